#![no_main]

use libfuzzer_sys::fuzz_target;

use hazelcast_serialization::serialization::{Data, ObjectDataInput};
use hazelcast_serialization::SerializationService;

fuzz_target!(|data: &[u8]| {
    let service = SerializationService::default();

    // Transported envelopes, one after another.
    let mut input = ObjectDataInput::with_service(data, &service);
    while input.remaining() > 0 {
        match input.read_data() {
            Ok(Some(envelope)) => {
                let _ = envelope.partition_hash();
                let _ = service.to_object(Some(&envelope));
            }
            Ok(None) => {}
            Err(_) => break,
        }
    }

    // A raw payload behind the type id in its first four bytes.
    if data.len() >= 4 {
        let type_id = i32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let envelope = Data::new(type_id, data[4..].to_vec());
        let _ = service.to_object(Some(&envelope));
    }

    let mut input = ObjectDataInput::with_service(data, &service);
    let _ = input.read_object();
});
