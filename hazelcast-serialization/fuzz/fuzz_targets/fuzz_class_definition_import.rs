#![no_main]

use libfuzzer_sys::fuzz_target;

use hazelcast_serialization::SerializationService;

fuzz_target!(|data: &[u8]| {
    let service = SerializationService::default();
    let context = service.portable_context();

    if let Ok(definition) = context.create_class_definition(data) {
        let known = context
            .lookup_versioned(definition.class_id(), definition.version())
            .expect("imported definition must be registered");
        assert!(std::sync::Arc::ptr_eq(&known, &definition));
        let _ = context.binary_of(&definition);
    }
});
