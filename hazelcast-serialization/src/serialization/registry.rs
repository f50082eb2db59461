//! Type and type id bindings of the serialization service.

use super::portable::PORTABLE_TYPE_ID;
use super::serializer::{same_implementation, same_instance, TypeSerializer};
use super::type_key::{TypeDescriptor, TypeHierarchy, TypeKey};
use super::IDENTIFIED_DATA_SERIALIZABLE_TYPE_ID;
use crate::error::{HazelcastError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Maps runtime types and type ids to codecs.
///
/// A type that has no binding of its own resolves through the declared type
/// hierarchy, then through the fallback codec. Whatever it resolves to is
/// memoized as a direct binding, so the walk happens once per type.
#[derive(Debug, Default)]
pub struct SerializerRegistry {
    type_map: DashMap<TypeKey, Arc<dyn TypeSerializer>>,
    id_map: DashMap<i32, Arc<dyn TypeSerializer>>,
    fallback: RwLock<Option<Arc<dyn TypeSerializer>>>,
    hierarchy: TypeHierarchy,
    hierarchy_walks: AtomicU64,
}

impl SerializerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the declared type hierarchy used by [`lookup`](Self::lookup).
    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    /// Declares the parents of `key`.
    pub fn declare_type(&self, key: impl Into<TypeKey>, descriptor: TypeDescriptor) {
        self.hierarchy.declare(key.into(), descriptor);
    }

    /// Binds a user codec to `key` and to the codec's type id.
    ///
    /// Fails with `InvalidArgument` for a negative type id and with
    /// `RegistrationConflict` when the type or the id is already bound to a
    /// different codec implementation, or when `key` belongs to a reserved
    /// family. A failed call leaves no binding behind.
    pub fn register(&self, key: TypeKey, codec: Arc<dyn TypeSerializer>) -> Result<()> {
        if codec.type_id() < 0 {
            return Err(HazelcastError::InvalidArgument(format!(
                "type id must be non-negative, got {} for {}",
                codec.type_id(),
                key
            )));
        }
        for (family, family_id) in [
            (TypeKey::PORTABLE, PORTABLE_TYPE_ID),
            (TypeKey::DATA_SERIALIZABLE, IDENTIFIED_DATA_SERIALIZABLE_TYPE_ID),
        ] {
            if !self.hierarchy.is_a(&key, &family) {
                continue;
            }
            let canonical = self.lookup_id(family_id);
            let is_canonical = canonical
                .as_ref()
                .is_some_and(|c| same_implementation(c.as_ref(), codec.as_ref()));
            if !is_canonical {
                tracing::warn!(type_key = %key, family = %family, "rejected codec override of reserved family");
                return Err(HazelcastError::RegistrationConflict(format!(
                    "{} is a {} and must use the built-in codec",
                    key, family
                )));
            }
        }
        self.safe_register(key, codec)
    }

    /// Binds a built-in codec to `key` and to its type id, replacing whatever
    /// was bound before.
    pub(crate) fn install(&self, key: TypeKey, codec: Arc<dyn TypeSerializer>) {
        self.id_map.insert(codec.type_id(), Arc::clone(&codec));
        self.type_map.insert(key, codec);
    }

    /// Binds a codec unless the type or its id is taken by a different
    /// implementation.
    fn safe_register(&self, key: TypeKey, codec: Arc<dyn TypeSerializer>) -> Result<()> {
        let inserted_type = match self.type_map.entry(key.clone()) {
            Entry::Occupied(existing) => {
                if !same_implementation(existing.get().as_ref(), codec.as_ref()) {
                    tracing::warn!(type_key = %key, type_id = codec.type_id(), "type already bound to another codec");
                    return Err(HazelcastError::RegistrationConflict(format!(
                        "{} is already bound to {:?}",
                        key,
                        existing.get()
                    )));
                }
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&codec));
                true
            }
        };

        if let Err(e) = self.bind_id(&codec) {
            if inserted_type {
                self.type_map
                    .remove_if(&key, |_, bound| same_instance(bound, &codec));
            }
            tracing::warn!(type_key = %key, type_id = codec.type_id(), "type id already bound to another codec");
            return Err(e);
        }
        Ok(())
    }

    fn bind_id(&self, codec: &Arc<dyn TypeSerializer>) -> Result<()> {
        let type_id = codec.type_id();
        match self.id_map.entry(type_id) {
            Entry::Occupied(existing) => {
                if same_implementation(existing.get().as_ref(), codec.as_ref()) {
                    Ok(())
                } else {
                    Err(HazelcastError::RegistrationConflict(format!(
                        "type id {} is already bound to {:?}",
                        type_id,
                        existing.get()
                    )))
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(codec));
                Ok(())
            }
        }
    }

    /// Removes the binding of `key`, and its id binding if the id still maps
    /// to the same codec instance.
    pub fn deregister(&self, key: &TypeKey) {
        if let Some((_, codec)) = self.type_map.remove(key) {
            self.id_map
                .remove_if(&codec.type_id(), |_, bound| same_instance(bound, &codec));
            tracing::debug!(type_key = %key, type_id = codec.type_id(), "deregistered codec");
        }
    }

    /// Installs the fallback codec and binds its type id.
    ///
    /// Fails with `RegistrationConflict` if a fallback is already active or
    /// the id is bound to another codec. The active fallback is left as is.
    pub fn register_fallback(&self, codec: Arc<dyn TypeSerializer>) -> Result<()> {
        {
            let mut slot = self.fallback.write();
            if let Some(active) = slot.as_ref() {
                return Err(HazelcastError::RegistrationConflict(format!(
                    "fallback codec already registered: {:?}",
                    active
                )));
            }
            *slot = Some(Arc::clone(&codec));
        }
        if let Err(e) = self.bind_id(&codec) {
            let mut slot = self.fallback.write();
            if slot.as_ref().is_some_and(|active| same_instance(active, &codec)) {
                *slot = None;
            }
            return Err(e);
        }
        tracing::debug!(type_id = codec.type_id(), "registered fallback codec");
        Ok(())
    }

    /// Clears the fallback slot. Its id binding and any memoized adoptions
    /// stay in place.
    pub fn deregister_fallback(&self) {
        self.fallback.write().take();
    }

    /// Returns the active fallback codec.
    pub fn fallback(&self) -> Option<Arc<dyn TypeSerializer>> {
        self.fallback.read().clone()
    }

    /// Resolves the codec for `key`.
    ///
    /// Members of the Portable and identified data serializable families
    /// always resolve to the family codec, even when a binding for the key
    /// predates its declaration as a family member.
    pub fn lookup(&self, key: &TypeKey) -> Option<Arc<dyn TypeSerializer>> {
        if let Some((_, codec)) = self.lookup_family(key) {
            return Some(codec);
        }
        if let Some(codec) = self.type_map.get(key) {
            return Some(Arc::clone(codec.value()));
        }
        self.hierarchy_walks.fetch_add(1, Ordering::Relaxed);

        let codec = match self.lookup_ancestors(key) {
            Some((ancestor, codec)) => {
                tracing::debug!(type_key = %key, ancestor = %ancestor, type_id = codec.type_id(), "adopted codec of ancestor");
                codec
            }
            None => {
                let codec = self.fallback()?;
                tracing::debug!(type_key = %key, type_id = codec.type_id(), "adopted fallback codec");
                codec
            }
        };
        let winner = self.type_map.entry(key.clone()).or_insert(codec);
        Some(Arc::clone(winner.value()))
    }

    fn lookup_family(&self, key: &TypeKey) -> Option<(TypeKey, Arc<dyn TypeSerializer>)> {
        if !self.hierarchy.is_declared(key) {
            return None;
        }
        let ancestors = self.hierarchy.ancestors(key);
        [TypeKey::PORTABLE, TypeKey::DATA_SERIALIZABLE]
            .into_iter()
            .filter(|family| ancestors.contains(family))
            .find_map(|family| {
                let codec = self.type_map.get(&family).map(|c| Arc::clone(c.value()))?;
                Some((family, codec))
            })
    }

    fn lookup_ancestors(&self, key: &TypeKey) -> Option<(TypeKey, Arc<dyn TypeSerializer>)> {
        self.hierarchy
            .ancestors(key)
            .into_iter()
            .find_map(|ancestor| {
                let codec = self.type_map.get(&ancestor).map(|c| Arc::clone(c.value()))?;
                Some((ancestor, codec))
            })
    }

    /// Returns the codec bound to `type_id`.
    pub fn lookup_id(&self, type_id: i32) -> Option<Arc<dyn TypeSerializer>> {
        self.id_map.get(&type_id).map(|codec| Arc::clone(codec.value()))
    }

    /// Returns how many lookups missed the direct bindings.
    pub fn hierarchy_walks(&self) -> u64 {
        self.hierarchy_walks.load(Ordering::Relaxed)
    }

    /// Returns the number of type bindings, memoized adoptions included.
    pub fn len(&self) -> usize {
        self.type_map.len()
    }

    /// Returns true if no type is bound.
    pub fn is_empty(&self) -> bool {
        self.type_map.is_empty()
    }

    /// Runs the teardown hook of every distinct codec once and drops all
    /// bindings, the fallback and the declared hierarchy.
    pub fn destroy(&self) {
        let mut codecs: Vec<Arc<dyn TypeSerializer>> = Vec::new();
        let candidates = self
            .type_map
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .chain(self.id_map.iter().map(|entry| Arc::clone(entry.value())))
            .chain(self.fallback.write().take());
        for codec in candidates {
            if !codecs.iter().any(|seen| same_instance(seen, &codec)) {
                codecs.push(codec);
            }
        }
        self.type_map.clear();
        self.id_map.clear();
        self.hierarchy.clear();
        for codec in &codecs {
            codec.destroy();
        }
        tracing::debug!(codecs = codecs.len(), "destroyed serializer registry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::value::Value;
    use crate::serialization::{ObjectDataInput, ObjectDataOutput};
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Default)]
    struct Codec {
        id: i32,
        destroyed: AtomicUsize,
    }

    impl Codec {
        fn with_id(id: i32) -> Arc<Self> {
            Arc::new(Self {
                id,
                destroyed: AtomicUsize::new(0),
            })
        }
    }

    impl TypeSerializer for Codec {
        fn type_id(&self) -> i32 {
            self.id
        }

        fn write(&self, _output: &mut ObjectDataOutput<'_>, _value: &Value) -> Result<()> {
            Ok(())
        }

        fn read(&self, _input: &mut ObjectDataInput<'_>) -> Result<Value> {
            Ok(Value::Null)
        }

        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Debug)]
    struct OtherCodec;

    impl TypeSerializer for OtherCodec {
        fn type_id(&self) -> i32 {
            10
        }

        fn write(&self, _output: &mut ObjectDataOutput<'_>, _value: &Value) -> Result<()> {
            Ok(())
        }

        fn read(&self, _input: &mut ObjectDataInput<'_>) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn key(name: &'static str) -> TypeKey {
        TypeKey::from_static(name)
    }

    #[test]
    fn test_register_binds_type_and_id() {
        let registry = SerializerRegistry::new();
        let codec = Codec::with_id(10);
        registry.register(key("a.Order"), codec.clone()).unwrap();
        assert_eq!(registry.lookup(&key("a.Order")).unwrap().type_id(), 10);
        assert_eq!(registry.lookup_id(10).unwrap().type_id(), 10);
        assert_eq!(registry.hierarchy_walks(), 0);
    }

    #[test]
    fn test_negative_id_is_invalid() {
        let registry = SerializerRegistry::new();
        assert!(matches!(
            registry.register(key("a.Order"), Codec::with_id(-3)),
            Err(HazelcastError::InvalidArgument(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_same_implementation_rebinds_quietly() {
        let registry = SerializerRegistry::new();
        registry.register(key("a.Order"), Codec::with_id(10)).unwrap();
        registry.register(key("a.Order"), Codec::with_id(10)).unwrap();
        registry.register(key("a.Invoice"), Codec::with_id(10)).unwrap();
    }

    #[test]
    fn test_type_conflict_keeps_original() {
        let registry = SerializerRegistry::new();
        registry.register(key("a.Order"), Codec::with_id(10)).unwrap();
        assert!(matches!(
            registry.register(key("a.Order"), Arc::new(OtherCodec)),
            Err(HazelcastError::RegistrationConflict(_))
        ));
        let bound = registry.lookup(&key("a.Order")).unwrap();
        assert!(same_implementation(bound.as_ref(), &Codec::default()));
    }

    #[test]
    fn test_id_conflict_rolls_back_type_binding() {
        let registry = SerializerRegistry::new();
        registry.register(key("a.Order"), Codec::with_id(10)).unwrap();
        assert!(matches!(
            registry.register(key("a.Invoice"), Arc::new(OtherCodec)),
            Err(HazelcastError::RegistrationConflict(_))
        ));
        assert!(registry.lookup(&key("a.Invoice")).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reserved_family_cannot_be_overridden() {
        let registry = SerializerRegistry::new();
        registry.declare_type(
            "a.Customer",
            TypeDescriptor::new().implements(TypeKey::PORTABLE),
        );
        assert!(matches!(
            registry.register(key("a.Customer"), Codec::with_id(10)),
            Err(HazelcastError::RegistrationConflict(_))
        ));
        assert!(registry.lookup_id(10).is_none());
    }

    #[test]
    fn test_subtype_adopts_supertype_codec_once() {
        let registry = SerializerRegistry::new();
        let base = Codec::with_id(10);
        registry.register(key("a.Shape"), base.clone()).unwrap();
        registry.declare_type("a.Circle", TypeDescriptor::new().extends("a.Shape"));

        let first = registry.lookup(&key("a.Circle")).unwrap();
        assert_eq!(registry.hierarchy_walks(), 1);
        let second = registry.lookup(&key("a.Circle")).unwrap();
        assert_eq!(registry.hierarchy_walks(), 1);
        assert!(same_instance(&first, &second));
        let base: Arc<dyn TypeSerializer> = base;
        assert!(same_instance(&first, &base));
    }

    #[test]
    fn test_supertypes_win_over_interfaces() {
        let registry = SerializerRegistry::new();
        registry.register(key("a.Named"), Codec::with_id(20)).unwrap();
        registry.register(key("a.Shape"), Codec::with_id(10)).unwrap();
        registry.declare_type(
            "a.Square",
            TypeDescriptor::new().extends("a.Rect").implements("a.Named"),
        );
        registry.declare_type("a.Rect", TypeDescriptor::new().extends("a.Shape"));
        assert_eq!(registry.lookup(&key("a.Square")).unwrap().type_id(), 10);
    }

    #[test]
    fn test_family_member_adopts_family_codec() {
        let registry = SerializerRegistry::new();
        registry.install(TypeKey::PORTABLE, Codec::with_id(PORTABLE_TYPE_ID));
        registry.declare_type(
            "a.Customer",
            TypeDescriptor::new().implements(TypeKey::PORTABLE),
        );
        assert_eq!(
            registry.lookup(&key("a.Customer")).unwrap().type_id(),
            PORTABLE_TYPE_ID
        );
    }

    #[test]
    fn test_late_family_declaration_overrides_binding() {
        let registry = SerializerRegistry::new();
        registry.install(TypeKey::PORTABLE, Codec::with_id(PORTABLE_TYPE_ID));
        registry.register(key("a.Customer"), Codec::with_id(10)).unwrap();
        assert_eq!(registry.lookup(&key("a.Customer")).unwrap().type_id(), 10);

        registry.declare_type(
            "a.Customer",
            TypeDescriptor::new().implements(TypeKey::PORTABLE),
        );
        assert_eq!(
            registry.lookup(&key("a.Customer")).unwrap().type_id(),
            PORTABLE_TYPE_ID
        );
    }

    #[test]
    fn test_fallback_is_adopted_and_memoized() {
        let registry = SerializerRegistry::new();
        assert!(registry.lookup(&key("a.Unknown")).is_none());
        registry.register_fallback(Codec::with_id(50)).unwrap();
        assert_eq!(registry.lookup(&key("a.Unknown")).unwrap().type_id(), 50);
        assert_eq!(registry.lookup_id(50).unwrap().type_id(), 50);

        registry.deregister_fallback();
        assert!(registry.fallback().is_none());
        assert_eq!(registry.lookup(&key("a.Unknown")).unwrap().type_id(), 50);
        assert!(registry.lookup(&key("a.Other")).is_none());
    }

    #[test]
    fn test_second_fallback_conflicts() {
        let registry = SerializerRegistry::new();
        let first = Codec::with_id(50);
        registry.register_fallback(first.clone()).unwrap();
        assert!(matches!(
            registry.register_fallback(Codec::with_id(51)),
            Err(HazelcastError::RegistrationConflict(_))
        ));
        assert_eq!(registry.fallback().unwrap().type_id(), 50);
        assert!(registry.lookup_id(51).is_none());
    }

    #[test]
    fn test_fallback_id_conflict_clears_slot() {
        let registry = SerializerRegistry::new();
        registry.register(key("a.Order"), Codec::with_id(10)).unwrap();
        assert!(registry.register_fallback(Arc::new(OtherCodec)).is_err());
        assert!(registry.fallback().is_none());
    }

    #[test]
    fn test_deregister() {
        let registry = SerializerRegistry::new();
        registry.register(key("a.Order"), Codec::with_id(10)).unwrap();
        registry.deregister(&key("a.Order"));
        assert!(registry.lookup(&key("a.Order")).is_none());
        assert!(registry.lookup_id(10).is_none());
        registry.deregister(&key("a.Order"));
    }

    #[test]
    fn test_deregister_keeps_id_of_other_instance() {
        let registry = SerializerRegistry::new();
        registry.register(key("a.Order"), Codec::with_id(10)).unwrap();
        registry.register(key("a.Invoice"), Codec::with_id(10)).unwrap();
        registry.deregister(&key("a.Invoice"));
        assert!(registry.lookup_id(10).is_some());
    }

    #[test]
    fn test_destroy_runs_teardown_once_per_codec() {
        let registry = SerializerRegistry::new();
        let shared = Codec::with_id(10);
        let fallback = Codec::with_id(50);
        registry.register(key("a.Order"), shared.clone()).unwrap();
        registry.register(key("a.Invoice"), shared.clone()).unwrap();
        registry.register_fallback(fallback.clone()).unwrap();
        registry.declare_type("a.Circle", TypeDescriptor::new().extends("a.Shape"));

        registry.destroy();
        assert_eq!(shared.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.destroyed.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
        assert!(registry.lookup_id(10).is_none());
        assert!(registry.fallback().is_none());
        assert!(registry.hierarchy().descriptor(&key("a.Circle")).is_none());
    }

    #[test]
    fn test_concurrent_adoption_converges() {
        let registry = SerializerRegistry::new();
        registry.register(key("a.Shape"), Codec::with_id(10)).unwrap();
        registry.declare_type("a.Circle", TypeDescriptor::new().extends("a.Shape"));
        let resolved: Vec<Arc<dyn TypeSerializer>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.lookup(&key("a.Circle")).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for codec in &resolved {
            assert!(same_instance(codec, &resolved[0]));
        }
    }
}
