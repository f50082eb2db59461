//! Runtime type names and the declared is-a graph used for codec lookup.

use dashmap::DashMap;
use std::borrow::Cow;
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Name of a runtime type as seen by the serializer registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    /// Family of every [`Portable`](super::portable::Portable) type.
    pub const PORTABLE: TypeKey = TypeKey::from_static("hazelcast.Portable");
    /// Family of every [`IdentifiedDataSerializable`](super::IdentifiedDataSerializable) type.
    pub const DATA_SERIALIZABLE: TypeKey = TypeKey::from_static("hazelcast.DataSerializable");
    /// Family of user types encoded by the generic serde codec.
    pub const SERIALIZABLE: TypeKey = TypeKey::from_static("hazelcast.Serializable");

    /// Key of `Value::String`.
    pub const STRING: TypeKey = TypeKey::from_static("string");
    /// Key of `Value::Integer`.
    pub const INTEGER: TypeKey = TypeKey::from_static("i32");
    /// Key of `Value::Long`.
    pub const LONG: TypeKey = TypeKey::from_static("i64");
    /// Key of `Value::Boolean`.
    pub const BOOLEAN: TypeKey = TypeKey::from_static("bool");
    /// Key of `Value::ByteArray`.
    pub const BYTE_ARRAY: TypeKey = TypeKey::from_static("byte[]");
    /// Key of `Value::Date`.
    pub const DATE: TypeKey = TypeKey::from_static("date");
    /// Key of `Value::BigInteger`.
    pub const BIG_INTEGER: TypeKey = TypeKey::from_static("big_integer");

    /// Creates a key from a static name.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a key from any name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns true for the keys of the reserved codec families.
    pub fn is_reserved_family(&self) -> bool {
        *self == Self::PORTABLE || *self == Self::DATA_SERIALIZABLE
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeKey {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Declared parents of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Concrete supertypes, nearest first.
    pub supertypes: Vec<TypeKey>,
    /// Implemented interfaces, in declaration order.
    pub interfaces: Vec<TypeKey>,
}

impl TypeDescriptor {
    /// Creates an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a supertype.
    pub fn extends(mut self, supertype: impl Into<TypeKey>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    /// Adds an interface.
    pub fn implements(mut self, interface: impl Into<TypeKey>) -> Self {
        self.interfaces.push(interface.into());
        self
    }
}

/// The declared is-a graph.
///
/// Declarations are additive: declaring the same type twice merges the parent
/// lists, keeping declaration order and dropping duplicates.
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    types: DashMap<TypeKey, TypeDescriptor>,
}

impl TypeHierarchy {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares (or extends) the parents of `key`.
    pub fn declare(&self, key: TypeKey, descriptor: TypeDescriptor) {
        let mut entry = self.types.entry(key).or_default();
        for supertype in descriptor.supertypes {
            if !entry.supertypes.contains(&supertype) {
                entry.supertypes.push(supertype);
            }
        }
        for interface in descriptor.interfaces {
            if !entry.interfaces.contains(&interface) {
                entry.interfaces.push(interface);
            }
        }
    }

    /// Returns true if `key` has declared parents.
    pub fn is_declared(&self, key: &TypeKey) -> bool {
        self.types.contains_key(key)
    }

    /// Returns the declared parents of `key`.
    pub fn descriptor(&self, key: &TypeKey) -> Option<TypeDescriptor> {
        self.types.get(key).map(|entry| entry.value().clone())
    }

    /// Returns every ancestor of `key` in lookup order.
    ///
    /// Supertypes come first, breadth-first in declaration order. Interfaces
    /// follow, breadth-first starting from those declared on `key` and then on
    /// each supertype in the order visited, including the interfaces' own
    /// declared parents. `key` itself is not part of the result.
    pub fn ancestors(&self, key: &TypeKey) -> Vec<TypeKey> {
        let mut seen: HashSet<TypeKey> = HashSet::new();
        seen.insert(key.clone());

        let mut classes = Vec::new();
        let mut queue = VecDeque::from([key.clone()]);
        while let Some(current) = queue.pop_front() {
            if let Some(entry) = self.types.get(&current) {
                for supertype in &entry.supertypes {
                    if seen.insert(supertype.clone()) {
                        classes.push(supertype.clone());
                        queue.push_back(supertype.clone());
                    }
                }
            }
        }

        let mut interfaces = Vec::new();
        let mut queue: VecDeque<TypeKey> = VecDeque::new();
        for owner in std::iter::once(key).chain(classes.iter()) {
            if let Some(entry) = self.types.get(owner) {
                for interface in &entry.interfaces {
                    if seen.insert(interface.clone()) {
                        interfaces.push(interface.clone());
                        queue.push_back(interface.clone());
                    }
                }
            }
        }
        while let Some(current) = queue.pop_front() {
            if let Some(entry) = self.types.get(&current) {
                for parent in entry.interfaces.iter().chain(entry.supertypes.iter()) {
                    if seen.insert(parent.clone()) {
                        interfaces.push(parent.clone());
                        queue.push_back(parent.clone());
                    }
                }
            }
        }

        classes.extend(interfaces);
        classes
    }

    /// Returns true if `key` is `ancestor` or declares it anywhere above.
    pub fn is_a(&self, key: &TypeKey, ancestor: &TypeKey) -> bool {
        key == ancestor || self.ancestors(key).contains(ancestor)
    }

    /// Removes every declaration.
    pub fn clear(&self) {
        self.types.clear();
    }
}
