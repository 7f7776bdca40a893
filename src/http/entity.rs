//! Response entity module
//!
//! Type-erased response bodies (pre-serialization), the type metadata that
//! writers use to pick a serializer, and serialization annotations.

use serde::Serialize;
use serde_json::Value;
use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Annotation asking JSON writers for indented output
pub const PRETTY_JSON: &str = "json.pretty";

/// Describes the type of an entity as seen by serialization
///
/// Either the runtime type of a value (`of::<T>()`) or a declared shape that
/// has no concrete Rust type behind it (`named(..)`).
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: Cow<'static, str>,
    id: Option<TypeId>,
}

impl TypeDescriptor {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            name: Cow::Borrowed(type_name::<T>()),
            id: Some(TypeId::of::<T>()),
        }
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn type_id(&self) -> Option<TypeId> {
        self.id
    }

    pub fn is<T: Any + ?Sized>(&self) -> bool {
        self.id == Some(TypeId::of::<T>())
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.name == other.name,
        }
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

type JsonFn = fn(&(dyn Any + Send + Sync)) -> serde_json::Result<Value>;

fn json_of<T: Serialize + Any>(value: &(dyn Any + Send + Sync)) -> serde_json::Result<Value> {
    value
        .downcast_ref::<T>()
        .map_or(Ok(Value::Null), serde_json::to_value)
}

/// A response body value, shared and type-erased
///
/// Cloning is cheap; clones point at the same value.
#[derive(Clone)]
pub struct Entity {
    value: Arc<dyn Any + Send + Sync>,
    runtime_type: TypeDescriptor,
    to_json: Option<JsonFn>,
}

impl Entity {
    /// Wrap a value that writers can only handle by downcasting
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            runtime_type: TypeDescriptor::of::<T>(),
            to_json: None,
        }
    }

    /// Wrap a value that JSON writers can serialize
    pub fn serializable<T: Serialize + Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            runtime_type: TypeDescriptor::of::<T>(),
            to_json: Some(json_of::<T>),
        }
    }

    /// Runtime type of the wrapped value
    pub const fn runtime_type(&self) -> &TypeDescriptor {
        &self.runtime_type
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub const fn is_serializable(&self) -> bool {
        self.to_json.is_some()
    }

    /// JSON view of the value, `None` when it was not created serializable
    pub fn to_json(&self) -> Option<serde_json::Result<Value>> {
        self.to_json.map(|f| f(self.value.as_ref()))
    }

    /// Whether both entities share the same underlying value
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("runtime_type", &self.runtime_type.name())
            .field("serializable", &self.is_serializable())
            .finish_non_exhaustive()
    }
}

impl From<String> for Entity {
    fn from(value: String) -> Self {
        Self::serializable(value)
    }
}

impl From<&'static str> for Entity {
    fn from(value: &'static str) -> Self {
        Self::serializable(value)
    }
}

impl From<Value> for Entity {
    fn from(value: Value) -> Self {
        Self::serializable(value)
    }
}

/// An entity paired with an explicitly declared type
///
/// Used when the type serialization should see differs from, or is more
/// specific than, what the runtime type says.
#[derive(Debug, Clone)]
pub struct GenericEntity {
    entity: Entity,
    declared_type: TypeDescriptor,
}

impl GenericEntity {
    pub fn new(entity: impl Into<Entity>, declared_type: TypeDescriptor) -> Self {
        Self {
            entity: entity.into(),
            declared_type,
        }
    }

    pub const fn entity(&self) -> &Entity {
        &self.entity
    }

    pub const fn declared_type(&self) -> &TypeDescriptor {
        &self.declared_type
    }

    pub fn into_parts(self) -> (Entity, TypeDescriptor) {
        (self.entity, self.declared_type)
    }
}

/// What a response can carry as its entity
#[derive(Debug, Clone)]
pub enum ResponseEntity {
    Plain(Entity),
    Declared(GenericEntity),
}

impl ResponseEntity {
    /// The value itself, unwrapping a declared-type wrapper
    pub const fn value(&self) -> &Entity {
        match self {
            Self::Plain(entity) => entity,
            Self::Declared(generic) => generic.entity(),
        }
    }
}

impl From<Entity> for ResponseEntity {
    fn from(entity: Entity) -> Self {
        Self::Plain(entity)
    }
}

impl From<GenericEntity> for ResponseEntity {
    fn from(generic: GenericEntity) -> Self {
        Self::Declared(generic)
    }
}

/// Ordered serialization hints attached to an entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    entries: Vec<(String, String)>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an annotation, replacing any previous value for `name`
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether a flag-style annotation is set to `true`
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_type_descriptor_equality() {
        assert_eq!(TypeDescriptor::of::<String>(), TypeDescriptor::of::<String>());
        assert_ne!(TypeDescriptor::of::<String>(), TypeDescriptor::of::<u32>());
        assert_eq!(
            TypeDescriptor::named("List<Item>"),
            TypeDescriptor::named("List<Item>")
        );
        assert!(TypeDescriptor::of::<Vec<u8>>().is::<Vec<u8>>());
        assert!(!TypeDescriptor::named("Vec<u8>").is::<Vec<u8>>());
    }

    #[test]
    fn test_entity_runtime_type_and_downcast() {
        let entity = Entity::new(42_u32);
        assert!(entity.runtime_type().is::<u32>());
        assert_eq!(entity.downcast_ref::<u32>(), Some(&42));
        assert!(entity.downcast_ref::<i64>().is_none());
        assert!(entity.to_json().is_none());
    }

    #[test]
    fn test_serializable_entity_to_json() {
        let mut map = HashMap::new();
        map.insert("k".to_string(), "v".to_string());
        let entity = Entity::serializable(map);
        let json = entity.to_json().unwrap().unwrap();
        assert_eq!(json, serde_json::json!({"k": "v"}));
    }

    #[test]
    fn test_entity_clone_shares_value() {
        let entity = Entity::from("hello");
        let clone = entity.clone();
        assert!(entity.ptr_eq(&clone));
        assert!(!entity.ptr_eq(&Entity::from("hello")));
    }

    #[test]
    fn test_response_entity_value_unwraps_declared() {
        let generic =
            GenericEntity::new(Entity::new(vec![1_u8, 2]), TypeDescriptor::named("Bytes"));
        let entity = ResponseEntity::from(generic);
        assert!(entity.value().runtime_type().is::<Vec<u8>>());
    }

    #[test]
    fn test_annotations_insert_replaces() {
        let mut annotations = Annotations::new().with(PRETTY_JSON, "false");
        annotations.insert(PRETTY_JSON, "TRUE");
        annotations.insert("other", "x");
        assert!(annotations.is_enabled(PRETTY_JSON));
        assert_eq!(annotations.iter().count(), 2);
    }
}
