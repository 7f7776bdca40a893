//! Handler result module
//!
//! The closed set of shapes an endpoint can hand back to the pipeline.

use crate::http::{Entity, GenericEntity, Response};

/// Raw value returned by application code
#[derive(Debug, Clone, Default)]
pub enum HandlerResult {
    /// A finished response, possibly carrying a declared-type entity
    Response(Response),
    /// An entity with an explicitly declared type
    Declared(GenericEntity),
    /// Any other value
    Entity(Entity),
    /// The handler produced no value
    #[default]
    Absent,
}

impl From<Response> for HandlerResult {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<GenericEntity> for HandlerResult {
    fn from(generic: GenericEntity) -> Self {
        Self::Declared(generic)
    }
}

impl From<Entity> for HandlerResult {
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

impl<T: Into<Self>> From<Option<T>> for HandlerResult {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_conversion() {
        assert!(matches!(HandlerResult::from(None::<Entity>), HandlerResult::Absent));
        let result = HandlerResult::from(Some(Entity::from("x")));
        assert!(matches!(result, HandlerResult::Entity(_)));
    }

    #[test]
    fn test_default_is_absent() {
        assert!(matches!(HandlerResult::default(), HandlerResult::Absent));
    }
}
