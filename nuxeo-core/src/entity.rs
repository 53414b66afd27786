//! # Entities
//!
//! The typed payloads the converter can produce from JSON.
//!
//! The set of reachable shapes is closed: a wire-level `entity-type` tag never selects a type
//! by name, it is resolved through the [`registry::EntityRegistry`] to one of the
//! [`EntityShape`] decoders below. Server-defined entities with no dedicated struct can be
//! registered as [`EntityShape::Generic`] and come back as a plain JSON tree.
pub mod registry;
mod types;

pub use types::*;

use serde_json::Value;
use std::io::Read;

/// The decoders a tag can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityShape {
    Document,
    Documents,
    RecordSet,
    User,
    Group,
    Workflow,
    Workflows,
    /// Any JSON object, kept as a `serde_json::Value`.
    Generic,
}

impl EntityShape {
    /// Returns the name of the shape, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            EntityShape::Document => "Document",
            EntityShape::Documents => "Documents",
            EntityShape::RecordSet => "RecordSet",
            EntityShape::User => "User",
            EntityShape::Group => "Group",
            EntityShape::Workflow => "Workflow",
            EntityShape::Workflows => "Workflows",
            EntityShape::Generic => "Generic",
        }
    }

    /// Decodes a JSON document from `reader` into this shape.
    pub fn decode<R: Read>(self, reader: R) -> serde_json::Result<Entity> {
        let entity = match self {
            EntityShape::Document => Entity::Document(serde_json::from_reader(reader)?),
            EntityShape::Documents => Entity::Documents(serde_json::from_reader(reader)?),
            EntityShape::RecordSet => Entity::RecordSet(serde_json::from_reader(reader)?),
            EntityShape::User => Entity::User(serde_json::from_reader(reader)?),
            EntityShape::Group => Entity::Group(serde_json::from_reader(reader)?),
            EntityShape::Workflow => Entity::Workflow(serde_json::from_reader(reader)?),
            EntityShape::Workflows => Entity::Workflows(serde_json::from_reader(reader)?),
            EntityShape::Generic => Entity::Generic(serde_json::from_reader(reader)?),
        };
        Ok(entity)
    }
}

/// A decoded entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Document(Document),
    Documents(Documents),
    RecordSet(RecordSet),
    User(User),
    Group(Group),
    Workflow(Workflow),
    Workflows(Workflows),
    Generic(Value),
}

impl Entity {
    /// Returns the shape this entity was decoded as.
    pub fn shape(&self) -> EntityShape {
        match self {
            Entity::Document(_) => EntityShape::Document,
            Entity::Documents(_) => EntityShape::Documents,
            Entity::RecordSet(_) => EntityShape::RecordSet,
            Entity::User(_) => EntityShape::User,
            Entity::Group(_) => EntityShape::Group,
            Entity::Workflow(_) => EntityShape::Workflow,
            Entity::Workflows(_) => EntityShape::Workflows,
            Entity::Generic(_) => EntityShape::Generic,
        }
    }

    /// Returns the `entity-type` carried by the payload, if any.
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Entity::Document(v) => Some(&v.entity_type),
            Entity::Documents(v) => Some(&v.entity_type),
            Entity::RecordSet(v) => Some(&v.entity_type),
            Entity::User(v) => Some(&v.entity_type),
            Entity::Group(v) => Some(&v.entity_type),
            Entity::Workflow(v) => Some(&v.entity_type),
            Entity::Workflows(v) => Some(&v.entity_type),
            Entity::Generic(v) => v.get("entity-type").and_then(Value::as_str),
        }
    }
}

macro_rules! impl_try_from_entity {
    ($($variant:ident),* $(,)?) => {
        $(
            impl TryFrom<Entity> for $variant {
                type Error = Entity;

                fn try_from(entity: Entity) -> Result<Self, Self::Error> {
                    match entity {
                        Entity::$variant(v) => Ok(v),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

impl_try_from_entity!(
    Document, Documents, RecordSet, User, Group, Workflow, Workflows
);
