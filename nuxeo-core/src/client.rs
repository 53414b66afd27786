//! # Nuxeo Client
//!
//! This module implements the high-level entry point for talking to a Nuxeo server.
//!
//! The [`NuxeoClient`] uses a **Typestate Pattern** to make clear which operations need a
//! server. It has two possible states:
//!
//! 1. **[`Online`]**: The client holds an HTTP transport. Every REST or automation call sends a
//!    request and hands the successful response to the [`ResponseConverter`].
//! 2. **[`Offline`]**: The client is **not connected** to any server. It only exposes the
//!    converter, which is enough to decode captured responses or to extend the registry.
//!
//! Both states share the same [`ResponseConverter`] and therefore the same
//! [`EntityRegistry`]: entity types registered on a client are visible to all of its clones.
//!
//! ## Example: State Transition
//!
//! ```rust,no_run
//! use nuxeo_core::client::{NuxeoClient, config::{Authentication, ClientConfig}};
//! use nuxeo_core::entity::registry::EntityRegistry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! // 1. Online State
//! let config = ClientConfig::new("http://localhost:8080/nuxeo")
//!     .authentication(Authentication::basic("Administrator", "Administrator"));
//! let client = NuxeoClient::connect(config).await?;
//!
//! // 2. Offline State
//! let offline = NuxeoClient::offline(EntityRegistry::new());
//! # Ok(())
//! # }
//! ```
pub mod auth;
pub mod config;
pub mod offline;
pub mod online;
pub mod operation;
pub mod transport;
pub mod version;

use self::transport::HttpClient;
use crate::{
    entity::{EntityShape, registry::EntityRegistry},
    error::ConvertError,
    marshal::converter::ResponseConverter,
};

/// Errors that can occur during a call, once the server has been reached.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Request failed: '{0}'")]
    Request(#[from] self::transport::HttpRequestError),
    #[error("Failed to encode request body: '{0}'")]
    Encode(#[source] serde_json::Error),
    #[error("Failed to read blob for upload: '{0}'")]
    ReadBlob(#[source] std::io::Error),
    #[error("Document has no id")]
    MissingDocumentId,
    #[error("Invalid server version: '{0}'")]
    Version(#[from] self::version::VersionError),
    #[error("Failed to convert response: '{0}'")]
    Convert(#[from] ConvertError),
    #[error("Unexpected payload: expected {expected}, got {actual}")]
    UnexpectedPayload {
        expected: &'static str,
        actual: &'static str,
    },
}

/// The main client for interacting with a Nuxeo server.
///
/// The generic parameter `T` represents the current state of the client.
#[derive(Clone, Debug)]
pub struct NuxeoClient<T> {
    state: T,
    converter: ResponseConverter,
}

impl<T> NuxeoClient<T> {
    pub(crate) fn new(state: T, converter: ResponseConverter) -> Self {
        Self { state, converter }
    }

    pub fn converter(&self) -> &ResponseConverter {
        &self.converter
    }

    pub fn registry(&self) -> &EntityRegistry {
        self.converter.registry()
    }

    /// Teaches the client a new entity type, or remaps an existing one.
    pub fn register_entity(&self, entity_type: impl Into<String>, shape: EntityShape) {
        self.converter.register_entity(entity_type, shape);
    }
}

/// State: Connected to a server.
#[derive(Debug, Clone)]
pub struct Online {
    http: HttpClient,
    /// Repository targeted by document calls, the server default when `None`.
    repository: Option<String>,
}

impl Online {
    pub(crate) fn new(http: HttpClient) -> Self {
        Self {
            http,
            repository: None,
        }
    }
}

/// State: Disconnected, conversion only.
#[derive(Debug, Clone, Default)]
pub struct Offline;
