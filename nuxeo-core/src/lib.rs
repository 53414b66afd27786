//! # Nuxeo Core
//!
//! `nuxeo-core` is the foundational library powering the `nuxeo` CLI. It provides a client for
//! the Nuxeo REST API whose responses are marshalled by a content-negotiation engine rather than
//! by per-endpoint code.
//!
//! ## Key Components
//!
//! * **[`NuxeoClient`](client::NuxeoClient):** The main entry point. It issues REST and automation
//!   calls and hands every successful response to the converter.
//! * **[`ResponseConverter`](marshal::converter::ResponseConverter):** Inspects a response's
//!   content type and headers and turns the payload into an entity, a JSON tree, raw text,
//!   a [`Blob`](marshal::blob::Blob) or a collection of blobs.
//! * **[`EntityRegistry`](entity::registry::EntityRegistry):** Maps the wire-level
//!   `entity-type` tag to a known [`EntityShape`](entity::EntityShape). It can be extended at
//!   runtime to teach the converter about server-defined entities.
//!
//! ## Dispatch order
//!
//! Multipart and binary payloads short-circuit before anything reads the body as text.
//! JSON payloads are decoded into the statically expected shape, or, for automation calls whose
//! result shape is unknown at the call site, into whatever the `entity-type` tag resolves to.
//!
//! ## Re-exports
//!
//! This crate re-exports `http` so consumers can build [`RawResponse`](marshal::converter::RawResponse)
//! values from a compatible `HeaderMap`.
pub mod client;
pub mod entity;
pub mod error;
pub mod marshal;
pub mod media_type;

// Re-exports
pub use http;
