//! # Response Marshalling
//!
//! This module contains the engine that turns raw HTTP responses into values.
//!
//! * [`converter`]: the dispatcher, selecting one conversion path per response.
//! * [`blob`]: materializes single-pass byte streams into re-readable temporary files.
//! * [`multipart`]: splits `multipart/*` bodies into their parts.
//!
//! The legacy entity-type sniff used for payloads from older servers lives in its own private
//! module so the main decode path stays free of string matching.
pub mod blob;
pub mod converter;
pub mod multipart;
mod sniff;
