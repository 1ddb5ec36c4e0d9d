//! Thin HTTP client for the chat backend.
//!
//! Wraps the three backend calls (list models, fetch history, send message)
//! and normalizes responses into the `proto` wire types. Each operation is a
//! stateless one-shot request with no retry, timeout, or caching.

pub mod api;

pub use api::{ApiClient, Attachment, DEFAULT_TEMPERATURE, SendRequest};
