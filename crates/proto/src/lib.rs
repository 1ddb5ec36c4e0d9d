//! Shared protocol types for the chat client.
//!
//! This crate defines the session/message structures, the wire shapes of the
//! backend endpoints, and strongly-typed error enums shared across the
//! workspace.

pub mod error;
pub mod message;
pub mod wire;

/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of conversation/message identity types.
pub use message::{ChatMessage, Role, SessionId};
/// Re-export of backend wire shapes.
pub use wire::{HistoryPage, ModelList, SendReply};
