//! # jurutani-shared
//!
//! Domain types for the JuruTani direct-messaging engine: conversation and
//! message rows, participant profiles, attachment references, and the tuning
//! constants shared by every other crate in the workspace.
//!
//! Every struct derives `Serialize` and `Deserialize` so rows can be handed
//! directly to a UI layer.

pub mod constants;
pub mod models;
pub mod types;

pub use models::*;
pub use types::{ConversationId, MessageId, UserId};
