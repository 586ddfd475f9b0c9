//! Client-side reconciliation for the chat channel.
//!
//! [`conversation`] keeps the per-user view consistent across the
//! synchronous send acknowledgment and the live push of the same record,
//! and mirrors the server-computed unseen counts between peer-list loads.
//! [`call`] tracks one endpoint's view of a signaling session, gating media
//! setup behind the user's explicit accept.

pub mod call;
pub mod conversation;

pub use call::{CallPhase, CallRole, CallSession, MediaDirective};
pub use conversation::{ConversationAction, ConversationState, LastMessage};
