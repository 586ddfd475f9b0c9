pub mod asset_store;
pub mod call_service;
pub mod conversation_service;
pub mod message_service;

// Re-export key types for convenience
pub use asset_store::{AssetStore, S3AssetStore};
pub use call_service::{CallCoordinator, CallStatus};
pub use conversation_service::{ConversationService, PeerDirectory};
pub use message_service::{MessageService, SendMessagePayload};
