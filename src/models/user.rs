use chat_events::CallerInfo;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public user profile as read from the identity store. Profile CRUD is
/// owned by the identity service; this service only reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl UserProfile {
    pub fn caller_info(&self) -> CallerInfo {
        CallerInfo {
            id: self.id,
            full_name: self.full_name.clone(),
            profile_pic: self.profile_pic.clone(),
        }
    }
}
