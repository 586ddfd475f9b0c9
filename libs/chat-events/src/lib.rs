//! Wire contract shared by the service and its clients.
//!
//! Every frame on the event channel is one JSON object tagged by `type`.
//! SDP and ICE payloads are opaque [`serde_json::Value`]s — the server
//! relays signaling envelopes, it never interprets them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Placeholder shown in conversation summaries for image-only messages.
pub const IMAGE_PLACEHOLDER: &str = "📷 Image";

/// Immutable message record as persisted and as carried on the wire.
///
/// `message_text` / `message_image` hold wire ciphertext
/// (`<ivHex>:QKD:<base64>`) or legacy plaintext; the server never decrypts
/// on the read path. `seen` transitions false→true exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_image: Option<String>,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// The conversation partner from `user`'s point of view.
    pub fn peer_of(&self, user: Uuid) -> Uuid {
        if self.sender_id == user {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

/// Display payload relayed with a call invitation. Opaque to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallerInfo {
    pub id: Uuid,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
}

/// Server → client channel events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelEvent {
    #[serde(rename = "presenceChanged")]
    PresenceChanged {
        #[serde(rename = "onlineUserIds")]
        online_user_ids: Vec<Uuid>,
    },

    #[serde(rename = "newMessage")]
    NewMessage { message: MessageRecord },

    #[serde(rename = "callIncoming")]
    CallIncoming {
        #[serde(rename = "callerInfo")]
        caller_info: CallerInfo,
    },

    #[serde(rename = "callAccepted")]
    CallAccepted,

    #[serde(rename = "callRejected")]
    CallRejected,

    #[serde(rename = "callEnded")]
    CallEnded,

    #[serde(rename = "callOffer")]
    CallOffer {
        sdp: JsonValue,
        #[serde(rename = "fromUserId")]
        from_user_id: Uuid,
    },

    #[serde(rename = "callAnswer")]
    CallAnswer { sdp: JsonValue },

    #[serde(rename = "callIceCandidate")]
    CallIceCandidate { candidate: JsonValue },
}

impl ChannelEvent {
    /// Serialize to the single-frame JSON representation.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).expect("channel event serialization cannot fail")
    }
}

/// Client → server channel events (call signaling only; messaging goes
/// through the synchronous HTTP API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "callInitiate")]
    CallInitiate {
        #[serde(rename = "targetId")]
        target_id: Uuid,
        #[serde(rename = "callerInfo")]
        caller_info: CallerInfo,
    },

    #[serde(rename = "callAccept")]
    CallAccept {
        #[serde(rename = "callerId")]
        caller_id: Uuid,
    },

    #[serde(rename = "callReject")]
    CallReject {
        #[serde(rename = "callerId")]
        caller_id: Uuid,
    },

    #[serde(rename = "callEnd")]
    CallEnd {
        #[serde(rename = "targetId")]
        target_id: Uuid,
    },

    #[serde(rename = "callOffer")]
    CallOffer {
        #[serde(rename = "targetId")]
        target_id: Uuid,
        sdp: JsonValue,
    },

    #[serde(rename = "callAnswer")]
    CallAnswer {
        #[serde(rename = "targetId")]
        target_id: Uuid,
        sdp: JsonValue,
    },

    #[serde(rename = "callIceCandidate")]
    CallIceCandidate {
        #[serde(rename = "targetId")]
        target_id: Uuid,
        candidate: JsonValue,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_events_carry_wire_names() {
        let event = ChannelEvent::PresenceChanged {
            online_user_ids: vec![],
        };
        let frame: JsonValue = serde_json::from_str(&event.to_frame()).unwrap();
        assert_eq!(frame["type"], "presenceChanged");
        assert!(frame["onlineUserIds"].is_array());

        let event = ChannelEvent::CallOffer {
            sdp: json!({"type": "offer", "sdp": "v=0"}),
            from_user_id: Uuid::nil(),
        };
        let frame: JsonValue = serde_json::from_str(&event.to_frame()).unwrap();
        assert_eq!(frame["type"], "callOffer");
        assert_eq!(frame["fromUserId"], Uuid::nil().to_string());
    }

    #[test]
    fn client_events_parse_from_wire_json() {
        let raw = json!({
            "type": "callIceCandidate",
            "targetId": Uuid::nil(),
            "candidate": {"candidate": "candidate:0 1 UDP ...", "sdpMid": "0"},
        });
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        match event {
            ClientEvent::CallIceCandidate { target_id, .. } => {
                assert_eq!(target_id, Uuid::nil())
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn message_record_skips_absent_payload_fields() {
        let record = MessageRecord {
            id: Uuid::nil(),
            sender_id: Uuid::nil(),
            receiver_id: Uuid::nil(),
            message_text: Some("ct".into()),
            message_image: None,
            seen: false,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["messageText"], "ct");
        assert!(value.get("messageImage").is_none());
        assert_eq!(value["senderId"], Uuid::nil().to_string());
    }
}
