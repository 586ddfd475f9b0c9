//! Per-dyad call signaling state machine.
//!
//! The coordinator relays opaque WebRTC envelopes between the two sides of
//! an ordered dyad (caller, target) and tracks just enough state to gate
//! media behind the target's explicit accept. It never parses SDP or ICE
//! payloads, and it never errors back to the initiator of a signaling
//! event: undefined transitions and unknown/offline targets are dropped
//! with a debug log.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chat_events::{CallerInfo, ChannelEvent, ClientEvent};
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::websocket::PresenceRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// Initiated; target offline or not yet notified. No timeout applies —
    /// a caller can ring an offline target indefinitely.
    Calling,
    /// `callIncoming` delivered, awaiting the target's decision.
    Incoming,
    Connected,
    Rejected,
    Ended,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calling => "calling",
            Self::Incoming => "incoming",
            Self::Connected => "connected",
            Self::Rejected => "rejected",
            Self::Ended => "ended",
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Ended)
    }
}

struct CallSession {
    status: CallStatus,
    /// An offer relayed before the target accepted; consumed exactly once
    /// on accept. Media must not be wired before user consent.
    buffered_offer: Option<JsonValue>,
}

/// One active session per ordered dyad, process-wide. Absence of an entry
/// is the idle state; a new initiate is only valid once the prior session
/// is terminal or gone.
#[derive(Clone)]
pub struct CallCoordinator {
    registry: PresenceRegistry,
    sessions: Arc<RwLock<HashMap<(Uuid, Uuid), CallSession>>>,
    reject_reset: Duration,
}

impl CallCoordinator {
    pub fn new(registry: PresenceRegistry, reject_reset: Duration) -> Self {
        Self {
            registry,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            reject_reset,
        }
    }

    /// Dispatch one client signaling event from `from`'s connection.
    pub async fn handle_event(&self, from: Uuid, event: ClientEvent) {
        match event {
            ClientEvent::CallInitiate {
                target_id,
                caller_info,
            } => self.initiate(from, target_id, caller_info).await,
            ClientEvent::CallAccept { caller_id } => self.accept(caller_id, from).await,
            ClientEvent::CallReject { caller_id } => self.reject(caller_id, from).await,
            ClientEvent::CallEnd { target_id } => self.end(from, target_id).await,
            ClientEvent::CallOffer { target_id, sdp } => self.offer(from, target_id, sdp).await,
            ClientEvent::CallAnswer { target_id, sdp } => self.answer(from, target_id, sdp).await,
            ClientEvent::CallIceCandidate {
                target_id,
                candidate,
            } => self.ice_candidate(from, target_id, candidate).await,
        }
    }

    pub async fn session_status(&self, caller: Uuid, target: Uuid) -> Option<CallStatus> {
        self.sessions
            .read()
            .await
            .get(&(caller, target))
            .map(|s| s.status)
    }

    pub async fn initiate(&self, caller: Uuid, target: Uuid, caller_info: CallerInfo) {
        {
            let mut sessions = self.sessions.write().await;
            if let Some(existing) = sessions.get(&(caller, target)) {
                if !existing.status.is_terminal() {
                    debug!(
                        caller = %caller,
                        target = %target,
                        status = existing.status.as_str(),
                        "initiate dropped, session already active"
                    );
                    return;
                }
            }
            sessions.insert(
                (caller, target),
                CallSession {
                    status: CallStatus::Calling,
                    buffered_offer: None,
                },
            );
        }

        let delivered = self
            .registry
            .send_to_user(target, ChannelEvent::CallIncoming { caller_info }.to_frame())
            .await;

        if delivered {
            let mut sessions = self.sessions.write().await;
            if let Some(session) = sessions.get_mut(&(caller, target)) {
                if session.status == CallStatus::Calling {
                    session.status = CallStatus::Incoming;
                }
            }
        } else {
            debug!(caller = %caller, target = %target, "target offline, caller keeps ringing");
        }
    }

    pub async fn accept(&self, caller: Uuid, target: Uuid) {
        let buffered = {
            let mut sessions = self.sessions.write().await;
            let Some(session) = sessions.get_mut(&(caller, target)) else {
                debug!(caller = %caller, target = %target, "accept for unknown session dropped");
                return;
            };
            if !matches!(session.status, CallStatus::Calling | CallStatus::Incoming) {
                debug!(
                    status = session.status.as_str(),
                    "accept dropped, transition undefined"
                );
                return;
            }
            session.status = CallStatus::Connected;
            session.buffered_offer.take()
        };

        self.registry
            .send_to_user(caller, ChannelEvent::CallAccepted.to_frame())
            .await;

        if let Some(sdp) = buffered {
            self.registry
                .send_to_user(
                    target,
                    ChannelEvent::CallOffer {
                        sdp,
                        from_user_id: caller,
                    }
                    .to_frame(),
                )
                .await;
        }
    }

    pub async fn reject(&self, caller: Uuid, target: Uuid) {
        {
            let mut sessions = self.sessions.write().await;
            let Some(session) = sessions.get_mut(&(caller, target)) else {
                debug!(caller = %caller, target = %target, "reject for unknown session dropped");
                return;
            };
            if session.status.is_terminal() {
                return;
            }
            session.status = CallStatus::Rejected;
        }

        self.registry
            .send_to_user(caller, ChannelEvent::CallRejected.to_frame())
            .await;

        // rejected lingers for the configured delay, then back to idle
        let sessions = Arc::clone(&self.sessions);
        let reset_after = self.reject_reset;
        tokio::spawn(async move {
            tokio::time::sleep(reset_after).await;
            let mut sessions = sessions.write().await;
            if let Some(session) = sessions.get(&(caller, target)) {
                if session.status == CallStatus::Rejected {
                    sessions.remove(&(caller, target));
                }
            }
        });
    }

    pub async fn offer(&self, from: Uuid, target: Uuid, sdp: JsonValue) {
        {
            let mut sessions = self.sessions.write().await;
            if let Some(session) = sessions.get_mut(&(from, target)) {
                match session.status {
                    CallStatus::Calling | CallStatus::Incoming => {
                        // pre-accept: buffer, consumed once on accept
                        session.buffered_offer = Some(sdp);
                        return;
                    }
                    CallStatus::Connected => {}
                    _ => return,
                }
            } else if let Some(session) = sessions.get(&(target, from)) {
                if session.status != CallStatus::Connected {
                    return;
                }
            } else {
                debug!(from = %from, target = %target, "offer without session dropped");
                return;
            }
        }

        self.registry
            .send_to_user(
                target,
                ChannelEvent::CallOffer {
                    sdp,
                    from_user_id: from,
                }
                .to_frame(),
            )
            .await;
    }

    pub async fn answer(&self, from: Uuid, target: Uuid, sdp: JsonValue) {
        {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(&(target, from))
                .or_else(|| sessions.get(&(from, target)));
            match session {
                Some(session) if !session.status.is_terminal() => {}
                _ => {
                    debug!(from = %from, target = %target, "answer without session dropped");
                    return;
                }
            }
        }

        self.registry
            .send_to_user(target, ChannelEvent::CallAnswer { sdp }.to_frame())
            .await;
    }

    pub async fn ice_candidate(&self, from: Uuid, target: Uuid, candidate: JsonValue) {
        {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(&(from, target))
                .or_else(|| sessions.get(&(target, from)));
            match session {
                Some(session) if !session.status.is_terminal() => {}
                _ => {
                    debug!(from = %from, target = %target, "ice candidate without session dropped");
                    return;
                }
            }
        }

        self.registry
            .send_to_user(target, ChannelEvent::CallIceCandidate { candidate }.to_frame())
            .await;
    }

    pub async fn end(&self, from: Uuid, target: Uuid) {
        let any_removed = {
            let mut sessions = self.sessions.write().await;
            let removed_a = sessions.remove(&(from, target)).is_some();
            let removed_b = sessions.remove(&(target, from)).is_some();
            removed_a || removed_b
        };

        // repeated end after teardown is a no-op
        if !any_removed {
            return;
        }

        self.registry
            .send_to_user(target, ChannelEvent::CallEnded.to_frame())
            .await;
    }
}
