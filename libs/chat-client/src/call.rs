//! One endpoint's view of a call signaling session.
//!
//! The session interprets relayed channel events into media directives for
//! the embedding WebRTC layer; it carries no media itself. Two gates are
//! enforced here: a remote offer is never applied before the local user
//! accepted the call, and remote ICE candidates arriving before the remote
//! description is set are queued, never dropped.

use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Calling,
    Incoming,
    Connected,
    Rejected,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRole {
    Caller,
    Callee,
}

/// What the embedding media layer must do next.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaDirective {
    /// Set the remote offer, create an answer and send it, then apply the
    /// queued candidates in arrival order.
    ApplyRemoteOffer {
        sdp: JsonValue,
        candidates: Vec<JsonValue>,
    },
    /// Set the remote answer, then apply the queued candidates.
    ApplyRemoteAnswer {
        sdp: JsonValue,
        candidates: Vec<JsonValue>,
    },
    AddIceCandidate(JsonValue),
    /// Tear down the peer connection and release capture devices.
    Release,
}

pub struct CallSession {
    remote_user: Uuid,
    role: CallRole,
    phase: CallPhase,
    accepted: bool,
    buffered_offer: Option<JsonValue>,
    queued_candidates: Vec<JsonValue>,
    remote_description_set: bool,
}

impl CallSession {
    pub fn outgoing(remote_user: Uuid) -> Self {
        Self::new(remote_user, CallRole::Caller, CallPhase::Calling)
    }

    pub fn incoming(remote_user: Uuid) -> Self {
        Self::new(remote_user, CallRole::Callee, CallPhase::Incoming)
    }

    fn new(remote_user: Uuid, role: CallRole, phase: CallPhase) -> Self {
        Self {
            remote_user,
            role,
            phase,
            accepted: role == CallRole::Caller,
            buffered_offer: None,
            queued_candidates: Vec::new(),
            remote_description_set: false,
        }
    }

    pub fn remote_user(&self) -> Uuid {
        self.remote_user
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub fn role(&self) -> CallRole {
        self.role
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, CallPhase::Rejected | CallPhase::Ended)
    }

    /// Callee consents to the call. Consumes the buffered offer exactly
    /// once; media is wired only from this point on.
    pub fn accept(&mut self) -> Option<MediaDirective> {
        if self.phase != CallPhase::Incoming {
            return None;
        }
        self.accepted = true;
        self.phase = CallPhase::Connected;
        debug!(remote = %self.remote_user, "call accepted");
        self.buffered_offer.take().map(|sdp| self.apply_offer(sdp))
    }

    /// Callee declines. The coordinator relays the rejection; locally the
    /// session is terminal immediately.
    pub fn reject(&mut self) {
        self.phase = CallPhase::Rejected;
    }

    /// Caller side: the remote user accepted. Returns true when the caller
    /// should now create and send its offer.
    pub fn on_accepted(&mut self) -> bool {
        if self.role == CallRole::Caller && self.phase == CallPhase::Calling {
            self.phase = CallPhase::Connected;
            return true;
        }
        false
    }

    /// Remote offer relayed by the coordinator. Buffered until [`accept`]
    /// when the local user has not consented yet.
    pub fn on_offer(&mut self, sdp: JsonValue) -> Option<MediaDirective> {
        if self.is_terminal() {
            return None;
        }
        if !self.accepted {
            debug!(remote = %self.remote_user, "buffering offer until accept");
            self.buffered_offer = Some(sdp);
            return None;
        }
        Some(self.apply_offer(sdp))
    }

    /// Remote answer relayed by the coordinator; caller applies it and the
    /// session is connected.
    pub fn on_answer(&mut self, sdp: JsonValue) -> Option<MediaDirective> {
        if self.role != CallRole::Caller || self.is_terminal() {
            return None;
        }
        self.remote_description_set = true;
        self.phase = CallPhase::Connected;
        Some(MediaDirective::ApplyRemoteAnswer {
            sdp,
            candidates: std::mem::take(&mut self.queued_candidates),
        })
    }

    /// Remote ICE candidate. Queued while the remote description is not
    /// yet set; candidates are never dropped.
    pub fn on_ice_candidate(&mut self, candidate: JsonValue) -> Option<MediaDirective> {
        if self.is_terminal() {
            return None;
        }
        if !self.remote_description_set {
            self.queued_candidates.push(candidate);
            return None;
        }
        Some(MediaDirective::AddIceCandidate(candidate))
    }

    /// Remote user rejected the call. The embedding layer returns the UI
    /// to idle after its fixed display delay.
    pub fn on_rejected(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.phase = CallPhase::Rejected;
        true
    }

    /// Remote hangup. Idempotent after local teardown.
    pub fn on_ended(&mut self) -> Option<MediaDirective> {
        if self.phase == CallPhase::Ended {
            return None;
        }
        self.phase = CallPhase::Ended;
        debug!(remote = %self.remote_user, "call ended");
        Some(MediaDirective::Release)
    }

    /// Local hangup. Idempotent like the remote variant.
    pub fn end(&mut self) -> Option<MediaDirective> {
        self.on_ended()
    }

    fn apply_offer(&mut self, sdp: JsonValue) -> MediaDirective {
        self.remote_description_set = true;
        MediaDirective::ApplyRemoteOffer {
            sdp,
            candidates: std::mem::take(&mut self.queued_candidates),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn offer_before_accept_is_buffered_and_applied_on_accept() {
        let mut session = CallSession::incoming(Uuid::new_v4());

        let offer = json!({"type": "offer", "sdp": "v=0"});
        assert_eq!(session.on_offer(offer.clone()), None);

        match session.accept() {
            Some(MediaDirective::ApplyRemoteOffer { sdp, .. }) => assert_eq!(sdp, offer),
            other => panic!("expected buffered offer, got {other:?}"),
        }
        assert_eq!(session.phase(), CallPhase::Connected);
    }

    #[test]
    fn accept_without_buffered_offer_waits_for_relay() {
        let mut session = CallSession::incoming(Uuid::new_v4());
        assert_eq!(session.accept(), None);

        // the offer relayed after accept is applied directly
        let offer = json!({"type": "offer", "sdp": "v=0"});
        match session.on_offer(offer.clone()) {
            Some(MediaDirective::ApplyRemoteOffer { sdp, .. }) => assert_eq!(sdp, offer),
            other => panic!("expected immediate apply, got {other:?}"),
        }
    }

    #[test]
    fn early_candidates_are_queued_until_remote_description() {
        let mut session = CallSession::incoming(Uuid::new_v4());

        let c1 = json!({"candidate": "one"});
        let c2 = json!({"candidate": "two"});
        assert_eq!(session.on_ice_candidate(c1.clone()), None);
        assert_eq!(session.on_ice_candidate(c2.clone()), None);

        session.on_offer(json!({"type": "offer"}));
        match session.accept() {
            Some(MediaDirective::ApplyRemoteOffer { candidates, .. }) => {
                assert_eq!(candidates, vec![c1, c2], "queued in arrival order");
            }
            other => panic!("expected offer with drained queue, got {other:?}"),
        }

        // once the remote description is set, candidates flow through
        let c3 = json!({"candidate": "three"});
        assert_eq!(
            session.on_ice_candidate(c3.clone()),
            Some(MediaDirective::AddIceCandidate(c3))
        );
    }

    #[test]
    fn caller_connects_via_accepted_then_answer() {
        let mut session = CallSession::outgoing(Uuid::new_v4());
        assert!(session.on_accepted(), "caller creates the offer on accept");

        let answer = json!({"type": "answer", "sdp": "v=0"});
        match session.on_answer(answer.clone()) {
            Some(MediaDirective::ApplyRemoteAnswer { sdp, .. }) => assert_eq!(sdp, answer),
            other => panic!("expected answer apply, got {other:?}"),
        }
        assert_eq!(session.phase(), CallPhase::Connected);
    }

    #[test]
    fn ended_is_idempotent() {
        let mut session = CallSession::outgoing(Uuid::new_v4());
        assert_eq!(session.on_ended(), Some(MediaDirective::Release));
        assert_eq!(session.on_ended(), None);
        assert_eq!(session.end(), None);
    }

    #[test]
    fn rejected_is_terminal() {
        let mut session = CallSession::outgoing(Uuid::new_v4());
        assert!(session.on_rejected());
        assert!(!session.on_rejected());
        assert_eq!(session.on_offer(json!({"type": "offer"})), None);
    }
}
