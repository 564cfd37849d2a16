use std::fmt;

pub type PeerId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceServerKind {
    Stun,
    Turn,
}

/// One ICE server entry. Credentials are only meaningful for TURN relays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceServerConfig {
    pub kind: IceServerKind,
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            kind: IceServerKind::Stun,
            url: url.into(),
            username: None,
            credential: None,
        }
    }

    pub fn turn(
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            kind: IceServerKind::Turn,
            url: url.into(),
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }
}

/// Which side of the offer/answer exchange this session is.
/// Fixed for the lifetime of a session once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Our offer stands; the remote side answers.
    Caller,
    /// The remote side's offer won; we answer.
    Callee,
}

/// Per-session negotiation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Offering,
    AwaitingAnswer,
    Answering,
    Connected,
    Failed,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Offering => "offering",
            SessionState::AwaitingAnswer => "awaiting-answer",
            SessionState::Answering => "answering",
            SessionState::Connected => "connected",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Events pushed from transport callbacks and timers into the orchestrator's
/// event loop. Callbacks run on webrtc's internal tasks; the channel brings
/// them back onto the single orchestrator task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The peer connection reached the connected state.
    Up(PeerId),
    /// The transport reported failure after being established.
    Failed(PeerId),
    /// The reconnect delay for a discarded session has elapsed.
    Retry(PeerId),
    /// An incoming remote track was received (kind is "audio" or "video").
    RemoteTrack(PeerId, String),
}
