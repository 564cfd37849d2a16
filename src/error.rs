use thiserror::Error;

/// Errors surfaced by the call client and its components.
///
/// None of these are fatal to the process: negotiation and candidate errors
/// are scoped to one peer session, channel errors to the signaling socket.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("signaling transport: {0}")]
    Channel(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("negotiation with {peer}: {source}")]
    Negotiation {
        peer: String,
        #[source]
        source: webrtc::Error,
    },

    #[error("webrtc: {0}")]
    Rtc(#[from] webrtc::Error),

    /// The platform refused access to the capture device. Distinct from
    /// negotiation failure: no session is affected, no media was attached.
    #[error("capture device access denied")]
    CaptureDenied,

    #[error("not joined to a room")]
    NotJoined,
}
