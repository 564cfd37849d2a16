use crate::error::CallError;
use crate::logger::log;
use crate::media::LocalMediaSource;
use crate::peer::candidates::CandidateBuffer;
use crate::peer::types::{PeerId, Role, SessionState};
use crate::protocol::{CandidatePayload, SignalMessage};
use crate::signaling::SignalSink;
use std::sync::Arc;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;

/// The negotiation state machine and resource bundle for one remote peer.
///
/// Exactly one session exists per peer id at any time; the orchestrator
/// enforces that. The session owns the peer connection, the candidate buffer
/// and the senders its outgoing tracks are bound to.
pub struct Session {
    peer_id: PeerId,
    role: Role,
    state: SessionState,
    pc: Arc<RTCPeerConnection>,
    buffer: CandidateBuffer,
    audio_sender: Option<Arc<RTCRtpSender>>,
    video_sender: Option<Arc<RTCRtpSender>>,
}

impl Session {
    pub fn new(peer_id: PeerId, role: Role, pc: Arc<RTCPeerConnection>) -> Self {
        Self {
            peer_id,
            role,
            state: SessionState::Idle,
            pc,
            buffer: CandidateBuffer::new(),
            audio_sender: None,
            video_sender: None,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn has_media(&self) -> bool {
        self.audio_sender.is_some() || self.video_sender.is_some()
    }

    /// Sender the outgoing video track is bound to, if media is attached.
    /// Screen-share substitution goes through this.
    pub fn video_sender(&self) -> Option<Arc<RTCRtpSender>> {
        self.video_sender.clone()
    }

    /// Number of remote candidates waiting for the remote description.
    pub fn buffered_candidates(&self) -> usize {
        self.buffer.len()
    }

    /// Binds the shared local tracks to this session's outgoing transport.
    /// Must happen before the offer/answer so the tracks appear in the SDP.
    pub async fn attach_media(&mut self, source: &LocalMediaSource) -> Result<(), CallError> {
        let audio = self
            .pc
            .add_track(source.audio_track() as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        Self::drain_rtcp(audio.clone());
        self.audio_sender = Some(audio);

        let video = self
            .pc
            .add_track(source.video_track() as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        Self::drain_rtcp(video.clone());
        self.video_sender = Some(video);
        Ok(())
    }

    // Interceptors only run while sender RTCP is being read.
    fn drain_rtcp(sender: Arc<RTCRtpSender>) {
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while let Ok((_, _)) = sender.read(&mut buf).await {}
        });
    }

    /// Caller side: create the offer, set it locally and send it.
    /// Idle -> Offering -> AwaitingAnswer. On error the session stays where
    /// the failure left it rather than advancing.
    pub async fn start_offer(&mut self, signals: &Arc<dyn SignalSink>) -> Result<(), CallError> {
        debug_assert_eq!(self.role, Role::Caller);
        self.state = SessionState::Offering;

        let offer = self.pc.create_offer(None).await.map_err(|e| self.nego(e))?;
        self.pc
            .set_local_description(offer.clone())
            .await
            .map_err(|e| self.nego(e))?;
        let local = self.pc.local_description().await.unwrap_or(offer);

        signals.send(SignalMessage::Offer {
            target_peer_id: Some(self.peer_id.clone()),
            source_peer_id: None,
            sdp: local,
        });
        log(&format!("offer sent to {}", self.peer_id));
        self.state = SessionState::AwaitingAnswer;
        Ok(())
    }

    /// Callee side: apply the remote offer, flush buffered candidates, answer.
    /// Idle -> Answering -> Connected.
    pub async fn accept_offer(
        &mut self,
        sdp: RTCSessionDescription,
        signals: &Arc<dyn SignalSink>,
    ) -> Result<(), CallError> {
        debug_assert_eq!(self.role, Role::Callee);
        self.state = SessionState::Answering;

        self.pc
            .set_remote_description(sdp)
            .await
            .map_err(|e| self.nego(e))?;
        self.apply_buffered().await;

        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| self.nego(e))?;
        self.pc
            .set_local_description(answer.clone())
            .await
            .map_err(|e| self.nego(e))?;
        let local = self.pc.local_description().await.unwrap_or(answer);

        signals.send(SignalMessage::Answer {
            target_peer_id: Some(self.peer_id.clone()),
            source_peer_id: None,
            sdp: local,
        });
        log(&format!("answer sent to {}", self.peer_id));
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Caller side: apply the remote answer and flush buffered candidates.
    /// AwaitingAnswer -> Connected. The orchestrator has already verified the
    /// state; a stale answer never reaches this method.
    pub async fn accept_answer(&mut self, sdp: RTCSessionDescription) -> Result<(), CallError> {
        self.pc
            .set_remote_description(sdp)
            .await
            .map_err(|e| self.nego(e))?;
        self.apply_buffered().await;
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Applies a remote candidate now if the buffer was already drained (the
    /// remote description is set by then), otherwise queues it.
    pub async fn add_candidate(&mut self, candidate: CandidatePayload) {
        if self.buffer.is_drained() {
            self.apply_candidate(candidate).await;
        } else {
            self.buffer.push(candidate);
            log(&format!(
                "candidate queued for {} ({} pending)",
                self.peer_id,
                self.buffer.len()
            ));
        }
    }

    async fn apply_buffered(&mut self) {
        let pending = self.buffer.drain_in_order();
        if pending.is_empty() {
            return;
        }
        log(&format!(
            "flushing {} buffered candidates for {}",
            pending.len(),
            self.peer_id
        ));
        for candidate in pending {
            self.apply_candidate(candidate).await;
        }
    }

    // Candidate application errors are logged per candidate and never touch
    // session state.
    async fn apply_candidate(&self, candidate: CandidatePayload) {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: None,
        };
        if let Err(e) = self.pc.add_ice_candidate(init).await {
            log(&format!("candidate from {} rejected: {e}", self.peer_id));
        }
    }

    pub fn mark_failed(&mut self) {
        self.state = SessionState::Failed;
    }

    pub async fn close(&mut self) {
        self.state = SessionState::Closed;
        if let Err(e) = self.pc.close().await {
            log(&format!("closing session with {}: {e}", self.peer_id));
        }
    }

    fn nego(&self, source: webrtc::Error) -> CallError {
        CallError::Negotiation {
            peer: self.peer_id.clone(),
            source,
        }
    }
}
