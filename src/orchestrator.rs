use crate::config;
use crate::error::CallError;
use crate::logger::log;
use crate::media::LocalMediaSource;
use crate::peer::connection::new_peer;
use crate::peer::session::Session;
use crate::peer::types::{IceServerConfig, PeerId, Role, SessionState, TransportEvent};
use crate::protocol::CandidatePayload;
use crate::signaling::SignalSink;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;

/// Notifications for the presentation layer.
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The relay assigned our identity.
    AssignedPeerId(PeerId),
    /// Roster confirmation received; the room is live.
    RoomJoined {
        room_id: String,
        is_host: bool,
        peers: Vec<PeerId>,
    },
    /// A session was created for a remote peer.
    SessionCreated { peer_id: PeerId, role: Role },
    /// The media transport to a peer is up.
    PeerConnected(PeerId),
    /// The peer left and its session was discarded.
    PeerLeft(PeerId),
    /// An incoming remote track arrived (kind is "audio" or "video").
    RemoteTrack { peer_id: PeerId, kind: String },
    /// The transport to a peer failed; a retry is scheduled.
    ConnectionProblem(PeerId),
    /// The fixed reconnect delay elapsed and a fresh session is being set up.
    Reconnecting(PeerId),
}

/// Owns the set of sessions, one per remote peer, and drives them from
/// signaling messages and transport events.
///
/// Every roster message opens caller sessions toward unseen peers, so both
/// ends of a fresh edge offer; the lexicographic tie-break settles which side
/// keeps the caller role. Everything here runs on one task; relay messages
/// are handled in arrival order, so negotiation for a given peer is
/// serialized end-to-end. Constructed per room membership, torn down on
/// hangup.
pub struct ConnectionOrchestrator {
    self_id: PeerId,
    sessions: HashMap<PeerId, Session>,
    roster: HashSet<PeerId>,
    signals: Arc<dyn SignalSink>,
    events: UnboundedSender<CallEvent>,
    transport_tx: UnboundedSender<TransportEvent>,
    media: Option<Arc<LocalMediaSource>>,
    ice_servers: Vec<IceServerConfig>,
    reconnect_delay: Duration,
}

impl ConnectionOrchestrator {
    pub fn new(
        self_id: PeerId,
        signals: Arc<dyn SignalSink>,
        events: UnboundedSender<CallEvent>,
        transport_tx: UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            self_id,
            sessions: HashMap::new(),
            roster: HashSet::new(),
            signals,
            events,
            transport_tx,
            media: None,
            ice_servers: Vec::new(),
            reconnect_delay: config::RECONNECT_DELAY,
        }
    }

    /// Replaces the default ICE servers for sessions created afterwards.
    pub fn set_ice_servers(&mut self, servers: Vec<IceServerConfig>) {
        self.ice_servers = servers;
    }

    #[cfg(test)]
    fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Attaches the local media source. Sessions created from here on bind
    /// its tracks and caller sessions actually send offers.
    pub fn attach_media(&mut self, source: Arc<LocalMediaSource>) {
        self.media = Some(source);
    }

    /// Media became ready mid-call: bind the tracks to every session that
    /// lacks them and move idle caller sessions on to offering.
    pub async fn media_ready(&mut self, source: Arc<LocalMediaSource>) {
        self.media = Some(source.clone());
        let signals = self.signals.clone();
        for session in self.sessions.values_mut() {
            if !session.has_media() {
                if let Err(e) = session.attach_media(&source).await {
                    log(&format!("media attach for {}: {e}", session.peer_id()));
                    continue;
                }
            }
            if session.role() == Role::Caller && session.state() == SessionState::Idle {
                if let Err(e) = session.start_offer(&signals).await {
                    log(&format!("{e}"));
                }
            }
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_state(&self, peer_id: &str) -> Option<SessionState> {
        self.sessions.get(peer_id).map(|s| s.state())
    }

    pub fn session_role(&self, peer_id: &str) -> Option<Role> {
        self.sessions.get(peer_id).map(|s| s.role())
    }

    pub fn buffered_candidates(&self, peer_id: &str) -> Option<usize> {
        self.sessions.get(peer_id).map(|s| s.buffered_candidates())
    }

    /// Video senders of every session with media attached, for screen-share
    /// substitution.
    pub fn video_senders(&self) -> Vec<(PeerId, Arc<RTCRtpSender>)> {
        self.sessions
            .values()
            .filter_map(|s| Some((s.peer_id().clone(), s.video_sender()?)))
            .collect()
    }

    /// Called with the full roster on join and with the updated roster on
    /// each arrival. Every peer id without a session gets a caller-role
    /// session; existing sessions are untouched.
    pub async fn on_roster(&mut self, peers: &[PeerId]) {
        self.roster = peers.iter().cloned().collect();
        for peer_id in peers {
            if *peer_id == self.self_id || self.sessions.contains_key(peer_id) {
                continue;
            }
            if let Err(e) = self.open_caller_session(peer_id.clone()).await {
                log(&format!("session setup for {peer_id}: {e}"));
            }
        }
    }

    /// Closes and discards the session for a departed peer. Idempotent.
    pub async fn on_peer_left(&mut self, peer_id: &str) {
        self.roster.remove(peer_id);
        if let Some(mut session) = self.sessions.remove(peer_id) {
            session.close().await;
            self.emit(CallEvent::PeerLeft(peer_id.to_owned()));
        }
    }

    /// Handles a remote offer: creates a callee session if none exists,
    /// applies the offer, flushes buffered candidates and answers.
    pub async fn on_offer(&mut self, from: PeerId, sdp: RTCSessionDescription) {
        if let Some(session) = self.sessions.get(&from) {
            match (session.role(), session.state()) {
                // Negotiation for one peer is serialized end-to-end; a second
                // offer arriving mid-answer is dropped, not interleaved.
                (_, SessionState::Answering) => {
                    log(&format!("offer from {from} dropped: already answering"));
                    return;
                }
                // Glare: both sides offered. The lexicographically smaller
                // peer id keeps the caller role.
                (Role::Caller, SessionState::Offering | SessionState::AwaitingAnswer) => {
                    if self.self_id < from {
                        log(&format!("glare with {from}: keeping caller role"));
                        return;
                    }
                    log(&format!("glare with {from}: yielding caller role"));
                    if let Some(mut stale) = self.sessions.remove(&from) {
                        stale.close().await;
                    }
                }
                // A caller still waiting on local media; the remote side
                // offered first, so take the callee role instead.
                (_, SessionState::Idle) => {
                    log(&format!("idle session with {from}: answering their offer"));
                    if let Some(mut stale) = self.sessions.remove(&from) {
                        stale.close().await;
                    }
                }
                (_, state) => {
                    log(&format!("offer from {from} ignored in state {state}"));
                    return;
                }
            }
        }

        if let Err(e) = self.create_session(from.clone(), Role::Callee).await {
            log(&format!("session setup for {from}: {e}"));
            return;
        }
        let signals = self.signals.clone();
        if let Some(session) = self.sessions.get_mut(&from) {
            if let Err(e) = session.accept_offer(sdp, &signals).await {
                log(&format!("{e}"));
            }
        }
    }

    /// Applies a remote answer. Anything arriving while the session is not
    /// awaiting one is stale or duplicate: discarded and logged, never fatal.
    pub async fn on_answer(&mut self, from: PeerId, sdp: RTCSessionDescription) {
        let Some(session) = self.sessions.get_mut(&from) else {
            log(&format!("answer from {from} dropped: no session"));
            return;
        };
        if session.state() != SessionState::AwaitingAnswer {
            log(&format!(
                "answer from {from} discarded in state {}",
                session.state()
            ));
            return;
        }
        if let Err(e) = session.accept_answer(sdp).await {
            log(&format!("{e}"));
        }
    }

    /// Routes a remote candidate to its session: applied immediately once the
    /// remote description is set, buffered otherwise.
    pub async fn on_candidate(&mut self, from: PeerId, candidate: CandidatePayload) {
        let Some(session) = self.sessions.get_mut(&from) else {
            log(&format!("candidate from {from} dropped: no session"));
            return;
        };
        session.add_candidate(candidate).await;
    }

    /// Reacts to events funneled in from transport callbacks and timers.
    pub async fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Up(peer_id) => self.emit(CallEvent::PeerConnected(peer_id)),
            TransportEvent::RemoteTrack(peer_id, kind) => {
                self.emit(CallEvent::RemoteTrack { peer_id, kind })
            }
            TransportEvent::Failed(peer_id) => self.on_transport_failed(peer_id).await,
            TransportEvent::Retry(peer_id) => self.on_retry(peer_id).await,
        }
    }

    /// Discard-and-retry: the failed session is dropped now and a fresh
    /// caller session is opened after the fixed delay. No cap, no backoff;
    /// retries stop only when the peer leaves or the room is torn down.
    async fn on_transport_failed(&mut self, peer_id: PeerId) {
        let Some(mut session) = self.sessions.remove(&peer_id) else {
            return;
        };
        session.mark_failed();
        session.close().await;
        self.emit(CallEvent::ConnectionProblem(peer_id.clone()));

        let tx = self.transport_tx.clone();
        let delay = self.reconnect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TransportEvent::Retry(peer_id));
        });
    }

    async fn on_retry(&mut self, peer_id: PeerId) {
        if !self.roster.contains(&peer_id) {
            log(&format!("retry for {peer_id} dropped: peer left"));
            return;
        }
        if self.sessions.contains_key(&peer_id) {
            // The remote side re-established the session in the meantime.
            return;
        }
        self.emit(CallEvent::Reconnecting(peer_id.clone()));
        if let Err(e) = self.open_caller_session(peer_id.clone()).await {
            log(&format!("reconnect to {peer_id}: {e}"));
        }
    }

    /// Closes every session and clears all state.
    pub async fn hangup(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.close().await;
        }
        self.roster.clear();
        log("all sessions closed");
    }

    async fn open_caller_session(&mut self, peer_id: PeerId) -> Result<(), CallError> {
        self.create_session(peer_id.clone(), Role::Caller).await?;
        if self.media.is_none() {
            // Offer only once local media is ready; the session waits in
            // Idle and answers if the remote side offers first.
            return Ok(());
        }
        let signals = self.signals.clone();
        if let Some(session) = self.sessions.get_mut(&peer_id) {
            session.start_offer(&signals).await?;
        }
        Ok(())
    }

    /// Creates a session for `peer_id` unless one exists; creating a
    /// duplicate is a no-op leaving the existing session untouched.
    async fn create_session(&mut self, peer_id: PeerId, role: Role) -> Result<(), CallError> {
        if self.sessions.contains_key(&peer_id) {
            return Ok(());
        }
        let pc = new_peer(
            &peer_id,
            &self.ice_servers,
            self.signals.clone(),
            self.transport_tx.clone(),
        )
        .await?;
        let mut session = Session::new(peer_id.clone(), role, pc);
        if let Some(source) = &self.media {
            session.attach_media(source).await?;
        }
        log(&format!("session created for {peer_id} as {role:?}"));
        self.sessions.insert(peer_id.clone(), session);
        self.emit(CallEvent::SessionCreated { peer_id, role });
        Ok(())
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }
}
