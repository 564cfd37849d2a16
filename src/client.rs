use crate::error::CallError;
use crate::logger::log;
use crate::media::{MediaCapture, MediaSourceManager};
use crate::orchestrator::{CallEvent, ConnectionOrchestrator};
use crate::peer::types::{IceServerConfig, TransportEvent};
use crate::protocol::SignalMessage;
use crate::room::{RoomMembershipTracker, RoomRole};
use crate::signaling::{SignalSink, SignalingChannel};
use crate::utils::random_room_id;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// One call client: signaling channel, room membership, local media and the
/// per-room orchestrator, glued together by a single event loop.
///
/// The orchestrator is constructed when the roster confirmation arrives and
/// torn down on hangup; there is no session state outside it.
pub struct CallClient {
    signals: Arc<SignalingChannel>,
    inbound: UnboundedReceiver<SignalMessage>,
    transport_tx: UnboundedSender<TransportEvent>,
    transport_rx: UnboundedReceiver<TransportEvent>,
    events: UnboundedSender<CallEvent>,
    room: RoomMembershipTracker,
    media: MediaSourceManager,
    ice_servers: Vec<IceServerConfig>,
    orchestrator: Option<ConnectionOrchestrator>,
}

impl CallClient {
    /// Connects to the signaling relay. The returned receiver carries
    /// presentation events for the whole lifetime of the client.
    pub async fn connect(
        url: &str,
        capture: Arc<dyn MediaCapture>,
    ) -> Result<(Self, UnboundedReceiver<CallEvent>), CallError> {
        let (signals, inbound) = SignalingChannel::connect(url).await?;
        let (events, event_rx) = unbounded_channel();
        let (transport_tx, transport_rx) = unbounded_channel();
        Ok((
            Self {
                signals,
                inbound,
                transport_tx,
                transport_rx,
                events,
                room: RoomMembershipTracker::new(),
                media: MediaSourceManager::new(capture),
                ice_servers: Vec::new(),
                orchestrator: None,
            },
            event_rx,
        ))
    }

    /// Acquires camera and microphone. Caller sessions only offer once media
    /// is ready; starting the camera mid-call moves any idle caller sessions
    /// on to offering. Without media the client still answers and receives.
    pub async fn start_camera(&mut self) -> Result<(), CallError> {
        let source = self.media.start().await?;
        if let Some(orchestrator) = &mut self.orchestrator {
            orchestrator.media_ready(source).await;
        }
        Ok(())
    }

    /// Generates a room id and joins it.
    pub fn create_room(&self) -> String {
        let room_id = random_room_id();
        self.join_room(&room_id);
        room_id
    }

    pub fn join_room(&self, room_id: &str) {
        self.signals.send(SignalMessage::JoinRoom {
            room_id: room_id.to_owned(),
        });
    }

    pub fn room(&self) -> &RoomMembershipTracker {
        &self.room
    }

    /// Supplies custom ICE servers (own STUN/TURN infrastructure). Applies to
    /// rooms joined after the call; the built-in defaults are used otherwise.
    pub fn set_ice_servers(&mut self, servers: Vec<IceServerConfig>) {
        self.ice_servers = servers;
    }

    /// Flips the shared mute flag; every connected peer observes the change
    /// at once, with no renegotiation.
    pub fn toggle_audio(&self) -> Option<bool> {
        self.media.toggle_audio()
    }

    pub fn toggle_video(&self) -> Option<bool> {
        self.media.toggle_video()
    }

    /// Substitutes a display-capture track on every session's video sender.
    pub async fn start_screen_share(&mut self) -> Result<(), CallError> {
        let Some(orchestrator) = &self.orchestrator else {
            return Err(CallError::NotJoined);
        };
        let senders = orchestrator.video_senders();
        self.media.start_screen_share(&senders).await
    }

    /// Restores the camera track everywhere. Presentation calls this when the
    /// user stops sharing or the display track ends.
    pub async fn stop_screen_share(&mut self) {
        let senders = self
            .orchestrator
            .as_ref()
            .map(|o| o.video_senders())
            .unwrap_or_default();
        self.media.stop_screen_share(&senders).await;
    }

    /// Leaves the call: closes every session, releases local media, clears
    /// the room. The signaling connection itself stays up.
    pub async fn hangup(&mut self) {
        if let Some(mut orchestrator) = self.orchestrator.take() {
            orchestrator.hangup().await;
        }
        self.media.release();
        self.room.clear();
        log("hung up");
    }

    /// The event loop: processes relay messages in arrival order and
    /// transport events as they surface. Returns when the signaling channel
    /// closes.
    pub async fn run(&mut self) -> Result<(), CallError> {
        loop {
            tokio::select! {
                msg = self.inbound.recv() => {
                    match msg {
                        Some(msg) => self.handle_signal(msg).await,
                        None => {
                            log("signaling channel closed, stopping");
                            break;
                        }
                    }
                }
                Some(event) = self.transport_rx.recv() => {
                    if let Some(orchestrator) = &mut self.orchestrator {
                        orchestrator.on_transport_event(event).await;
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        match msg {
            SignalMessage::Connected { peer_id } => {
                log(&format!("assigned peer id {peer_id}"));
                self.room.set_self_id(peer_id.clone());
                self.emit(CallEvent::AssignedPeerId(peer_id));
            }
            SignalMessage::JoinedRoom { room_id, peers } => {
                self.room.joined(room_id.clone(), peers.clone());
                let Some(self_id) = self.room.self_id() else {
                    log("joined-room before connected, ignoring");
                    return;
                };
                let mut orchestrator = ConnectionOrchestrator::new(
                    self_id.to_owned(),
                    self.signals.clone() as Arc<dyn SignalSink>,
                    self.events.clone(),
                    self.transport_tx.clone(),
                );
                if !self.ice_servers.is_empty() {
                    orchestrator.set_ice_servers(self.ice_servers.clone());
                }
                if let Some(source) = self.media.source() {
                    orchestrator.attach_media(source);
                }
                orchestrator.on_roster(&peers).await;
                self.orchestrator = Some(orchestrator);
                self.emit(CallEvent::RoomJoined {
                    room_id,
                    is_host: self.room.role() == Some(RoomRole::Host),
                    peers,
                });
            }
            SignalMessage::PeerJoined { peer_id, peers } => {
                log(&format!("peer joined: {peer_id}"));
                self.room.update_roster(peers.clone());
                if let Some(orchestrator) = &mut self.orchestrator {
                    orchestrator.on_roster(&peers).await;
                }
            }
            SignalMessage::PeerLeft { peer_id, peers } => {
                log(&format!("peer left: {peer_id}"));
                self.room.update_roster(peers);
                if let Some(orchestrator) = &mut self.orchestrator {
                    orchestrator.on_peer_left(&peer_id).await;
                }
            }
            SignalMessage::Offer {
                source_peer_id: Some(from),
                sdp,
                ..
            } => {
                if let Some(orchestrator) = &mut self.orchestrator {
                    orchestrator.on_offer(from, sdp).await;
                } else {
                    log(&format!("offer from {from} before joining, dropped"));
                }
            }
            SignalMessage::Answer {
                source_peer_id: Some(from),
                sdp,
                ..
            } => {
                if let Some(orchestrator) = &mut self.orchestrator {
                    orchestrator.on_answer(from, sdp).await;
                }
            }
            SignalMessage::IceCandidate {
                source_peer_id: Some(from),
                candidate,
                ..
            } => {
                if let Some(orchestrator) = &mut self.orchestrator {
                    orchestrator.on_candidate(from, candidate).await;
                }
            }
            // Addressed messages must be relay-stamped with a source.
            SignalMessage::Offer { .. }
            | SignalMessage::Answer { .. }
            | SignalMessage::IceCandidate { .. } => {
                log("addressed message without sourcePeerId, dropped");
            }
            SignalMessage::JoinRoom { .. } => {
                log("client-bound join-room message, dropped");
            }
        }
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }
}
