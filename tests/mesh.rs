//! Mesh negotiation exercised end-to-end: real peer connections on every
//! endpoint, with an in-memory relay standing in for the signaling server.

use meshcall::media::{LocalMediaSource, MediaTracks};
use meshcall::orchestrator::{CallEvent, ConnectionOrchestrator};
use meshcall::peer::types::{Role, SessionState, TransportEvent};
use meshcall::protocol::SignalMessage;
use meshcall::signaling::SignalSink;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

fn tracks() -> MediaTracks {
    MediaTracks {
        audio: Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            "meshcall".to_owned(),
        )),
        video: Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            "meshcall".to_owned(),
        )),
    }
}

/// Outbound sink that stamps the sender identity the way the relay does.
struct RelaySink {
    from: String,
    tx: UnboundedSender<SignalMessage>,
}

impl SignalSink for RelaySink {
    fn send(&self, message: SignalMessage) {
        let stamped = match message {
            SignalMessage::Offer {
                target_peer_id,
                sdp,
                ..
            } => SignalMessage::Offer {
                target_peer_id,
                source_peer_id: Some(self.from.clone()),
                sdp,
            },
            SignalMessage::Answer {
                target_peer_id,
                sdp,
                ..
            } => SignalMessage::Answer {
                target_peer_id,
                source_peer_id: Some(self.from.clone()),
                sdp,
            },
            SignalMessage::IceCandidate {
                target_peer_id,
                candidate,
                ..
            } => SignalMessage::IceCandidate {
                target_peer_id,
                source_peer_id: Some(self.from.clone()),
                candidate,
            },
            other => other,
        };
        let _ = self.tx.send(stamped);
    }
}

struct Endpoint {
    orch: ConnectionOrchestrator,
    events: UnboundedReceiver<CallEvent>,
    transport: UnboundedReceiver<TransportEvent>,
}

fn endpoint(id: &str, relay_tx: &UnboundedSender<SignalMessage>) -> Endpoint {
    let (event_tx, events) = unbounded_channel();
    let (transport_tx, transport) = unbounded_channel();
    let mut orch = ConnectionOrchestrator::new(
        id.to_owned(),
        Arc::new(RelaySink {
            from: id.to_owned(),
            tx: relay_tx.clone(),
        }),
        event_tx,
        transport_tx,
    );
    orch.attach_media(LocalMediaSource::new(tracks()));
    Endpoint {
        orch,
        events,
        transport,
    }
}

async fn deliver(msg: SignalMessage, endpoints: &mut HashMap<String, Endpoint>) {
    match msg {
        SignalMessage::Offer {
            target_peer_id: Some(to),
            source_peer_id: Some(from),
            sdp,
        } => {
            if let Some(ep) = endpoints.get_mut(&to) {
                ep.orch.on_offer(from, sdp).await;
            }
        }
        SignalMessage::Answer {
            target_peer_id: Some(to),
            source_peer_id: Some(from),
            sdp,
        } => {
            if let Some(ep) = endpoints.get_mut(&to) {
                ep.orch.on_answer(from, sdp).await;
            }
        }
        SignalMessage::IceCandidate {
            target_peer_id: Some(to),
            source_peer_id: Some(from),
            candidate,
        } => {
            if let Some(ep) = endpoints.get_mut(&to) {
                ep.orch.on_candidate(from, candidate).await;
            }
        }
        _ => {}
    }
}

/// Relays messages until the wire goes quiet, feeding transport events back
/// into their own orchestrators as they surface.
async fn pump(
    relay_rx: &mut UnboundedReceiver<SignalMessage>,
    endpoints: &mut HashMap<String, Endpoint>,
) {
    loop {
        for ep in endpoints.values_mut() {
            while let Ok(event) = ep.transport.try_recv() {
                ep.orch.on_transport_event(event).await;
            }
        }
        match tokio::time::timeout(Duration::from_millis(300), relay_rx.recv()).await {
            Ok(Some(msg)) => deliver(msg, endpoints).await,
            _ => break,
        }
    }
}

#[tokio::test]
async fn offer_answer_completes_between_two_clients() {
    let (relay_tx, mut relay_rx) = unbounded_channel();
    let mut endpoints = HashMap::new();
    endpoints.insert("aa".to_owned(), endpoint("aa", &relay_tx));
    endpoints.insert("bb".to_owned(), endpoint("bb", &relay_tx));

    // Both ends receive the roster and offer; the lexicographically smaller
    // id keeps the caller role when the offers cross.
    endpoints
        .get_mut("bb")
        .unwrap()
        .orch
        .on_roster(&["aa".into(), "bb".into()])
        .await;
    endpoints
        .get_mut("aa")
        .unwrap()
        .orch
        .on_roster(&["aa".into(), "bb".into()])
        .await;

    pump(&mut relay_rx, &mut endpoints).await;

    let aa = &endpoints["aa"];
    let bb = &endpoints["bb"];
    assert_eq!(aa.orch.session_role("bb"), Some(Role::Caller));
    assert_eq!(aa.orch.session_state("bb"), Some(SessionState::Connected));
    assert_eq!(bb.orch.session_role("aa"), Some(Role::Callee));
    assert_eq!(bb.orch.session_state("aa"), Some(SessionState::Connected));
    // Every buffered candidate was flushed during the exchange.
    assert_eq!(bb.orch.buffered_candidates("aa"), Some(0));
    assert_eq!(aa.orch.buffered_candidates("bb"), Some(0));
}

#[tokio::test]
async fn three_peers_form_a_full_mesh() {
    let (relay_tx, mut relay_rx) = unbounded_channel();
    let mut endpoints = HashMap::new();
    for id in ["aa", "bb", "cc"] {
        endpoints.insert(id.to_owned(), endpoint(id, &relay_tx));
    }

    // "aa" opens the room, then "bb" and "cc" arrive one at a time; every
    // endpoint reacts to each roster it receives.
    endpoints
        .get_mut("bb")
        .unwrap()
        .orch
        .on_roster(&["aa".into(), "bb".into()])
        .await;
    endpoints
        .get_mut("aa")
        .unwrap()
        .orch
        .on_roster(&["aa".into(), "bb".into()])
        .await;
    pump(&mut relay_rx, &mut endpoints).await;

    let full: Vec<String> = vec!["aa".into(), "bb".into(), "cc".into()];
    endpoints.get_mut("cc").unwrap().orch.on_roster(&full).await;
    endpoints.get_mut("aa").unwrap().orch.on_roster(&full).await;
    endpoints.get_mut("bb").unwrap().orch.on_roster(&full).await;
    pump(&mut relay_rx, &mut endpoints).await;

    for (id, ep) in &endpoints {
        assert_eq!(ep.orch.session_count(), 2, "{id} should hold two sessions");
    }
    let aa = &endpoints["aa"];
    let bb = &endpoints["bb"];
    let cc = &endpoints["cc"];
    // The smaller peer id ends up caller on every edge.
    assert_eq!(aa.orch.session_role("bb"), Some(Role::Caller));
    assert_eq!(aa.orch.session_role("cc"), Some(Role::Caller));
    assert_eq!(bb.orch.session_role("aa"), Some(Role::Callee));
    assert_eq!(bb.orch.session_role("cc"), Some(Role::Caller));
    assert_eq!(cc.orch.session_role("aa"), Some(Role::Callee));
    assert_eq!(cc.orch.session_role("bb"), Some(Role::Callee));
    for ep in endpoints.values() {
        for peer in endpoints.keys() {
            if let Some(state) = ep.orch.session_state(peer) {
                assert_eq!(state, SessionState::Connected);
            }
        }
    }
}

#[tokio::test]
async fn departure_tears_down_only_that_peers_sessions() {
    let (relay_tx, mut relay_rx) = unbounded_channel();
    let mut endpoints = HashMap::new();
    for id in ["aa", "bb", "cc"] {
        endpoints.insert(id.to_owned(), endpoint(id, &relay_tx));
    }
    let full: Vec<String> = vec!["aa".into(), "bb".into(), "cc".into()];
    endpoints.get_mut("aa").unwrap().orch.on_roster(&full).await;
    endpoints.get_mut("bb").unwrap().orch.on_roster(&full).await;
    endpoints.get_mut("cc").unwrap().orch.on_roster(&full).await;
    pump(&mut relay_rx, &mut endpoints).await;

    endpoints.get_mut("aa").unwrap().orch.on_peer_left("bb").await;
    endpoints.get_mut("cc").unwrap().orch.on_peer_left("bb").await;

    assert_eq!(endpoints["aa"].orch.session_count(), 1);
    assert!(endpoints["aa"].orch.session_state("cc").is_some());

    let mut saw_left = false;
    let aa = endpoints.get_mut("aa").unwrap();
    while let Ok(event) = aa.events.try_recv() {
        if matches!(&event, CallEvent::PeerLeft(p) if p == "bb") {
            saw_left = true;
        }
    }
    assert!(saw_left);
}
