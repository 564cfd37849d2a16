use crate::config;
use crate::error::CallError;
use crate::logger::log;
use crate::peer::types::{IceServerConfig, PeerId, TransportEvent};
use crate::protocol::{CandidatePayload, SignalMessage};
use crate::signaling::SignalSink;
use crate::utils::add_ice_url_scheme;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::RTCPeerConnection;

/// Builds the peer connection for one remote peer and wires its callbacks.
///
/// Local trickle candidates go straight out through the signaling sink,
/// addressed to `peer_id`. Connection state changes and incoming tracks are
/// funneled into `transport_tx` so the orchestrator reacts to them on its own
/// task.
pub async fn new_peer(
    peer_id: &PeerId,
    ice_servers: &[IceServerConfig],
    signals: Arc<dyn SignalSink>,
    transport_tx: UnboundedSender<TransportEvent>,
) -> Result<Arc<RTCPeerConnection>, CallError> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;
    let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();

    let pc = Arc::new(api.new_peer_connection(rtc_config(ice_servers)).await?);

    let target = peer_id.clone();
    pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
        let target = target.clone();
        let signals = signals.clone();
        Box::pin(async move {
            let Some(c) = cand else {
                log(&format!("candidate gathering complete for {target}"));
                return;
            };
            match c.to_json() {
                Ok(init) => signals.send(SignalMessage::IceCandidate {
                    target_peer_id: Some(target),
                    source_peer_id: None,
                    candidate: CandidatePayload {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_mline_index: init.sdp_mline_index,
                    },
                }),
                Err(e) => log(&format!("candidate serialization for {target}: {e}")),
            }
        })
    }));

    let state_peer = peer_id.clone();
    let state_tx = transport_tx.clone();
    pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
        log(&format!("peer {state_peer} connection state: {st}"));
        match st {
            RTCPeerConnectionState::Connected => {
                let _ = state_tx.send(TransportEvent::Up(state_peer.clone()));
            }
            RTCPeerConnectionState::Failed => {
                let _ = state_tx.send(TransportEvent::Failed(state_peer.clone()));
            }
            _ => {}
        }
        Box::pin(async {})
    }));

    let track_peer = peer_id.clone();
    pc.on_track(Box::new(move |track, _receiver, _transceiver| {
        let kind = track.kind().to_string();
        log(&format!("remote {kind} track from {track_peer}"));
        let _ = transport_tx.send(TransportEvent::RemoteTrack(track_peer.clone(), kind));
        Box::pin(async {})
    }));

    Ok(pc)
}

// Custom servers replace the default set wholesale; an empty slice means
// "use the defaults" (STUN plus TURN fallback).
fn rtc_config(servers: &[IceServerConfig]) -> RTCConfiguration {
    let servers = if servers.is_empty() {
        config::default_ice_servers()
    } else {
        servers.to_vec()
    };
    let ice_servers = servers
        .iter()
        .map(|s| RTCIceServer {
            urls: vec![add_ice_url_scheme(s)],
            username: s.username.clone().unwrap_or_default(),
            credential: s.credential.clone().unwrap_or_default(),
            ..Default::default()
        })
        .collect();

    RTCConfiguration {
        ice_servers,
        ice_candidate_pool_size: 10,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    }
}
