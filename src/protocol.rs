use serde::{Deserialize, Serialize};
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// A transport candidate as it crosses the signaling relay.
///
/// Mirrors the browser `RTCIceCandidateInit` shape so Rust and web clients
/// can interoperate in the same room.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CandidatePayload {
    pub candidate: String,
    #[serde(rename = "sdpMid")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
}

/// Every message exchanged with the signaling relay, discriminated by `type`.
///
/// Addressed messages (`offer`, `answer`, `ice-candidate`) carry
/// `targetPeerId` when sent and `sourcePeerId` when received; the relay strips
/// the former and stamps the latter. Rosters (`peers`) are computed by the
/// relay and trusted as given.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalMessage {
    Connected {
        #[serde(rename = "peerId")]
        peer_id: String,
    },
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: String,
    },
    JoinedRoom {
        #[serde(rename = "roomId")]
        room_id: String,
        peers: Vec<String>,
    },
    PeerJoined {
        #[serde(rename = "peerId")]
        peer_id: String,
        peers: Vec<String>,
    },
    PeerLeft {
        #[serde(rename = "peerId")]
        peer_id: String,
        peers: Vec<String>,
    },
    Offer {
        #[serde(rename = "targetPeerId", skip_serializing_if = "Option::is_none")]
        target_peer_id: Option<String>,
        #[serde(rename = "sourcePeerId", skip_serializing_if = "Option::is_none")]
        source_peer_id: Option<String>,
        sdp: RTCSessionDescription,
    },
    Answer {
        #[serde(rename = "targetPeerId", skip_serializing_if = "Option::is_none")]
        target_peer_id: Option<String>,
        #[serde(rename = "sourcePeerId", skip_serializing_if = "Option::is_none")]
        source_peer_id: Option<String>,
        sdp: RTCSessionDescription,
    },
    IceCandidate {
        #[serde(rename = "targetPeerId", skip_serializing_if = "Option::is_none")]
        target_peer_id: Option<String>,
        #[serde(rename = "sourcePeerId", skip_serializing_if = "Option::is_none")]
        source_peer_id: Option<String>,
        candidate: CandidatePayload,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relay_stamped_candidate() {
        let raw = r#"{
            "type": "ice-candidate",
            "sourcePeerId": "ab12",
            "candidate": {
                "candidate": "candidate:1 1 udp 2130706431 192.0.2.1 54321 typ host",
                "sdpMid": "0",
                "sdpMLineIndex": 0
            }
        }"#;
        let msg: SignalMessage = serde_json::from_str(raw).unwrap();
        match msg {
            SignalMessage::IceCandidate {
                source_peer_id,
                target_peer_id,
                candidate,
            } => {
                assert_eq!(source_peer_id.as_deref(), Some("ab12"));
                assert_eq!(target_peer_id, None);
                assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
                assert_eq!(candidate.sdp_mline_index, Some(0));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn join_room_wire_format() {
        let msg = SignalMessage::JoinRoom {
            room_id: "room-42".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"join-room","roomId":"room-42"}"#);
    }

    #[test]
    fn parses_joined_room_roster() {
        let raw = r#"{"type":"joined-room","roomId":"room-42","peers":["aa","bb","cc"]}"#;
        let msg: SignalMessage = serde_json::from_str(raw).unwrap();
        match msg {
            SignalMessage::JoinedRoom { room_id, peers } => {
                assert_eq!(room_id, "room-42");
                assert_eq!(peers, vec!["aa", "bb", "cc"]);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn outbound_offer_omits_source() {
        let sdp = RTCSessionDescription::offer(
            "v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n".into(),
        )
        .unwrap();
        let msg = SignalMessage::Offer {
            target_peer_id: Some("bb".into()),
            source_peer_id: None,
            sdp,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""targetPeerId":"bb""#));
        assert!(!json.contains("sourcePeerId"));
    }
}
