use crate::peer::types::{IceServerConfig, IceServerKind};
use rand::Rng;

/// Room ids generated client-side when creating (rather than joining) a room.
pub fn random_room_id() -> String {
    format!("room-{}", hex::encode(rand::rng().random::<[u8; 4]>()))
}

// Prefixes the transport scheme when a configured ICE URL lacks one.
pub fn add_ice_url_scheme(config: &IceServerConfig) -> String {
    if config.url.starts_with("turn:") || config.url.starts_with("stun:") {
        config.url.clone()
    } else {
        let scheme = match config.kind {
            IceServerKind::Turn => "turn:",
            IceServerKind::Stun => "stun:",
        };
        format!("{}{}", scheme, config.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_added_by_server_kind() {
        let turn = IceServerConfig::turn("relay.example.net:3478", "user", "pass");
        assert_eq!(add_ice_url_scheme(&turn), "turn:relay.example.net:3478");
        let stun = IceServerConfig::stun("stun.example.net:19302");
        assert_eq!(add_ice_url_scheme(&stun), "stun:stun.example.net:19302");
    }

    #[test]
    fn existing_scheme_is_kept() {
        let turn = IceServerConfig::turn("turn:relay.example.net:443", "user", "pass");
        assert_eq!(add_ice_url_scheme(&turn), "turn:relay.example.net:443");
    }
}
