// Application configuration.
// Logging can only be disabled in development builds.

use crate::peer::types::IceServerConfig;
use std::time::Duration;

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true;

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false;

/// Delay before a failed session is re-created as a fresh caller session.
/// Retries repeat at this fixed interval until the peer leaves the room.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Public STUN servers used when no custom configuration is supplied.
pub const DEFAULT_STUN_URLS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun3.l.google.com:19302",
    "stun:stun4.l.google.com:19302",
];

/// Public TURN relays paired with the defaults above, as (url, username,
/// credential). Needed when both peers sit behind symmetric NAT.
pub const DEFAULT_TURN_SERVERS: &[(&str, &str, &str)] = &[
    (
        "turn:openrelay.metered.ca:80",
        "openrelayproject",
        "openrelayproject",
    ),
    (
        "turn:openrelay.metered.ca:443",
        "openrelayproject",
        "openrelayproject",
    ),
];

/// The default ICE server set: STUN plus TURN fallback.
pub fn default_ice_servers() -> Vec<IceServerConfig> {
    let mut servers: Vec<IceServerConfig> = DEFAULT_STUN_URLS
        .iter()
        .map(|url| IceServerConfig::stun(*url))
        .collect();
    servers.extend(
        DEFAULT_TURN_SERVERS
            .iter()
            .map(|(url, user, cred)| IceServerConfig::turn(*url, *user, *cred)),
    );
    servers
}
