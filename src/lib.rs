pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod media;
pub mod orchestrator;
pub mod peer;
pub mod protocol;
pub mod room;
pub mod signaling;
pub mod utils;

pub use client::CallClient;
pub use error::CallError;
pub use media::{MediaCapture, MediaTracks, NullCapture};
pub use orchestrator::{CallEvent, ConnectionOrchestrator};
pub use peer::types::{IceServerConfig, IceServerKind};
pub use room::RoomRole;
