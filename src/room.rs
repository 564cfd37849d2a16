use crate::peer::types::PeerId;

/// Room role of the local peer. Used for presentation layout only; it has no
/// effect on negotiation correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomRole {
    Host,
    Guest,
}

/// Self identity, room identity and the evolving roster.
///
/// The host is the first identity in the initial `joined-room` roster, fixed
/// for the lifetime of the membership record. This is the single source of
/// truth for host identification; nothing else derives it.
#[derive(Debug, Default)]
pub struct RoomMembershipTracker {
    self_id: Option<PeerId>,
    room_id: Option<String>,
    roster: Vec<PeerId>,
    host_id: Option<PeerId>,
}

impl RoomMembershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the identity the relay assigned in its `connected` message.
    pub fn set_self_id(&mut self, id: PeerId) {
        self.self_id = Some(id);
    }

    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Applies a `joined-room` confirmation. Replaces any previous room
    /// wholesale, including the host derivation.
    pub fn joined(&mut self, room_id: String, peers: Vec<PeerId>) {
        self.host_id = peers.first().cloned();
        self.room_id = Some(room_id);
        self.roster = peers;
    }

    /// Applies the roster carried on `peer-joined` / `peer-left`.
    pub fn update_roster(&mut self, peers: Vec<PeerId>) {
        self.roster = peers;
    }

    /// Clears everything on hangup. Self identity survives: it belongs to the
    /// relay connection, not the room.
    pub fn clear(&mut self) {
        self.room_id = None;
        self.roster.clear();
        self.host_id = None;
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn roster(&self) -> &[PeerId] {
        &self.roster
    }

    pub fn host_id(&self) -> Option<&str> {
        self.host_id.as_deref()
    }

    pub fn role(&self) -> Option<RoomRole> {
        let self_id = self.self_id.as_deref()?;
        let host_id = self.host_id.as_deref()?;
        Some(if self_id == host_id {
            RoomRole::Host
        } else {
            RoomRole::Guest
        })
    }
}
