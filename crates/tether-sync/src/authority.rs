//! Per-entity ownership and trust metadata.
//!
//! Authority answers one question: who may legally write this entity's
//! pose? Server-authoritative entities are only ever moved through the sync
//! layer; client-predictive entities move locally and reconcile later;
//! client-local entities never synchronize at all.

/// Trust classification for an entity's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityLevel {
    /// The server owns this entity. Local game logic must not move it;
    /// only the sync layer's interpolation may advance its transform.
    ServerAuthoritative,
    /// Moved locally for responsiveness, corrected by server snapshots.
    ClientPredictive,
    /// Purely local (UI markers, transient effects). Never synchronized.
    ClientLocal,
}

/// Ownership component attached to every synchronized (and predictive)
/// entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Authority {
    /// Client or server identifier that owns the entity.
    pub owner_id: u64,
    /// Trust level governing writes.
    pub level: AuthorityLevel,
    /// World-clock second of the last authority-relevant event.
    pub last_update: f64,
    /// `true` while the local guess is ahead of server confirmation.
    pub is_predicted: bool,
}

impl Authority {
    /// Authority for a server-owned replica.
    pub fn server_owned(owner_id: u64, now: f64) -> Self {
        Self {
            owner_id,
            level: AuthorityLevel::ServerAuthoritative,
            last_update: now,
            is_predicted: false,
        }
    }

    /// Authority for a locally-moved, server-corrected entity.
    pub fn client_predictive(owner_id: u64, now: f64) -> Self {
        Self {
            owner_id,
            level: AuthorityLevel::ClientPredictive,
            last_update: now,
            is_predicted: false,
        }
    }

    /// Authority for an entity that never synchronizes.
    pub fn client_local(owner_id: u64, now: f64) -> Self {
        Self {
            owner_id,
            level: AuthorityLevel::ClientLocal,
            last_update: now,
            is_predicted: false,
        }
    }

    /// `true` if `client_id` may drive this entity directly. Only the
    /// owning client may, and never for server-authoritative entities.
    pub fn can_be_controlled_by(&self, client_id: u64) -> bool {
        match self.level {
            AuthorityLevel::ServerAuthoritative => false,
            AuthorityLevel::ClientPredictive | AuthorityLevel::ClientLocal => {
                self.owner_id == client_id
            }
        }
    }

    /// `true` unless the entity is purely local.
    pub fn needs_synchronization(&self) -> bool {
        self.level != AuthorityLevel::ClientLocal
    }

    /// Flags the local state as an unconfirmed guess.
    pub fn mark_as_predicted(&mut self, now: f64) {
        self.is_predicted = true;
        self.last_update = now;
    }

    /// Records a server confirmation, clearing the prediction flag.
    pub fn confirm_from_server(&mut self, now: f64) {
        self.is_predicted = false;
        self.last_update = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_authoritative_rejects_all_clients() {
        let auth = Authority::server_owned(0, 0.0);
        assert!(!auth.can_be_controlled_by(0));
        assert!(!auth.can_be_controlled_by(7));
        assert!(auth.needs_synchronization());
    }

    #[test]
    fn test_predictive_controlled_only_by_owner() {
        let auth = Authority::client_predictive(3, 0.0);
        assert!(auth.can_be_controlled_by(3));
        assert!(!auth.can_be_controlled_by(4));
        assert!(auth.needs_synchronization());
    }

    #[test]
    fn test_client_local_never_synchronizes() {
        let auth = Authority::client_local(3, 0.0);
        assert!(auth.can_be_controlled_by(3));
        assert!(!auth.needs_synchronization());
    }

    #[test]
    fn test_prediction_flag_round_trip() {
        let mut auth = Authority::client_predictive(1, 0.0);
        assert!(!auth.is_predicted);

        auth.mark_as_predicted(1.5);
        assert!(auth.is_predicted);
        assert_eq!(auth.last_update, 1.5);

        auth.confirm_from_server(2.0);
        assert!(!auth.is_predicted);
        assert_eq!(auth.last_update, 2.0);
    }
}
