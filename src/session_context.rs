//! Process-wide registry of each session's currently active action.
//!
//! Every simulated user ("session") runs its operations strictly one after
//! another; the context maps the session id to the most recently created
//! action so that the next operation can inherit its state and so that the
//! transport layer can attribute measurements to the right timer. The table
//! is the only structure shared across concurrent sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::debug;

use crate::actions::action::ActionState;

/// Concurrency-safe map from session id to the session's active action.
///
/// Entries are created by the action constructors and removed by an explicit
/// [`release_session`] call at the end of a test case. Relying on the map to
/// shrink by itself would leak chains of finished actions, so release is part
/// of the session lifecycle, not an afterthought.
///
/// [`release_session`]: WebDavContext::release_session
pub struct WebDavContext {
    active: RwLock<HashMap<String, Arc<ActionState>>>,
}

impl WebDavContext {
    pub fn new() -> Self {
        Self {
            active: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the session's active action, or `None` if the session never
    /// registered one (or was released).
    pub fn get_active(&self, session_id: &str) -> Option<Arc<ActionState>> {
        self.active.read().unwrap().get(session_id).cloned()
    }

    /// Replaces the session's active action. The superseded action stays
    /// reachable through the new action's predecessor chain only.
    pub fn set_active(&self, session_id: &str, action: Arc<ActionState>) {
        self.active
            .write()
            .unwrap()
            .insert(session_id.to_string(), action);
    }

    /// Drops the session's action chain and with it the session's client.
    /// Idempotent: releasing an unknown or already-released session is a
    /// no-op.
    pub fn release_session(&self, session_id: &str) {
        let removed = self.active.write().unwrap().remove(session_id);
        if removed.is_some() {
            debug!("[{}] session released", session_id);
        }
    }

    /// Number of sessions currently holding an active action.
    pub fn active_session_count(&self) -> usize {
        self.active.read().unwrap().len()
    }
}

impl Default for WebDavContext {
    fn default() -> Self {
        Self::new()
    }
}
