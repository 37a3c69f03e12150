//! Connected players and their per-session context
//!
//! Each session carries a [`SessionContext`] that lives exactly as long as the
//! connection: the in-progress zone selection of the `setzone` flow and the
//! zone whose match the player is currently rostered in.

use std::collections::HashMap;

use crate::geom::Location;
use crate::host::{PlayerId, PlayerSession};

/// Two-corner zone selection started with `setzone <name>`
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDraft {
    pub zone: String,
    pub corner1: Option<Location>,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    pub draft: Option<ZoneDraft>,
    playing_in: Option<String>,
}

impl SessionContext {
    pub fn playing_in(&self) -> Option<&str> {
        self.playing_in.as_deref()
    }
}

struct Entry {
    session: Box<dyn PlayerSession>,
    context: SessionContext,
}

/// Registry of connected sessions
#[derive(Default)]
pub struct Sessions {
    entries: HashMap<PlayerId, Entry>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, session: Box<dyn PlayerSession>) -> PlayerId {
        let id = session.id();
        self.entries.insert(
            id,
            Entry {
                session,
                context: SessionContext::default(),
            },
        );
        id
    }

    /// Drop the session and its context
    pub fn disconnect(&mut self, id: PlayerId) -> Option<Box<dyn PlayerSession>> {
        self.entries.remove(&id).map(|entry| entry.session)
    }

    pub fn get(&self, id: PlayerId) -> Option<&dyn PlayerSession> {
        self.entries.get(&id).map(|entry| entry.session.as_ref())
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut (dyn PlayerSession + 'static)> {
        self.entries.get_mut(&id).map(|entry| entry.session.as_mut())
    }

    pub fn context(&self, id: PlayerId) -> Option<&SessionContext> {
        self.entries.get(&id).map(|entry| &entry.context)
    }

    pub fn context_mut(&mut self, id: PlayerId) -> Option<&mut SessionContext> {
        self.entries.get_mut(&id).map(|entry| &mut entry.context)
    }

    /// Zone whose match this player is rostered in
    pub fn playing_in(&self, id: PlayerId) -> Option<&str> {
        self.context(id).and_then(SessionContext::playing_in)
    }

    pub(crate) fn set_playing_in(&mut self, id: PlayerId, zone: Option<&str>) {
        if let Some(context) = self.context_mut(id) {
            context.playing_in = zone.map(str::to_string);
        }
    }

    pub fn name_of(&self, id: PlayerId) -> String {
        self.get(id)
            .map(|session| session.name())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn send(&mut self, id: PlayerId, message: &str) {
        if let Some(session) = self.get_mut(id) {
            session.send_message(message);
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
