//! Application state shared across routes

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::util::rate_limit::{create_limiter, Limiter};
use crate::war::ZoneStatus;

use super::authority::ConsoleRequest;

/// Latest zone status, written by the authority loop and read by HTTP handlers
#[derive(Default)]
pub struct StatusBoard {
    zones: DashMap<String, ZoneStatus>,
    ticks: AtomicU64,
    players: AtomicUsize,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the board with a fresh view
    pub fn publish(&self, zones: Vec<ZoneStatus>, players: usize) {
        self.zones
            .retain(|name, _| zones.iter().any(|z| &z.name == name));
        for zone in zones {
            self.zones.insert(zone.name.clone(), zone);
        }
        self.players.store(players, Ordering::Relaxed);
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// All zones, sorted by name
    pub fn zones(&self) -> Vec<ZoneStatus> {
        let mut zones: Vec<ZoneStatus> = self.zones.iter().map(|z| z.value().clone()).collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        zones
    }

    pub fn zone(&self, name: &str) -> Option<ZoneStatus> {
        self.zones
            .iter()
            .find(|z| z.key().eq_ignore_ascii_case(name))
            .map(|z| z.value().clone())
    }

    pub fn active_matches(&self) -> usize {
        self.zones.iter().filter(|z| z.value().round.is_some()).count()
    }

    pub fn players_in_matches(&self) -> usize {
        self.zones.iter().map(|z| z.value().players).sum()
    }

    pub fn connected_players(&self) -> usize {
        self.players.load(Ordering::Relaxed)
    }

    /// Number of publishes so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub status: Arc<StatusBoard>,
    pub console: mpsc::Sender<ConsoleRequest>,
    pub console_limiter: Arc<Limiter>,
}

impl AppState {
    pub fn new(config: Config, console: mpsc::Sender<ConsoleRequest>, status: Arc<StatusBoard>) -> Self {
        let console_limiter = create_limiter(config.console_rate_limit);
        Self {
            config: Arc::new(config),
            status,
            console,
            console_limiter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(name: &str, round: Option<u32>, players: usize) -> ZoneStatus {
        ZoneStatus {
            name: name.to_string(),
            size: Some("10x10x10".into()),
            editing: false,
            teams: vec!["red".into(), "blue".into()],
            round,
            players,
            scores: Vec::new(),
        }
    }

    #[test]
    fn publish_replaces_previous_view() {
        let board = StatusBoard::new();
        board.publish(vec![status("arena", Some(1), 4), status("fort", None, 0)], 6);
        assert_eq!(board.active_matches(), 1);
        assert_eq!(board.players_in_matches(), 4);
        assert_eq!(board.connected_players(), 6);

        board.publish(vec![status("fort", None, 0)], 2);
        assert!(board.zone("arena").is_none());
        assert_eq!(board.zone("FORT").map(|z| z.name), Some("fort".to_string()));
        assert_eq!(board.ticks(), 2);
    }
}
