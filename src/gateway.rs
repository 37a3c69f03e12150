//! Host event entry points: movement across zone borders, combat and deaths
//!
//! Movements are classified against every zone cuboid. A blocked crossing
//! draws a short-lived wall of opaque blocks in the player's own view along
//! the zone face they walked into.

use std::time::Duration;

use tracing::{debug, error};

use crate::error::WarError;
use crate::game::DamageCause;
use crate::geom::{Cuboid, Location};
use crate::host::{PlayerId, PlayerSession};
use crate::scheduler::DeferredTask;
use crate::war::{JoinTeam, War};
use crate::zone::{mask_block, mask_cells, Zone};

pub const MASK_RADIUS: i32 = 3;
pub const MASK_DURATION: Duration = Duration::from_secs(3);

pub const LEAVE_HINT: &str = "Please use /leave to exit the game before leaving.";
pub const JOIN_HINT: &str = "Please join a team first.";
pub const FRIENDLY_FIRE: &str = "Do not target your own team!";
pub const INTERNAL_ERROR: &str = "An internal error occurred.";

/// What the host should do with a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Allowed,
    /// Keep the player where they were
    Cancelled,
    /// The core already teleported the player
    Redirected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    Allowed,
    Cancelled,
}

/// Message shown to a player for a failed game action
pub fn player_message(err: &WarError) -> String {
    if err.is_internal() {
        error!(error = %err, "Internal error while handling player action");
        INTERNAL_ERROR.to_string()
    } else {
        err.to_string()
    }
}

impl War {
    /// Name of the zone whose cuboid contains `at`
    pub fn zone_at(&self, at: &Location) -> Option<&Zone> {
        self.zones().find(|zone| zone.contains(at))
    }

    pub fn handle_movement(&mut self, player: PlayerId, from: &Location, to: &Location) -> Movement {
        let from_zone = self.zone_at(from).map(|z| z.name().to_string());
        let to_zone = self.zone_at(to).map(|z| z.name().to_string());

        if from_zone.is_some() && from_zone == to_zone {
            return Movement::Allowed;
        }

        if let Some(leaving) = &from_zone {
            if self.sessions().playing_in(player) == Some(leaving.as_str()) {
                self.sessions_mut().send(player, LEAVE_HINT);
                self.mask(player, leaving, to);
                return Movement::Cancelled;
            }
        }

        if let Some(entering) = &to_zone {
            if !self.may_enter(player, entering) {
                self.sessions_mut().send(player, JOIN_HINT);
                self.mask(player, entering, to);
                return match self.zone(entering).and_then(Zone::lobby) {
                    Ok(lobby) => {
                        if let Some(session) = self.sessions_mut().get_mut(player) {
                            session.teleport(&lobby);
                        }
                        Movement::Redirected
                    }
                    Err(_) => Movement::Cancelled,
                };
            }
            return Movement::Allowed;
        }

        if from.same_block(to) {
            return Movement::Allowed;
        }
        match self.gate_at(to) {
            Some((zone, team)) => self.enter_gate(player, &zone, team),
            None => Movement::Allowed,
        }
    }

    /// Rostered players may move in their zone; editors may walk into an idle one
    fn may_enter(&self, player: PlayerId, zone: &str) -> bool {
        let Ok(zone) = self.zone(zone) else {
            return false;
        };
        match zone.game() {
            Some(game) => game.is_playing(player),
            None => self
                .sessions()
                .get(player)
                .map(|session| session.is_zone_maker())
                .unwrap_or(false),
        }
    }

    fn gate_at(&self, at: &Location) -> Option<(String, JoinTeam)> {
        for zone in self.zones() {
            let Ok(gates) = zone.gates() else {
                continue;
            };
            if let Some(gate) = gates.iter().find(|g| g.location.same_block(at)) {
                let team = if gate.is_autoassign() {
                    JoinTeam::Auto
                } else {
                    JoinTeam::Named(gate.name.clone())
                };
                return Some((zone.name().to_string(), team));
            }
        }
        None
    }

    fn enter_gate(&mut self, player: PlayerId, zone: &str, team: JoinTeam) -> Movement {
        match self.join(zone, player, team) {
            Ok(()) => Movement::Redirected,
            Err(e) => {
                let message = player_message(&e);
                self.sessions_mut().send(player, &message);
                match self.zone(zone).and_then(Zone::lobby) {
                    Ok(lobby) => {
                        if let Some(session) = self.sessions_mut().get_mut(player) {
                            session.teleport(&lobby);
                        }
                        Movement::Redirected
                    }
                    Err(_) => Movement::Cancelled,
                }
            }
        }
    }

    /// Draw the mask near `around` on `zone`'s boundary and schedule its removal
    fn mask(&mut self, player: PlayerId, zone: &str, around: &Location) {
        let Ok(cuboid) = self.zone(zone).and_then(Zone::cuboid) else {
            return;
        };
        let cells = self.mask_cells_for(&cuboid, around);
        if cells.is_empty() {
            return;
        }
        let block = mask_block(&self.config().mask_block);
        let Some(session) = self.sessions_mut().get_mut(player) else {
            return;
        };
        for cell in &cells {
            session.set_local_block(cell, &block);
        }
        debug!(player = %player, zone = %zone, cells = cells.len(), "Masked zone boundary");
        self.schedule(MASK_DURATION, DeferredTask::Unmask { player, cells });
    }

    fn mask_cells_for(&self, cuboid: &Cuboid, around: &Location) -> Vec<Location> {
        mask_cells(cuboid, around, MASK_RADIUS, self.world())
    }

    /// Cancel friendly fire; otherwise remember the hit for kill credit
    pub fn handle_combat(&mut self, attacker: PlayerId, defender: PlayerId) -> CombatOutcome {
        let Some(zone) = self.sessions().playing_in(attacker).map(str::to_string) else {
            return CombatOutcome::Allowed;
        };
        if self.sessions().playing_in(defender) != Some(zone.as_str()) {
            return CombatOutcome::Allowed;
        }

        let same_team = self
            .zone(&zone)
            .ok()
            .and_then(Zone::game)
            .and_then(|game| game.team_of(attacker))
            .map(|team| team.has(defender))
            .unwrap_or(false);
        if same_team {
            self.sessions_mut().send(attacker, FRIENDLY_FIRE);
            return CombatOutcome::Cancelled;
        }

        let now_ms = self.now_ms();
        if let Err(e) = self.with_match(&zone, |game, _| {
            game.record_attack(attacker, defender, now_ms);
            Ok(())
        }) {
            error!(zone = %zone, error = %e, "Failed to record attack");
        }
        CombatOutcome::Allowed
    }

    /// Cause for a player killed by `attacker`, naming the attacker's weapon
    pub fn combat_cause(&self, attacker: PlayerId) -> DamageCause {
        let weapon = self
            .sessions()
            .get(attacker)
            .and_then(|session| session.item_in_hand())
            .map(|item| item.display_name())
            .unwrap_or_else(|| "their fists".to_string());
        DamageCause::Combat {
            attacker: self.display_name(attacker),
            weapon,
        }
    }

    /// Announce a death to the victim's match and score it; false when the victim was not playing
    pub fn handle_death(&mut self, player: PlayerId, cause: &DamageCause) -> bool {
        let Some(zone) = self.sessions().playing_in(player).map(str::to_string) else {
            return false;
        };
        let message = cause.death_message(&self.display_name(player));

        let result = self.with_match(&zone, |game, ctx| {
            game.broadcast(ctx.sessions, &message);
            game.on_death(ctx, player)
        });
        if let Err(e) = result {
            error!(zone = %zone, player = %player, error = %e, "Failed to process death");
        }
        true
    }
}
