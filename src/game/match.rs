//! Match state for one zone
//!
//! A `MatchEngine` exists only while a game is running. Teams are fixed when it
//! is created; only the players assigned to them change. Every operation runs
//! on the authority thread with a [`MatchCtx`] lending it the zone store, the
//! world, the connected sessions and the deferred task queue.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::WarError;
use crate::geom::Location;
use crate::host::{Loadout, PlayerId, PlayerState, WorldAdapter};
use crate::scheduler::{DeferredTask, TaskQueue};
use crate::session::Sessions;
use crate::store::ZoneStore;
use crate::zone::settings::ZoneSettings;
use crate::zone::{self, team_spawn_point, DEFAULT_LOADOUT, LOBBY};

use super::combat::AttackLog;
use super::team::Team;

/// Delay between a death and the player's reset into the match
pub const RESPAWN_DELAY: Duration = Duration::from_millis(100);

/// Everything a match borrows from its zone and the host for one operation
pub struct MatchCtx<'a> {
    pub store: &'a ZoneStore,
    pub world: &'a mut dyn WorldAdapter,
    pub sessions: &'a mut Sessions,
    pub tasks: &'a mut TaskQueue,
    pub settings: ZoneSettings,
    pub now_ms: u64,
}

#[derive(Debug)]
pub struct MatchEngine {
    zone: String,
    round: u32,
    teams: Vec<Team>,
    roster: Vec<PlayerId>,
    saved: HashMap<PlayerId, PlayerState>,
    attacks: AttackLog,
}

impl MatchEngine {
    pub fn new(zone: &str, team_names: Vec<String>) -> Self {
        Self {
            zone: zone.to_string(),
            round: 0,
            teams: team_names.into_iter().map(Team::new).collect(),
            roster: Vec::new(),
            saved: HashMap::new(),
            attacks: AttackLog::new(),
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn team_of(&self, player: PlayerId) -> Option<&Team> {
        self.teams.iter().find(|t| t.has(player))
    }

    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    pub fn is_playing(&self, player: PlayerId) -> bool {
        self.roster.contains(&player)
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn saved_state(&self, player: PlayerId) -> Option<&PlayerState> {
        self.saved.get(&player)
    }

    pub fn attacks(&self) -> &AttackLog {
        &self.attacks
    }

    /// Put `player` on `team_name`
    pub fn assign(&mut self, ctx: &mut MatchCtx<'_>, player: PlayerId, team_name: &str) -> Result<(), WarError> {
        let index = self
            .teams
            .iter()
            .position(|t| t.name().eq_ignore_ascii_case(team_name))
            .ok_or_else(|| WarError::UnknownTeam(team_name.to_string()))?;
        if self.roster.len() >= ctx.settings.max_players {
            return Err(WarError::ZoneFull);
        }
        if self.is_playing(player) {
            return Err(WarError::AlreadyPlaying);
        }
        if ctx.sessions.playing_in(player).is_some() {
            return Err(WarError::PlayingElsewhere);
        }
        let captured = ctx
            .sessions
            .get(player)
            .map(|session| session.state())
            .ok_or(WarError::UnknownPlayer(player))?;
        let (spawn, clean) = self.respawn_kit(ctx, self.teams[index].name())?;

        self.roster.push(player);
        self.teams[index].add_player(player);
        self.saved.insert(player, captured);
        ctx.sessions.set_playing_in(player, Some(&self.zone));
        if let Some(session) = ctx.sessions.get_mut(player) {
            session.set_state(clean);
            session.teleport(&spawn);
        }

        let team = &self.teams[index];
        let teammates = team
            .players()
            .iter()
            .map(|p| ctx.sessions.name_of(*p))
            .collect::<Vec<_>>()
            .join(", ");
        let welcome = format!(
            "Welcome to team {}. Points: {}/{}. Teammates: {}",
            team.display_name(),
            team.points(),
            ctx.settings.max_points,
            teammates
        );
        ctx.sessions.send(player, &welcome);
        let joined = format!("{} joined team {}.", ctx.sessions.name_of(player), team.display_name());
        for other in self.roster.iter().copied().filter(|p| *p != player) {
            ctx.sessions.send(other, &joined);
        }

        info!(zone = %self.zone, player = %player, team = team.name(), "Player joined match");
        Ok(())
    }

    /// Put `player` on the smallest team; ties go to the earliest created team
    pub fn auto_assign(&mut self, ctx: &mut MatchCtx<'_>, player: PlayerId) -> Result<(), WarError> {
        let team = self
            .teams
            .iter()
            .min_by_key(|t| t.size())
            .map(|t| t.name().to_string())
            .ok_or_else(|| WarError::NoTeams(self.zone.clone()))?;
        self.assign(ctx, player, &team)
    }

    pub fn record_attack(&mut self, attacker: PlayerId, defender: PlayerId, at_ms: u64) {
        self.attacks.record(attacker, defender, at_ms);
    }

    /// Credit a recent attacker, check for a round win, then respawn the defender
    pub fn on_death(&mut self, ctx: &mut MatchCtx<'_>, defender: PlayerId) -> Result<(), WarError> {
        if !self.is_playing(defender) {
            return Ok(());
        }

        if let Some(attacker) = self.attacks.take_credit(defender, ctx.now_ms) {
            if let Some(team) = self.teams.iter_mut().find(|t| t.has(attacker)) {
                team.add_point();
                let message = format!("Team {} gains 1 point.", team.display_name());
                self.broadcast(ctx.sessions, &message);
            }
        }

        let round_ended = self.check_for_end_round(ctx)?;
        if !round_ended && self.is_playing(defender) {
            if let Some(team) = self.team_of(defender) {
                let spawn = ctx
                    .store
                    .resolve_point(&team_spawn_point(team.name()))?
                    .ok_or_else(|| WarError::UnknownTeam(team.name().to_string()))?;
                if let Some(session) = ctx.sessions.get_mut(defender) {
                    session.teleport(&spawn);
                }
            }
            ctx.tasks.schedule_once(
                ctx.now_ms,
                RESPAWN_DELAY,
                DeferredTask::Respawn {
                    zone: self.zone.clone(),
                    player: defender,
                },
            );
        }
        Ok(())
    }

    /// End the round if any team reached max points; true when it did
    fn check_for_end_round(&mut self, ctx: &mut MatchCtx<'_>) -> Result<bool, WarError> {
        let winner = self
            .teams
            .iter()
            .find(|t| t.points() >= ctx.settings.max_points)
            .map(Team::display_name);
        match winner {
            Some(name) => {
                self.broadcast(ctx.sessions, &format!("Team {name} wins!"));
                self.end_round(ctx)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Finish the round; the last round also ends the game and empties the roster
    pub fn end_round(&mut self, ctx: &mut MatchCtx<'_>) -> Result<(), WarError> {
        self.round = self.round.saturating_add(1);
        let game_over = self.round >= ctx.settings.max_rounds;

        // lowest score first, so the leader closes the line; ties keep team order
        let mut standings: Vec<&Team> = self.teams.iter().collect();
        standings.sort_by_key(|team| team.points());
        let mut message = String::from(if game_over { "Game over!" } else { "Round over!" });
        for team in standings {
            message.push_str(&format!(" {} has {} points.", team.display_name(), team.points()));
        }
        if !game_over {
            message.push_str(" Resetting warzone for next round...");
        }
        self.broadcast(ctx.sessions, &message);
        info!(zone = %self.zone, round = self.round, game_over, "Round ended");

        if game_over {
            for player in self.roster.clone() {
                self.release(ctx, player)?;
            }
        } else {
            for team in &mut self.teams {
                team.reset_points();
            }
            for player in self.roster.clone() {
                self.reset_player_state(ctx, player)?;
            }
        }

        zone::reset_blocks(&self.zone, ctx.store, &mut *ctx.world)?;
        Ok(())
    }

    /// Take `player` out of the match and tell everyone left
    pub fn remove_player(&mut self, ctx: &mut MatchCtx<'_>, player: PlayerId) -> Result<(), WarError> {
        let team = self
            .team_of(player)
            .map(Team::display_name)
            .ok_or(WarError::NotPlaying)?;
        let name = ctx.sessions.name_of(player);

        self.release(ctx, player)?;
        self.broadcast(ctx.sessions, &format!("Player {name} left team {team}."));
        info!(zone = %self.zone, player = %player, "Player left match");
        Ok(())
    }

    /// End the game on the next round transition, whatever the round
    pub fn force_end_game(&mut self, ctx: &mut MatchCtx<'_>) -> Result<(), WarError> {
        self.round = u32::MAX;
        self.end_round(ctx)
    }

    /// Send `player` back to their team spawn with a clean state and the default loadout
    pub fn reset_player_state(&self, ctx: &mut MatchCtx<'_>, player: PlayerId) -> Result<(), WarError> {
        let Some(team) = self.team_of(player) else {
            return Ok(());
        };
        let (spawn, clean) = self.respawn_kit(ctx, team.name())?;
        if let Some(session) = ctx.sessions.get_mut(player) {
            session.set_state(clean);
            session.teleport(&spawn);
        }
        Ok(())
    }

    pub fn broadcast(&self, sessions: &mut Sessions, message: &str) {
        for player in &self.roster {
            sessions.send(*player, message);
        }
    }

    fn respawn_kit(&self, ctx: &MatchCtx<'_>, team: &str) -> Result<(Location, PlayerState), WarError> {
        let spawn = ctx
            .store
            .resolve_point(&team_spawn_point(team))?
            .ok_or_else(|| WarError::UnknownTeam(team.to_string()))?;
        let loadout = ctx
            .store
            .load_loadout(DEFAULT_LOADOUT)?
            .unwrap_or_else(Loadout::empty);
        Ok((spawn, PlayerState::clean(loadout)))
    }

    /// Drop `player` from every structure, restore their state and send them to the lobby
    fn release(&mut self, ctx: &mut MatchCtx<'_>, player: PlayerId) -> Result<(), WarError> {
        let lobby = ctx.store.resolve_point(LOBBY)?;

        for team in &mut self.teams {
            team.remove_player(player);
        }
        self.roster.retain(|p| *p != player);
        self.attacks.forget(player);
        let saved = self.saved.remove(&player);
        ctx.sessions.set_playing_in(player, None);

        if let Some(session) = ctx.sessions.get_mut(player) {
            match &lobby {
                Some(lobby) => session.teleport(lobby),
                None => warn!(zone = %self.zone, "Zone has no lobby to return players to"),
            }
            if let Some(state) = saved {
                session.set_state(state);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{GameMode, Item, PlayerSession};
    use crate::testing::Arena;

    #[test]
    fn assign_captures_state_and_sends_player_to_spawn() {
        let mut arena = Arena::new();
        let (alice, handle) = arena.player("alice");
        let mut before = PlayerState::clean(Loadout::empty());
        before.game_mode = GameMode::Creative;
        before.level = 30;
        handle.put_state(before.clone());

        arena.with_game(|game, ctx| game.assign(ctx, alice, "red")).unwrap();

        assert_eq!(handle.location().block(), arena.red_spawn().block());
        assert_eq!(handle.state().game_mode, GameMode::Survival);
        assert_eq!(
            handle.last_message().as_deref(),
            Some("Welcome to team §cred§f. Points: 0/10. Teammates: alice")
        );
        let game = arena.game().unwrap();
        assert_eq!(game.saved_state(alice), Some(&before));
        assert_eq!(arena.war.sessions().playing_in(alice), Some("arena"));
    }

    #[test]
    fn reset_applies_default_loadout() {
        let mut arena = Arena::new();
        let mut kit = Loadout::empty();
        kit.set(0, Some(Item::new("minecraft:stone_sword", 1)));
        arena.zone_mut().save_loadout(DEFAULT_LOADOUT, &kit).unwrap();
        let (alice, handle) = arena.player("alice");

        arena.with_game(|game, ctx| game.assign(ctx, alice, "blue")).unwrap();
        assert_eq!(handle.state().inventory, kit);
    }

    #[test]
    fn assign_failures() {
        let mut arena = Arena::new();
        arena.set_zone_setting("maxplayers", "2");
        let (a, _) = arena.player("a");
        let (b, _) = arena.player("b");
        let (c, _) = arena.player("c");

        let unknown = arena.with_game(|game, ctx| game.assign(ctx, a, "green"));
        assert!(matches!(unknown, Err(WarError::UnknownTeam(_))));

        arena.with_game(|game, ctx| game.assign(ctx, a, "red")).unwrap();
        let again = arena.with_game(|game, ctx| game.assign(ctx, a, "blue"));
        assert!(matches!(again, Err(WarError::AlreadyPlaying)));

        arena.with_game(|game, ctx| game.assign(ctx, b, "blue")).unwrap();
        let full = arena.with_game(|game, ctx| game.assign(ctx, c, "red"));
        assert!(matches!(full, Err(WarError::ZoneFull)));
    }

    #[test]
    fn auto_assign_picks_smallest_team_in_creation_order() {
        let mut arena = Arena::with_teams(&["alpha", "beta", "gamma"]);
        let (p1, _) = arena.player("p1");
        let (p2, _) = arena.player("p2");
        let (p3, _) = arena.player("p3");

        arena.with_game(|game, ctx| game.assign(ctx, p1, "beta")).unwrap();
        // {alpha: 0, beta: 1, gamma: 0}
        arena.with_game(|game, ctx| game.auto_assign(ctx, p2)).unwrap();
        assert_eq!(arena.game().unwrap().team_of(p2).map(Team::name), Some("alpha"));

        // {alpha: 1, beta: 1, gamma: 0}
        arena.with_game(|game, ctx| game.auto_assign(ctx, p3)).unwrap();
        assert_eq!(arena.game().unwrap().team_of(p3).map(Team::name), Some("gamma"));
    }

    #[test]
    fn kill_inside_window_scores_one_point() {
        let mut arena = Arena::new();
        let (killer, _) = arena.player("killer");
        let (victim, _) = arena.player("victim");
        arena.with_game(|game, ctx| game.assign(ctx, killer, "red")).unwrap();
        arena.with_game(|game, ctx| game.assign(ctx, victim, "blue")).unwrap();

        arena.clock.set(50_000);
        arena.with_game(|game, _| {
            game.record_attack(killer, victim, 50_000);
            Ok(())
        })
        .unwrap();
        arena.clock.set(52_999);
        arena.with_game(|game, ctx| game.on_death(ctx, victim)).unwrap();

        let game = arena.game().unwrap();
        assert_eq!(game.team("red").unwrap().points(), 1);
        assert_eq!(game.team("blue").unwrap().points(), 0);
    }

    #[test]
    fn kill_outside_window_scores_nothing() {
        let mut arena = Arena::new();
        let (killer, _) = arena.player("killer");
        let (victim, _) = arena.player("victim");
        arena.with_game(|game, ctx| game.assign(ctx, killer, "red")).unwrap();
        arena.with_game(|game, ctx| game.assign(ctx, victim, "blue")).unwrap();

        arena.with_game(|game, _| {
            game.record_attack(killer, victim, 50_000);
            Ok(())
        })
        .unwrap();
        arena.clock.set(53_001);
        arena.with_game(|game, ctx| game.on_death(ctx, victim)).unwrap();

        assert!(arena.game().unwrap().teams().iter().all(|t| t.points() == 0));
    }

    #[test]
    fn death_schedules_exactly_one_respawn() {
        let mut arena = Arena::new();
        let (a, handle) = arena.player("a");
        let (b, _) = arena.player("b");
        arena.with_game(|game, ctx| game.assign(ctx, a, "red")).unwrap();
        arena.with_game(|game, ctx| game.assign(ctx, b, "blue")).unwrap();
        handle.place(Location::new(5.0, 1.0, 5.0, "world"));

        arena.with_game(|game, ctx| game.on_death(ctx, a)).unwrap();

        assert_eq!(handle.location().block(), arena.red_spawn().block());
        assert_eq!(arena.war.pending_tasks(), 1);
    }

    #[test]
    fn reaching_max_points_ends_round_once() {
        let mut arena = Arena::new();
        arena.set_zone_setting("maxpoints", "1");
        let (a, handle) = arena.player("a");
        let (b, _) = arena.player("b");
        arena.with_game(|game, ctx| game.assign(ctx, a, "red")).unwrap();
        arena.with_game(|game, ctx| game.assign(ctx, b, "blue")).unwrap();
        handle.clear_messages();

        arena.with_game(|game, ctx| {
            game.record_attack(a, b, ctx.now_ms);
            game.on_death(ctx, b)
        })
        .unwrap();

        let game = arena.game().unwrap();
        assert_eq!(game.round(), 1);
        // points reset for the next round; the death did not respawn twice
        assert!(game.teams().iter().all(|t| t.points() == 0));
        assert_eq!(arena.war.pending_tasks(), 0);
        let wins = handle.messages().iter().filter(|m| m.ends_with("wins!")).count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn only_first_team_at_threshold_is_announced() {
        let mut arena = Arena::new();
        arena.set_zone_setting("maxpoints", "1");
        let (a, handle) = arena.player("a");
        let (b, _) = arena.player("b");
        arena.with_game(|game, ctx| game.assign(ctx, a, "red")).unwrap();
        arena.with_game(|game, ctx| game.assign(ctx, b, "blue")).unwrap();
        arena.with_game(|game, _| {
            for team in &mut game.teams {
                team.add_point();
            }
            Ok(())
        })
        .unwrap();
        handle.clear_messages();

        let ended = arena.with_game(|game, ctx| game.check_for_end_round(ctx)).unwrap();

        assert!(ended);
        assert_eq!(arena.game().unwrap().round(), 1);
        let wins: Vec<_> = handle.messages().into_iter().filter(|m| m.ends_with("wins!")).collect();
        assert_eq!(wins, vec!["Team §cred§f wins!"]);
    }

    #[test]
    fn interim_round_resets_players_and_blocks() {
        let mut arena = Arena::new();
        let (a, handle) = arena.player("a");
        arena.with_game(|game, ctx| game.assign(ctx, a, "red")).unwrap();
        handle.place(Location::new(6.0, 1.0, 6.0, "world"));
        arena.world.set_block(&Location::new(4.0, 0.0, 4.0, "world"), crate::host::BlockSnapshot::new("minecraft:tnt"));

        arena.with_game(|game, ctx| game.end_round(ctx)).unwrap();

        assert_eq!(arena.game().unwrap().round(), 1);
        assert_eq!(handle.location().block(), arena.red_spawn().block());
        assert!(arena.world.block_at(&Location::new(4.0, 0.0, 4.0, "world")).is_air());
        assert!(handle
            .last_message()
            .unwrap()
            .starts_with("Round over! §cred§f has 0 points."));
    }

    #[test]
    fn standings_end_with_the_leader() {
        let mut arena = Arena::new();
        let (a, handle) = arena.player("a");
        arena.with_game(|game, ctx| game.assign(ctx, a, "red")).unwrap();
        arena.with_game(|game, _| {
            game.teams[0].add_point();
            Ok(())
        })
        .unwrap();
        handle.clear_messages();

        arena.with_game(|game, ctx| game.end_round(ctx)).unwrap();

        assert_eq!(
            handle.messages()[0],
            "Round over! §9blue§f has 0 points. §cred§f has 1 points. Resetting warzone for next round..."
        );
    }

    #[test]
    fn last_round_restores_everyone_and_tears_down() {
        let mut arena = Arena::new();
        arena.set_zone_setting("maxrounds", "1");
        let (a, ha) = arena.player("a");
        let (b, hb) = arena.player("b");
        let mut state_a = PlayerState::clean(Loadout::empty());
        state_a.level = 12;
        state_a.inventory.set(0, Some(Item::new("minecraft:diamond", 3)));
        ha.put_state(state_a.clone());
        let mut state_b = PlayerState::clean(Loadout::empty());
        state_b.game_mode = GameMode::Adventure;
        hb.put_state(state_b.clone());

        arena.with_game(|game, ctx| game.assign(ctx, a, "red")).unwrap();
        arena.with_game(|game, ctx| game.assign(ctx, b, "blue")).unwrap();
        arena.with_game(|game, ctx| game.end_round(ctx)).unwrap();

        assert!(arena.game().is_none());
        assert_eq!(ha.state(), state_a);
        assert_eq!(hb.state(), state_b);
        assert_eq!(ha.location(), arena.lobby());
        assert_eq!(arena.war.sessions().playing_in(a), None);
        assert!(ha.messages().iter().any(|m| m.starts_with("Game over!")));
    }

    #[test]
    fn removing_last_player_tears_match_down() {
        let mut arena = Arena::new();
        let (a, ha) = arena.player("a");
        let (b, hb) = arena.player("b");
        arena.with_game(|game, ctx| game.assign(ctx, a, "red")).unwrap();
        arena.with_game(|game, ctx| game.assign(ctx, b, "blue")).unwrap();

        arena.with_game(|game, ctx| game.remove_player(ctx, a)).unwrap();
        assert_eq!(hb.last_message().as_deref(), Some("Player a left team §cred§f."));
        assert_eq!(ha.location(), arena.lobby());
        assert!(arena.game().is_some());

        arena.with_game(|game, ctx| game.remove_player(ctx, b)).unwrap();
        assert!(arena.game().is_none());
    }

    #[test]
    fn force_end_game_ends_regardless_of_round() {
        let mut arena = Arena::new();
        let (a, ha) = arena.player("a");
        arena.with_game(|game, ctx| game.assign(ctx, a, "red")).unwrap();

        arena.with_game(|game, ctx| game.force_end_game(ctx)).unwrap();

        assert!(arena.game().is_none());
        assert!(ha.messages().iter().any(|m| m.starts_with("Game over!")));
    }
}
