//! The war: every loaded zone plus the host pieces they share
//!
//! `War` is owned by the authority loop and is the only path through which
//! zones, matches and sessions are mutated. Zone lookups by name are
//! case-insensitive; the registered spelling is kept.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::war::{WarConfig, WarSetting};
use crate::error::WarError;
use crate::game::{MatchCtx, MatchEngine};
use crate::geom::Cuboid;
use crate::host::{PlayerId, PlayerSession, WorldAdapter};
use crate::scheduler::{DeferredTask, TaskQueue};
use crate::session::Sessions;
use crate::store::SnapshotStats;
use crate::util::time::Clock;
use crate::zone::settings::{SettingError, SettingValue, ZoneSetting};
use crate::zone::validator::ZoneValidator;
use crate::zone::{GameEnv, Zone};

/// Deleted zone files are moved here, under the data directory
pub const TRASH_DIR: &str = "trash";

/// Which team a joining player asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinTeam {
    Auto,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamStatus {
    pub name: String,
    pub players: usize,
    pub points: u32,
}

/// Public view of one zone, published by the authority loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneStatus {
    pub name: String,
    pub size: Option<String>,
    pub editing: bool,
    pub teams: Vec<String>,
    /// Present while a match is running
    pub round: Option<u32>,
    pub players: usize,
    pub scores: Vec<TeamStatus>,
}

pub struct War {
    data_dir: PathBuf,
    config: WarConfig,
    zones: BTreeMap<String, Zone>,
    sessions: Sessions,
    tasks: TaskQueue,
    world: Box<dyn WorldAdapter>,
    clock: Box<dyn Clock>,
}

fn lookup<'a>(zones: &'a BTreeMap<String, Zone>, name: &str) -> Result<&'a Zone, WarError> {
    zones
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, zone)| zone)
        .ok_or_else(|| WarError::UnknownZone(name.to_string()))
}

fn lookup_mut<'a>(zones: &'a mut BTreeMap<String, Zone>, name: &str) -> Result<&'a mut Zone, WarError> {
    zones
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, zone)| zone)
        .ok_or_else(|| WarError::UnknownZone(name.to_string()))
}

impl War {
    /// Load the war config and every registered zone; zones that fail to open are skipped
    pub fn open(
        data_dir: impl Into<PathBuf>,
        world: Box<dyn WorldAdapter>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, WarError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        let config = WarConfig::load(&data_dir)?;

        let mut zones = BTreeMap::new();
        for name in &config.zones {
            match Zone::open(&data_dir, name) {
                Ok(zone) => {
                    info!(zone = %name, "Loaded zone");
                    zones.insert(name.clone(), zone);
                }
                Err(e) => error!(zone = %name, error = %e, "Failed to load zone, skipping"),
            }
        }
        info!(zones = zones.len(), data_dir = %data_dir.display(), "War loaded");

        Ok(Self {
            data_dir,
            config,
            zones,
            sessions: Sessions::new(),
            tasks: TaskQueue::new(),
            world,
            clock,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &WarConfig {
        &self.config
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn zone(&self, name: &str) -> Result<&Zone, WarError> {
        lookup(&self.zones, name)
    }

    pub fn zone_mut(&mut self, name: &str) -> Result<&mut Zone, WarError> {
        lookup_mut(&mut self.zones, name)
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut Sessions {
        &mut self.sessions
    }

    pub fn world(&self) -> &dyn WorldAdapter {
        self.world.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn connect(&mut self, session: Box<dyn PlayerSession>) -> PlayerId {
        let id = self.sessions.connect(session);
        info!(player = %id, name = %self.sessions.name_of(id), "Player connected");
        id
    }

    /// Pull the player out of any match, then drop the session
    pub fn disconnect(&mut self, player: PlayerId) {
        if self.sessions.playing_in(player).is_some() {
            if let Err(e) = self.leave(player) {
                error!(player = %player, error = %e, "Failed to remove quitting player from match");
            }
        }
        if self.sessions.disconnect(player).is_some() {
            info!(player = %player, "Player disconnected");
        }
    }

    /// Player name in their team colour when they are in a match
    pub fn display_name(&self, player: PlayerId) -> String {
        let name = self.sessions.name_of(player);
        let color = self
            .sessions
            .playing_in(player)
            .and_then(|zone| lookup(&self.zones, zone).ok())
            .and_then(Zone::game)
            .and_then(|game| game.team_of(player))
            .and_then(|team| team.color());
        match color {
            Some(color) => format!("{color}{name}§f"),
            None => name,
        }
    }

    // ------------------------------------------------------------------
    // Zone lifecycle
    // ------------------------------------------------------------------

    /// Validate and register a new zone spanning `cuboid`
    pub fn create_zone(&mut self, name: &str, cuboid: &Cuboid) -> Result<(), WarError> {
        let validator = ZoneValidator::new(self.config.settings.max_zone_size);
        validator.validate_name(name)?;
        if lookup(&self.zones, name).is_ok() {
            return Err(WarError::ZoneExists(name.to_string()));
        }
        let max_zones = self.config.settings.max_zones;
        if self.zones.len() >= max_zones as usize {
            return Err(WarError::TooManyZones(max_zones));
        }
        validator.validate_dimensions(cuboid)?;
        let existing: Vec<(&str, Cuboid)> = self
            .zones
            .iter()
            .filter_map(|(key, zone)| zone.cuboid().ok().map(|c| (key.as_str(), c)))
            .collect();
        validator.validate_location(cuboid, existing)?;

        let mut zone = Zone::open(&self.data_dir, name)?;
        zone.set_cuboid(cuboid)?;
        self.config.register_zone(name);
        self.config.save()?;
        self.zones.insert(name.to_string(), zone);

        info!(zone = %name, size = %cuboid, "Created zone");
        Ok(())
    }

    /// End any match, unregister the zone and move its files to the trash
    pub fn delete_zone(&mut self, name: &str) -> Result<Vec<PathBuf>, WarError> {
        let key = self.zone(name)?.name().to_string();
        if self.zone(&key)?.has_game() {
            self.force_end_game(&key)?;
        }

        let zone = self
            .zones
            .remove(&key)
            .ok_or_else(|| WarError::UnknownZone(key.clone()))?;
        self.config.unregister_zone(&key);
        self.config.save()?;

        let trash = self.data_dir.join(TRASH_DIR);
        fs::create_dir_all(&trash)?;
        let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let mut trashed = Vec::new();
        for path in zone.close() {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| key.clone());
            let target = trash.join(format!("{file_name}.{stamp}"));
            fs::rename(&path, &target)?;
            trashed.push(target);
        }

        info!(zone = %key, files = trashed.len(), trash = %trash.display(), "Deleted zone");
        Ok(trashed)
    }

    pub fn save_zone(&mut self, name: &str) -> Result<SnapshotStats, WarError> {
        let zone = lookup_mut(&mut self.zones, name)?;
        Ok(zone.save(self.world.as_ref())?)
    }

    /// Put the saved blocks back; returns how many were written
    pub fn reset_zone(&mut self, name: &str) -> Result<usize, WarError> {
        let zone = lookup(&self.zones, name)?;
        zone.reset(self.world.as_mut())
    }

    /// Apply a zone setting; enabling `editing` ends a running match first
    pub fn set_zone_setting(&mut self, name: &str, setting: &str, raw: &str) -> Result<SettingValue, WarError> {
        let setting: ZoneSetting = setting.parse()?;
        let value = setting.parse_value(raw)?;
        let key = self.zone(name)?.name().to_string();

        if setting == ZoneSetting::Editing && value == SettingValue::Bool(true) && self.zone(&key)?.has_game() {
            info!(zone = %key, "Editing enabled, ending running game");
            self.force_end_game(&key)?;
        }
        self.zone_mut(&key)?.set_setting(setting, value)?;
        Ok(value)
    }

    /// Set a war setting, or a war-wide default for a zone setting
    pub fn set_war_setting(&mut self, setting: &str, raw: &str) -> Result<String, WarError> {
        if let Ok(war_setting) = setting.parse::<WarSetting>() {
            war_setting.apply(&mut self.config.settings, raw)?;
            self.config.save()?;
            return Ok(format!("{} = {}", war_setting, war_setting.get(&self.config.settings)));
        }
        let zone_setting: ZoneSetting = setting
            .parse()
            .map_err(|_| SettingError::Unknown(setting.to_string()))?;
        let value = zone_setting.parse_value(raw)?;

        let mut defaults = self.config.zone_defaults.clone();
        defaults.insert(zone_setting, value);
        if zone_setting == ZoneSetting::Editing && value == SettingValue::Bool(true) {
            // zones with their own editing override keep their match
            let ending: Vec<String> = self
                .zones
                .values()
                .filter(|zone| zone.has_game())
                .filter(|zone| zone.setting(ZoneSetting::Editing, &defaults) == SettingValue::Bool(true))
                .map(|zone| zone.name().to_string())
                .collect();
            for zone in ending {
                info!(zone = %zone, "Editing enabled war-wide, ending running game");
                self.force_end_game(&zone)?;
            }
        }
        self.config.zone_defaults = defaults;
        self.config.save()?;
        Ok(format!("{zone_setting} = {value}"))
    }

    // ------------------------------------------------------------------
    // Matches
    // ------------------------------------------------------------------

    /// Start a match in `name` unless one is running
    pub fn start_game(&mut self, name: &str) -> Result<(), WarError> {
        let zone = lookup_mut(&mut self.zones, name)?;
        let settings = zone.settings(&self.config.zone_defaults);
        zone.new_game(&settings)
    }

    /// Run `f` against the live match of `name`
    pub(crate) fn with_match<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut MatchEngine, &mut MatchCtx<'_>) -> Result<R, WarError>,
    ) -> Result<R, WarError> {
        let now_ms = self.clock.now_ms();
        let zone = lookup_mut(&mut self.zones, name)?;
        let settings = zone.settings(&self.config.zone_defaults);
        let mut env = GameEnv {
            world: self.world.as_mut(),
            sessions: &mut self.sessions,
            tasks: &mut self.tasks,
            now_ms,
        };
        zone.with_game(&mut env, settings, f)
    }

    pub fn join(&mut self, zone: &str, player: PlayerId, team: JoinTeam) -> Result<(), WarError> {
        self.start_game(zone)?;
        self.with_match(zone, |game, ctx| match &team {
            JoinTeam::Auto => game.auto_assign(ctx, player),
            JoinTeam::Named(name) => game.assign(ctx, player, name),
        })
    }

    pub fn leave(&mut self, player: PlayerId) -> Result<(), WarError> {
        let zone = self
            .sessions
            .playing_in(player)
            .map(str::to_string)
            .ok_or(WarError::NotPlaying)?;
        self.with_match(&zone, |game, ctx| game.remove_player(ctx, player))
    }

    pub fn end_round(&mut self, zone: &str) -> Result<(), WarError> {
        self.with_match(zone, |game, ctx| game.end_round(ctx))
    }

    pub fn force_end_game(&mut self, zone: &str) -> Result<(), WarError> {
        self.with_match(zone, |game, ctx| game.force_end_game(ctx))
    }

    // ------------------------------------------------------------------
    // Authority loop
    // ------------------------------------------------------------------

    /// Run every deferred task that is due; returns how many ran
    pub fn tick(&mut self) -> usize {
        let due = self.tasks.take_due(self.clock.now_ms());
        let count = due.len();
        for task in due {
            self.run_task(task);
        }
        count
    }

    pub(crate) fn schedule(&mut self, delay: std::time::Duration, task: DeferredTask) {
        let now_ms = self.clock.now_ms();
        self.tasks.schedule_once(now_ms, delay, task);
    }

    fn run_task(&mut self, task: DeferredTask) {
        match task {
            DeferredTask::Unmask { player, cells } => {
                let Some(session) = self.sessions.get_mut(player) else {
                    return;
                };
                if !session.is_online() {
                    return;
                }
                for cell in &cells {
                    let real = self.world.read_block(cell, true);
                    session.set_local_block(cell, &real);
                }
            }
            DeferredTask::Respawn { zone, player } => {
                if self.sessions.playing_in(player) != Some(zone.as_str()) {
                    return;
                }
                if let Err(e) = self.with_match(&zone, |game, ctx| game.reset_player_state(ctx, player)) {
                    warn!(zone = %zone, player = %player, error = %e, "Deferred respawn failed");
                }
            }
        }
    }

    pub fn status(&self) -> Vec<ZoneStatus> {
        self.zones
            .values()
            .map(|zone| {
                let settings = zone.settings(&self.config.zone_defaults);
                let game = zone.game();
                ZoneStatus {
                    name: zone.name().to_string(),
                    size: zone.cuboid().ok().map(|c| c.to_string()),
                    editing: settings.editing,
                    teams: zone.teams(),
                    round: game.map(MatchEngine::round),
                    players: game.map(|g| g.roster().len()).unwrap_or(0),
                    scores: game
                        .map(|g| {
                            g.teams()
                                .iter()
                                .map(|t| TeamStatus {
                                    name: t.name().to_string(),
                                    players: t.size(),
                                    points: t.points(),
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Location;
    use crate::host::memory::MemoryWorld;
    use crate::host::{BlockSnapshot, Loadout, PlayerState};
    use crate::testing::Arena;
    use crate::util::time::ManualClock;

    fn loc(x: f64, y: f64, z: f64) -> Location {
        Location::new(x, y, z, "world")
    }

    fn open(dir: &Path) -> War {
        War::open(dir, Box::new(MemoryWorld::new()), Box::new(ManualClock::starting_at(0))).unwrap()
    }

    #[test]
    fn created_zones_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut war = open(dir.path());
        war.create_zone("arena", &Cuboid::new(&loc(0.0, 0.0, 0.0), &loc(9.0, 9.0, 9.0)))
            .unwrap();
        drop(war);

        let war = open(dir.path());
        let zone = war.zone("ARENA").unwrap();
        assert_eq!(zone.name(), "arena");
        assert_eq!(zone.cuboid().unwrap().to_string(), "10x10x10");
    }

    #[test]
    fn create_zone_rejects_before_writing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let mut war = open(dir.path());
        let arena = Cuboid::new(&loc(0.0, 0.0, 0.0), &loc(9.0, 9.0, 9.0));
        war.create_zone("arena", &arena).unwrap();

        assert!(matches!(war.create_zone("a/b", &arena), Err(WarError::Validation(_))));
        assert!(matches!(war.create_zone("Arena", &arena), Err(WarError::ZoneExists(_))));
        assert!(matches!(
            war.create_zone("tiny", &Cuboid::new(&loc(50.0, 0.0, 0.0), &loc(53.0, 3.0, 53.0))),
            Err(WarError::Validation(_))
        ));
        assert!(matches!(
            war.create_zone("clip", &Cuboid::new(&loc(5.0, 0.0, 5.0), &loc(15.0, 9.0, 15.0))),
            Err(WarError::Validation(_))
        ));
        assert_eq!(war.zones().count(), 1);
        assert!(!dir.path().join("clip.warzone").exists());
    }

    #[test]
    fn zone_count_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let mut war = open(dir.path());
        war.set_war_setting("maxzones", "1").unwrap();
        war.create_zone("one", &Cuboid::new(&loc(0.0, 0.0, 0.0), &loc(9.0, 9.0, 9.0)))
            .unwrap();

        let err = war
            .create_zone("two", &Cuboid::new(&loc(20.0, 0.0, 0.0), &loc(29.0, 9.0, 9.0)))
            .unwrap_err();
        assert!(matches!(err, WarError::TooManyZones(1)));
    }

    #[test]
    fn deleted_zone_moves_to_trash() {
        let dir = tempfile::tempdir().unwrap();
        let mut war = open(dir.path());
        war.create_zone("arena", &Cuboid::new(&loc(0.0, 0.0, 0.0), &loc(9.0, 9.0, 9.0)))
            .unwrap();

        let trashed = war.delete_zone("arena").unwrap();

        assert_eq!(trashed.len(), 2);
        for path in &trashed {
            assert!(path.starts_with(dir.path().join(TRASH_DIR)));
            assert!(path.exists());
        }
        assert!(!dir.path().join("arena.warzone").exists());
        assert!(!dir.path().join("arena.blocks").exists());
        assert!(war.zone("arena").is_err());
        assert!(open(dir.path()).zone("arena").is_err());
    }

    #[test]
    fn deleting_a_zone_ends_its_match() {
        let mut arena = Arena::new();
        let (a, handle) = arena.player("a");
        let mut before = PlayerState::clean(Loadout::empty());
        before.level = 7;
        handle.put_state(before.clone());
        arena.war.join("arena", a, JoinTeam::Auto).unwrap();

        arena.war.delete_zone("arena").unwrap();

        assert_eq!(handle.state(), before);
        assert_eq!(arena.war.sessions().playing_in(a), None);
    }

    #[test]
    fn enabling_editing_forces_game_over() {
        let mut arena = Arena::new();
        let (a, handle) = arena.player("a");
        arena.war.join("arena", a, JoinTeam::Named("red".into())).unwrap();

        arena.war.set_zone_setting("arena", "editing", "on").unwrap();

        assert!(arena.game().is_none());
        assert!(handle.messages().iter().any(|m| m.starts_with("Game over!")));
        let rejoin = arena.war.join("arena", a, JoinTeam::Auto);
        assert!(matches!(rejoin, Err(WarError::EditingEnabled(_))));
    }

    #[test]
    fn team_removal_is_refused_mid_match_and_rounds_still_reset() {
        let mut arena = Arena::new();
        let (a, _) = arena.player("a");
        let (b, hb) = arena.player("b");
        arena.war.join("arena", a, JoinTeam::Named("red".into())).unwrap();
        arena.war.join("arena", b, JoinTeam::Named("blue".into())).unwrap();

        let removed = arena.zone_mut().delete_team("red");
        assert!(matches!(removed, Err(WarError::GameRunning(_))));

        let tnt = loc(5.0, 1.0, 5.0);
        arena.world.set_block(&tnt, BlockSnapshot::new("minecraft:tnt"));
        hb.place(loc(6.0, 1.0, 6.0));
        arena.war.end_round("arena").unwrap();

        assert_eq!(arena.game().unwrap().round(), 1);
        assert!(arena.world.block_at(&tnt).is_air());
        assert_eq!(hb.location().block(), loc(7.0, 1.0, 7.0).block());
    }

    #[test]
    fn enabling_editing_war_wide_ends_matches_without_an_override() {
        let mut arena = Arena::new();
        let (a, handle) = arena.player("a");
        let (b, _) = arena.player("b");
        arena.war.join("arena", a, JoinTeam::Named("red".into())).unwrap();

        arena.war.set_war_setting("editing", "true").unwrap();

        assert!(arena.game().is_none());
        assert_eq!(arena.war.sessions().playing_in(a), None);
        assert!(handle.messages().iter().any(|m| m.starts_with("Game over!")));
        let late = arena.war.join("arena", b, JoinTeam::Auto);
        assert!(matches!(late, Err(WarError::EditingEnabled(_))));
    }

    #[test]
    fn zone_editing_override_survives_war_wide_editing() {
        let mut arena = Arena::new();
        let (a, _) = arena.player("a");
        arena.set_zone_setting("editing", "false");
        arena.war.join("arena", a, JoinTeam::Named("red".into())).unwrap();

        arena.war.set_war_setting("editing", "true").unwrap();

        assert!(arena.game().is_some());
        assert_eq!(arena.war.sessions().playing_in(a), Some("arena"));
    }

    #[test]
    fn war_defaults_apply_to_every_zone() {
        let mut arena = Arena::new();
        arena.war.set_war_setting("maxplayers", "1").unwrap();
        let (a, _) = arena.player("a");
        let (b, _) = arena.player("b");

        arena.war.join("arena", a, JoinTeam::Auto).unwrap();
        assert!(matches!(arena.war.join("arena", b, JoinTeam::Auto), Err(WarError::ZoneFull)));
        assert!(matches!(
            arena.war.set_war_setting("colour", "red"),
            Err(WarError::Setting(SettingError::Unknown(_)))
        ));
    }

    #[test]
    fn quitting_player_is_restored_and_forgotten() {
        let mut arena = Arena::new();
        let (a, ha) = arena.player("a");
        let (b, _) = arena.player("b");
        let mut before = PlayerState::clean(Loadout::empty());
        before.level = 3;
        ha.put_state(before.clone());
        arena.war.join("arena", a, JoinTeam::Named("red".into())).unwrap();
        arena.war.join("arena", b, JoinTeam::Named("blue".into())).unwrap();

        arena.war.disconnect(a);

        assert_eq!(ha.state(), before);
        assert!(arena.war.sessions().get(a).is_none());
        assert!(!arena.game().unwrap().is_playing(a));
    }

    #[test]
    fn respawn_task_is_dropped_once_player_left() {
        let mut arena = Arena::new();
        let (a, handle) = arena.player("a");
        let (b, _) = arena.player("b");
        arena.war.join("arena", a, JoinTeam::Named("red".into())).unwrap();
        arena.war.join("arena", b, JoinTeam::Named("blue".into())).unwrap();
        arena.with_game(|game, ctx| game.on_death(ctx, a)).unwrap();
        arena.war.leave(a).unwrap();

        arena.clock.advance(std::time::Duration::from_millis(150));
        assert_eq!(arena.war.tick(), 1);
        assert_eq!(handle.location(), arena.lobby());
    }

    #[test]
    fn status_reports_running_match() {
        let mut arena = Arena::new();
        let (a, _) = arena.player("a");
        arena.war.join("arena", a, JoinTeam::Named("blue".into())).unwrap();

        let status = arena.war.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].round, Some(0));
        assert_eq!(status[0].players, 1);
        assert_eq!(status[0].teams, vec!["red", "blue"]);
        assert_eq!(status[0].scores[1].players, 1);
    }
}
