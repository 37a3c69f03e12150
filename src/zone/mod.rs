//! Warzones
//!
//! A [`Zone`] pairs the zone's store with its live match, if any, and enforces
//! where reference points may be placed: team spawns inside the cuboid, lobby
//! and gates outside it.

pub mod settings;
pub mod validator;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{PlacementError, WarError};
use crate::game::{MatchCtx, MatchEngine};
use crate::geom::{Cuboid, Location};
use crate::host::{BlockSnapshot, EntityKind, Loadout, WorldAdapter};
use crate::scheduler::TaskQueue;
use crate::session::Sessions;
use crate::store::{SnapshotStats, StoreError, ZoneStore, ORIGIN_POINT};

use settings::{SettingValue, ZoneDefaults, ZoneSetting, ZoneSettings};

pub const POSITION1: &str = ORIGIN_POINT;
pub const POSITION2: &str = "position2";
pub const LOBBY: &str = "lobby";
pub const TEAM_SPAWN_PREFIX: &str = "teamspawn";
pub const GATE_PREFIX: &str = "gate";
/// Gate name that puts the player on the smallest team
pub const AUTOASSIGN: &str = "autoassign";
/// Loadout applied whenever a player is reset into a match
pub const DEFAULT_LOADOUT: &str = "default";

/// Team and gate names are stored lower-cased, so `Red` and `red` are one team
pub fn team_spawn_point(team: &str) -> String {
    format!("{TEAM_SPAWN_PREFIX}{}", team.to_ascii_lowercase())
}

pub fn gate_point(name: &str) -> String {
    format!("{GATE_PREFIX}{}", name.to_ascii_lowercase())
}

/// A gate marker outside the zone
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub name: String,
    pub location: Location,
}

impl Gate {
    pub fn is_autoassign(&self) -> bool {
        self.name.eq_ignore_ascii_case(AUTOASSIGN)
    }
}

/// Host-side pieces a match needs while it runs
pub struct GameEnv<'a> {
    pub world: &'a mut dyn WorldAdapter,
    pub sessions: &'a mut Sessions,
    pub tasks: &'a mut TaskQueue,
    pub now_ms: u64,
}

#[derive(Debug)]
pub struct Zone {
    name: String,
    store: ZoneStore,
    game: Option<MatchEngine>,
}

impl Zone {
    pub fn open(dir: &Path, name: &str) -> Result<Self, StoreError> {
        Ok(Self {
            name: name.to_string(),
            store: ZoneStore::open(dir, name)?,
            game: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &ZoneStore {
        &self.store
    }

    pub fn game(&self) -> Option<&MatchEngine> {
        self.game.as_ref()
    }

    pub fn has_game(&self) -> bool {
        self.game.is_some()
    }

    /// Release the store; the match must already be over
    pub fn close(self) -> Vec<PathBuf> {
        self.store.close()
    }

    // ------------------------------------------------------------------
    // Geometry and points
    // ------------------------------------------------------------------

    pub fn cuboid(&self) -> Result<Cuboid, WarError> {
        self.store
            .cuboid()?
            .ok_or_else(|| WarError::incomplete(&self.name, "boundary"))
    }

    pub fn contains(&self, at: &Location) -> bool {
        self.cuboid().map(|c| c.contains(at)).unwrap_or(false)
    }

    /// Write both corners; `position1` becomes the minimum corner
    pub fn set_cuboid(&mut self, cuboid: &Cuboid) -> Result<(), StoreError> {
        self.store.set_point(POSITION1, &cuboid.min_location())?;
        self.store.set_point(POSITION2, &cuboid.max_location())
    }

    pub fn lobby(&self) -> Result<Location, WarError> {
        self.store
            .resolve_point(LOBBY)?
            .ok_or_else(|| WarError::incomplete(&self.name, "lobby"))
    }

    pub fn set_lobby(&mut self, at: &Location) -> Result<(), WarError> {
        if self.cuboid()?.contains(at) {
            return Err(PlacementError::LobbyInside.into());
        }
        self.store.set_point(LOBBY, at)?;
        Ok(())
    }

    /// Team names in spawn creation order
    pub fn teams(&self) -> Vec<String> {
        self.store
            .points_with_prefix(TEAM_SPAWN_PREFIX)
            .map(str::to_string)
            .collect()
    }

    pub fn has_team(&self, team: &str) -> bool {
        self.teams().iter().any(|t| t.eq_ignore_ascii_case(team))
    }

    pub fn team_spawn(&self, team: &str) -> Result<Location, WarError> {
        self.store
            .resolve_point(&team_spawn_point(team))?
            .ok_or_else(|| WarError::UnknownTeam(team.to_string()))
    }

    /// Creates the team when it has no spawn yet
    pub fn set_team_spawn(&mut self, team: &str, at: &Location) -> Result<(), WarError> {
        if !self.cuboid()?.contains(at) {
            return Err(PlacementError::SpawnOutside.into());
        }
        self.store.set_point(&team_spawn_point(team), at)?;
        Ok(())
    }

    /// Teams are fixed while a match runs
    pub fn delete_team(&mut self, team: &str) -> Result<bool, WarError> {
        if self.game.is_some() {
            return Err(WarError::GameRunning(self.name.clone()));
        }
        Ok(self.store.delete_point(&team_spawn_point(team))?)
    }

    pub fn gates(&self) -> Result<Vec<Gate>, WarError> {
        let names: Vec<String> = self
            .store
            .points_with_prefix(GATE_PREFIX)
            .map(str::to_string)
            .collect();
        let mut gates = Vec::with_capacity(names.len());
        for name in names {
            if let Some(location) = self.store.resolve_point(&gate_point(&name))? {
                gates.push(Gate { name, location });
            }
        }
        Ok(gates)
    }

    /// `name` must be an existing team or `autoassign`
    pub fn set_gate(&mut self, name: &str, at: &Location) -> Result<(), WarError> {
        if !name.eq_ignore_ascii_case(AUTOASSIGN) && !self.has_team(name) {
            return Err(WarError::UnknownTeam(name.to_string()));
        }
        if self.cuboid()?.contains(at) {
            return Err(PlacementError::GateInside.into());
        }
        self.store.set_point(&gate_point(name), at)?;
        Ok(())
    }

    pub fn delete_gate(&mut self, name: &str) -> Result<bool, WarError> {
        Ok(self.store.delete_point(&gate_point(name))?)
    }

    // ------------------------------------------------------------------
    // Settings and loadouts
    // ------------------------------------------------------------------

    pub fn setting(&self, setting: ZoneSetting, defaults: &ZoneDefaults) -> SettingValue {
        settings::resolve(setting, self.store.setting(setting.key()), defaults)
    }

    pub fn settings(&self, defaults: &ZoneDefaults) -> ZoneSettings {
        ZoneSettings::from_lookup(|setting| self.setting(setting, defaults))
    }

    pub fn set_setting(&mut self, setting: ZoneSetting, value: SettingValue) -> Result<(), StoreError> {
        self.store.put_setting(setting.key(), &value.to_string())
    }

    pub fn save_loadout(&mut self, label: &str, loadout: &Loadout) -> Result<(), StoreError> {
        self.store.save_loadout(label, loadout)
    }

    // ------------------------------------------------------------------
    // World snapshot
    // ------------------------------------------------------------------

    pub fn save(&mut self, world: &dyn WorldAdapter) -> Result<SnapshotStats, StoreError> {
        info!(zone = %self.name, "Saving zone");
        self.store.save_snapshot(world)
    }

    /// Clear dropped items and restore the saved blocks
    pub fn reset(&self, world: &mut dyn WorldAdapter) -> Result<usize, WarError> {
        reset_blocks(&self.name, &self.store, world)
    }

    // ------------------------------------------------------------------
    // Match lifecycle
    // ------------------------------------------------------------------

    /// Start a match if none is running
    pub fn new_game(&mut self, settings: &ZoneSettings) -> Result<(), WarError> {
        if self.game.is_some() {
            return Ok(());
        }
        if settings.editing {
            return Err(WarError::EditingEnabled(self.name.clone()));
        }
        let teams = self.teams();
        if teams.is_empty() {
            return Err(WarError::NoTeams(self.name.clone()));
        }

        info!(zone = %self.name, teams = teams.len(), "Starting new game");
        self.game = Some(MatchEngine::new(&self.name, teams));
        Ok(())
    }

    /// Run `f` against the live match, tearing the match down once its roster is empty
    pub fn with_game<R>(
        &mut self,
        env: &mut GameEnv<'_>,
        settings: ZoneSettings,
        f: impl FnOnce(&mut MatchEngine, &mut MatchCtx<'_>) -> Result<R, WarError>,
    ) -> Result<R, WarError> {
        let Some(game) = self.game.as_mut() else {
            return Err(WarError::NoGame(self.name.clone()));
        };
        let mut ctx = MatchCtx {
            store: &self.store,
            world: &mut *env.world,
            sessions: &mut *env.sessions,
            tasks: &mut *env.tasks,
            settings,
            now_ms: env.now_ms,
        };

        let result = f(game, &mut ctx);
        if game.is_empty() {
            info!(zone = %self.name, round = game.round(), "Game over, no players left");
            self.game = None;
        }
        result
    }
}

/// Clear dropped items inside the zone and write the stored snapshot back
pub(crate) fn reset_blocks(
    zone: &str,
    store: &ZoneStore,
    world: &mut dyn WorldAdapter,
) -> Result<usize, WarError> {
    let cuboid = store
        .cuboid()?
        .ok_or_else(|| WarError::incomplete(zone, "boundary"))?;
    let cleared = world.clear_entities(&cuboid, EntityKind::Item);
    let blocks = store.load_snapshot(world)?;
    info!(zone, blocks, cleared, "Reset zone");
    Ok(blocks)
}

/// Shell cells around `around` that are air, i.e. the ones a mask has to fill
pub fn mask_cells(cuboid: &Cuboid, around: &Location, radius: i32, world: &dyn WorldAdapter) -> Vec<Location> {
    if around.world != cuboid.world() {
        warn!(world = %around.world, "Mask requested in a different world");
        return Vec::new();
    }
    cuboid
        .shell_near(around.block(), radius)
        .into_iter()
        .map(|pos| Location::at_block(pos, cuboid.world()))
        .filter(|at| world.read_block(at, true).is_air())
        .collect()
}

/// Block drawn over masked cells
pub fn mask_block(type_name: &str) -> BlockSnapshot {
    BlockSnapshot::new(type_name)
}
