//! Test fixture: one 10x10x10 zone with a lobby, two teams and two gates
//!
//! Layout, all in world "world":
//! - cuboid (0,0,0)..(9,9,9)
//! - lobby (20,1,20)
//! - team spawns inside, red (2,1,2) and blue (7,1,7)
//! - gate `red` at (20,1,25), gate `autoassign` at (22,1,22)

use tempfile::TempDir;

use crate::error::WarError;
use crate::game::{MatchCtx, MatchEngine};
use crate::geom::{Cuboid, Location};
use crate::host::memory::{MemorySession, MemoryWorld};
use crate::host::PlayerId;
use crate::util::time::ManualClock;
use crate::war::War;
use crate::zone::Zone;

pub(crate) const ZONE: &str = "arena";

const SPAWNS: [(f64, f64, f64); 4] = [(2.0, 1.0, 2.0), (7.0, 1.0, 7.0), (2.0, 1.0, 7.0), (7.0, 1.0, 2.0)];

fn loc(x: f64, y: f64, z: f64) -> Location {
    Location::new(x, y, z, "world")
}

pub(crate) struct Arena {
    pub war: War,
    pub world: MemoryWorld,
    pub clock: ManualClock,
    _dir: TempDir,
}

impl Arena {
    pub fn new() -> Self {
        Self::with_teams(&["red", "blue"])
    }

    pub fn with_teams(teams: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let world = MemoryWorld::new();
        let clock = ManualClock::starting_at(0);
        let mut war = War::open(dir.path(), Box::new(world.clone()), Box::new(clock.clone())).unwrap();

        war.create_zone(ZONE, &Cuboid::new(&loc(0.0, 0.0, 0.0), &loc(9.0, 9.0, 9.0)))
            .unwrap();
        let zone = war.zone_mut(ZONE).unwrap();
        zone.set_lobby(&loc(20.0, 1.0, 20.0)).unwrap();
        for (team, (x, y, z)) in teams.iter().zip(SPAWNS.iter().cycle()) {
            zone.set_team_spawn(team, &loc(*x, *y, *z)).unwrap();
        }
        if teams.contains(&"red") {
            zone.set_gate("red", &loc(20.0, 1.0, 25.0)).unwrap();
        }
        zone.set_gate("autoassign", &loc(22.0, 1.0, 22.0)).unwrap();
        war.save_zone(ZONE).unwrap();

        Self {
            war,
            world,
            clock,
            _dir: dir,
        }
    }

    /// Connect a player standing in the lobby
    pub fn player(&mut self, name: &str) -> (PlayerId, MemorySession) {
        let session = MemorySession::new(name, self.lobby());
        (self.war.connect(Box::new(session.clone())), session)
    }

    pub fn zone_maker(&mut self, name: &str) -> (PlayerId, MemorySession) {
        let session = MemorySession::new(name, self.lobby()).zone_maker();
        (self.war.connect(Box::new(session.clone())), session)
    }

    pub fn lobby(&self) -> Location {
        loc(20.0, 1.0, 20.0)
    }

    pub fn red_spawn(&self) -> Location {
        self.war.zone(ZONE).unwrap().team_spawn("red").unwrap()
    }

    pub fn zone_mut(&mut self) -> &mut Zone {
        self.war.zone_mut(ZONE).unwrap()
    }

    pub fn game(&self) -> Option<&MatchEngine> {
        self.war.zone(ZONE).unwrap().game()
    }

    pub fn set_zone_setting(&mut self, setting: &str, value: &str) {
        self.war.set_zone_setting(ZONE, setting, value).unwrap();
    }

    /// Start a match if needed and run `f` against it
    pub fn with_game<R>(
        &mut self,
        f: impl FnOnce(&mut MatchEngine, &mut MatchCtx<'_>) -> Result<R, WarError>,
    ) -> Result<R, WarError> {
        self.war.start_game(ZONE)?;
        self.war.with_match(ZONE, f)
    }
}
