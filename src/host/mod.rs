//! Boundary to the game host
//!
//! The core never talks to a game engine directly. Block access goes through a
//! [`WorldAdapter`], and everything a player can be asked to do goes through a
//! [`PlayerSession`]. A host provides one implementation of each; the
//! in-memory pair in [`memory`] backs the headless server and the tests.

pub mod items;
pub mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::{Cuboid, Location};

pub use items::{GameMode, Item, Loadout, PlayerState, EQUIPMENT_SLOTS, INVENTORY_SLOTS, LOADOUT_SLOTS};

/// Block type name of empty space
pub const AIR: &str = "minecraft:air";

/// Opaque block state as produced and consumed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSnapshot {
    pub type_name: String,
    pub meta: u16,
    /// Serialized extended state (container contents, sign text)
    pub payload: Option<String>,
}

impl BlockSnapshot {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            meta: 0,
            payload: None,
        }
    }

    pub fn air() -> Self {
        Self::new(AIR)
    }

    pub fn with_meta(mut self, meta: u16) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn is_air(&self) -> bool {
        self.type_name == AIR
    }
}

/// Entity categories the host can clear from a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Item,
    Projectile,
    Vehicle,
    Prop,
    Tnt,
    Falling,
    Mob,
    Player,
    Unknown,
}

/// Block storage of the persistent world
pub trait WorldAdapter: Send {
    /// Read one block; `cheap` skips extracting the extended payload
    fn read_block(&self, at: &Location, cheap: bool) -> BlockSnapshot;

    fn write_block(&mut self, at: &Location, block: &BlockSnapshot);

    /// Remove every entity of `kind` inside `region`, returning how many were removed
    fn clear_entities(&mut self, region: &Cuboid, kind: EntityKind) -> usize;
}

/// Stable identity of a player across sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the core may ask of a connected player
pub trait PlayerSession: Send {
    fn id(&self) -> PlayerId;

    fn name(&self) -> String;

    fn is_online(&self) -> bool;

    fn location(&self) -> Location;

    fn teleport(&mut self, to: &Location);

    fn send_message(&mut self, message: &str);

    /// Block the player is looking at, if any is in reach
    fn target_block(&self) -> Option<Location>;

    /// Permission to build zones and enter them outside of a match
    fn is_zone_maker(&self) -> bool;

    /// Override a block in this player's view only
    fn set_local_block(&mut self, at: &Location, block: &BlockSnapshot);

    fn state(&self) -> PlayerState;

    fn set_state(&mut self, state: PlayerState);

    fn item_in_hand(&self) -> Option<Item>;
}
