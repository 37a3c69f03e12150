//! In-memory host used by the headless server and by tests
//!
//! Both types are cheap cloneable handles over shared state, so a caller can
//! hand one clone to the core and keep another to observe what happened.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{BlockSnapshot, EntityKind, Item, PlayerId, PlayerSession, PlayerState, WorldAdapter};
use crate::geom::{BlockPos, Cuboid, Location};

#[derive(Debug, Default)]
struct WorldData {
    blocks: HashMap<(String, BlockPos), BlockSnapshot>,
    entities: Vec<(Location, EntityKind)>,
}

/// Sparse block world; unset cells read as air
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    inner: Arc<Mutex<WorldData>>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_at(&self, at: &Location) -> BlockSnapshot {
        self.read_block(at, false)
    }

    pub fn set_block(&self, at: &Location, block: BlockSnapshot) {
        let mut data = self.inner.lock();
        let key = (at.world.clone(), at.block());
        if block.is_air() {
            data.blocks.remove(&key);
        } else {
            data.blocks.insert(key, block);
        }
    }

    pub fn spawn_entity(&self, at: Location, kind: EntityKind) {
        self.inner.lock().entities.push((at, kind));
    }

    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.inner.lock().entities.iter().filter(|(_, k)| *k == kind).count()
    }

    /// Non-air cells currently stored
    pub fn solid_blocks(&self) -> usize {
        self.inner.lock().blocks.len()
    }
}

impl WorldAdapter for MemoryWorld {
    fn read_block(&self, at: &Location, cheap: bool) -> BlockSnapshot {
        let data = self.inner.lock();
        match data.blocks.get(&(at.world.clone(), at.block())) {
            Some(block) if cheap => BlockSnapshot {
                payload: None,
                ..block.clone()
            },
            Some(block) => block.clone(),
            None => BlockSnapshot::air(),
        }
    }

    fn write_block(&mut self, at: &Location, block: &BlockSnapshot) {
        self.set_block(at, block.clone());
    }

    fn clear_entities(&mut self, region: &Cuboid, kind: EntityKind) -> usize {
        let mut data = self.inner.lock();
        let before = data.entities.len();
        data.entities
            .retain(|(at, k)| !(*k == kind && region.contains(at)));
        before - data.entities.len()
    }
}

#[derive(Debug)]
struct PlayerData {
    id: PlayerId,
    name: String,
    online: bool,
    location: Location,
    messages: Vec<String>,
    target: Option<Location>,
    zone_maker: bool,
    local_blocks: HashMap<BlockPos, BlockSnapshot>,
    state: PlayerState,
    item_in_hand: Option<Item>,
}

/// A scripted player
#[derive(Debug, Clone)]
pub struct MemorySession {
    inner: Arc<Mutex<PlayerData>>,
}

impl MemorySession {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlayerData {
                id: PlayerId::new_v4(),
                name: name.into(),
                online: true,
                location,
                messages: Vec::new(),
                target: None,
                zone_maker: false,
                local_blocks: HashMap::new(),
                state: PlayerState::default(),
                item_in_hand: None,
            })),
        }
    }

    pub fn zone_maker(self) -> Self {
        self.inner.lock().zone_maker = true;
        self
    }

    pub fn set_online(&self, online: bool) {
        self.inner.lock().online = online;
    }

    /// Move without going through the core, as the host would before raising a movement event
    pub fn place(&self, at: Location) {
        self.inner.lock().location = at;
    }

    pub fn aim_at(&self, target: Option<Location>) {
        self.inner.lock().target = target;
    }

    pub fn hold(&self, item: Option<Item>) {
        self.inner.lock().item_in_hand = item;
    }

    pub fn put_state(&self, state: PlayerState) {
        self.inner.lock().state = state;
    }

    pub fn messages(&self) -> Vec<String> {
        self.inner.lock().messages.clone()
    }

    pub fn last_message(&self) -> Option<String> {
        self.inner.lock().messages.last().cloned()
    }

    pub fn clear_messages(&self) {
        self.inner.lock().messages.clear();
    }

    pub fn local_block(&self, at: BlockPos) -> Option<BlockSnapshot> {
        self.inner.lock().local_blocks.get(&at).cloned()
    }

    pub fn local_block_count(&self) -> usize {
        self.inner.lock().local_blocks.len()
    }
}

impl PlayerSession for MemorySession {
    fn id(&self) -> PlayerId {
        self.inner.lock().id
    }

    fn name(&self) -> String {
        self.inner.lock().name.clone()
    }

    fn is_online(&self) -> bool {
        self.inner.lock().online
    }

    fn location(&self) -> Location {
        self.inner.lock().location.clone()
    }

    fn teleport(&mut self, to: &Location) {
        self.inner.lock().location = to.clone();
    }

    fn send_message(&mut self, message: &str) {
        self.inner.lock().messages.push(message.to_string());
    }

    fn target_block(&self) -> Option<Location> {
        self.inner.lock().target.clone()
    }

    fn is_zone_maker(&self) -> bool {
        self.inner.lock().zone_maker
    }

    fn set_local_block(&mut self, at: &Location, block: &BlockSnapshot) {
        let mut data = self.inner.lock();
        // unmasking writes back air, which drops the override
        if block.is_air() {
            data.local_blocks.remove(&at.block());
        } else {
            data.local_blocks.insert(at.block(), block.clone());
        }
    }

    fn state(&self) -> PlayerState {
        self.inner.lock().state.clone()
    }

    fn set_state(&mut self, state: PlayerState) {
        self.inner.lock().state = state;
    }

    fn item_in_hand(&self) -> Option<Item> {
        self.inner.lock().item_in_hand.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_cells_read_as_air() {
        let world = MemoryWorld::new();
        assert!(world.block_at(&Location::new(1.0, 2.0, 3.0, "world")).is_air());
    }

    #[test]
    fn cheap_reads_drop_payload() {
        let world = MemoryWorld::new();
        let at = Location::new(0.0, 0.0, 0.0, "world");
        world.set_block(&at, BlockSnapshot::new("minecraft:chest").with_payload("{items:[]}"));

        assert!(world.read_block(&at, true).payload.is_none());
        assert!(world.read_block(&at, false).payload.is_some());
    }

    #[test]
    fn clear_entities_respects_kind_and_region() {
        let mut world = MemoryWorld::new();
        let region = Cuboid::new(&Location::new(0.0, 0.0, 0.0, "world"), &Location::new(4.0, 4.0, 4.0, "world"));
        world.spawn_entity(Location::new(1.0, 1.0, 1.0, "world"), EntityKind::Item);
        world.spawn_entity(Location::new(1.0, 1.0, 1.0, "world"), EntityKind::Mob);
        world.spawn_entity(Location::new(9.0, 1.0, 1.0, "world"), EntityKind::Item);

        assert_eq!(world.clear_entities(&region, EntityKind::Item), 1);
        assert_eq!(world.entity_count(EntityKind::Item), 1);
        assert_eq!(world.entity_count(EntityKind::Mob), 1);
    }
}
