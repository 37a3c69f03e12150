//! Items, inventories and player vitals

use serde::{Deserialize, Serialize};

/// General inventory slots (hotbar included)
pub const INVENTORY_SLOTS: usize = 36;
/// Helmet, chestplate, leggings, boots, off-hand
pub const EQUIPMENT_SLOTS: usize = 5;
/// Logical slot keys run 0..LOADOUT_SLOTS
pub const LOADOUT_SLOTS: usize = INVENTORY_SLOTS + EQUIPMENT_SLOTS;

pub const HELMET_SLOT: usize = 36;
pub const CHESTPLATE_SLOT: usize = 37;
pub const LEGGINGS_SLOT: usize = 38;
pub const BOOTS_SLOT: usize = 39;
pub const OFF_HAND_SLOT: usize = 40;

const NAMESPACE: &str = "minecraft:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub type_name: String,
    /// Serialized extra data, opaque to the core
    pub data: String,
    pub count: u32,
}

impl Item {
    pub fn new(type_name: impl Into<String>, count: u32) -> Self {
        Self {
            type_name: type_name.into(),
            data: String::new(),
            count,
        }
    }

    /// Human readable name with an indefinite article, e.g. "an iron sword"
    pub fn display_name(&self) -> String {
        let bare = self
            .type_name
            .strip_prefix(NAMESPACE)
            .unwrap_or(&self.type_name)
            .replace('_', " ")
            .to_lowercase();
        let article = match bare.chars().next() {
            Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
            _ => "a",
        };
        format!("{article} {bare}")
    }
}

/// A full inventory: 36 general slots plus five equipment slots
#[derive(Debug, Clone, PartialEq)]
pub struct Loadout {
    slots: Vec<Option<Item>>,
}

impl Loadout {
    pub fn empty() -> Self {
        Self {
            slots: vec![None; LOADOUT_SLOTS],
        }
    }

    /// Item at a logical slot key (0..=35 general, 36..=40 equipment)
    pub fn get(&self, slot: usize) -> Option<&Item> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Returns false when `slot` is not a valid logical key
    pub fn set(&mut self, slot: usize, item: Option<Item>) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry) => {
                *entry = item;
                true
            }
            None => false,
        }
    }

    pub fn helmet(&self) -> Option<&Item> {
        self.get(HELMET_SLOT)
    }

    pub fn chestplate(&self) -> Option<&Item> {
        self.get(CHESTPLATE_SLOT)
    }

    pub fn leggings(&self) -> Option<&Item> {
        self.get(LEGGINGS_SLOT)
    }

    pub fn boots(&self) -> Option<&Item> {
        self.get(BOOTS_SLOT)
    }

    pub fn off_hand(&self) -> Option<&Item> {
        self.get(OFF_HAND_SLOT)
    }

    /// Occupied slots with their logical keys
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &Item)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, item)| item.as_ref().map(|item| (slot, item)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl Default for Loadout {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

/// Everything captured before a player joins a match and restored when they leave
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub game_mode: GameMode,
    pub inventory: Loadout,
    pub health: f64,
    pub exhaustion: f32,
    pub saturation: f32,
    pub food_level: u32,
    pub level: u32,
    pub experience: f32,
    pub flying: bool,
}

impl PlayerState {
    /// Fresh survival state carrying `inventory`
    pub fn clean(inventory: Loadout) -> Self {
        Self {
            game_mode: GameMode::Survival,
            inventory,
            health: 20.0,
            exhaustion: 0.0,
            saturation: 0.0,
            food_level: 20,
            level: 0,
            experience: 0.0,
            flying: false,
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::clean(Loadout::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_strips_namespace_and_picks_article() {
        assert_eq!(Item::new("minecraft:iron_sword", 1).display_name(), "an iron sword");
        assert_eq!(Item::new("minecraft:BOW", 1).display_name(), "a bow");
        assert_eq!(Item::new("custom:Arrow", 1).display_name(), "a custom:arrow");
    }

    #[test]
    fn equipment_shares_slot_space() {
        let mut loadout = Loadout::empty();
        assert!(loadout.set(HELMET_SLOT, Some(Item::new("minecraft:iron_helmet", 1))));
        assert!(loadout.set(OFF_HAND_SLOT, Some(Item::new("minecraft:shield", 1))));
        assert!(!loadout.set(LOADOUT_SLOTS, Some(Item::new("minecraft:stone", 1))));

        assert_eq!(loadout.helmet().map(|i| i.type_name.as_str()), Some("minecraft:iron_helmet"));
        assert_eq!(loadout.occupied().map(|(slot, _)| slot).collect::<Vec<_>>(), vec![36, 40]);
    }
}
