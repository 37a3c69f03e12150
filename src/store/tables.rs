//! Row types of the zone store tables

use bitcode::{Decode, Encode};

pub const COORDINATES: &str = "coordinates";
pub const BLOCK_IDS: &str = "block_ids";
/// Holds the number of block chunks; rows live in `blocks/<n>`
pub const BLOCKS: &str = "blocks";
pub const INV_LABELS: &str = "inv_labels";
pub const INVENTORIES: &str = "inventories";
pub const SETTINGS: &str = "settings";

/// Block rows per chunk section
pub const BATCH_SIZE: usize = 10_000;

pub fn block_chunk(index: u32) -> String {
    format!("{BLOCKS}/{index}")
}

/// Tables that live in the separate snapshot file
pub fn is_snapshot_table(name: &str) -> bool {
    name == BLOCK_IDS || name == BLOCKS || name.starts_with("blocks/")
}

/// Named reference point; absolute for `position1`, relative to it otherwise
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PointRow {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub world: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BlockIdRow {
    pub id: u32,
    pub name: String,
}

/// One cell, relative to `position1`
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct BlockRow {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub id: u32,
    pub meta: u16,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct LabelRow {
    pub id: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ItemRow {
    pub inv_id: u32,
    pub slot: u32,
    pub name: String,
    pub data: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SettingRow {
    pub option: String,
    pub value: String,
}
