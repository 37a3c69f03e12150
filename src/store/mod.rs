//! Per-zone persistent store
//!
//! Each zone has a data file holding the reference points, named inventory
//! loadouts and the zone's setting overrides, and a snapshot file holding the
//! blocks of the zone cuboid. The snapshot is only read while it is being
//! restored, and small edits never rewrite it.
//! `position1` is the only point stored in absolute form; every other point is
//! kept relative to it, so moving `position1` moves the whole zone.

pub mod format;
pub mod schema;
pub mod tables;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::geom::{Cuboid, Location};
use crate::host::{BlockSnapshot, Item, Loadout, WorldAdapter, LOADOUT_SLOTS};
use crate::util::time::Timer;

use format::{Transaction, ZoneFile};
pub use schema::{MigrationReport, SCHEMA_VERSION};
use tables::{
    block_chunk, BlockIdRow, BlockRow, ItemRow, LabelRow, PointRow, SettingRow, BATCH_SIZE,
    BLOCKS, BLOCK_IDS, COORDINATES, INVENTORIES, INV_LABELS, SETTINGS,
};

/// File extension of zone data files
pub const ZONE_FILE_EXTENSION: &str = "warzone";
/// File extension of zone block snapshots
pub const SNAPSHOT_FILE_EXTENSION: &str = "blocks";
/// Name of the absolute origin point
pub const ORIGIN_POINT: &str = "position1";
/// A save still running after this long is reported, and again at each further interval
pub const PROGRESS_INTERVAL_MS: u64 = 5_000;

/// Zone store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a zone data file", .0.display())]
    NotAZoneFile(PathBuf),

    #[error("Zone data is corrupt: {0}")]
    Corrupt(String),

    #[error("Zone data checksum mismatch (expected {expected:#010x}, found {found:#010x})")]
    Checksum { expected: u32, found: u32 },

    #[error("Failed to decode table {table}: {message}")]
    Decode { table: String, message: String },

    #[error("Unsupported zone version: {found}. Current version: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("No migration path from zone version {0}")]
    UnknownMigration(u32),

    #[error("Zone table {0} is missing")]
    MissingTable(String),

    #[error("Zone has no {0} point")]
    MissingPoint(String),
}

/// Result of a snapshot save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotStats {
    pub blocks: usize,
    pub block_types: usize,
    pub chunks: u32,
    pub elapsed_ms: u64,
}

/// Exclusive handle on one zone's data and snapshot files
#[derive(Debug)]
pub struct ZoneStore {
    zone: String,
    path: PathBuf,
    snapshot_path: PathBuf,
    file: ZoneFile,
    /// Insertion ordered; team enumeration order follows it
    points: Vec<PointRow>,
    settings: Vec<SettingRow>,
    cache: RefCell<HashMap<String, Location>>,
}

impl ZoneStore {
    pub fn file_path(dir: &Path, zone: &str) -> PathBuf {
        dir.join(format!("{zone}.{ZONE_FILE_EXTENSION}"))
    }

    pub fn snapshot_file_path(dir: &Path, zone: &str) -> PathBuf {
        dir.join(format!("{zone}.{SNAPSHOT_FILE_EXTENSION}"))
    }

    /// Open (creating if needed) and upgrade the data file of `zone`
    pub fn open(dir: &Path, zone: &str) -> Result<Self, StoreError> {
        let path = Self::file_path(dir, zone);
        let snapshot_path = Self::snapshot_file_path(dir, zone);
        let mut file = ZoneFile::read(&path)?;
        let mut snapshot = ZoneFile::empty();
        let migrated = schema::upgrade(&mut file, &mut snapshot)?;
        let created_settings = file.ensure_table(SETTINGS, &Vec::<SettingRow>::new());

        // snapshot first: until the data file is rewritten the old layout is migrated again
        if migrated.is_some() && snapshot.has_table(BLOCKS) {
            snapshot.commit(&snapshot_path, Transaction::new())?;
        }
        if migrated.is_some() || created_settings {
            file.commit(&path, Transaction::new())?;
        }
        if let Some(report) = &migrated {
            info!(
                zone,
                from = report.from_version,
                to = report.to_version,
                "Upgraded zone store"
            );
        }

        let points = file.table(COORDINATES)?;
        let settings = file.table(SETTINGS)?;
        debug!(zone, path = %path.display(), "Opened zone store");

        Ok(Self {
            zone: zone.to_string(),
            path,
            snapshot_path,
            file,
            points,
            settings,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn schema_version(&self) -> u32 {
        self.file.version
    }

    /// Release the store, handing back whichever of its files exist for relocation
    pub fn close(self) -> Vec<PathBuf> {
        debug!(zone = %self.zone, "Closed zone store");
        [self.path, self.snapshot_path]
            .into_iter()
            .filter(|path| path.exists())
            .collect()
    }

    fn read_snapshot(&self) -> Result<ZoneFile, StoreError> {
        let snapshot = ZoneFile::read(&self.snapshot_path)?;
        if snapshot.version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: snapshot.version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Reference points
    // ------------------------------------------------------------------

    /// Absolute location of a named point
    pub fn resolve_point(&self, name: &str) -> Result<Option<Location>, StoreError> {
        if let Some(hit) = self.cache.borrow().get(name) {
            return Ok(Some(hit.clone()));
        }

        let Some(row) = self.points.iter().find(|p| p.name == name) else {
            return Ok(None);
        };
        let stored = point_location(row);
        let resolved = if name == ORIGIN_POINT {
            stored
        } else {
            self.origin()?.add(&stored)
        };

        self.cache
            .borrow_mut()
            .insert(name.to_string(), resolved.clone());
        Ok(Some(resolved))
    }

    pub fn has_point(&self, name: &str) -> bool {
        self.points.iter().any(|p| p.name == name)
    }

    /// Insert or update a point given in absolute coordinates
    pub fn set_point(&mut self, name: &str, at: &Location) -> Result<(), StoreError> {
        let stored = if name == ORIGIN_POINT {
            at.clone()
        } else {
            self.to_relative(at)?
        };
        let row = PointRow {
            name: name.to_string(),
            x: stored.x,
            y: stored.y,
            z: stored.z,
            pitch: stored.pitch,
            yaw: stored.yaw,
            world: stored.world,
        };

        let mut points = self.points.clone();
        match points.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = row,
            None => points.push(row),
        }
        self.write_points(points)
    }

    /// Returns whether the point existed
    pub fn delete_point(&mut self, name: &str) -> Result<bool, StoreError> {
        if !self.has_point(name) {
            return Ok(false);
        }
        let points = self.points.iter().filter(|p| p.name != name).cloned().collect();
        self.write_points(points)?;
        Ok(true)
    }

    /// Point names in insertion order
    pub fn point_names(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.name.as_str())
    }

    /// Point names starting with `prefix`, prefix stripped, in insertion order
    pub fn points_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.point_names()
            .filter_map(move |name| name.strip_prefix(prefix))
            .filter(|rest| !rest.is_empty())
    }

    pub fn to_absolute(&self, relative: &Location) -> Result<Location, StoreError> {
        Ok(self.origin()?.add(relative))
    }

    pub fn to_relative(&self, absolute: &Location) -> Result<Location, StoreError> {
        Ok(absolute.sub(&self.origin()?))
    }

    /// Cuboid spanned by `position1` and `position2`, when both are set
    pub fn cuboid(&self) -> Result<Option<Cuboid>, StoreError> {
        let (Some(a), Some(b)) = (self.resolve_point(ORIGIN_POINT)?, self.resolve_point("position2")?)
        else {
            return Ok(None);
        };
        Ok(Some(Cuboid::new(&a, &b)))
    }

    fn origin(&self) -> Result<Location, StoreError> {
        self.points
            .iter()
            .find(|p| p.name == ORIGIN_POINT)
            .map(point_location)
            .ok_or_else(|| StoreError::MissingPoint(ORIGIN_POINT.to_string()))
    }

    fn write_points(&mut self, points: Vec<PointRow>) -> Result<(), StoreError> {
        let mut txn = Transaction::new();
        txn.put(COORDINATES, &points);
        self.file.commit(&self.path, txn)?;
        self.points = points;
        self.cache.borrow_mut().clear();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Block snapshot
    // ------------------------------------------------------------------

    /// Replace the stored snapshot with the current contents of the zone cuboid
    pub fn save_snapshot(&mut self, world: &dyn WorldAdapter) -> Result<SnapshotStats, StoreError> {
        let cuboid = self
            .cuboid()?
            .ok_or_else(|| StoreError::MissingPoint("position2".to_string()))?;
        let origin = self.origin()?.block();
        let timer = Timer::new();
        let mut next_report = PROGRESS_INTERVAL_MS;

        // the snapshot file is rewritten whole, so stale chunks cannot survive
        let mut txn = Transaction::new();

        let mut ids: HashMap<String, u32> = HashMap::new();
        let mut id_rows: Vec<BlockIdRow> = Vec::new();
        let mut batch: Vec<BlockRow> = Vec::with_capacity(BATCH_SIZE);
        let mut chunks: u32 = 0;
        let mut total = 0usize;

        for pos in cuboid.blocks() {
            let block = world.read_block(&Location::at_block(pos, cuboid.world()), false);
            let id = match ids.get(&block.type_name) {
                Some(id) => *id,
                None => {
                    let id = id_rows.len() as u32;
                    ids.insert(block.type_name.clone(), id);
                    id_rows.push(BlockIdRow {
                        id,
                        name: block.type_name,
                    });
                    id
                }
            };
            batch.push(BlockRow {
                x: pos.x - origin.x,
                y: pos.y - origin.y,
                z: pos.z - origin.z,
                id,
                meta: block.meta,
                data: block.payload,
            });
            total += 1;

            if batch.len() == BATCH_SIZE {
                txn.put(&block_chunk(chunks), &batch);
                chunks += 1;
                batch.clear();

                if timer.elapsed_ms() >= next_report {
                    info!(
                        zone = %self.zone,
                        blocks = total,
                        "Still saving zone {}, {:.2} seconds elapsed.",
                        self.zone,
                        timer.elapsed_secs_f64()
                    );
                    next_report += PROGRESS_INTERVAL_MS;
                }
            }
        }
        if !batch.is_empty() {
            txn.put(&block_chunk(chunks), &batch);
            chunks += 1;
        }
        txn.put(BLOCKS, &chunks);
        txn.put(BLOCK_IDS, &id_rows);
        ZoneFile::with_version(SCHEMA_VERSION).commit(&self.snapshot_path, txn)?;

        let stats = SnapshotStats {
            blocks: total,
            block_types: id_rows.len(),
            chunks,
            elapsed_ms: timer.elapsed_ms(),
        };
        info!(
            zone = %self.zone,
            blocks = stats.blocks,
            block_types = stats.block_types,
            elapsed_ms = stats.elapsed_ms,
            "Saved zone snapshot"
        );
        Ok(stats)
    }

    /// Write the stored snapshot back into the world, one chunk at a time
    pub fn load_snapshot(&self, world: &mut dyn WorldAdapter) -> Result<usize, StoreError> {
        let origin = self.origin()?;
        let base = origin.block();
        let snapshot = self.read_snapshot()?;
        let names: HashMap<u32, String> = snapshot
            .table::<Vec<BlockIdRow>>(BLOCK_IDS)?
            .into_iter()
            .map(|row| (row.id, row.name))
            .collect();
        let chunks: u32 = snapshot.table(BLOCKS)?;

        let mut applied = 0usize;
        for index in 0..chunks {
            let rows: Vec<BlockRow> = snapshot.table(&block_chunk(index))?;
            for row in rows {
                let type_name = names.get(&row.id).ok_or_else(|| {
                    StoreError::Corrupt(format!("block type id {} has no name", row.id))
                })?;
                let at = Location::new(
                    f64::from(base.x + row.x),
                    f64::from(base.y + row.y),
                    f64::from(base.z + row.z),
                    origin.world.clone(),
                );
                world.write_block(
                    &at,
                    &BlockSnapshot {
                        type_name: type_name.clone(),
                        meta: row.meta,
                        payload: row.data,
                    },
                );
                applied += 1;
            }
        }
        Ok(applied)
    }

    // ------------------------------------------------------------------
    // Loadouts
    // ------------------------------------------------------------------

    pub fn loadout_labels(&self) -> Result<Vec<String>, StoreError> {
        let labels: Vec<LabelRow> = self.file.table(INV_LABELS)?;
        Ok(labels.into_iter().map(|l| l.label).collect())
    }

    /// Store `loadout` under `label`, replacing any previous one
    pub fn save_loadout(&mut self, label: &str, loadout: &Loadout) -> Result<(), StoreError> {
        let mut labels: Vec<LabelRow> = self.file.table(INV_LABELS)?;
        let mut items: Vec<ItemRow> = self.file.table(INVENTORIES)?;

        let inv_id = match labels.iter().find(|l| l.label == label) {
            Some(existing) => existing.id,
            None => {
                let id = labels.iter().map(|l| l.id + 1).max().unwrap_or(0);
                labels.push(LabelRow {
                    id,
                    label: label.to_string(),
                });
                id
            }
        };
        items.retain(|row| row.inv_id != inv_id);
        items.extend(loadout.occupied().map(|(slot, item)| ItemRow {
            inv_id,
            slot: slot as u32,
            name: item.type_name.clone(),
            data: item.data.clone(),
            count: item.count,
        }));

        let mut txn = Transaction::new();
        txn.put(INV_LABELS, &labels);
        txn.put(INVENTORIES, &items);
        self.file.commit(&self.path, txn)
    }

    pub fn load_loadout(&self, label: &str) -> Result<Option<Loadout>, StoreError> {
        let labels: Vec<LabelRow> = self.file.table(INV_LABELS)?;
        let Some(inv_id) = labels.iter().find(|l| l.label == label).map(|l| l.id) else {
            return Ok(None);
        };

        let items: Vec<ItemRow> = self.file.table(INVENTORIES)?;
        let mut loadout = Loadout::empty();
        for row in items.into_iter().filter(|row| row.inv_id == inv_id) {
            let slot = row.slot as usize;
            if slot >= LOADOUT_SLOTS {
                return Err(StoreError::Corrupt(format!("loadout slot {slot} out of range")));
            }
            loadout.set(
                slot,
                Some(Item {
                    type_name: row.name,
                    data: row.data,
                    count: row.count,
                }),
            );
        }
        Ok(Some(loadout))
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn setting(&self, option: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|s| s.option == option)
            .map(|s| s.value.as_str())
    }

    pub fn put_setting(&mut self, option: &str, value: &str) -> Result<(), StoreError> {
        let mut settings = self.settings.clone();
        match settings.iter_mut().find(|s| s.option == option) {
            Some(existing) => existing.value = value.to_string(),
            None => settings.push(SettingRow {
                option: option.to_string(),
                value: value.to_string(),
            }),
        }

        let mut txn = Transaction::new();
        txn.put(SETTINGS, &settings);
        self.file.commit(&self.path, txn)?;
        self.settings = settings;
        Ok(())
    }
}

fn point_location(row: &PointRow) -> Location {
    Location::new(row.x, row.y, row.z, row.world.clone()).with_orientation(row.pitch, row.yaw)
}
