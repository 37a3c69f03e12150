//! Zone store schema versions and upgrades
//!
//! Each step upgrades a file from exactly `from_version` to `from_version + 1`.
//! Steps must be contiguous from 0 to [`SCHEMA_VERSION`]. A step sees both the
//! zone file and the snapshot file, since version 3 moved the block tables out.

use tracing::info;

use super::format::ZoneFile;
use super::tables::{
    is_snapshot_table, BlockIdRow, ItemRow, LabelRow, PointRow, BLOCKS, BLOCK_IDS, COORDINATES,
    INVENTORIES, INV_LABELS,
};
use super::StoreError;

/// Schema version written by this build
pub const SCHEMA_VERSION: u32 = 3;

struct MigrationStep {
    from_version: u32,
    description: &'static str,
    apply: fn(&mut ZoneFile, &mut ZoneFile),
}

const STEPS: &[MigrationStep] = &[
    MigrationStep {
        from_version: 0,
        description: "coordinates, block ids and blocks",
        apply: create_zone_tables,
    },
    MigrationStep {
        from_version: 1,
        description: "inventory labels and items",
        apply: create_inventory_tables,
    },
    MigrationStep {
        from_version: 2,
        description: "block snapshot in its own file",
        apply: split_snapshot,
    },
];

fn create_zone_tables(file: &mut ZoneFile, _snapshot: &mut ZoneFile) {
    file.ensure_table(COORDINATES, &Vec::<PointRow>::new());
    file.ensure_table(BLOCK_IDS, &Vec::<BlockIdRow>::new());
    file.ensure_table(BLOCKS, &0u32);
}

fn create_inventory_tables(file: &mut ZoneFile, _snapshot: &mut ZoneFile) {
    file.ensure_table(INV_LABELS, &Vec::<LabelRow>::new());
    file.ensure_table(INVENTORIES, &Vec::<ItemRow>::new());
}

fn split_snapshot(file: &mut ZoneFile, snapshot: &mut ZoneFile) {
    file.split_off(snapshot, is_snapshot_table);
    snapshot.ensure_table(BLOCK_IDS, &Vec::<BlockIdRow>::new());
    snapshot.ensure_table(BLOCKS, &0u32);
}

/// Outcome of bringing a file up to [`SCHEMA_VERSION`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    pub steps_applied: Vec<&'static str>,
}

/// Upgrade `file` in memory, filling `snapshot` with any tables moved out of it;
/// `None` when it was already current
pub fn upgrade(file: &mut ZoneFile, snapshot: &mut ZoneFile) -> Result<Option<MigrationReport>, StoreError> {
    if file.version > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: file.version,
            supported: SCHEMA_VERSION,
        });
    }
    if file.version == SCHEMA_VERSION {
        return Ok(None);
    }

    let from_version = file.version;
    let mut steps_applied = Vec::new();
    while file.version < SCHEMA_VERSION {
        let step = STEPS
            .iter()
            .find(|s| s.from_version == file.version)
            .ok_or(StoreError::UnknownMigration(file.version))?;
        (step.apply)(file, snapshot);
        file.version = step.from_version + 1;
        steps_applied.push(step.description);
    }
    snapshot.version = SCHEMA_VERSION;

    info!(from_version, to_version = SCHEMA_VERSION, steps = steps_applied.len(), "Migrated zone store");
    Ok(Some(MigrationReport {
        from_version,
        to_version: SCHEMA_VERSION,
        steps_applied,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tables::block_chunk;

    #[test]
    fn steps_are_contiguous_up_to_current() {
        for (i, step) in STEPS.iter().enumerate() {
            assert_eq!(step.from_version, i as u32);
        }
        assert_eq!(STEPS.len() as u32, SCHEMA_VERSION);
    }

    #[test]
    fn fresh_file_gets_every_table() {
        let mut file = ZoneFile::empty();
        let mut snapshot = ZoneFile::empty();
        let report = upgrade(&mut file, &mut snapshot).unwrap().unwrap();

        assert_eq!(report.from_version, 0);
        assert_eq!(report.steps_applied.len(), 3);
        assert_eq!(file.version, SCHEMA_VERSION);
        assert_eq!(snapshot.version, SCHEMA_VERSION);
        for table in [COORDINATES, INV_LABELS, INVENTORIES] {
            assert!(file.has_table(table), "{table} missing");
        }
        for table in [BLOCK_IDS, BLOCKS] {
            assert!(snapshot.has_table(table), "{table} missing from snapshot");
            assert!(!file.has_table(table), "{table} left in zone file");
        }
    }

    #[test]
    fn version_one_gains_inventory_tables_and_moves_blocks() {
        let mut file = ZoneFile::empty();
        create_zone_tables(&mut file, &mut ZoneFile::empty());
        file.ensure_table(&block_chunk(0), &Vec::<u32>::new());
        file.version = 1;
        let mut snapshot = ZoneFile::empty();

        let report = upgrade(&mut file, &mut snapshot).unwrap().unwrap();
        assert_eq!(
            report.steps_applied,
            vec!["inventory labels and items", "block snapshot in its own file"]
        );
        assert!(file.has_table(INVENTORIES));
        assert!(snapshot.has_table(&block_chunk(0)));
        assert!(!file.has_table(&block_chunk(0)));
    }

    #[test]
    fn current_file_is_untouched() {
        let mut file = ZoneFile::with_version(SCHEMA_VERSION);
        let mut snapshot = ZoneFile::empty();
        assert_eq!(upgrade(&mut file, &mut snapshot).unwrap(), None);
        assert_eq!(snapshot.table_names().count(), 0);
    }

    #[test]
    fn newer_file_is_refused() {
        let mut file = ZoneFile::with_version(SCHEMA_VERSION + 1);

        let err = upgrade(&mut file, &mut ZoneFile::empty()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedVersion { found, supported }
                if found == SCHEMA_VERSION + 1 && supported == SCHEMA_VERSION
        ));
    }
}
