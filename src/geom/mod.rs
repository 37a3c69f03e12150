//! World coordinates and axis-aligned regions

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in a named world with a view orientation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub world: String,
    pub pitch: f64,
    pub yaw: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64, world: impl Into<String>) -> Self {
        Self {
            x,
            y,
            z,
            world: world.into(),
            pitch: 0.0,
            yaw: 0.0,
        }
    }

    pub fn with_orientation(mut self, pitch: f64, yaw: f64) -> Self {
        self.pitch = pitch;
        self.yaw = yaw;
        self
    }

    /// Location of the block cell at integer coordinates
    pub fn at_block(pos: BlockPos, world: impl Into<String>) -> Self {
        Self::new(pos.x as f64, pos.y as f64, pos.z as f64, world)
    }

    /// Component-wise sum, keeping this location's world
    pub fn add(&self, other: &Location) -> Location {
        Location {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            world: self.world.clone(),
            pitch: self.pitch + other.pitch,
            yaw: self.yaw + other.yaw,
        }
    }

    /// Component-wise difference, keeping this location's world
    pub fn sub(&self, other: &Location) -> Location {
        Location {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
            world: self.world.clone(),
            pitch: self.pitch - other.pitch,
            yaw: self.yaw - other.yaw,
        }
    }

    /// Integer block cell containing this location
    pub fn block(&self) -> BlockPos {
        BlockPos {
            x: self.x.floor() as i32,
            y: self.y.floor() as i32,
            z: self.z.floor() as i32,
        }
    }

    /// Same block cell in the same world
    pub fn same_block(&self, other: &Location) -> bool {
        self.world == other.world && self.block() == other.block()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x: {}, y: {}, z: {}", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Axis-aligned box of block cells spanned by two corners given in any order
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    world: String,
    min: BlockPos,
    max: BlockPos,
}

impl Cuboid {
    pub fn new(corner1: &Location, corner2: &Location) -> Self {
        let a = corner1.block();
        let b = corner2.block();
        Self {
            world: corner1.world.clone(),
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn min(&self) -> BlockPos {
        self.min
    }

    pub fn max(&self) -> BlockPos {
        self.max
    }

    pub fn min_location(&self) -> Location {
        Location::at_block(self.min, self.world.clone())
    }

    pub fn max_location(&self) -> Location {
        Location::at_block(self.max, self.world.clone())
    }

    pub fn size_x(&self) -> i64 {
        i64::from(self.max.x) - i64::from(self.min.x) + 1
    }

    pub fn size_y(&self) -> i64 {
        i64::from(self.max.y) - i64::from(self.min.y) + 1
    }

    pub fn size_z(&self) -> i64 {
        i64::from(self.max.z) - i64::from(self.min.z) + 1
    }

    /// Number of block cells
    pub fn volume(&self) -> u64 {
        (self.size_x() * self.size_y() * self.size_z()) as u64
    }

    pub fn contains(&self, at: &Location) -> bool {
        at.world == self.world && self.contains_block(at.block())
    }

    pub fn contains_block(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Whether the two boxes share at least one cell
    pub fn intersects(&self, other: &Cuboid) -> bool {
        self.world == other.world
            && self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    /// Every cell, outer axis X, then Y, then Z
    pub fn blocks(&self) -> impl Iterator<Item = BlockPos> + '_ {
        let (min, max) = (self.min, self.max);
        (min.x..=max.x).flat_map(move |x| {
            (min.y..=max.y).flat_map(move |y| (min.z..=max.z).map(move |z| BlockPos::new(x, y, z)))
        })
    }

    /// Cells on the outer shell within `radius` blocks (per axis) of `around`
    pub fn shell_near(&self, around: BlockPos, radius: i32) -> Vec<BlockPos> {
        let lo = BlockPos::new(
            (around.x - radius).max(self.min.x),
            (around.y - radius).max(self.min.y),
            (around.z - radius).max(self.min.z),
        );
        let hi = BlockPos::new(
            (around.x + radius).min(self.max.x),
            (around.y + radius).min(self.max.y),
            (around.z + radius).min(self.max.z),
        );
        if lo.x > hi.x || lo.y > hi.y || lo.z > hi.z {
            return Vec::new();
        }

        let mut cells = Vec::new();
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    let on_shell = x == self.min.x
                        || x == self.max.x
                        || y == self.min.y
                        || y == self.max.y
                        || z == self.min.z
                        || z == self.max.z;
                    if on_shell {
                        cells.push(BlockPos::new(x, y, z));
                    }
                }
            }
        }
        cells
    }
}

impl fmt::Display for Cuboid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.size_x(), self.size_y(), self.size_z())
    }
}
