//! Acceptance rules for zone names and extents

use crate::geom::Cuboid;

pub const MIN_SIZE_X: i64 = 5;
pub const MIN_SIZE_Y: i64 = 4;
pub const MIN_SIZE_Z: i64 = 5;

/// Characters that would escape the data directory or break a URL segment
const FORBIDDEN: [char; 3] = ['.', '/', '%'];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name `{0}' is invalid for a warzone.")]
    InvalidName(String),

    #[error("Zone dimensions {dimensions} are invalid. Zones must be at least 5x4x5 and at most {max_volume} blocks.")]
    InvalidDimensions { dimensions: String, max_volume: u64 },

    #[error("Zone overlaps warzone {0}.")]
    Overlaps(String),
}

/// Stateless rule set; only the volume ceiling is configurable
#[derive(Debug, Clone, Copy)]
pub struct ZoneValidator {
    max_zone_size: u64,
}

impl ZoneValidator {
    pub fn new(max_zone_size: u64) -> Self {
        Self { max_zone_size }
    }

    pub fn validate_name(&self, name: &str) -> Result<(), ValidationError> {
        if name.is_empty() || name.contains(FORBIDDEN) {
            return Err(ValidationError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    pub fn validate_dimensions(&self, cuboid: &Cuboid) -> Result<(), ValidationError> {
        let too_small = cuboid.size_x() < MIN_SIZE_X
            || cuboid.size_y() < MIN_SIZE_Y
            || cuboid.size_z() < MIN_SIZE_Z;
        if too_small || cuboid.volume() > self.max_zone_size {
            return Err(ValidationError::InvalidDimensions {
                dimensions: cuboid.to_string(),
                max_volume: self.max_zone_size,
            });
        }
        Ok(())
    }

    /// Zones may touch or stack but never share a block
    pub fn validate_location<'a>(
        &self,
        cuboid: &Cuboid,
        existing: impl IntoIterator<Item = (&'a str, Cuboid)>,
    ) -> Result<(), ValidationError> {
        for (name, other) in existing {
            if cuboid.intersects(&other) {
                return Err(ValidationError::Overlaps(name.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Location;

    fn cuboid(a: (f64, f64, f64), b: (f64, f64, f64)) -> Cuboid {
        Cuboid::new(&Location::new(a.0, a.1, a.2, "world"), &Location::new(b.0, b.1, b.2, "world"))
    }

    #[test]
    fn names_with_path_characters_are_rejected() {
        let validator = ZoneValidator::new(1_000_000);
        for bad in ["a/b", "../x", "100%", "zone.db", ""] {
            assert!(validator.validate_name(bad).is_err(), "{bad:?} accepted");
        }
        assert!(validator.validate_name("arena1").is_ok());
        assert!(validator.validate_name("Capture_The-Flag").is_ok());
    }

    #[test]
    fn minimum_extents() {
        let validator = ZoneValidator::new(1_000_000);

        assert!(validator.validate_dimensions(&cuboid((0.0, 0.0, 0.0), (3.0, 3.0, 3.0))).is_err());
        assert!(validator.validate_dimensions(&cuboid((0.0, 0.0, 0.0), (4.0, 3.0, 4.0))).is_ok());
        assert!(validator.validate_dimensions(&cuboid((0.0, 0.0, 0.0), (4.0, 2.0, 4.0))).is_err());
        assert!(validator.validate_dimensions(&cuboid((0.0, 0.0, 0.0), (25.0, 64.0, 25.0))).is_ok());
    }

    #[test]
    fn volume_ceiling_applies_regardless_of_axes() {
        let validator = ZoneValidator::new(1_000);
        // 10x10x10 is exactly at the ceiling
        assert!(validator.validate_dimensions(&cuboid((0.0, 0.0, 0.0), (9.0, 9.0, 9.0))).is_ok());
        let err = validator
            .validate_dimensions(&cuboid((0.0, 0.0, 0.0), (10.0, 9.0, 9.0)))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidDimensions {
                dimensions: "11x10x10".into(),
                max_volume: 1_000
            }
        );
    }

    #[test]
    fn stacked_zones_are_valid_clipped_zones_are_not() {
        let validator = ZoneValidator::new(1_000_000);
        let existing = cuboid((0.0, 0.0, 0.0), (9.0, 9.0, 9.0));

        let stacked = cuboid((0.0, 10.0, 0.0), (9.0, 19.0, 9.0));
        assert!(validator.validate_location(&stacked, [("arena", existing.clone())]).is_ok());

        let clipped = cuboid((9.0, 0.0, 0.0), (18.0, 9.0, 9.0));
        assert_eq!(
            validator.validate_location(&clipped, [("arena", existing)]),
            Err(ValidationError::Overlaps("arena".into()))
        );
    }
}
