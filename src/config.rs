//! Construction parameters for a [`SlotTable`](crate::SlotTable).

use crate::error::{Result, TableError};
use serde::{Deserialize, Serialize};

/// Initial capacity used by `SlotTable::new`.
pub const DEFAULT_INITIAL_CAPACITY: usize = 8;

/// Load factor used unless configured otherwise.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Largest number of primary slots a table may allocate.
pub const MAX_CAPACITY: usize = 1 << 30;

/// Smallest accepted load factor. Below it a handful of pairs would
/// demand a slot array many times their count.
pub const MIN_LOAD_FACTOR: f32 = 1.0 / 32.0;

/// Sizing parameters. Deserializable so callers can keep table tuning in
/// their own configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Requested number of primary slots; rounded up to a power of two.
    pub initial_capacity: usize,
    /// Fraction of capacity that may be filled before the table doubles.
    pub load_factor: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Config sized for `count` pairs at `load_factor`. The slot array is
    /// never pre-sized past the first power of two at or above `2 * count`;
    /// sparser load factors reach their size through normal growth.
    pub fn for_persisted(count: usize, load_factor: f32) -> Result<Self> {
        let cfg = Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            load_factor,
        };
        cfg.validate()?;
        let mut capacity = 1usize;
        while max_size_for(capacity, load_factor) < count && capacity < count.saturating_mul(2) {
            if capacity >= MAX_CAPACITY {
                return Err(TableError::invalid_argument(format!(
                    "{count} pairs exceed the maximum capacity"
                )));
            }
            capacity <<= 1;
        }
        Ok(cfg.initial_capacity(capacity))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.load_factor.is_finite() || self.load_factor < MIN_LOAD_FACTOR {
            return Err(TableError::invalid_argument(format!(
                "load factor must be finite and at least {}, got {}",
                MIN_LOAD_FACTOR, self.load_factor
            )));
        }
        if self.initial_capacity > MAX_CAPACITY {
            return Err(TableError::invalid_argument(format!(
                "initial capacity {} exceeds {}",
                self.initial_capacity, MAX_CAPACITY
            )));
        }
        Ok(())
    }

    /// Power-of-two slot count this config allocates.
    pub(crate) fn slot_capacity(&self) -> usize {
        self.initial_capacity.max(1).next_power_of_two()
    }
}

/// Resize threshold for `capacity` slots; always below `capacity`.
pub(crate) fn max_size_for(capacity: usize, load_factor: f32) -> usize {
    let scaled = (capacity as f64 * load_factor as f64).floor() as usize;
    scaled.min(capacity - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_size_leaves_a_free_slot() {
        assert_eq!(max_size_for(8, 0.75), 6);
        assert_eq!(max_size_for(16, 0.75), 12);
        assert_eq!(max_size_for(1, 0.75), 0);
        assert_eq!(max_size_for(8, 1.0), 7);
        assert_eq!(max_size_for(8, 4.0), 7);
    }

    #[test]
    fn validate_rejects_bad_load_factors() {
        for lf in [0.0, -1.0, 1e-6, MIN_LOAD_FACTOR / 2.0, f32::NAN, f32::INFINITY] {
            let r = TableConfig::new().load_factor(lf).validate();
            assert!(matches!(r, Err(TableError::InvalidArgument { .. })), "{lf}");
        }
        let r = TableConfig::new()
            .initial_capacity(MAX_CAPACITY + 1)
            .validate();
        assert!(matches!(r, Err(TableError::InvalidArgument { .. })));
    }

    #[test]
    fn slot_capacity_rounds_up() {
        assert_eq!(TableConfig::new().initial_capacity(0).slot_capacity(), 1);
        assert_eq!(TableConfig::new().initial_capacity(5).slot_capacity(), 8);
        assert_eq!(TableConfig::new().initial_capacity(8).slot_capacity(), 8);
    }

    #[test]
    fn for_persisted_fits_without_resize() {
        let cfg = TableConfig::for_persisted(13, 0.75).unwrap();
        let cap = cfg.slot_capacity();
        assert!(max_size_for(cap, 0.75) >= 13);
        assert!(max_size_for(cap / 2, 0.75) < 13);
        assert_eq!(TableConfig::for_persisted(0, 0.75).unwrap().slot_capacity(), 1);
    }

    #[test]
    fn for_persisted_caps_presize_for_sparse_tables() {
        let cfg = TableConfig::for_persisted(10, MIN_LOAD_FACTOR).unwrap();
        assert_eq!(cfg.slot_capacity(), 32);
        let cfg = TableConfig::for_persisted(65_536, 0.04).unwrap();
        assert_eq!(cfg.slot_capacity(), 131_072);
        assert!(TableConfig::for_persisted(10, 1e-6).is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: TableConfig = serde_json::from_str(r#"{"load_factor": 0.5}"#).unwrap();
        assert_eq!(cfg.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert_eq!(cfg.load_factor, 0.5);
    }
}
