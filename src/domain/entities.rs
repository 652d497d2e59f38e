//! Domain entities: core data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{DomainError, DomainResult};

/// Identifier of a selected fund.
pub type EntityId = i64;

/// Total budget every allocation distributes.
pub const FULL_BUDGET: f64 = 100.0;

/// Lower share bound applied when more than one entity is present.
pub const MIN_SHARE: f64 = 5.0;

/// Upper share bound applied when more than one entity is present.
pub const MAX_SHARE: f64 = 95.0;

/// Tolerance of the confirmation gate.
pub const TOTAL_EPSILON: f64 = 0.01;

/// One `{id, share}` record, the hand-off format of a finished allocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: EntityId,
    pub share: f64,
}

/// Per-entity share bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareBounds {
    pub min_share: f64,
    pub max_share: f64,
}

impl Default for ShareBounds {
    fn default() -> Self {
        Self {
            min_share: MIN_SHARE,
            max_share: MAX_SHARE,
        }
    }
}

impl ShareBounds {
    /// Create bounds, rejecting ranges that cannot hold a share.
    pub fn new(min_share: f64, max_share: f64) -> DomainResult<Self> {
        let bounds = Self {
            min_share,
            max_share,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Check `0 <= min < max <= 100`.
    pub fn validate(&self) -> DomainResult<()> {
        let ok = self.min_share.is_finite()
            && self.max_share.is_finite()
            && self.min_share >= 0.0
            && self.min_share < self.max_share
            && self.max_share <= FULL_BUDGET;
        if ok {
            Ok(())
        } else {
            Err(DomainError::InvalidBounds {
                min: self.min_share,
                max: self.max_share,
            })
        }
    }

    /// Clamp a value into `[min_share, max_share]`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min_share).min(self.max_share)
    }
}

/// Ordered association list from entity to share.
///
/// Order is significant: the first entry absorbs the final rounding residue
/// of a rebalance, so a `Vec` of pairs is kept instead of a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation {
    shares: Vec<ShareRecord>,
}

impl Allocation {
    /// Build from `(id, share)` pairs, keeping their order.
    ///
    /// A repeated id overwrites the earlier value in place.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (EntityId, f64)>,
    {
        let mut allocation = Self::default();
        for (id, share) in pairs {
            allocation.set(id, share);
        }
        allocation
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Share of `id`, if present.
    pub fn get(&self, id: EntityId) -> Option<f64> {
        self.shares.iter().find(|r| r.id == id).map(|r| r.share)
    }

    /// Set the share of `id`; appends when the id is new.
    pub fn set(&mut self, id: EntityId, share: f64) {
        match self.shares.iter_mut().find(|r| r.id == id) {
            Some(record) => record.share = share,
            None => self.shares.push(ShareRecord { id, share }),
        }
    }

    /// Entity ids in allocation order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.shares.iter().map(|r| r.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShareRecord> {
        self.shares.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ShareRecord> {
        self.shares.iter_mut()
    }

    pub(crate) fn first_mut(&mut self) -> Option<&mut ShareRecord> {
        self.shares.first_mut()
    }

    /// Unrounded sum of all shares.
    pub fn raw_total(&self) -> f64 {
        self.shares.iter().map(|r| r.share).sum()
    }

    /// Sum of all shares rounded to 2 decimals.
    pub fn total(&self) -> f64 {
        round2(self.raw_total())
    }

    /// True when the total is within [`TOTAL_EPSILON`] of 100.
    pub fn is_balanced(&self) -> bool {
        (self.total() - FULL_BUDGET).abs() <= TOTAL_EPSILON
    }

    /// Confirmation gate: fails with the current total when not balanced.
    pub fn ensure_balanced(&self) -> DomainResult<()> {
        if self.is_balanced() {
            Ok(())
        } else {
            Err(DomainError::TotalMismatch {
                total: self.total(),
            })
        }
    }

    /// Records in allocation order.
    pub fn to_records(&self) -> Vec<ShareRecord> {
        self.shares.clone()
    }
}

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// In-progress allocation session, persisted between edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Entity set the allocation was initialized for, in caller order
    pub entity_ids: Vec<EntityId>,
    pub allocation: Allocation,
    pub updated_at: DateTime<Utc>,
}

/// Allocation accepted by the confirmation gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedAllocation {
    pub confirmed_at: DateTime<Utc>,
    pub total: f64,
    pub shares: Vec<ShareRecord>,
    /// Exact integer view of `shares`, summing to 10000
    pub basis_points: Vec<(EntityId, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_repeated_id_when_building_from_pairs_then_keeps_first_position() {
        let allocation = Allocation::from_pairs([(1, 10.0), (2, 20.0), (1, 70.0)]);
        assert_eq!(allocation.ids(), vec![1, 2]);
        assert_eq!(allocation.get(1), Some(70.0));
    }

    #[test]
    fn given_unbalanced_allocation_when_gating_then_reports_total() {
        let allocation = Allocation::from_pairs([(1, 60.0), (2, 30.0)]);
        let err = allocation.ensure_balanced().unwrap_err();
        assert_eq!(err, DomainError::TotalMismatch { total: 90.0 });
        assert_eq!(
            err.to_string(),
            "sum must be exactly 100%, current sum is 90%"
        );
    }

    #[test]
    fn given_total_within_epsilon_when_gating_then_passes() {
        let allocation = Allocation::from_pairs([(1, 33.0), (2, 33.0), (3, 33.0)]);
        assert!(!allocation.is_balanced());

        let allocation = Allocation::from_pairs([(1, 33.33), (2, 33.33), (3, 33.34)]);
        assert!(allocation.ensure_balanced().is_ok());
    }

    #[test]
    fn given_inverted_bounds_when_creating_then_errors() {
        assert!(ShareBounds::new(95.0, 5.0).is_err());
        assert!(ShareBounds::new(-1.0, 50.0).is_err());
        assert!(ShareBounds::new(0.0, 100.0).is_ok());
    }

    #[test]
    fn given_allocation_when_serialized_then_is_ordered_record_list() {
        let allocation = Allocation::from_pairs([(7, 60.0), (3, 40.0)]);
        let json = serde_json::to_string(&allocation).unwrap();
        assert_eq!(json, r#"[{"id":7,"share":60.0},{"id":3,"share":40.0}]"#);
    }
}
