//! Allocation normalizer
//!
//! Keeps a set of shares summing to 100 while one share at a time is edited.
//! The other shares are rebalanced proportionally to their pre-edit values,
//! clamped into the configured bounds, then corrected in two passes so the
//! total lands on 100 again.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::entities::{round2, Allocation, EntityId, ShareBounds, FULL_BUDGET};
use super::error::{DomainError, DomainResult};

/// Below this the other shares count as all-zero and get an equal split.
const ZERO_WEIGHT_EPSILON: f64 = 0.01;

/// Deviation from 100 that triggers a correction pass.
const CORRECTION_EPSILON: f64 = 0.001;

/// Rebalances shares of a fixed 100-unit budget.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Normalizer {
    bounds: ShareBounds,
}

impl Normalizer {
    pub fn new(bounds: ShareBounds) -> DomainResult<Self> {
        bounds.validate()?;
        Ok(Self { bounds })
    }

    /// Equal split of the budget over `entity_ids`.
    ///
    /// Every entity but the last gets `floor(100 / n)` (clamped), the last one
    /// takes the remainder (clamped). With more than 20 entities the clamp
    /// pushes the total above 100; that result is returned as is and left
    /// to the confirmation gate.
    pub fn initialize(&self, entity_ids: &[EntityId]) -> DomainResult<Allocation> {
        ensure_unique(entity_ids)?;
        let (last, rest) = entity_ids
            .split_last()
            .ok_or(DomainError::EmptyEntitySet)?;

        if rest.is_empty() {
            return Ok(Allocation::from_pairs([(*last, FULL_BUDGET)]));
        }

        let base = self
            .bounds
            .clamp((FULL_BUDGET / entity_ids.len() as f64).floor());
        let mut allocation = Allocation::from_pairs(rest.iter().map(|id| (*id, base)));
        let remainder = FULL_BUDGET - allocation.raw_total();
        allocation.set(*last, self.bounds.clamp(remainder));

        debug!(
            "initialize: {} entities, base={}, last={}",
            entity_ids.len(),
            base,
            allocation.get(*last).unwrap_or_default()
        );
        if !allocation.is_balanced() {
            warn!(
                "initialize: clamped remainder leaves total at {} for {} entities",
                allocation.total(),
                entity_ids.len()
            );
        }
        Ok(allocation)
    }

    /// Set `target` to `requested` and rebalance everyone else.
    ///
    /// `entity_ids` defines the entity set and the order of the result.
    /// Values missing from `allocation` count as 0. `requested` is clamped
    /// into the bounds; NaN keeps the target's current value.
    pub fn set_share(
        &self,
        allocation: &Allocation,
        target: EntityId,
        requested: f64,
        entity_ids: &[EntityId],
    ) -> DomainResult<Allocation> {
        ensure_unique(entity_ids)?;
        if !entity_ids.contains(&target) {
            return Err(DomainError::UnknownEntity(target));
        }

        let current = |id: EntityId| allocation.get(id).unwrap_or(0.0);
        let others: Vec<(EntityId, f64)> = entity_ids
            .iter()
            .filter(|id| **id != target)
            .map(|id| (*id, current(*id)))
            .collect();

        if others.is_empty() {
            return Ok(Allocation::from_pairs([(target, FULL_BUDGET)]));
        }

        let requested = if requested.is_nan() {
            current(target)
        } else {
            requested
        };
        let clamped_target = self.bounds.clamp(requested);
        let remaining = FULL_BUDGET - clamped_target;
        let others_total: f64 = others.iter().map(|(_, share)| share).sum();
        debug!(
            "set_share: target={} requested={} clamped={} remaining={} others_total={}",
            target, requested, clamped_target, remaining, others_total
        );

        // weights are the pre-edit values, even for shares already at a bound
        let redistribute = |weight: f64| {
            if others_total <= ZERO_WEIGHT_EPSILON {
                remaining / others.len() as f64
            } else {
                remaining * (weight / others_total)
            }
        };

        let mut next = Allocation::from_pairs(entity_ids.iter().map(|&id| {
            if id == target {
                (id, clamped_target)
            } else {
                (id, self.bounds.clamp(redistribute(current(id))))
            }
        }));

        self.correct_deviation(&mut next);
        settle_rounding(&mut next);
        Ok(next)
    }

    /// Spread a deviation from 100 over the shares that can still move.
    fn correct_deviation(&self, allocation: &mut Allocation) {
        let diff = FULL_BUDGET - allocation.raw_total();
        if diff.abs() <= CORRECTION_EPSILON {
            return;
        }

        let adjustable: Vec<EntityId> = allocation
            .iter()
            .filter(|r| {
                if diff > 0.0 {
                    r.share < self.bounds.max_share
                } else {
                    r.share > self.bounds.min_share
                }
            })
            .map(|r| r.id)
            .collect();
        let Some(&first_adjustable) = adjustable.first() else {
            debug!("correct_deviation: nothing adjustable for diff={}", diff);
            return;
        };

        let step = diff / adjustable.len() as f64;
        for record in allocation
            .iter_mut()
            .filter(|r| adjustable.contains(&r.id))
        {
            record.share = round2(self.bounds.clamp(record.share + step));
        }

        let residual = FULL_BUDGET - allocation.raw_total();
        if residual.abs() > CORRECTION_EPSILON {
            if let Some(record) = allocation.iter_mut().find(|r| r.id == first_adjustable) {
                record.share = self.bounds.clamp(record.share + residual);
            }
        }
        debug!(
            "correct_deviation: diff={} over {} adjustable, residual={}",
            diff,
            adjustable.len(),
            residual
        );
    }
}

/// Round every share; the first entry absorbs whatever is left, unclamped.
fn settle_rounding(allocation: &mut Allocation) {
    for record in allocation.iter_mut() {
        record.share = round2(record.share);
    }
    let residual = FULL_BUDGET - allocation.raw_total();
    if residual.abs() > CORRECTION_EPSILON {
        if let Some(first) = allocation.first_mut() {
            debug!("settle_rounding: sink {} takes {}", first.id, residual);
            first.share = round2(first.share + residual);
        }
    }
}

fn ensure_unique(entity_ids: &[EntityId]) -> DomainResult<()> {
    if entity_ids.is_empty() {
        return Err(DomainError::EmptyEntitySet);
    }
    let mut seen = HashSet::with_capacity(entity_ids.len());
    for id in entity_ids {
        if !seen.insert(*id) {
            return Err(DomainError::DuplicateEntity(*id));
        }
    }
    Ok(())
}

/// Equal split with the default 5..95 bounds.
pub fn initialize(entity_ids: &[EntityId]) -> DomainResult<Allocation> {
    Normalizer::default().initialize(entity_ids)
}

/// Single-share edit with the default 5..95 bounds.
pub fn set_share(
    allocation: &Allocation,
    target: EntityId,
    requested: f64,
    entity_ids: &[EntityId],
) -> DomainResult<Allocation> {
    Normalizer::default().set_share(allocation, target, requested, entity_ids)
}

/// Sum of all shares rounded to 2 decimals.
pub fn total_of(allocation: &Allocation) -> f64 {
    allocation.total()
}

/// Slider step for `count` entities, so small counts divide evenly.
pub fn slider_step(count: usize) -> f64 {
    match count {
        0 | 1 => 1.0,
        2..=4 => 1.0 / count as f64,
        5..=10 => 0.2,
        _ => 0.1,
    }
}
