//! Integer basis-point view of an allocation (largest remainder method)

use super::entities::{Allocation, EntityId};

/// Basis points in one percent.
const BPS_PER_PERCENT: f64 = 100.0;

/// Convert shares to basis points that add up exactly to the rounded total.
///
/// A balanced allocation always yields 10000. Units left after flooring go to
/// the largest fractional parts; ties go to the earlier entity.
pub fn to_basis_points(allocation: &Allocation) -> Vec<(EntityId, u32)> {
    let scaled: Vec<(EntityId, f64)> = allocation
        .iter()
        .map(|r| (r.id, (r.share * BPS_PER_PERCENT).max(0.0)))
        .collect();
    let target = scaled.iter().map(|(_, v)| v).sum::<f64>().round() as u64;

    let mut result: Vec<(EntityId, u32)> = scaled
        .iter()
        .map(|(id, v)| (*id, v.floor() as u32))
        .collect();
    let assigned: u64 = result.iter().map(|(_, bps)| u64::from(*bps)).sum();
    // fractional parts add up to less than the entity count
    let missing = target.saturating_sub(assigned) as usize;

    let mut order: Vec<usize> = (0..scaled.len()).collect();
    // stable sort keeps insertion order among equal remainders
    order.sort_by(|&a, &b| {
        let fa = scaled[a].1 - scaled[a].1.floor();
        let fb = scaled[b].1 - scaled[b].1.floor();
        fb.total_cmp(&fa)
    });

    for idx in order.into_iter().take(missing) {
        result[idx].1 += 1;
    }
    result
}
