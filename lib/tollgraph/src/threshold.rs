use itertools::Itertools;
use tracing::*;

use crate::*;
use crate::unroll::UnrolledRecord;

/// Relative half-width of the band around the reference average.
pub const THRESHOLD_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMatch<L> {
    pub reference: L,
    /// Mean finite distance over the records leaving `reference`.
    pub average: Distance,
    pub lower: Distance,
    pub upper: Distance,
    /// Distinct origins of every record whose own distance is in `[lower, upper]`, ascending.
    pub ids: Vec<L>,
}

/// Find the origins whose records lie within 10% of the reference location's average distance.
///
/// The band is derived from the average over records with `origin == reference`, but it is tested
/// against each individual record of the whole list, not against per-origin averages.
/// Unreachable records are skipped on both sides.
#[instrument(level="debug", skip(records), fields(records=records.len()))]
pub fn find_ids_within_threshold<L: Location>(records: &[UnrolledRecord<L>], reference: &L) -> anyhow::Result<ThresholdMatch<L>> {
    let (count, sum) = records.iter()
        .filter(|r| &r.origin == reference)
        .filter_map(|r| r.distance.finite())
        .fold((0usize, 0.0), |(c, s), d| (c + 1, s + d));

    if count == 0 {
        warn!(%reference, "no finite records for reference location");
        return Err(Error::NoReferenceData.into());
    }

    let average = sum / count as f64;
    let lower = average * (1.0 - THRESHOLD_FRACTION);
    let upper = average * (1.0 + THRESHOLD_FRACTION);

    let ids: Vec<L> = records.iter()
        .filter(|r| matches!(r.distance.finite(), Some(d) if lower <= d && d <= upper))
        .map(|r| r.origin.clone())
        .sorted()
        .dedup()
        .collect();

    debug!(%reference, average, lower, upper, matches=ids.len(), "threshold search finished");
    Ok(ThresholdMatch { reference: reference.clone(), average, lower, upper, ids })
}
