//! Industry averages over peer fact sets.

use commonsize_core::{FactBag, PeriodKind, StatementKind, StatementLine};
use tracing::debug;

use crate::builder::common_size_lines;

/// Sets `industry_common_size` on each line to the mean of the peer ratios at
/// that line.
///
/// Peers whose statement cannot be built are skipped. A line no peer reported
/// keeps an absent industry ratio. Returns the number of peers that
/// contributed.
pub fn apply_industry_average(
    lines: &mut [StatementLine],
    peers: &[FactBag],
    kind: StatementKind,
    period: PeriodKind,
) -> usize {
    let mut sums = vec![0.0_f64; lines.len()];
    let mut counts = vec![0_usize; lines.len()];
    let mut contributing = 0;

    for peer in peers {
        let peer_lines = match common_size_lines(peer, kind, period) {
            Ok(peer_lines) => peer_lines,
            Err(e) => {
                debug!(
                    peer = peer.entity_name.as_deref().unwrap_or("unknown"),
                    error = %e,
                    "Skipping peer"
                );
                continue;
            }
        };
        contributing += 1;

        for (index, ratio) in peer_lines.iter().map(|l| l.common_size).enumerate() {
            if let (Some(ratio), Some(sum)) = (ratio, sums.get_mut(index)) {
                *sum += ratio;
                counts[index] += 1;
            }
        }
    }

    for ((line, sum), count) in lines.iter_mut().zip(sums).zip(counts) {
        line.industry_common_size = (count > 0).then(|| sum / count as f64);
    }

    contributing
}
