//! Statement assembly.

use commonsize_core::{
    CommonSizeError, FactBag, LayoutEntry, PeriodKind, Result, StatementKind, StatementLine,
};
use tracing::{debug, instrument};

use crate::{
    derive::apply_derivations,
    layout::{DENOMINATOR_INDEX, layout_for},
    peers::apply_industry_average,
    resolver::resolve_value,
    statement::CommonSizeStatement,
};

/// Resolves a value for every line of `layout`.
///
/// The denominator line is resolved first; its fact becomes the reference for
/// all other lines so they come from the same filing where possible.
#[must_use]
pub fn build_lines(facts: &FactBag, layout: &[LayoutEntry], period: PeriodKind) -> Vec<StatementLine> {
    let mut lines: Vec<StatementLine> = layout.iter().map(StatementLine::from_layout).collect();

    let Some(denominator) = layout.get(DENOMINATOR_INDEX) else {
        return lines;
    };
    let reference = resolve_value(facts, denominator.tags, period, None);
    if let Some((_, value)) = reference {
        lines[DENOMINATOR_INDEX].value = Some(value);
    }
    let reference = reference.map(|(fact, _)| fact);

    for (index, (line, entry)) in lines.iter_mut().zip(layout).enumerate() {
        if index == DENOMINATOR_INDEX || entry.is_header {
            continue;
        }
        line.value = resolve_value(facts, entry.tags, period, reference).map(|(_, v)| v);
    }

    lines
}

/// Divides every line by the denominator line.
///
/// # Errors
/// Returns [`CommonSizeError::StatementUnavailable`] if the denominator is
/// missing or zero.
pub fn compute_common_size(lines: &mut [StatementLine]) -> Result<()> {
    let denominator = lines.get(DENOMINATOR_INDEX).ok_or_else(|| {
        CommonSizeError::StatementUnavailable("Statement has no lines.".to_string())
    })?;
    let base = match denominator.value {
        Some(value) if value != 0.0 => value,
        _ => {
            return Err(CommonSizeError::StatementUnavailable(format!(
                "{} not available for common size computation.",
                denominator.label
            )));
        }
    };

    for line in lines.iter_mut() {
        line.common_size = line.value.map(|v| v / base);
    }
    Ok(())
}

/// Resolves, reconciles and common-sizes one entity's lines.
pub(crate) fn common_size_lines(
    facts: &FactBag,
    kind: StatementKind,
    period: PeriodKind,
) -> Result<Vec<StatementLine>> {
    let mut lines = build_lines(facts, layout_for(kind), period);
    apply_derivations(kind, &mut lines);
    compute_common_size(&mut lines)?;
    Ok(lines)
}

/// Builds a common-size statement, with an industry column when `peers` is
/// given.
///
/// # Errors
/// Returns [`CommonSizeError::StatementUnavailable`] if the subject's
/// denominator line cannot be resolved or is zero. Peer failures never fail
/// the build.
#[instrument(skip(facts, peers), fields(entity = facts.entity_name.as_deref().unwrap_or("unknown")))]
pub fn build_statement(
    facts: &FactBag,
    kind: StatementKind,
    period: PeriodKind,
    peers: Option<&[FactBag]>,
) -> Result<CommonSizeStatement> {
    let mut lines = common_size_lines(facts, kind, period)?;

    let peer_count = match peers {
        Some(peers) if !peers.is_empty() => apply_industry_average(&mut lines, peers, kind, period),
        _ => 0,
    };

    debug!(lines = lines.len(), peer_count, "Built common-size statement");

    Ok(CommonSizeStatement {
        kind,
        period,
        lines,
        peer_count,
    })
}
