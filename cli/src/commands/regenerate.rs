//! `regenerate`: rebuild the lookup table, whole or for selected wrappers.

use lineage_commons::EntityId;
use lineage_core::{Lineage, RegenerationReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerateOutcome {
    Full { rows: usize },
    Scoped(RegenerationReport),
}

impl RegenerateOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            RegenerateOutcome::Full { .. } => true,
            RegenerateOutcome::Scoped(report) => report.is_success(),
        }
    }

    /// Line printed for the operator.
    pub fn summary(&self) -> String {
        match self {
            RegenerateOutcome::Full { .. } => "Regenerated lookup-table.".to_string(),
            RegenerateOutcome::Scoped(report) => format!(
                "Regenerated {}; failed regenerating {} records.",
                report.regenerated,
                report.failed.len()
            ),
        }
    }
}

/// Full rebuild when `wrapper_ids` is empty, otherwise only the listed wrappers.
///
/// A failing full rebuild is an error; failing wrappers in a scoped run are
/// reported in the outcome.
pub fn regenerate(lineage: &Lineage, wrapper_ids: &[i64]) -> anyhow::Result<RegenerateOutcome> {
    if wrapper_ids.is_empty() {
        log::info!("Regenerating full LUT; this could take a while...");
        let rows = lineage.regenerate()?;
        return Ok(RegenerateOutcome::Full { rows });
    }

    let ids: Vec<EntityId> = wrapper_ids.iter().copied().map(EntityId::new).collect();
    log::info!("Regenerating LUT rows for {} wrapper(s)", ids.len());
    let report = lineage.regenerate_wrappers(&ids);
    for id in &report.failed {
        log::error!("Failed regenerating wrapper {}", id);
    }
    Ok(RegenerateOutcome::Scoped(report))
}
