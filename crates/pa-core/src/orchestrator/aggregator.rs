//! Result aggregation
//!
//! Turns a completed store into an [`AggregateReport`] ordered by the
//! decomposition, independent of the order in which subtasks finished.

use tracing::{debug, warn};

use super::store::ResultStore;
use super::types::{AggregateReport, SubtaskDescriptor, Task};
use crate::{Error, Result};

/// Build the report for `subtasks` from one snapshot of `store`
///
/// Must be called after the matching dispatch returned. Any subtask without
/// an entry yields [`Error::IncompleteAggregation`] carrying the partial
/// report.
pub fn aggregate(
    task: &Task,
    subtasks: &[SubtaskDescriptor],
    store: &ResultStore,
) -> Result<AggregateReport> {
    let snapshot = store.snapshot();

    let mut ordered: Vec<&SubtaskDescriptor> = subtasks.iter().collect();
    ordered.sort_by_key(|s| s.order);

    let mut entries = Vec::with_capacity(ordered.len());
    let mut missing = Vec::new();

    for subtask in ordered {
        match snapshot.get(&subtask.key) {
            Some(entry) => entries.push(entry.clone()),
            None => missing.push(subtask.key.to_string()),
        }
    }

    let report = AggregateReport::from_entries(task.clone(), entries);

    if !missing.is_empty() {
        warn!(
            "Aggregation found {} of {} entries",
            report.entries.len(),
            subtasks.len()
        );
        return Err(Error::IncompleteAggregation {
            missing,
            partial: Box::new(report),
        });
    }

    debug!("Aggregated report: {}", report.summary());
    Ok(report)
}
