//! Row helpers shared by the repository implementations.

use std::collections::BTreeSet;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

/// Row struct for `SELECT count() AS total ... GROUP ALL` queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

/// `GROUP ALL` over zero rows yields no row at all rather than a zero.
pub(crate) fn total(rows: &[CountRow]) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}

/// Collapse duplicate ids into their string keys, in stable order.
pub(crate) fn dedup_ids(ids: &[Uuid]) -> Vec<String> {
    ids.iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(Uuid::to_string)
        .collect()
}
