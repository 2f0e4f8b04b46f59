//! Collect sideloaded records for the `included` member.

use crate::config::Registry;
use crate::record::Record;
use std::collections::HashSet;

/// Every related record attached to `records`, depth first, duplicates kept.
/// Only associations declared on the record's model are followed.
pub fn extract_included<'r>(records: &[&'r Record], registry: &Registry) -> Vec<&'r Record> {
    let mut out = Vec::new();
    for record in records {
        collect(record, registry, &mut out);
    }
    out
}

fn collect<'r>(record: &'r Record, registry: &Registry, out: &mut Vec<&'r Record>) {
    let Some(model) = registry.model(&record.model) else {
        return;
    };
    for assoc in &model.associations {
        let Some(related) = record.related(&assoc.name) else {
            continue;
        };
        let attached = related.records();
        out.extend(attached.iter().copied());
        for child in attached {
            collect(child, registry, out);
        }
    }
}

/// First occurrence of each `(model, id)` pair, in encounter order.
pub fn dedup_included<'r>(records: Vec<&'r Record>) -> Vec<&'r Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(format!("{}_{}", r.model, r.id_string())))
        .collect()
}
