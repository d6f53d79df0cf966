//! Parents-first table order from foreign keys (depth-first, two-mark topological sort).

use crate::backup::catalog::TableDescriptor;
use crate::error::BackupError;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Order tables so every referenced table precedes the tables that reference it.
/// Tables and parents are visited by name, so the result is stable for an unchanged schema.
/// Foreign keys to tables outside the set are ignored; any cycle (self references included) is an error.
pub fn dependency_order(tables: &[TableDescriptor]) -> Result<Vec<&TableDescriptor>, BackupError> {
    let by_name: BTreeMap<&str, &TableDescriptor> = tables.iter().map(|t| (t.name.as_str(), t)).collect();
    let parents: HashMap<&str, BTreeSet<&str>> = tables
        .iter()
        .map(|t| {
            let deps = t
                .foreign_keys
                .iter()
                .map(|fk| fk.referenced_table.as_str())
                .filter(|p| by_name.contains_key(p))
                .collect();
            (t.name.as_str(), deps)
        })
        .collect();

    let mut state: HashMap<&str, Visit> = by_name.keys().map(|n| (*n, Visit::Unvisited)).collect();
    let mut order = Vec::with_capacity(by_name.len());
    for &name in by_name.keys() {
        visit(name, &parents, &mut state, &mut order)?;
    }
    Ok(order.into_iter().filter_map(|n| by_name.get(n).copied()).collect())
}

fn visit<'a>(
    name: &'a str,
    parents: &HashMap<&'a str, BTreeSet<&'a str>>,
    state: &mut HashMap<&'a str, Visit>,
    order: &mut Vec<&'a str>,
) -> Result<(), BackupError> {
    match state.get(name).copied().unwrap_or(Visit::Unvisited) {
        Visit::Done => return Ok(()),
        Visit::InProgress => {
            return Err(BackupError::CircularDependency {
                table: name.to_string(),
            })
        }
        Visit::Unvisited => {}
    }
    state.insert(name, Visit::InProgress);
    if let Some(deps) = parents.get(name) {
        for &parent in deps {
            visit(parent, parents, state, order)?;
        }
    }
    state.insert(name, Visit::Done);
    order.push(name);
    Ok(())
}
