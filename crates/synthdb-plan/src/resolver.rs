use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use synthdb_core::{DependencyGraph, ForeignKeyRelation};
use tracing::info;

use crate::sql::extract_foreign_keys;

/// Safe generation order plus each table's dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub generation_order: Vec<String>,
    /// `table -> tables it references`.
    pub dependency_map: BTreeMap<String, Vec<String>>,
    /// Tables ordered by the alphabetical cycle fallback, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<String>>,
    /// Relations that survived filtering against the known tables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<ForeignKeyRelation>,
}

impl Resolution {
    /// Input order with no dependencies.
    pub fn unordered<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let generation_order: Vec<String> = tables.into_iter().map(Into::into).collect();
        let dependency_map = generation_order
            .iter()
            .map(|table| (table.clone(), Vec::new()))
            .collect();
        Self {
            generation_order,
            dependency_map,
            cycle: None,
            relations: Vec::new(),
        }
    }

    pub fn dependencies_of(&self, table: &str) -> &[String] {
        self.dependency_map
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn rank_of(&self, table: &str) -> Option<usize> {
        self.generation_order.iter().position(|name| name == table)
    }
}

/// Derive a generation order for `tables` from the foreign keys in `schema_sql`.
///
/// Never fails. Blank SQL keeps the input order; cycles are broken
/// alphabetically.
pub fn resolve_dependencies<S: AsRef<str>>(schema_sql: &str, tables: &[S]) -> Resolution {
    let names: Vec<String> = tables.iter().map(|t| t.as_ref().to_string()).collect();
    if schema_sql.trim().is_empty() {
        return Resolution::unordered(names);
    }

    let mut graph = DependencyGraph::new(names.iter().cloned());
    let relations: Vec<ForeignKeyRelation> = extract_foreign_keys(schema_sql)
        .into_iter()
        .filter(|relation| graph.add_relation(relation))
        .collect();

    let ordered = graph.generation_order();
    let resolution = Resolution {
        generation_order: ordered.order,
        dependency_map: graph.dependency_map(),
        cycle: ordered.cycle,
        relations,
    };

    info!(
        tables = names.len(),
        relations = resolution.relations.len(),
        order = ?resolution.generation_order,
        "resolved table dependencies"
    );

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_sql_keeps_input_order() {
        let resolution = resolve_dependencies("  ", &["b", "a"]);
        assert_eq!(resolution.generation_order, vec!["b", "a"]);
        assert!(resolution.dependencies_of("a").is_empty());
        assert!(resolution.dependencies_of("b").is_empty());
    }

    #[test]
    fn self_reference_does_not_create_cycle() {
        let sql = "CREATE TABLE employees (id INTEGER PRIMARY KEY, manager_id INTEGER REFERENCES employees(id));";
        let resolution = resolve_dependencies(sql, &["employees"]);
        assert!(resolution.cycle.is_none());
        assert!(resolution.dependencies_of("employees").is_empty());
        assert!(resolution.relations.is_empty());
    }

    #[test]
    fn unknown_targets_are_ignored() {
        let sql = "CREATE TABLE orders (id INTEGER, region_id INTEGER REFERENCES regions(id));";
        let resolution = resolve_dependencies(sql, &["orders"]);
        assert_eq!(resolution.generation_order, vec!["orders"]);
        assert!(resolution.dependencies_of("orders").is_empty());
    }
}
