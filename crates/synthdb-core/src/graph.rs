use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constraints::ForeignKeyRelation;

/// Summary of dependency graph structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Result of ordering a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOrder {
    /// Every table exactly once, dependencies first.
    pub order: Vec<String>,
    /// Tables that could not be ordered and were appended alphabetically.
    pub cycle: Option<Vec<String>>,
}

impl GenerationOrder {
    pub fn is_acyclic(&self) -> bool {
        self.cycle.is_none()
    }

    pub fn rank_of(&self, table: &str) -> Option<usize> {
        self.order.iter().position(|name| name == table)
    }
}

/// Table dependency graph built from foreign-key relations.
///
/// Edges run from the referenced table to the referencing one, so Kahn's
/// algorithm emits parents before children.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependents: BTreeMap<String, BTreeSet<String>>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::default();
        for table in tables {
            let name = table.into();
            graph.dependents.entry(name.clone()).or_default();
            graph.dependencies.entry(name).or_default();
        }
        graph
    }

    pub fn from_relations<'a, I, S>(tables: I, relations: impl IntoIterator<Item = &'a ForeignKeyRelation>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::new(tables);
        for relation in relations {
            graph.add_relation(relation);
        }
        graph
    }

    /// Canonical node name for `table`, matched case-insensitively.
    pub fn node(&self, table: &str) -> Option<&str> {
        if let Some((name, _)) = self.dependents.get_key_value(table) {
            return Some(name.as_str());
        }
        self.dependents
            .keys()
            .find(|name| name.eq_ignore_ascii_case(table))
            .map(String::as_str)
    }

    /// Add the edge for a relation. Self references and relations touching
    /// unknown tables are dropped and reported as `false`.
    pub fn add_relation(&mut self, relation: &ForeignKeyRelation) -> bool {
        let (Some(source), Some(target)) = (
            self.node(&relation.source_table).map(str::to_string),
            self.node(&relation.target_table).map(str::to_string),
        ) else {
            return false;
        };
        if source == target {
            return false;
        }

        self.dependents
            .entry(target.clone())
            .or_default()
            .insert(source.clone());
        self.dependencies.entry(source).or_default().insert(target);
        true
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.dependents.len(),
            edges: self.dependents.values().map(BTreeSet::len).sum(),
        }
    }

    /// Tables each table references, sorted by name.
    pub fn dependency_map(&self) -> BTreeMap<String, Vec<String>> {
        self.dependencies
            .iter()
            .map(|(table, deps)| (table.clone(), deps.iter().cloned().collect()))
            .collect()
    }

    pub fn dependencies_of(&self, table: &str) -> Vec<String> {
        self.dependencies
            .get(table)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Kahn's algorithm with alphabetical tie breaking.
    ///
    /// Never fails: nodes left over by a cycle are appended alphabetically.
    pub fn generation_order(&self) -> GenerationOrder {
        match toposort(&self.dependents) {
            Ok(order) => GenerationOrder { order, cycle: None },
            Err((mut order, remaining)) => {
                warn!(
                    tables = ?remaining,
                    "circular dependency detected, appending remaining tables alphabetically"
                );
                order.extend(remaining.iter().cloned());
                GenerationOrder {
                    order,
                    cycle: Some(remaining),
                }
            }
        }
    }
}

type PartialOrder = (Vec<String>, Vec<String>);

fn toposort(graph: &BTreeMap<String, BTreeSet<String>>) -> Result<Vec<String>, PartialOrder> {
    let mut indegree: BTreeMap<String, usize> = BTreeMap::new();

    for node in graph.keys() {
        indegree.entry(node.clone()).or_insert(0);
    }

    for targets in graph.values() {
        for target in targets {
            let entry = indegree.entry(target.clone()).or_insert(0);
            *entry += 1;
        }
    }

    let mut ready: BTreeSet<String> = indegree
        .iter()
        .filter_map(|(node, count)| if *count == 0 { Some(node.clone()) } else { None })
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.clone());

        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.clone());
                    }
                }
            }
        }
    }

    if order.len() == indegree.len() {
        Ok(order)
    } else {
        let remaining: Vec<String> = indegree
            .into_iter()
            .filter_map(|(node, count)| if count > 0 { Some(node) } else { None })
            .collect();
        Err((order, remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk(source: &str, column: &str, target: &str) -> ForeignKeyRelation {
        ForeignKeyRelation::new(source, column, target, None)
    }

    #[test]
    fn orders_parents_first() {
        let relations = [fk("orders", "customer_id", "customers")];
        let graph = DependencyGraph::from_relations(["orders", "customers"], &relations);

        let result = graph.generation_order();
        assert!(result.is_acyclic());
        assert_eq!(result.order, vec!["customers".to_string(), "orders".to_string()]);
        assert_eq!(graph.dependencies_of("orders"), vec!["customers".to_string()]);
        assert!(graph.dependencies_of("customers").is_empty());
    }

    #[test]
    fn ties_break_alphabetically() {
        let graph = DependencyGraph::new(["zebras", "apples", "mangos"]);
        assert_eq!(
            graph.generation_order().order,
            vec!["apples".to_string(), "mangos".to_string(), "zebras".to_string()]
        );
    }

    #[test]
    fn cycle_appends_remaining_alphabetically() {
        let relations = [
            fk("a", "b_id", "b"),
            fk("b", "a_id", "a"),
            fk("c", "a_id", "a"),
        ];
        let graph = DependencyGraph::from_relations(["c", "b", "a", "root"], &relations);

        let result = graph.generation_order();
        assert_eq!(
            result.cycle,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(
            result.order,
            vec!["root".to_string(), "a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn drops_self_and_unknown_references() {
        let relations = [
            fk("employees", "manager_id", "employees"),
            fk("employees", "office_id", "offices"),
        ];
        let mut graph = DependencyGraph::new(["employees"]);
        for relation in &relations {
            assert!(!graph.add_relation(relation));
        }

        assert_eq!(graph.summary(), GraphSummary { nodes: 1, edges: 0 });
        assert!(graph.generation_order().is_acyclic());
    }

    #[test]
    fn matches_table_names_case_insensitively() {
        let relations = [fk("Orders", "customer_id", "CUSTOMERS")];
        let graph = DependencyGraph::from_relations(["orders", "customers"], &relations);

        assert_eq!(graph.dependencies_of("orders"), vec!["customers".to_string()]);
        assert_eq!(graph.summary().edges, 1);
    }

    #[test]
    fn duplicate_relations_count_once() {
        let relations = [
            fk("orders", "customer_id", "customers"),
            fk("orders", "billing_customer_id", "customers"),
        ];
        let graph = DependencyGraph::from_relations(["orders", "customers"], &relations);
        assert_eq!(graph.summary().edges, 1);
        assert_eq!(graph.generation_order().rank_of("orders"), Some(1));
    }
}
