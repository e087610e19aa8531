//! Dependency graph over plan tasks.
//!
//! This module builds a directed acyclic graph from a [`Plan`] and computes
//! parallel execution waves: every task in a wave has all of its dependencies
//! in earlier waves.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

use crate::types::PackageIdentifier;

use super::Plan;

#[derive(Debug, Error)]
#[error("dependency cycle detected among: {}", .0.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", "))]
pub struct CycleError(pub Vec<PackageIdentifier>);

/// A DAG of plan tasks, edges pointing from dependency to dependent.
pub struct PlanDag {
  graph: DiGraph<PackageIdentifier, ()>,
  nodes: HashMap<PackageIdentifier, NodeIndex>,
}

impl PlanDag {
  /// Build the graph from a plan.
  ///
  /// Dependencies that are not tasks of the plan (already installed) are
  /// ignored.
  pub fn from_plan(plan: &Plan) -> Self {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for ident in plan.tasks.keys() {
      let idx = graph.add_node(ident.clone());
      nodes.insert(ident.clone(), idx);
    }

    for (ident, task) in &plan.tasks {
      let dependent_idx = nodes[ident];
      for dep in &task.deps {
        if let Some(&dep_idx) = nodes.get(dep) {
          graph.add_edge(dep_idx, dependent_idx, ());
        }
      }
    }

    Self { graph, nodes }
  }

  /// Group tasks into waves that can run in parallel.
  ///
  /// Waves are computed level by level (Kahn's algorithm); tasks inside a
  /// wave are sorted by identifier so the output is deterministic.
  pub fn waves(&self) -> Result<Vec<Vec<PackageIdentifier>>, CycleError> {
    let mut in_degree: HashMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();

    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let ready: Vec<NodeIndex> = remaining.iter().filter(|&&idx| in_degree[&idx] == 0).copied().collect();

      if ready.is_empty() {
        let mut stuck: Vec<PackageIdentifier> = remaining.iter().map(|&idx| self.graph[idx].clone()).collect();
        stuck.sort();
        return Err(CycleError(stuck));
      }

      for &idx in &ready {
        remaining.remove(&idx);
        for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      let mut wave: Vec<PackageIdentifier> = ready.into_iter().map(|idx| self.graph[idx].clone()).collect();
      wave.sort();
      waves.push(wave);
    }

    Ok(waves)
  }

  /// Direct plan dependencies of a task.
  pub fn dependencies(&self, ident: &PackageIdentifier) -> Vec<PackageIdentifier> {
    let Some(&idx) = self.nodes.get(ident) else {
      return Vec::new();
    };

    self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|dep_idx| self.graph[dep_idx].clone())
      .collect()
  }

  pub fn task_count(&self) -> usize {
    self.nodes.len()
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;
  use std::path::PathBuf;

  use super::*;
  use crate::package::Package;
  use crate::plan::{PackageLocation, Task, TaskLocation, TaskType};
  use crate::types::{PackageName, Version};

  fn ident(name: &str) -> PackageIdentifier {
    PackageIdentifier::new(PackageName::new(name), Version::new(vec![1]))
  }

  fn task(name: &str, deps: &[&str]) -> Task {
    Task {
      ident: ident(name),
      task_type: TaskType::Immutable {
        package: Package {
          ident: ident(name),
          depends: deps.iter().map(|d| PackageName::new(*d)).collect(),
          exes: BTreeSet::new(),
          build: None,
        },
        location: PackageLocation(PathBuf::from(format!("/deps/{}", name))),
      },
      location: TaskLocation::Snapshot,
      deps: deps.iter().map(|d| ident(d)).collect(),
    }
  }

  fn plan(tasks: Vec<Task>) -> Plan {
    let mut plan = Plan::new();
    for t in tasks {
      plan.insert(t);
    }
    plan
  }

  #[test]
  fn empty_plan_has_no_waves() {
    let dag = PlanDag::from_plan(&Plan::new());
    assert_eq!(dag.task_count(), 0);
    assert!(dag.waves().unwrap().is_empty());
  }

  #[test]
  fn diamond_produces_three_waves() {
    // a <- b, a <- c, {b, c} <- d
    let dag = PlanDag::from_plan(&plan(vec![
      task("a", &[]),
      task("b", &["a"]),
      task("c", &["a"]),
      task("d", &["b", "c"]),
    ]));

    let waves = dag.waves().unwrap();
    assert_eq!(waves, vec![vec![ident("a")], vec![ident("b"), ident("c")], vec![ident("d")]]);
  }

  #[test]
  fn dependencies_outside_the_plan_are_ignored() {
    let dag = PlanDag::from_plan(&plan(vec![task("app", &["base"])]));
    assert_eq!(dag.waves().unwrap(), vec![vec![ident("app")]]);
    assert!(dag.dependencies(&ident("app")).is_empty());
  }

  #[test]
  fn cycle_is_reported() {
    let dag = PlanDag::from_plan(&plan(vec![task("a", &["b"]), task("b", &["a"])]));
    let err = dag.waves().unwrap_err();
    assert_eq!(err.0, vec![ident("a"), ident("b")]);
  }
}
