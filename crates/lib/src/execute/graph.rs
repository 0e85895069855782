//! Library dependency ordering.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use crate::library::Library;

use super::types::ExecuteError;

/// Dependency graph over every known library, with edges from a dependency
/// to its dependents.
pub struct LibraryGraph {
  graph: DiGraph<Library, ()>,
  nodes: HashMap<Library, NodeIndex>,
}

impl LibraryGraph {
  pub fn new() -> Self {
    let mut graph = DiGraph::new();
    let nodes: HashMap<Library, NodeIndex> = Library::ALL.iter().map(|&lib| (lib, graph.add_node(lib))).collect();

    for lib in Library::ALL {
      for dep in lib.dependencies() {
        graph.add_edge(nodes[dep], nodes[&lib], ());
      }
    }

    Self { graph, nodes }
  }

  /// `selected` in an order where every library follows its dependencies.
  /// Duplicates are dropped.
  pub fn order(&self, selected: &[Library]) -> Result<Vec<Library>, ExecuteError> {
    let sorted = toposort(&self.graph, None).map_err(|_| ExecuteError::CycleDetected)?;
    Ok(
      sorted
        .into_iter()
        .map(|idx| self.graph[idx])
        .filter(|lib| selected.contains(lib))
        .collect(),
    )
  }

  /// Every library `library` needs, directly or transitively.
  pub fn transitive_dependencies(&self, library: Library) -> Vec<Library> {
    let reversed = Reversed(&self.graph);
    let mut dfs = Dfs::new(reversed, self.nodes[&library]);
    let mut deps = Vec::new();
    while let Some(idx) = dfs.next(reversed) {
      let lib = self.graph[idx];
      if lib != library {
        deps.push(lib);
      }
    }
    deps.sort();
    deps
  }
}

impl Default for LibraryGraph {
  fn default() -> Self {
    Self::new()
  }
}
