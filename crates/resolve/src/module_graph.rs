//! Import graph over resolved bindings
//!
//! Edges point from the imported module to the importing module (dependency
//! to dependent), so walking outgoing edges from a module yields everything
//! that would need to be re-resolved if it changed. Import cycles are allowed;
//! they are only reported for downstream consumers.

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::ids::ModuleId;

#[derive(Debug, Default)]
pub struct ImportGraph {
    graph: DiGraph<ModuleId, ()>,
    module_to_node: HashMap<ModuleId, NodeIndex>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, module: ModuleId) -> NodeIndex {
        if let Some(&node) = self.module_to_node.get(&module) {
            return node;
        }
        let node = self.graph.add_node(module);
        self.module_to_node.insert(module, node);
        node
    }

    /// Record that `importer` imports from `target`. Repeated edges collapse.
    pub fn add_import(&mut self, importer: ModuleId, target: ModuleId) {
        let from = self.node(target);
        let to = self.node(importer);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Modules that directly import from `module`
    pub fn dependents(&self, module: ModuleId) -> Vec<ModuleId> {
        self.neighbors(module, Direction::Outgoing)
    }

    /// Modules `module` directly imports from
    pub fn dependencies(&self, module: ModuleId) -> Vec<ModuleId> {
        self.neighbors(module, Direction::Incoming)
    }

    fn neighbors(&self, module: ModuleId, direction: Direction) -> Vec<ModuleId> {
        let Some(&node) = self.module_to_node.get(&module) else {
            return Vec::new();
        };
        let mut out: Vec<ModuleId> = self
            .graph
            .neighbors_directed(node, direction)
            .filter_map(|n| self.graph.node_weight(n))
            .copied()
            .collect();
        out.sort();
        out
    }

    /// Every module that transitively depends on `module`, excluding itself
    /// unless it sits on an import cycle.
    pub fn invalidation_set(&self, module: ModuleId) -> Vec<ModuleId> {
        let Some(&start) = self.module_to_node.get(&module) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let mut out: Vec<ModuleId> = seen
            .into_iter()
            .filter_map(|n| self.graph.node_weight(n))
            .copied()
            .collect();
        out.sort();
        out
    }

    /// Groups of modules that import each other, each sorted, largest first.
    pub fn import_cycles(&self) -> Vec<Vec<ModuleId>> {
        let mut cycles: Vec<Vec<ModuleId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                let mut modules: Vec<ModuleId> = scc
                    .into_iter()
                    .filter_map(|n| self.graph.node_weight(n))
                    .copied()
                    .collect();
                modules.sort();
                modules
            })
            .collect();
        cycles.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        cycles
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
