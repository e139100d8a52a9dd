//! Finalized control-dependency graph and its query interface

use std::collections::{BTreeMap, BTreeSet};

use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;

use region_ir::{FunctionEnv, OpId};

/// Raw, unordered predecessor relation accumulated during the region walk.
pub(crate) type RawPredecessors = BTreeMap<OpId, BTreeSet<OpId>>;

/// Control-dependency edges for one function.
///
/// Per operation, the direct predecessors (operations that must execute no
/// later than it) and the mirrored successors, both sorted by program
/// order. Immutable once built; safe to query from multiple threads.
/// Mutating the underlying IR invalidates the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlDependencyGraph {
    sorted_predecessors: BTreeMap<OpId, Vec<OpId>>,
    sorted_successors: BTreeMap<OpId, Vec<OpId>>,
}

impl ControlDependencyGraph {
    /// Builds the sorted, mirrored adjacency from the raw predecessor
    /// relation, consuming it.
    pub(crate) fn finalize(func: &FunctionEnv, raw: RawPredecessors) -> Self {
        let mut graph = Self::default();
        for (op, preds) in raw {
            if preds.is_empty() {
                continue;
            }
            for &pred in &preds {
                graph.sorted_successors.entry(pred).or_default().push(op);
            }
            graph
                .sorted_predecessors
                .insert(op, preds.into_iter().collect());
        }
        for list in graph.sorted_predecessors.values_mut() {
            list.sort_by_key(|&op| func.position(op));
        }
        for list in graph.sorted_successors.values_mut() {
            list.sort_by_key(|&op| func.position(op));
        }
        graph
    }

    /// Direct control predecessors of `op`, sorted by program order. Empty
    /// when `op` has none.
    pub fn direct_predecessors(&self, op: OpId) -> &[OpId] {
        self.sorted_predecessors
            .get(&op)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Direct control successors of `op`, sorted by program order. Empty
    /// when `op` has none.
    pub fn direct_successors(&self, op: OpId) -> &[OpId] {
        self.sorted_successors
            .get(&op)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Direct control predecessors of `op` satisfying `filter`.
    pub fn direct_predecessors_filtered<F>(&self, op: OpId, filter: F) -> Vec<OpId>
    where
        F: Fn(OpId) -> bool,
    {
        self.direct_predecessors(op)
            .iter()
            .copied()
            .filter(|&pred| filter(pred))
            .collect()
    }

    /// Direct control successors of `op` satisfying `filter`.
    pub fn direct_successors_filtered<F>(&self, op: OpId, filter: F) -> Vec<OpId>
    where
        F: Fn(OpId) -> bool,
    {
        self.direct_successors(op)
            .iter()
            .copied()
            .filter(|&succ| filter(succ))
            .collect()
    }

    /// Operations that have at least one predecessor.
    pub fn ops_with_predecessors(&self) -> impl Iterator<Item = OpId> + '_ {
        self.sorted_predecessors.keys().copied()
    }

    /// Operations that have at least one successor.
    pub fn ops_with_successors(&self) -> impl Iterator<Item = OpId> + '_ {
        self.sorted_successors.keys().copied()
    }

    pub fn edge_count(&self) -> usize {
        self.sorted_predecessors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_predecessors.is_empty()
    }

    /// Renders the dependency graph in dot format, for debugging.
    pub fn to_dot(&self, func: &FunctionEnv) -> String {
        let mut graph = DiGraph::<String, ()>::new();
        let mut nodes = BTreeMap::new();
        let mut node = |graph: &mut DiGraph<String, ()>, op: OpId| {
            *nodes
                .entry(op)
                .or_insert_with(|| graph.add_node(format!("{}@{}", func.op(op).kind, func.position(op))))
        };
        for (&op, preds) in &self.sorted_predecessors {
            let to = node(&mut graph, op);
            for &pred in preds {
                let from = node(&mut graph, pred);
                graph.add_edge(from, to, ());
            }
        }
        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}
