//! Region-recursive construction of control-dependency edges
//!
//! Side effects are expressed only implicitly, through resource identity:
//! two operations must keep their relative order iff they may touch a
//! common resource (or one of them touches a resource of unknown identity)
//! and at least one of them writes. This module walks a function body
//! region by region, tracks per-resource access state, and emits a
//! conservative predecessor relation that the finalized graph exposes in
//! program order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Formatter};

use codespan_reporting::diagnostic::Severity;
use itertools::Itertools;
use log::debug;

use region_ir::{FuncId, FunctionEnv, OpId, Program, RegionId, ValueId, ValueKind};

use crate::access_tracker::ResourceAccessTracker;
use crate::graph::{ControlDependencyGraph, RawPredecessors};
use crate::op_effects::{EffectClass, EffectOracle};
use crate::resource_alias::{ResourceAliasAnalysis, ResourceAliasOracle, ResourceId};

/// Returns a set that contains only the unknown resource id.
fn unknown_resource_set() -> BTreeSet<ResourceId> {
    BTreeSet::from([ResourceId::UNKNOWN])
}

/// Resource-typed operands and results of `op`.
fn resource_values<'env>(
    func: FunctionEnv<'env>,
    op: OpId,
) -> impl Iterator<Item = ValueId> + 'env {
    let operation = func.op(op);
    operation
        .operands
        .iter()
        .chain(operation.results.iter())
        .copied()
        .filter(move |&value| func.value_kind(value) == ValueKind::Resource)
}

/// All resources that could be accessed by `op`, or `{UNKNOWN}` if any one
/// of them cannot be resolved.
fn accessed_resources(
    func: FunctionEnv,
    op: OpId,
    alias: &dyn ResourceAliasOracle,
) -> BTreeSet<ResourceId> {
    let mut resources = BTreeSet::new();
    for value in resource_values(func, op) {
        if alias.is_unknown_resource(value) {
            return unknown_resource_set();
        }
        resources.extend(alias.resource_ids(value).iter().copied());
    }
    resources
}

/// Whether `op` is a resource declaration. Declarations create handles and
/// need no ordering edges of their own; a forwarding op that carries
/// resource handles counts as one.
fn op_is_declaration(
    func: FunctionEnv,
    op: OpId,
    alias: &dyn ResourceAliasOracle,
    effects: &dyn EffectOracle,
) -> bool {
    let kind = func.op(op).kind.as_str();
    match effects.classify(kind) {
        Some(EffectClass::Declaration) => true,
        _ => effects.is_forwarding(kind) && !accessed_resources(func, op, alias).is_empty(),
    }
}

/// Analyzes one region as an independent scope and returns its raw
/// predecessor relation. Nested regions are analyzed recursively and their
/// entries merged into the parent's map; the operation housing them is
/// handled like any other op of the parent region, which conservatively
/// anchors nested side effects to it.
fn analyze_region(
    region: RegionId,
    func: FunctionEnv,
    alias: &dyn ResourceAliasOracle,
    effects: &dyn EffectOracle,
) -> RawPredecessors {
    let mut preds = RawPredecessors::new();
    let mut tracker = ResourceAccessTracker::default();

    for &block in &func.region(region).blocks {
        for &op in &func.block(block).ops {
            for &child in &func.op(op).regions {
                let child_preds = analyze_region(child, func, alias, effects);
                preds.extend(child_preds);
            }

            if op_is_declaration(func, op, alias, effects) {
                continue;
            }

            let kind = func.op(op).kind.as_str();
            let class = effects.classify(kind);
            let resources = match class {
                Some(EffectClass::NoEffect) => continue,
                Some(EffectClass::ReadOnly) | Some(EffectClass::ReadWrite) => {
                    accessed_resources(func, op, alias)
                }
                // Declarations were handled above.
                Some(EffectClass::Declaration) => unknown_resource_set(),
                // No verdict at all means conservative unknown-write
                // semantics; worth surfacing, since every such op becomes a
                // barrier.
                None => {
                    func.program.diag(
                        Severity::Warning,
                        &format!(
                            "no effect classification for `{}` in `{}`, treating as a write to an unknown resource",
                            kind,
                            func.name()
                        ),
                    );
                    unknown_resource_set()
                }
            };
            assert!(
                !resources.is_empty(),
                "effectful op `{}` in `{}` accesses no resources",
                kind,
                func.name()
            );

            let is_unknown = resources.contains(&ResourceId::UNKNOWN);
            let read_only = class == Some(EffectClass::ReadOnly);
            let mut indirectly_tracked_unknown_access = false;
            // First add edges from known resources.
            if is_unknown {
                for resource in tracker.tracked_resources() {
                    tracker.add_predecessors_for_access(resource, op, read_only, &mut preds);
                    indirectly_tracked_unknown_access |=
                        tracker.unknown_access_indirectly_tracked(resource, read_only);
                }
            } else {
                for resource in resources {
                    tracker.add_predecessors_for_access(resource, op, read_only, &mut preds);
                    indirectly_tracked_unknown_access |=
                        tracker.unknown_access_indirectly_tracked(resource, read_only);
                    // Track immediately, so multiple resources touched by
                    // one op see each other's updates within the same step.
                    tracker.track_access(resource, op, read_only);
                }
            }
            // If not indirectly tracked, add edges from the unknown
            // resource.
            if !indirectly_tracked_unknown_access {
                tracker.add_predecessors_for_access(ResourceId::UNKNOWN, op, read_only, &mut preds);
            }
            if is_unknown {
                tracker.track_access(ResourceId::UNKNOWN, op, read_only);
            }
        }
    }
    preds
}

/// Analyzes a function body against the given alias result, producing the
/// finalized control-dependency graph.
pub fn analyze_function(
    func: &FunctionEnv,
    alias: &dyn ResourceAliasOracle,
    effects: &dyn EffectOracle,
) -> ControlDependencyGraph {
    let raw = analyze_region(func.body(), *func, alias, effects);
    ControlDependencyGraph::finalize(func, raw)
}

/// Whole-program side-effect analysis: one finalized graph per function.
///
/// Each function is analyzed against its own alias result; the graphs are
/// immutable after construction.
pub struct SideEffectAnalysis {
    graphs: BTreeMap<FuncId, ControlDependencyGraph>,
}

impl SideEffectAnalysis {
    pub fn new(program: &Program, effects: &dyn EffectOracle) -> Self {
        let mut graphs = BTreeMap::new();
        for id in program.functions() {
            let func = program.function(id);
            let alias = ResourceAliasAnalysis::new(&func, effects);
            debug!("analyzing side effects of `{}`", func.name());
            graphs.insert(id, analyze_function(&func, &alias, effects));
        }
        Self { graphs }
    }

    /// The finalized graph for `id`. Panics when `id` was not part of the
    /// analyzed program.
    pub fn graph(&self, id: FuncId) -> &ControlDependencyGraph {
        self.graphs
            .get(&id)
            .expect("function not part of the analyzed program")
    }

    pub fn graphs(&self) -> impl Iterator<Item = (FuncId, &ControlDependencyGraph)> {
        self.graphs.iter().map(|(id, graph)| (*id, graph))
    }
}

/// Display wrapper dumping per-op predecessor lists, for debugging.
pub struct SideEffectAnalysisDisplay<'a> {
    pub program: &'a Program,
    pub analysis: &'a SideEffectAnalysis,
}

impl fmt::Display for SideEffectAnalysisDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n********* Result of side-effect analysis *********\n")?;
        for (id, graph) in self.analysis.graphs() {
            let func = self.program.function(id);
            writeln!(f, "side-effect analysis for {}: [", func.name())?;
            for op in graph.ops_with_predecessors() {
                let preds = graph
                    .direct_predecessors(op)
                    .iter()
                    .map(|&pred| func.position(pred))
                    .join(", ");
                writeln!(
                    f,
                    "  {}@{} <- [{}]",
                    func.op(op).kind,
                    func.position(op),
                    preds
                )?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op_effects::EffectRegistry;
    use region_ir::{FunctionBuilder, Program};

    fn analyzed(func: region_ir::Function) -> (Program, FuncId) {
        let mut program = Program::new();
        let id = program.add_function(func);
        (program, id)
    }

    #[test]
    fn test_write_read_read_write_chain() {
        let mut b = FunctionBuilder::new("f");
        let handle = b.op("vars.handle", &[], &[ValueKind::Resource]);
        let hv = b.result(handle, 0);
        let cst = b.op("core.const", &[], &[ValueKind::Plain]);
        let cv = b.result(cst, 0);
        let w1 = b.op("vars.assign", &[hv, cv], &[]);
        let r1a = b.op("vars.read", &[hv], &[ValueKind::Plain]);
        let r1b = b.op("vars.read", &[hv], &[ValueKind::Plain]);
        let w2 = b.op("vars.assign", &[hv, cv], &[]);
        let (program, id) = analyzed(b.finish());
        let func = program.function(id);

        let effects = EffectRegistry::new();
        let alias = ResourceAliasAnalysis::new(&func, &effects);
        let graph = analyze_function(&func, &alias, &effects);

        assert_eq!(graph.direct_predecessors(r1a).to_vec(), vec![w1]);
        assert_eq!(graph.direct_predecessors(r1b).to_vec(), vec![w1]);
        // The write links to the pending reads, not to the older write.
        assert_eq!(graph.direct_predecessors(w2).to_vec(), vec![r1a, r1b]);
        assert_eq!(graph.direct_successors(w1).to_vec(), vec![r1a, r1b]);
        // Reads never order against each other.
        assert!(!graph.direct_predecessors(r1b).contains(&r1a));
    }

    #[test]
    fn test_declarations_stay_edge_free() {
        let mut b = FunctionBuilder::new("f");
        let handle = b.op("vars.handle", &[], &[ValueKind::Resource]);
        let hv = b.result(handle, 0);
        let cst = b.op("core.const", &[], &[ValueKind::Plain]);
        let cv = b.result(cst, 0);
        let w = b.op("vars.assign", &[hv, cv], &[]);
        let fwd = b.op("core.identity", &[hv], &[ValueKind::Resource]);
        let (program, id) = analyzed(b.finish());
        let func = program.function(id);

        let effects = EffectRegistry::new();
        let alias = ResourceAliasAnalysis::new(&func, &effects);
        let graph = analyze_function(&func, &alias, &effects);

        assert!(graph.direct_predecessors(handle).is_empty());
        assert!(graph.direct_successors(handle).is_empty());
        // A forwarding op that carries a resource counts as a declaration.
        assert!(graph.direct_predecessors(fwd).is_empty());
        assert!(graph.direct_successors(fwd).is_empty());
        assert!(graph.direct_predecessors(w).is_empty());
    }

    #[test]
    fn test_unknown_write_orders_later_concrete_write() {
        let mut b = FunctionBuilder::new("f");
        let unresolved = b.block_arg(ValueKind::Resource);
        let handle = b.op("vars.handle", &[], &[ValueKind::Resource]);
        let hv = b.result(handle, 0);
        let cst = b.op("core.const", &[], &[ValueKind::Plain]);
        let cv = b.result(cst, 0);
        let wu = b.op("vars.assign", &[unresolved, cv], &[]);
        let w1 = b.op("vars.assign", &[hv, cv], &[]);
        let (program, id) = analyzed(b.finish());
        let func = program.function(id);

        let effects = EffectRegistry::new();
        let alias = ResourceAliasAnalysis::new(&func, &effects);
        let graph = analyze_function(&func, &alias, &effects);

        assert_eq!(graph.direct_predecessors(w1).to_vec(), vec![wu]);
    }

    #[test]
    fn test_unknown_read_between_writes() {
        let mut b = FunctionBuilder::new("f");
        let unresolved = b.block_arg(ValueKind::Resource);
        let handle = b.op("vars.handle", &[], &[ValueKind::Resource]);
        let hv = b.result(handle, 0);
        let cst = b.op("core.const", &[], &[ValueKind::Plain]);
        let cv = b.result(cst, 0);
        let w1 = b.op("vars.assign", &[hv, cv], &[]);
        let ru = b.op("vars.read", &[unresolved], &[ValueKind::Plain]);
        let w2 = b.op("vars.assign", &[hv, cv], &[]);
        let (program, id) = analyzed(b.finish());
        let func = program.function(id);

        let effects = EffectRegistry::new();
        let alias = ResourceAliasAnalysis::new(&func, &effects);
        let graph = analyze_function(&func, &alias, &effects);

        // The unknown read orders against the earlier write; its own edge
        // to the unknown barrier is subsumed by that record.
        assert_eq!(graph.direct_predecessors(ru).to_vec(), vec![w1]);
        // The later concrete write orders against both the last write and
        // the pending unknown read, with no duplicates.
        assert_eq!(graph.direct_predecessors(w2).to_vec(), vec![w1, ru]);
    }

    #[test]
    fn test_unclassified_op_acts_as_barrier() {
        let mut b = FunctionBuilder::new("f");
        let handle = b.op("vars.handle", &[], &[ValueKind::Resource]);
        let hv = b.result(handle, 0);
        let cst = b.op("core.const", &[], &[ValueKind::Plain]);
        let cv = b.result(cst, 0);
        let w1 = b.op("vars.assign", &[hv, cv], &[]);
        let mystery = b.op("ext.launch_missiles", &[], &[]);
        let r1 = b.op("vars.read", &[hv], &[ValueKind::Plain]);
        let (program, id) = analyzed(b.finish());
        let func = program.function(id);

        let effects = EffectRegistry::new();
        let alias = ResourceAliasAnalysis::new(&func, &effects);
        let graph = analyze_function(&func, &alias, &effects);

        // The unclassified op gets unknown-write semantics; it orders
        // against the earlier write and the later read orders against it.
        assert_eq!(graph.direct_predecessors(mystery).to_vec(), vec![w1]);
        assert_eq!(graph.direct_predecessors(r1).to_vec(), vec![mystery]);
        // The conservative fallback is surfaced as a warning, not an error.
        assert!(!program.has_errors());
        assert!(program
            .diags()
            .iter()
            .any(|d| d.message.contains("ext.launch_missiles")));
    }

    #[test]
    fn test_nested_region_edges_are_merged() {
        let mut b = FunctionBuilder::new("f");
        let handle = b.op("vars.handle", &[], &[ValueKind::Resource]);
        let hv = b.result(handle, 0);
        let cst = b.op("core.const", &[], &[ValueKind::Plain]);
        let cv = b.result(cst, 0);
        let w1 = b.op("vars.assign", &[hv, cv], &[]);
        let brancher = b.op("ctl.if", &[cv], &[]);
        b.enter_region(brancher);
        let inner_read = b.op("vars.read", &[hv], &[ValueKind::Plain]);
        let inner_write = b.op("vars.assign", &[hv, cv], &[]);
        b.exit_region();
        let after = b.op("vars.read", &[hv], &[ValueKind::Plain]);
        let (program, id) = analyzed(b.finish());
        let func = program.function(id);

        let effects = EffectRegistry::new();
        let alias = ResourceAliasAnalysis::new(&func, &effects);
        let graph = analyze_function(&func, &alias, &effects);

        // The nested region is its own scope: its first access sees no
        // prior state, and the write-after-read edge inside it survives the
        // merge to the parent.
        assert!(graph.direct_predecessors(inner_read).is_empty());
        assert_eq!(
            graph.direct_predecessors(inner_write).to_vec(),
            vec![inner_read]
        );
        // The region-holding op is unclassified, i.e. an unknown-write
        // barrier anchoring the nested effects in the parent scope.
        assert_eq!(graph.direct_predecessors(brancher).to_vec(), vec![w1]);
        assert_eq!(graph.direct_predecessors(after).to_vec(), vec![brancher]);
    }

    #[test]
    fn test_multi_resource_op_sees_its_own_updates() {
        let mut b = FunctionBuilder::new("f");
        let h1 = b.op("vars.handle", &[], &[ValueKind::Resource]);
        let v1 = b.result(h1, 0);
        let h2 = b.op("vars.handle", &[], &[ValueKind::Resource]);
        let v2 = b.result(h2, 0);
        let cst = b.op("core.const", &[], &[ValueKind::Plain]);
        let cv = b.result(cst, 0);
        let w1 = b.op("vars.assign", &[v1, cv], &[]);
        let w2 = b.op("vars.assign", &[v2, cv], &[]);
        // One op writing both resources at once.
        let wboth = b.op("vars.assign", &[v1, v2], &[]);
        let (program, id) = analyzed(b.finish());
        let func = program.function(id);

        let effects = EffectRegistry::new();
        let alias = ResourceAliasAnalysis::new(&func, &effects);
        let graph = analyze_function(&func, &alias, &effects);

        assert_eq!(graph.direct_predecessors(wboth).to_vec(), vec![w1, w2]);
    }

    #[test]
    #[should_panic(expected = "accesses no resources")]
    fn test_classified_op_without_resources_is_a_fault() {
        let mut b = FunctionBuilder::new("f");
        // Read-classified, but carries no resource operand or result.
        let _ = b.op("vars.read", &[], &[ValueKind::Plain]);
        let (program, id) = analyzed(b.finish());
        let func = program.function(id);

        let effects = EffectRegistry::new();
        let alias = ResourceAliasAnalysis::new(&func, &effects);
        let _ = analyze_function(&func, &alias, &effects);
    }
}
