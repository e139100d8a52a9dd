//! Resource identity and per-function alias analysis

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;

use region_ir::{FunctionEnv, ValueDef, ValueId, ValueKind};

use crate::op_effects::{EffectClass, EffectOracle};

/// Identifier for a stateful resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub i64);

impl ResourceId {
    /// Sentinel for a resource whose identity could not be statically
    /// resolved. Distinct from every concrete id.
    pub const UNKNOWN: ResourceId = ResourceId(-1);

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }
}

/// Reports which resources a value may denote.
pub trait ResourceAliasOracle {
    /// Whether `value` is a resource handle whose identity is statically
    /// unresolved.
    fn is_unknown_resource(&self, value: ValueId) -> bool;

    /// The concrete resource ids `value` may alias. Empty for values that
    /// are not resource handles.
    fn resource_ids(&self, value: ValueId) -> &BTreeSet<ResourceId>;
}

static NO_IDS: Lazy<BTreeSet<ResourceId>> = Lazy::new(BTreeSet::new);

/// Per-function alias result.
///
/// Every resource result of a declaration gets a fresh unique id;
/// forwarding operations propagate their operands' ids to the matching
/// results; every other resource-typed value (block arguments included) has
/// unknown identity. Valid only for values of the function it was built
/// for.
#[derive(Debug, Clone, Default)]
pub struct ResourceAliasAnalysis {
    ids: BTreeMap<ValueId, BTreeSet<ResourceId>>,
    unknown: BTreeSet<ValueId>,
    next_id: i64,
}

impl ResourceAliasAnalysis {
    pub fn new(func: &FunctionEnv, effects: &dyn EffectOracle) -> Self {
        let mut analysis = Self::default();

        for value in func.values() {
            if func.value_kind(value) == ValueKind::Resource
                && matches!(func.value(value).def, ValueDef::BlockArg { .. })
            {
                analysis.unknown.insert(value);
            }
        }

        func.walk_ops(&mut |op_id| {
            let op = func.op(op_id);
            if effects.classify(&op.kind) == Some(EffectClass::Declaration) {
                for &result in &op.results {
                    if func.value_kind(result) == ValueKind::Resource {
                        let id = analysis.fresh_id();
                        analysis.ids.insert(result, BTreeSet::from([id]));
                    }
                }
            } else if effects.is_forwarding(&op.kind) {
                for (&operand, &result) in op.operands.iter().zip(op.results.iter()) {
                    if func.value_kind(result) != ValueKind::Resource {
                        continue;
                    }
                    match analysis.ids.get(&operand).cloned() {
                        Some(ids) => {
                            analysis.ids.insert(result, ids);
                        }
                        None => {
                            analysis.unknown.insert(result);
                        }
                    }
                }
            } else {
                for &result in &op.results {
                    if func.value_kind(result) == ValueKind::Resource {
                        analysis.unknown.insert(result);
                    }
                }
            }
        });

        analysis
    }

    fn fresh_id(&mut self) -> ResourceId {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl ResourceAliasOracle for ResourceAliasAnalysis {
    fn is_unknown_resource(&self, value: ValueId) -> bool {
        self.unknown.contains(&value)
    }

    fn resource_ids(&self, value: ValueId) -> &BTreeSet<ResourceId> {
        self.ids.get(&value).unwrap_or(&NO_IDS)
    }
}
