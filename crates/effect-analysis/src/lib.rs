//! Control-dependency side-effect analysis for region-nested programs.
//!
//! Computes, per function, the ordering edges between side-effecting
//! operations that later transformations must preserve when reordering or
//! parallelizing. Resource identity comes from an alias oracle, effect
//! classification from an effect oracle; operations touching resources of
//! unknown identity are handled as conservative barriers. The result is an
//! immutable per-function graph of program-order-sorted predecessor and
//! successor lists.

mod access_tracker;
pub mod graph;
pub mod op_effects;
pub mod resource_alias;
pub mod side_effect_analysis;

pub use graph::ControlDependencyGraph;
pub use op_effects::{EffectClass, EffectOracle, EffectRegistry};
pub use resource_alias::{ResourceAliasAnalysis, ResourceAliasOracle, ResourceId};
pub use side_effect_analysis::{
    analyze_function, SideEffectAnalysis, SideEffectAnalysisDisplay,
};
