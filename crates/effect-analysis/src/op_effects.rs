//! Side-effect classification of operation kinds

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;

/// How an operation kind interacts with stateful resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffectClass {
    /// Known to touch no resources.
    NoEffect,
    /// Creates a new resource handle; needs no ordering edges of its own.
    Declaration,
    /// Accesses resources, read-only.
    ReadOnly,
    /// Accesses resources and may write them.
    ReadWrite,
}

/// Classifies operation kinds for dependency purposes.
///
/// `None` means the oracle has no verdict for the kind; callers must treat
/// such operations conservatively (unknown resources, write semantics).
pub trait EffectOracle {
    fn classify(&self, kind: &str) -> Option<EffectClass>;

    /// Whether `kind` merely forwards its operands to its results. A
    /// forwarding operation that carries resource handles acts as a
    /// declaration for dependency purposes.
    fn is_forwarding(&self, kind: &str) -> bool;
}

static BUILTIN_EFFECTS: Lazy<BTreeMap<&'static str, EffectClass>> = Lazy::new(|| {
    use EffectClass::*;
    BTreeMap::from([
        ("core.const", NoEffect),
        // Identity is not formally pure, but it is safe to treat it as
        // effect-free when computing control dependencies.
        ("core.identity", NoEffect),
        ("vars.handle", Declaration),
        ("vars.read", ReadOnly),
        ("vars.assign", ReadWrite),
        ("vars.assign_add", ReadWrite),
        ("vars.assign_sub", ReadWrite),
    ])
});

static BUILTIN_FORWARDING: Lazy<BTreeSet<&'static str>> =
    Lazy::new(|| BTreeSet::from(["core.identity"]));

/// Table-driven [`EffectOracle`]: the builtin kinds plus per-instance
/// registrations, which take precedence over the builtin table.
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    registered: BTreeMap<String, EffectClass>,
    forwarding: BTreeSet<String>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overrides) the classification of an operation kind.
    pub fn register(&mut self, kind: &str, class: EffectClass) -> &mut Self {
        self.registered.insert(kind.to_string(), class);
        self
    }

    /// Marks an operation kind as forwarding its operands to its results.
    pub fn register_forwarding(&mut self, kind: &str) -> &mut Self {
        self.forwarding.insert(kind.to_string());
        self
    }
}

impl EffectOracle for EffectRegistry {
    fn classify(&self, kind: &str) -> Option<EffectClass> {
        self.registered
            .get(kind)
            .or_else(|| BUILTIN_EFFECTS.get(kind))
            .copied()
    }

    fn is_forwarding(&self, kind: &str) -> bool {
        self.forwarding.contains(kind) || BUILTIN_FORWARDING.contains(kind)
    }
}
