//! Function IR data structures

/// Unique identifier for an operation within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub u32);

/// Unique identifier for a block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Unique identifier for a region within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

/// Unique identifier for a value within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

/// Distinguishes plain values from stateful resource handles.
///
/// Only `Resource` values participate in alias analysis; effect analyses
/// filter operands and results down to resource values before asking for
/// their identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Plain,
    Resource,
}

/// Where a value is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDef {
    /// The `index`-th result of `op`.
    OpResult { op: OpId, index: usize },
    /// The `index`-th argument of `block`.
    BlockArg { block: BlockId, index: usize },
}

/// A value in the function, either an op result or a block argument.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub def: ValueDef,
}

/// An operation: a named kind applied to operands, producing results, and
/// possibly owning nested regions.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Kind name, e.g. `"vars.assign"`. Effect classification is keyed by
    /// this name.
    pub kind: String,
    pub operands: Vec<ValueId>,
    pub results: Vec<ValueId>,
    /// Nested regions owned by this operation, in declaration order.
    pub regions: Vec<RegionId>,
    /// Program-order index within the enclosing function. Assigned
    /// monotonically at build time in pre-order, so an operation always
    /// precedes the operations inside its nested regions. Comparing
    /// positions of two operations is only meaningful within one function.
    pub position: u32,
}

/// An ordered list of operations with optional block arguments.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub args: Vec<ValueId>,
    pub ops: Vec<OpId>,
}

/// An ordered list of blocks.
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub blocks: Vec<BlockId>,
}

/// A function body: arenas of operations, blocks, regions and values, plus
/// the root region id. Construct with [`crate::FunctionBuilder`].
#[derive(Debug, Clone)]
pub struct Function {
    pub(crate) name: String,
    pub(crate) ops: Vec<Operation>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) regions: Vec<Region>,
    pub(crate) values: Vec<Value>,
    pub(crate) body: RegionId,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root region holding the function body.
    pub fn body(&self) -> RegionId {
        self.body
    }

    pub fn op(&self, id: OpId) -> &Operation {
        &self.ops[id.0 as usize]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.0 as usize]
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Iterates over all value ids in the function.
    pub fn values(&self) -> impl Iterator<Item = ValueId> {
        (0..self.values.len() as u32).map(ValueId)
    }

    /// Program-order index of `id` within this function.
    pub fn position(&self, id: OpId) -> u32 {
        self.op(id).position
    }

    /// Whether `a` executes before `b` in program order. Only valid for
    /// operations of the same function.
    pub fn is_before(&self, a: OpId, b: OpId) -> bool {
        self.position(a) < self.position(b)
    }

    /// The `index`-th result of `op`.
    pub fn result(&self, op: OpId, index: usize) -> ValueId {
        self.op(op).results[index]
    }

    /// Visits every operation in the function in program (pre-)order.
    pub fn walk_ops(&self, f: &mut impl FnMut(OpId)) {
        self.walk_region(self.body, f);
    }

    fn walk_region(&self, region: RegionId, f: &mut impl FnMut(OpId)) {
        for &block in &self.region(region).blocks {
            for &op in &self.block(block).ops {
                f(op);
                for &child in &self.op(op).regions {
                    self.walk_region(child, f);
                }
            }
        }
    }
}
