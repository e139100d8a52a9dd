//! Program container and function env handles

use std::cell::RefCell;

use codespan_reporting::diagnostic::Severity;

use crate::function::{
    Block, BlockId, Function, OpId, Operation, Region, RegionId, Value, ValueId, ValueKind,
};

/// Unique identifier for a function in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub usize);

/// A recorded diagnostic.
#[derive(Debug, Clone)]
pub struct Diag {
    pub severity: Severity,
    pub message: String,
}

/// A whole-program unit: an arena of functions plus a diagnostics sink.
///
/// Diagnostics use interior mutability so that read-only consumers (walks,
/// analyses) can report problems without requiring `&mut Program`.
#[derive(Debug, Default)]
pub struct Program {
    functions: Vec<Function>,
    diags: RefCell<Vec<Diag>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, func: Function) -> FuncId {
        let id = FuncId(self.functions.len());
        self.functions.push(func);
        id
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Iterates over all function ids in insertion order.
    pub fn functions(&self) -> impl Iterator<Item = FuncId> {
        (0..self.functions.len()).map(FuncId)
    }

    /// Gets an env handle for a function.
    pub fn function(&self, id: FuncId) -> FunctionEnv<'_> {
        FunctionEnv {
            program: self,
            id,
            data: &self.functions[id.0],
        }
    }

    /// Records a diagnostic.
    pub fn diag(&self, severity: Severity, message: &str) {
        self.diags.borrow_mut().push(Diag {
            severity,
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn error_count(&self) -> usize {
        self.diags
            .borrow()
            .iter()
            .filter(|d| matches!(d.severity, Severity::Bug | Severity::Error))
            .count()
    }

    pub fn diags(&self) -> Vec<Diag> {
        self.diags.borrow().clone()
    }
}

/// Lightweight read-only handle for one function, carrying its id and the
/// enclosing program.
#[derive(Clone, Copy)]
pub struct FunctionEnv<'env> {
    pub program: &'env Program,
    pub id: FuncId,
    data: &'env Function,
}

impl<'env> FunctionEnv<'env> {
    pub fn data(&self) -> &'env Function {
        self.data
    }

    pub fn name(&self) -> &'env str {
        self.data.name()
    }

    pub fn body(&self) -> RegionId {
        self.data.body()
    }

    pub fn op(&self, id: OpId) -> &'env Operation {
        self.data.op(id)
    }

    pub fn block(&self, id: BlockId) -> &'env Block {
        self.data.block(id)
    }

    pub fn region(&self, id: RegionId) -> &'env Region {
        self.data.region(id)
    }

    pub fn value(&self, id: ValueId) -> &'env Value {
        self.data.value(id)
    }

    pub fn value_kind(&self, id: ValueId) -> ValueKind {
        self.data.value(id).kind
    }

    pub fn op_count(&self) -> usize {
        self.data.op_count()
    }

    pub fn value_count(&self) -> usize {
        self.data.value_count()
    }

    pub fn values(&self) -> impl Iterator<Item = ValueId> {
        self.data.values()
    }

    pub fn position(&self, id: OpId) -> u32 {
        self.data.position(id)
    }

    pub fn is_before(&self, a: OpId, b: OpId) -> bool {
        self.data.is_before(a, b)
    }

    pub fn result(&self, op: OpId, index: usize) -> ValueId {
        self.data.result(op, index)
    }

    pub fn walk_ops(&self, f: &mut impl FnMut(OpId)) {
        self.data.walk_ops(f)
    }
}
