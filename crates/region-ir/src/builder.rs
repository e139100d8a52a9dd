//! Append-only function construction

use crate::function::{
    Block, BlockId, Function, OpId, Operation, Region, RegionId, Value, ValueDef, ValueId,
    ValueKind,
};

/// Builds a [`Function`] in program order.
///
/// The builder maintains a cursor into the region/block currently under
/// construction. Operations are appended to the current block;
/// [`FunctionBuilder::enter_region`] opens a nested region on an operation
/// and moves the cursor inside it, [`FunctionBuilder::exit_region`] moves
/// back out. Program-order positions are assigned from a single monotone
/// counter, so the parent of a nested region always precedes the region's
/// contents.
///
/// Misuse (closing the function body, finishing with an open nested region)
/// is a construction-contract violation and panics.
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    ops: Vec<Operation>,
    blocks: Vec<Block>,
    regions: Vec<Region>,
    values: Vec<Value>,
    body: RegionId,
    region_stack: Vec<RegionId>,
    block_stack: Vec<BlockId>,
    next_position: u32,
}

impl FunctionBuilder {
    /// Creates a builder for a function named `name`, with the body region
    /// and its entry block open.
    pub fn new(name: &str) -> Self {
        let body = RegionId(0);
        let entry = BlockId(0);
        Self {
            name: name.to_string(),
            ops: Vec::new(),
            blocks: vec![Block::default()],
            regions: vec![Region {
                blocks: vec![entry],
            }],
            values: Vec::new(),
            body,
            region_stack: vec![body],
            block_stack: vec![entry],
            next_position: 0,
        }
    }

    fn current_block(&self) -> BlockId {
        *self
            .block_stack
            .last()
            .expect("builder has no open block")
    }

    fn new_value(&mut self, kind: ValueKind, def: ValueDef) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(Value { kind, def });
        id
    }

    /// Appends an argument to the current block.
    pub fn block_arg(&mut self, kind: ValueKind) -> ValueId {
        let block = self.current_block();
        let index = self.blocks[block.0 as usize].args.len();
        let value = self.new_value(kind, ValueDef::BlockArg { block, index });
        self.blocks[block.0 as usize].args.push(value);
        value
    }

    /// Appends an operation of the given kind to the current block,
    /// creating one result value per entry of `result_kinds`.
    pub fn op(&mut self, kind: &str, operands: &[ValueId], result_kinds: &[ValueKind]) -> OpId {
        let id = OpId(self.ops.len() as u32);
        let results = result_kinds
            .iter()
            .enumerate()
            .map(|(index, &k)| self.new_value(k, ValueDef::OpResult { op: id, index }))
            .collect();
        let position = self.next_position;
        self.next_position += 1;
        self.ops.push(Operation {
            kind: kind.to_string(),
            operands: operands.to_vec(),
            results,
            regions: Vec::new(),
            position,
        });
        let block = self.current_block();
        self.blocks[block.0 as usize].ops.push(id);
        id
    }

    /// The `index`-th result of `op`.
    pub fn result(&self, op: OpId, index: usize) -> ValueId {
        self.ops[op.0 as usize].results[index]
    }

    /// Opens a fresh nested region owned by `op` and makes its entry block
    /// current.
    pub fn enter_region(&mut self, op: OpId) -> RegionId {
        let entry = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::default());
        let region = RegionId(self.regions.len() as u32);
        self.regions.push(Region {
            blocks: vec![entry],
        });
        self.ops[op.0 as usize].regions.push(region);
        self.region_stack.push(region);
        self.block_stack.push(entry);
        region
    }

    /// Closes the innermost nested region, returning the cursor to the
    /// enclosing block. Panics when called at the function body.
    pub fn exit_region(&mut self) {
        assert!(
            self.region_stack.len() > 1,
            "exit_region called at the function body"
        );
        self.region_stack.pop();
        self.block_stack.pop();
    }

    /// Starts a new block in the current region and makes it current.
    pub fn start_block(&mut self) -> BlockId {
        let block = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::default());
        let region = *self
            .region_stack
            .last()
            .expect("builder has no open region");
        self.regions[region.0 as usize].blocks.push(block);
        *self
            .block_stack
            .last_mut()
            .expect("builder has no open block") = block;
        block
    }

    /// Finishes construction. Panics if a nested region is still open.
    pub fn finish(self) -> Function {
        assert!(
            self.region_stack.len() == 1,
            "finish called with {} open nested region(s)",
            self.region_stack.len() - 1
        );
        Function {
            name: self.name,
            ops: self.ops,
            blocks: self.blocks,
            regions: self.regions,
            values: self.values,
            body: self.body,
        }
    }
}
