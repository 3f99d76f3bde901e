//! Immutable analysis results.
//!
//! Once the engine converges, it freezes the per-block states into a
//! [`DataFlowAnalysisResult`]: one [`BlockAnalysisResult`] per basic block,
//! carrying the resolved input and output maps and a reachability flag.
//! Results are pure data; nothing in them is recomputed or mutated after
//! construction, which is what makes them safe to share behind an [`Arc`]
//! and cache across consumers.
//!
//! [`Arc`]: std::sync::Arc

use crate::{
    cfg::BlockId,
    dataflow::{data::AnalysisData, entity::EntityId},
    ir::OwningSymbol,
};

/// The converged state of a single basic block.
///
/// For unreachable blocks both maps are empty and
/// [`is_reachable`](Self::is_reachable) is `false`; an empty map on a
/// *reachable* block means every entity sits at the domain default.
#[derive(Debug, Clone)]
pub struct BlockAnalysisResult<V> {
    /// The block this result describes.
    block: BlockId,
    /// The resolved entity-value map on block entry.
    input: AnalysisData<V>,
    /// The resolved entity-value map on block exit.
    output: AnalysisData<V>,
    /// Whether the fixpoint iteration ever reached this block.
    is_reachable: bool,
}

impl<V> BlockAnalysisResult<V> {
    /// Freezes a block's converged state.
    pub(crate) fn new(
        block: BlockId,
        input: AnalysisData<V>,
        output: AnalysisData<V>,
        is_reachable: bool,
    ) -> Self {
        Self {
            block,
            input,
            output,
            is_reachable,
        }
    }

    /// Returns the block this result describes.
    #[must_use]
    pub const fn block(&self) -> BlockId {
        self.block
    }

    /// Returns the resolved entity-value map on block entry.
    #[must_use]
    pub fn input(&self) -> &AnalysisData<V> {
        &self.input
    }

    /// Returns the resolved entity-value map on block exit.
    #[must_use]
    pub fn output(&self) -> &AnalysisData<V> {
        &self.output
    }

    /// Returns the materialized input value for `entity`, if any.
    ///
    /// `None` means the entity holds the domain default on entry.
    #[must_use]
    pub fn input_value(&self, entity: EntityId) -> Option<&V> {
        self.input.get(entity)
    }

    /// Returns the materialized output value for `entity`, if any.
    #[must_use]
    pub fn output_value(&self, entity: EntityId) -> Option<&V> {
        self.output.get(entity)
    }

    /// Returns `true` if the block was ever reached from the entry.
    #[must_use]
    pub const fn is_reachable(&self) -> bool {
        self.is_reachable
    }
}

/// The complete, converged result of one analysis run.
///
/// Owns one [`BlockAnalysisResult`] per basic block of the analyzed graph,
/// indexed by [`BlockId`].
#[derive(Debug, Clone)]
pub struct DataFlowAnalysisResult<V> {
    /// The symbol the analyzed graph belongs to.
    owner: OwningSymbol,
    /// Per-block results, indexed by block id.
    blocks: Vec<BlockAnalysisResult<V>>,
}

impl<V> DataFlowAnalysisResult<V> {
    /// Assembles the result collection after convergence.
    pub(crate) fn new(owner: OwningSymbol, blocks: Vec<BlockAnalysisResult<V>>) -> Self {
        Self { owner, blocks }
    }

    /// Returns the symbol the analyzed graph belongs to.
    #[must_use]
    pub fn owner(&self) -> &OwningSymbol {
        &self.owner
    }

    /// Returns the result for `block`, or `None` if out of range.
    #[must_use]
    pub fn block(&self, block: BlockId) -> Option<&BlockAnalysisResult<V>> {
        self.blocks.get(block.index())
    }

    /// Returns all per-block results, indexed by block id.
    #[must_use]
    pub fn blocks(&self) -> &[BlockAnalysisResult<V>] {
        &self.blocks
    }

    /// Returns the number of blocks covered by this result.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}
