//! Worklist-based forward fixpoint engine.
//!
//! This module provides the iterative solver at the center of the crate. It
//! drives an analysis-supplied [`OperationVisitor`] over the blocks of a
//! control flow graph until the per-block entity-value maps stabilize.
//!
//! # Algorithm
//!
//! 1. Seed the entry block with the empty map; every other block starts
//!    "not yet computed".
//! 2. While the worklist is non-empty:
//!    a. Check for cooperative cancellation.
//!    b. Compute the block input by merging all *computed* predecessor
//!       outputs; loop-closing edges use the widening back-edge merge.
//!    c. Thread the state through the block's operations via the visitor.
//!    d. If the output changed observationally, enqueue the successors.
//! 3. Freeze the converged states into a [`DataFlowAnalysisResult`].
//!
//! Blocks never enqueued were never reached from the entry; they surface in
//! the result as unreachable with empty maps.
//!
//! # Termination
//!
//! Every merge climbs the lifted map lattice, the per-entity lattice has
//! finite height once back-edge widening collapses oscillating values, and a
//! block is only re-enqueued when a predecessor's output actually changed.
//! Together these bound the number of visits per block.
//!
//! # Complexity
//!
//! For reducible graphs the engine converges in O(n · h) block visits, where
//! n is the block count and h the effective lattice height.

use std::collections::VecDeque;

use crate::{
    cfg::BlockId,
    dataflow::{
        context::AnalysisContext,
        data::AnalysisData,
        domain::AbstractValueDomain,
        result::{BlockAnalysisResult, DataFlowAnalysisResult},
    },
    Error, Result,
};

/// The transfer-function seam between the engine and a concrete analysis.
///
/// Given one operation and the entity-value map flowing into it, a visitor
/// returns the map flowing out. The engine threads the map through a block's
/// operations in order and never interprets operations itself.
///
/// Visitors may intern new entities through the context while visiting; that
/// is the expected way storage locations come into existence.
pub trait OperationVisitor<Op> {
    /// The value domain this visitor computes over.
    type Domain: AbstractValueDomain;

    /// Called once before each block visit, including revisits.
    ///
    /// Stateful visitors use this to reset any intra-block bookkeeping; the
    /// default implementation does nothing.
    fn visit_block_start(&mut self, block: BlockId) {
        let _ = block;
    }

    /// Applies one operation to the abstract state.
    ///
    /// # Arguments
    ///
    /// * `block` - The block currently being visited
    /// * `operation` - The operation to interpret
    /// * `state` - The entity-value map flowing into the operation
    /// * `context` - The run's context, mutable for entity interning
    ///
    /// # Returns
    ///
    /// The entity-value map flowing out of the operation.
    fn visit_operation(
        &mut self,
        block: BlockId,
        operation: &Op,
        state: AnalysisData<<Self::Domain as AbstractValueDomain>::Value>,
        context: &mut AnalysisContext<'_, Op, Self::Domain>,
    ) -> AnalysisData<<Self::Domain as AbstractValueDomain>::Value>;
}

/// The worklist-based forward data flow solver.
///
/// One engine instance drives one run; it records iteration statistics that
/// can be inspected afterwards.
///
/// # Usage
///
/// ```rust,ignore
/// let mut engine = DataFlowEngine::new();
/// let result = engine.run(&mut context, &mut visitor)?;
/// println!("converged after {} block visits", engine.block_visits());
/// ```
#[derive(Debug, Default)]
pub struct DataFlowEngine {
    /// Number of block visits performed by the last run.
    block_visits: usize,
}

impl DataFlowEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of block visits performed by the last run.
    #[must_use]
    pub const fn block_visits(&self) -> usize {
        self.block_visits
    }

    /// Runs the analysis to a fixpoint.
    ///
    /// # Arguments
    ///
    /// * `context` - The run's context; exclusive to this run
    /// * `visitor` - The analysis-supplied transfer function
    ///
    /// # Returns
    ///
    /// The converged per-block results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when the context's cancellation token is
    /// signalled between block visits. A cancelled run publishes nothing.
    pub fn run<Op, D, V>(
        &mut self,
        context: &mut AnalysisContext<'_, Op, D>,
        visitor: &mut V,
    ) -> Result<DataFlowAnalysisResult<D::Value>>
    where
        D: AbstractValueDomain,
        V: OperationVisitor<Op, Domain = D>,
    {
        let cfg = context.cfg();
        let block_count = cfg.block_count();
        let entry = cfg.entry();

        self.block_visits = 0;

        let mut inputs: Vec<Option<AnalysisData<D::Value>>> = vec![None; block_count];
        let mut outputs: Vec<Option<AnalysisData<D::Value>>> = vec![None; block_count];
        let mut queued = vec![false; block_count];
        let mut worklist: VecDeque<usize> = VecDeque::with_capacity(block_count);

        log::debug!(
            target: "dataflow-engine",
            "running {} over {} blocks",
            context.owner(),
            block_count
        );

        worklist.push_back(entry.index());
        queued[entry.index()] = true;

        while let Some(current) = worklist.pop_front() {
            queued[current] = false;

            if context.cancellation().is_cancelled() {
                log::debug!(
                    target: "dataflow-engine",
                    "cancelled after {} block visits",
                    self.block_visits
                );
                return Err(Error::Cancelled);
            }
            self.block_visits += 1;

            let block_id = BlockId::new(current);
            let input = if current == entry.index() {
                // The entry starts from the empty map: every entity at the
                // domain default.
                AnalysisData::new()
            } else {
                match Self::merge_predecessors(context, &outputs, block_id) {
                    Some(input) => input,
                    // No predecessor has been computed yet; nothing to do.
                    None => continue,
                }
            };

            log::trace!(target: "dataflow-engine", "visiting {block_id}");
            inputs[current] = Some(input.clone());

            let mut state = input;
            visitor.visit_block_start(block_id);
            if let Some(block) = cfg.block(block_id) {
                for operation in block.operations() {
                    state = visitor.visit_operation(block_id, operation, state, context);
                }
            }
            context.data_domain().prune(&mut state);

            let changed = match outputs[current].as_ref() {
                Some(previous) => !context.data_domain().equals(previous, &state),
                None => true,
            };
            outputs[current] = Some(state);

            if changed {
                for edge in cfg.successors(block_id) {
                    let successor = edge.target().index();
                    if !queued[successor] {
                        worklist.push_back(successor);
                        queued[successor] = true;
                    }
                }
            }
        }

        log::debug!(
            target: "dataflow-engine",
            "converged after {} block visits",
            self.block_visits
        );

        let blocks = inputs
            .into_iter()
            .zip(outputs)
            .enumerate()
            .map(|(index, (input, output))| {
                let is_reachable = input.is_some();
                BlockAnalysisResult::new(
                    BlockId::new(index),
                    input.unwrap_or_default(),
                    output.unwrap_or_default(),
                    is_reachable,
                )
            })
            .collect();

        Ok(DataFlowAnalysisResult::new(context.owner().clone(), blocks))
    }

    /// Merges the computed predecessor outputs into a block input.
    ///
    /// Ordinary edges merge pointwise; loop-closing edges are folded in last
    /// through the widening back-edge merge. Predecessors without a computed
    /// output contribute nothing ("not yet computed" is the merge identity).
    fn merge_predecessors<Op, D>(
        context: &AnalysisContext<'_, Op, D>,
        outputs: &[Option<AnalysisData<D::Value>>],
        block: BlockId,
    ) -> Option<AnalysisData<D::Value>>
    where
        D: AbstractValueDomain,
    {
        let cfg = context.cfg();
        let data_domain = context.data_domain();
        let mut merged: Option<AnalysisData<D::Value>> = None;

        for edge in cfg.predecessors(block) {
            if cfg.is_back_edge(edge) {
                continue;
            }
            let Some(output) = outputs[edge.source().index()].as_ref() else {
                continue;
            };
            merged = Some(match merged {
                None => output.clone(),
                Some(accumulated) => data_domain.merge(&accumulated, output),
            });
        }

        for edge in cfg.predecessors(block) {
            if !cfg.is_back_edge(edge) {
                continue;
            }
            let Some(output) = outputs[edge.source().index()].as_ref() else {
                continue;
            };
            let forward = merged.take().unwrap_or_default();
            merged = Some(data_domain.merge_for_back_edge(&forward, output));
        }

        merged
    }
}
