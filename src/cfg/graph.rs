//! Control flow graph implementation.
//!
//! This module provides the main [`ControlFlowGraph`] structure that wraps basic
//! blocks with proper graph semantics, plus the [`ControlFlowGraphBuilder`] used
//! to assemble one block and edge at a time.
//!
//! # Construction
//!
//! Graphs are assembled through the builder; block 0 is the entry:
//!
//! ```rust
//! use flowscope::cfg::{CfgEdgeKind, ControlFlowGraphBuilder};
//!
//! let mut builder = ControlFlowGraphBuilder::new();
//! let b0 = builder.add_block(vec!["op"]);
//! let b1 = builder.add_block(Vec::new());
//! builder.add_edge(b0, b1, CfgEdgeKind::Unconditional)?;
//! let cfg = builder.build()?;
//! assert_eq!(cfg.entry(), b0);
//! # Ok::<(), flowscope::Error>(())
//! ```
//!
//! # Lazy Computation
//!
//! Expensive derived structures are computed on first access and cached:
//!
//! - [`reverse_postorder`](ControlFlowGraph::reverse_postorder) - iteration order for the engine
//! - [`dominators`](ControlFlowGraph::dominators) - dominator tree
//! - back-edge classification, consumed through [`is_back_edge`](ControlFlowGraph::is_back_edge)
//!
//! # Thread Safety
//!
//! `ControlFlowGraph` is [`Send`] and [`Sync`] when its operation type is;
//! lazy-initialized fields use [`OnceLock`] for thread-safe initialization.

use std::{collections::HashSet, sync::OnceLock};

use crate::{
    cfg::{BasicBlock, BlockId, CfgEdge, CfgEdgeKind, DominatorTree},
    Error::GraphError,
    Result,
};

/// A control flow graph over basic blocks of generic operations.
///
/// The graph owns its blocks and edges; analyses borrow it read-only for the
/// duration of a run. Entry is always block 0, exit blocks are those without
/// outgoing edges.
///
/// # Back Edges
///
/// An edge closes a loop when its target dominates its source. Producers that
/// already track loop structure can tag edges with [`CfgEdgeKind::Back`];
/// untagged edges are classified lazily via the dominator tree. Both sources
/// of information are honored by [`is_back_edge`](Self::is_back_edge).
#[derive(Debug)]
pub struct ControlFlowGraph<Op> {
    /// The basic blocks, indexed by [`BlockId`].
    blocks: Vec<BasicBlock<Op>>,
    /// All edges of the graph.
    edges: Vec<CfgEdge>,
    /// Outgoing edge indices per block.
    successors: Vec<Vec<usize>>,
    /// Incoming edge indices per block.
    predecessors: Vec<Vec<usize>>,
    /// The entry block (always block 0).
    entry: BlockId,
    /// Blocks without outgoing edges.
    exits: Vec<BlockId>,
    /// Caller-supplied graph version, part of the analysis cache key.
    version: u64,
    /// Lazily computed reverse postorder over reachable blocks.
    reverse_postorder: OnceLock<Vec<BlockId>>,
    /// Lazily computed dominator tree.
    dominators: OnceLock<DominatorTree>,
    /// Lazily computed dominator-derived back edges as (source, target) pairs.
    derived_back_edges: OnceLock<HashSet<(usize, usize)>>,
}

impl<Op> ControlFlowGraph<Op> {
    /// Returns the number of basic blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the block with the given id, or `None` if out of range.
    #[must_use]
    pub fn block(&self, block: BlockId) -> Option<&BasicBlock<Op>> {
        self.blocks.get(block.index())
    }

    /// Returns all basic blocks, indexed by [`BlockId`].
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock<Op>] {
        &self.blocks
    }

    /// Returns the entry block id.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// Returns the exit blocks (blocks without outgoing edges).
    #[must_use]
    pub fn exits(&self) -> &[BlockId] {
        &self.exits
    }

    /// Returns all edges of the graph.
    #[must_use]
    pub fn edges(&self) -> &[CfgEdge] {
        &self.edges
    }

    /// Returns the caller-supplied graph version.
    ///
    /// The version participates in the analysis cache key so a rebuilt graph
    /// for the same symbol does not alias stale cached results.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Iterates the outgoing edges of `block`.
    pub fn successors(&self, block: BlockId) -> impl Iterator<Item = &CfgEdge> {
        self.successors
            .get(block.index())
            .into_iter()
            .flatten()
            .map(|&edge| &self.edges[edge])
    }

    /// Iterates the incoming edges of `block`.
    pub fn predecessors(&self, block: BlockId) -> impl Iterator<Item = &CfgEdge> {
        self.predecessors
            .get(block.index())
            .into_iter()
            .flatten()
            .map(|&edge| &self.edges[edge])
    }

    /// Returns the reachable blocks in reverse postorder, starting at the entry.
    ///
    /// This is the canonical iteration order for forward data flow analysis:
    /// every block appears before its successors, except along back edges.
    /// Blocks unreachable from the entry are not part of the order.
    pub fn reverse_postorder(&self) -> &[BlockId] {
        self.reverse_postorder.get_or_init(|| {
            let mut visited = vec![false; self.blocks.len()];
            let mut postorder = Vec::with_capacity(self.blocks.len());
            let mut stack: Vec<(usize, usize)> = Vec::new();

            visited[self.entry.index()] = true;
            stack.push((self.entry.index(), 0));

            while let Some(&(block, child)) = stack.last() {
                let outgoing = &self.successors[block];
                if child < outgoing.len() {
                    if let Some(frame) = stack.last_mut() {
                        frame.1 += 1;
                    }
                    let next = self.edges[outgoing[child]].target().index();
                    if !visited[next] {
                        visited[next] = true;
                        stack.push((next, 0));
                    }
                } else {
                    stack.pop();
                    postorder.push(BlockId::new(block));
                }
            }

            postorder.reverse();
            postorder
        })
    }

    /// Returns the dominator tree, computing it on first access.
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators.get_or_init(|| {
            let pred_blocks: Vec<Vec<usize>> = self
                .predecessors
                .iter()
                .map(|incoming| {
                    incoming
                        .iter()
                        .map(|&edge| self.edges[edge].source().index())
                        .collect()
                })
                .collect();
            DominatorTree::compute(self.entry.index(), &pred_blocks, self.reverse_postorder())
        })
    }

    /// Returns `true` if `block` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.dominators().is_reachable(block)
    }

    /// Returns `true` if `edge` closes a loop.
    ///
    /// An edge is a back edge when it was explicitly tagged
    /// [`CfgEdgeKind::Back`] by the producer, or when its target dominates its
    /// source in the computed dominator tree.
    #[must_use]
    pub fn is_back_edge(&self, edge: &CfgEdge) -> bool {
        if edge.kind().is_back() {
            return true;
        }
        self.derived_back_edges()
            .contains(&(edge.source().index(), edge.target().index()))
    }

    /// The set of (source, target) pairs whose target dominates their source.
    fn derived_back_edges(&self) -> &HashSet<(usize, usize)> {
        self.derived_back_edges.get_or_init(|| {
            let dominators = self.dominators();
            self.edges
                .iter()
                .filter(|edge| dominators.dominates(edge.target(), edge.source()))
                .map(|edge| (edge.source().index(), edge.target().index()))
                .collect()
        })
    }
}

/// Incremental builder for [`ControlFlowGraph`].
///
/// Blocks are added first and identified by the returned [`BlockId`]; edges
/// may only connect blocks that already exist. The first block added becomes
/// the entry.
#[derive(Debug)]
pub struct ControlFlowGraphBuilder<Op> {
    /// Blocks added so far.
    blocks: Vec<BasicBlock<Op>>,
    /// Edges added so far.
    edges: Vec<CfgEdge>,
    /// Graph version forwarded to the built graph.
    version: u64,
}

impl<Op> ControlFlowGraphBuilder<Op> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            edges: Vec::new(),
            version: 0,
        }
    }

    /// Sets the graph version recorded on the built graph.
    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Adds a basic block and returns its id.
    ///
    /// The first block added is the entry block.
    pub fn add_block(&mut self, operations: Vec<Op>) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(BasicBlock::new(operations));
        id
    }

    /// Adds an edge between two existing blocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`](crate::Error::GraphError) if either
    /// endpoint has not been added yet.
    pub fn add_edge(&mut self, source: BlockId, target: BlockId, kind: CfgEdgeKind) -> Result<()> {
        let block_count = self.blocks.len();
        if source.index() >= block_count {
            return Err(GraphError(format!(
                "Edge source {} exceeds block count {}",
                source, block_count
            )));
        }
        if target.index() >= block_count {
            return Err(GraphError(format!(
                "Edge target {} exceeds block count {}",
                target, block_count
            )));
        }
        self.edges.push(CfgEdge::new(source, target, kind));
        Ok(())
    }

    /// Finalizes the graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`](crate::Error::Empty) if no block was added.
    pub fn build(self) -> Result<ControlFlowGraph<Op>> {
        if self.blocks.is_empty() {
            return Err(crate::Error::Empty);
        }

        let block_count = self.blocks.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); block_count];
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); block_count];
        for (index, edge) in self.edges.iter().enumerate() {
            successors[edge.source().index()].push(index);
            predecessors[edge.target().index()].push(index);
        }

        let exits: Vec<BlockId> = (0..block_count)
            .filter(|&block| successors[block].is_empty())
            .map(BlockId::new)
            .collect();

        Ok(ControlFlowGraph {
            blocks: self.blocks,
            edges: self.edges,
            successors,
            predecessors,
            entry: BlockId::new(0),
            exits,
            version: self.version,
            reverse_postorder: OnceLock::new(),
            dominators: OnceLock::new(),
            derived_back_edges: OnceLock::new(),
        })
    }
}

impl<Op> Default for ControlFlowGraphBuilder<Op> {
    fn default() -> Self {
        Self::new()
    }
}
