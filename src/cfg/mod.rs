//! Control flow graph construction and structural analysis.
//!
//! This module provides the graph representation consumed by the data flow
//! engine: basic blocks of generic operations, typed edges, and the derived
//! structures (reverse postorder, dominator tree, back-edge classification)
//! the fixpoint iteration depends on.
//!
//! # Key Types
//!
//! - [`BlockId`] / [`BasicBlock`] - block identity and contents
//! - [`CfgEdge`] / [`CfgEdgeKind`] - typed control flow edges
//! - [`ControlFlowGraph`] / [`ControlFlowGraphBuilder`] - the graph and its builder
//! - [`DominatorTree`] - dominance queries backing back-edge detection
//!
//! # Usage
//!
//! ```rust
//! use flowscope::cfg::{CfgEdgeKind, ControlFlowGraphBuilder};
//!
//! let mut builder = ControlFlowGraphBuilder::new();
//! let entry = builder.add_block(vec!["start"]);
//! let exit = builder.add_block(vec!["end"]);
//! builder.add_edge(entry, exit, CfgEdgeKind::Unconditional)?;
//!
//! let cfg = builder.build()?;
//! assert!(cfg.dominators().dominates(entry, exit));
//! # Ok::<(), flowscope::Error>(())
//! ```

mod block;
mod dominators;
mod edge;
mod graph;

pub use block::{BasicBlock, BlockId};
pub use dominators::DominatorTree;
pub use edge::{CfgEdge, CfgEdgeKind};
pub use graph::{ControlFlowGraph, ControlFlowGraphBuilder};
