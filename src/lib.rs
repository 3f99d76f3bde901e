// Copyright 2026 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # flowscope
//!
//! A worklist-based forward data flow analysis framework: monotone lattices
//! over sparse entity-value maps, fixpoint iteration over control flow graphs,
//! and back-edge widening that keeps loops from oscillating. Built in pure
//! Rust with static dispatch throughout; the engine is generic over both the
//! operation language and the abstract value domain.
//!
//! ## Features
//!
//! - **⚙️ Generic fixpoint engine** - one solver drives any lattice and any IR
//! - **🧮 Sparse abstract state** - absent entries mean "no information", so maps stay small
//! - **🔁 Guaranteed termination** - back edges are detected via dominators and widened
//! - **🔍 Value content analysis** - tracks literal contents of locals, fields and array slots
//! - **🔗 Copy analysis** - must-alias classes feeding precision back into value content
//! - **🗃️ Memoized results** - concurrent get-or-compute cache keyed by symbol and graph version
//! - **🛑 Cooperative cancellation** - all-or-nothing runs, never a partial result
//!
//! ## Quick Start
//!
//! Add `flowscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! flowscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust
//! use flowscope::prelude::*;
//!
//! # fn main() -> flowscope::Result<()> {
//! // if (cond) { x = 1 } else { x = 2 }
//! let mut builder = ControlFlowGraphBuilder::new();
//! let b0 = builder.add_block(Vec::new());
//! let b1 = builder.add_block(vec![Operation::assign(Place::local("x"), Expr::int(1))]);
//! let b2 = builder.add_block(vec![Operation::assign(Place::local("x"), Expr::int(2))]);
//! let b3 = builder.add_block(Vec::new());
//! builder.add_edge(b0, b1, CfgEdgeKind::ConditionalTrue)?;
//! builder.add_edge(b0, b2, CfgEdgeKind::ConditionalFalse)?;
//! builder.add_edge(b1, b3, CfgEdgeKind::Unconditional)?;
//! builder.add_edge(b2, b3, CfgEdgeKind::Unconditional)?;
//! let cfg = builder.build()?;
//!
//! let owner = OwningSymbol::new(SymbolId::new(1), "Sample::Method");
//! let mut context = AnalysisContext::new(&cfg, owner, ValueContentDomain);
//! let result = ValueContentAnalysis::analyze(&mut context)?;
//!
//! // At the join point, x is the literal set {1, 2} - not "anything".
//! let x = context.entities().lookup(EntityKind::Local, "x", None).unwrap();
//! let merged = result.block(b3).unwrap().input_value(x).unwrap();
//! assert_eq!(merged.literals().len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! `flowscope` is organized into focused modules:
//!
//! - [`cfg`] - Control flow graphs: blocks, typed edges, dominators, back-edge
//!   classification
//! - [`dataflow`] - The analysis core: value domains, sparse entity-value
//!   maps, the fixpoint engine, results, caching, and the bundled analyses
//! - [`ir`] - The minimal statement IR the bundled analyses interpret
//! - [`prelude`] - Convenient re-exports of the most commonly used types
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ### The Fixpoint Engine
//!
//! The [`dataflow::DataFlowEngine`] visits blocks from the entry in worklist
//! order. A block's input is the pointwise merge of its predecessors'
//! outputs; edges that close loops go through a widening merge instead, so
//! conflicting values climb to "unknown" rather than oscillating. A block
//! whose output changed re-enqueues its successors, and the engine stops when
//! nothing changes anymore. Concrete analyses only supply a per-operation
//! transfer function through [`dataflow::OperationVisitor`].
//!
//! ### Prerequisite Analyses
//!
//! Analyses compose through immutable results carried by the
//! [`dataflow::AnalysisContext`]: the bundled value content analysis consults
//! a prior [`dataflow::CopyAnalysis`] run for must-alias precision and an
//! upstream [`dataflow::PointsToAnalysisResult`] for strong/weak update
//! decisions. Missing prerequisites degrade conservatively instead of
//! failing.
//!
//! ## Concurrency
//!
//! One run owns its context, entity set and state maps exclusively; domain
//! singletons and finished results are freely shareable. Independent
//! functions therefore analyze in parallel without locking - see
//! [`dataflow::ValueContentAnalysis::analyze_all`] - and results memoize in
//! the concurrent [`dataflow::AnalysisResultCache`].
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). Analysis runs are
//! all-or-nothing: a cancelled run surfaces [`Error::Cancelled`] and
//! publishes no partial state.
//!
//! ```rust
//! use flowscope::prelude::*;
//!
//! let mut builder = ControlFlowGraphBuilder::new();
//! builder.add_block(vec![Operation::assign(Place::local("x"), Expr::int(1))]);
//! let cfg = builder.build().unwrap();
//!
//! let token = CancellationToken::new();
//! token.cancel();
//! let owner = OwningSymbol::new(SymbolId::new(1), "Sample::Method");
//! let mut context =
//!     AnalysisContext::new(&cfg, owner, ValueContentDomain).with_cancellation(token);
//!
//! match ValueContentAnalysis::analyze(&mut context) {
//!     Err(Error::Cancelled) => println!("no partial result"),
//!     other => panic!("expected cancellation, got {other:?}"),
//! }
//! ```

pub(crate) mod error;
pub(crate) mod utils;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use flowscope::prelude::*;
///
/// let mut builder: ControlFlowGraphBuilder<Operation> = ControlFlowGraphBuilder::new();
/// builder.add_block(Vec::new());
/// let cfg = builder.build()?;
/// # Ok::<(), flowscope::Error>(())
/// ```
pub mod prelude;

/// Control flow graph construction and structural analysis.
///
/// Provides the graph representation the engine consumes: basic blocks over a
/// generic operation type, typed edges, lazily computed reverse postorder,
/// dominator tree, and back-edge classification.
pub mod cfg;

/// The forward data flow analysis framework and bundled analyses.
///
/// The core abstractions ([`dataflow::AbstractValueDomain`],
/// [`dataflow::AnalysisData`], [`dataflow::DataFlowEngine`],
/// [`dataflow::OperationVisitor`]) plus the value content and copy analyses
/// built on them.
pub mod dataflow;

/// Minimal statement IR interpreted by the bundled analyses.
///
/// Assignments of expressions to places, opaque calls, literals and the
/// owning-symbol identity used for caching.
pub mod ir;

/// `flowscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is
/// always [`Error`]. Used consistently throughout the crate for all fallible
/// operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `flowscope` Error type
///
/// The main error type for all operations in this crate: graph construction
/// failures and cooperative cancellation.
pub use error::Error;

/// Cooperative cancellation token shared between an analysis run and its caller.
///
/// Signalled tokens abort the run between block visits with
/// [`Error::Cancelled`]; a cancelled run publishes no partial result.
pub use utils::synchronization::CancellationToken;
