//! # flowscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits from the flowscope library. Import this module to get quick
//! access to the essentials for building graphs and running analyses.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all flowscope operations
pub use crate::Error;

/// The result type used throughout flowscope
pub use crate::Result;

/// Cooperative cancellation signal observed between block visits
pub use crate::CancellationToken;

// ================================================================================================
// Control Flow Graphs
// ================================================================================================

/// Graph construction and structure
pub use crate::cfg::{
    BasicBlock, BlockId, CfgEdge, CfgEdgeKind, ControlFlowGraph, ControlFlowGraphBuilder,
    DominatorTree,
};

// ================================================================================================
// Data Flow Framework
// ================================================================================================

/// The lattice contract implemented by every analysis domain
pub use crate::dataflow::AbstractValueDomain;

/// Sparse entity-value maps and their lifted domain
pub use crate::dataflow::{AnalysisData, AnalysisDataDomain};

/// Per-run execution context and its configuration
pub use crate::dataflow::{AnalysisConfig, AnalysisContext};

/// The fixpoint solver and the per-operation transfer seam
pub use crate::dataflow::{DataFlowEngine, OperationVisitor};

/// Entities: abstract identities for storage locations
pub use crate::dataflow::{AnalysisEntity, EntityId, EntityInterner, EntityKind};

/// Converged per-block and per-run results
pub use crate::dataflow::{BlockAnalysisResult, DataFlowAnalysisResult};

/// Memoized get-or-compute result caching
pub use crate::dataflow::{AnalysisCacheKey, AnalysisResultCache};

// ================================================================================================
// Bundled Analyses
// ================================================================================================

/// Value content analysis: literal tracking
pub use crate::dataflow::{
    NonLiteralState, ValueContentAnalysis, ValueContentDomain, ValueContentValue,
    ValueContentVisitor,
};

/// Copy analysis: must-alias tracking
pub use crate::dataflow::{CopyAnalysis, CopyAnalysisResult, CopySetDomain, CopySetValue};

/// Points-to result abstraction for strong/weak update decisions
pub use crate::dataflow::{
    AbstractLocation, LocationSet, PointsToAnalysisResult, PointsToResultBuilder,
};

// ================================================================================================
// Statement IR
// ================================================================================================

/// The minimal operation language interpreted by the bundled analyses
pub use crate::ir::{BinaryOp, Expr, Literal, Operation, OwningSymbol, Place, SymbolId};
