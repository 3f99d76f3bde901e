//! Forward data flow analysis framework.
//!
//! This module provides the generic fixpoint machinery and the bundled
//! analyses built on top of it. The framework is built around four core
//! abstractions:
//!
//! - **[`AbstractValueDomain`]**: the lattice of abstract values, with merge,
//!   partial order, and back-edge widening
//! - **[`AnalysisData`] / [`AnalysisDataDomain`]**: sparse entity-value maps
//!   and the pointwise lifting of a value domain over them
//! - **[`OperationVisitor`]**: the per-operation transfer function supplied by
//!   a concrete analysis
//! - **[`DataFlowEngine`]**: the worklist solver iterating blocks to a
//!   fixpoint, merging predecessor states along edges and widening along
//!   loop-closing ones
//!
//! # Analyses Provided
//!
//! - [`ValueContentAnalysis`]: tracks literal contents of storage locations
//! - [`CopyAnalysis`]: tracks must-alias copy classes between locations
//! - [`PointsToAnalysisResult`]: the immutable result shape of an upstream
//!   points-to analysis, consulted for strong/weak update decisions
//!
//! # Example
//!
//! ```rust
//! use flowscope::prelude::*;
//!
//! # fn run() -> flowscope::Result<()> {
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
//! // At the join point x is one of the two literals, not "anything".
//! let x = context.entities().lookup(EntityKind::Local, "x", None).unwrap();
//! let at_join = result.block(b3).unwrap().input_value(x).unwrap();
//! assert_eq!(at_join.literals().len(), 2);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```
//!
//! # Thread Safety
//!
//! Contexts, engines and visitors are exclusive to one run; results and
//! domain singletons are freely shareable. Independent runs over different
//! graphs parallelize without shared mutable state (see
//! [`ValueContentAnalysis::analyze_all`]).

mod cache;
mod context;
mod copy;
mod data;
mod domain;
mod engine;
mod entity;
mod points_to;
mod result;
mod value_content;

pub use cache::{AnalysisCacheKey, AnalysisResultCache};
pub use context::{AnalysisConfig, AnalysisContext};
pub use copy::{CopyAnalysis, CopyAnalysisResult, CopySetDomain, CopySetValue};
pub use data::{AnalysisData, AnalysisDataDomain};
pub use domain::AbstractValueDomain;
pub use engine::{DataFlowEngine, OperationVisitor};
pub use entity::{AnalysisEntity, EntityId, EntityInterner, EntityKind};
pub use points_to::{
    AbstractLocation, LocationSet, PointsToAnalysisResult, PointsToResultBuilder,
};
pub use result::{BlockAnalysisResult, DataFlowAnalysisResult};
pub use value_content::{
    NonLiteralState, ValueContentAnalysis, ValueContentDomain, ValueContentValue,
    ValueContentVisitor,
};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        cfg::{BlockId, CfgEdgeKind, ControlFlowGraph, ControlFlowGraphBuilder},
        ir::{Expr, Literal, Operation, OwningSymbol, Place, SymbolId},
        utils::synchronization::CancellationToken,
        Error,
    };

    fn owner() -> OwningSymbol {
        OwningSymbol::new(SymbolId::new(1), "Sample::Method")
    }

    fn assign_int(name: &str, value: i64) -> Operation {
        Operation::assign(Place::local(name), Expr::int(value))
    }

    fn lookup_local(
        context: &AnalysisContext<'_, Operation, ValueContentDomain>,
        name: &str,
    ) -> EntityId {
        context
            .entities()
            .lookup(EntityKind::Local, name, None)
            .expect("local was interned during the run")
    }

    /// `if (b) x = 1; else x = 2;` merges to the literal set {1, 2}.
    #[test]
    fn test_branch_join_keeps_literal_set() {
        let mut builder = ControlFlowGraphBuilder::new();
        let b0 = builder.add_block(Vec::new());
        let b1 = builder.add_block(vec![assign_int("x", 1)]);
        let b2 = builder.add_block(vec![assign_int("x", 2)]);
        let b3 = builder.add_block(Vec::new());
        builder.add_edge(b0, b1, CfgEdgeKind::ConditionalTrue).unwrap();
        builder.add_edge(b0, b2, CfgEdgeKind::ConditionalFalse).unwrap();
        builder.add_edge(b1, b3, CfgEdgeKind::Unconditional).unwrap();
        builder.add_edge(b2, b3, CfgEdgeKind::Unconditional).unwrap();
        let cfg = builder.build().unwrap();

        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let result = ValueContentAnalysis::analyze(&mut context).unwrap();
        let x = lookup_local(&context, "x");

        let at_join = result.block(b3).unwrap();
        assert!(at_join.is_reachable());
        let value = at_join.input_value(x).expect("x is tracked at the join");
        assert!(value.is_literal_only(), "join must not coarsen to unknown");
        assert_eq!(
            value.literals().iter().cloned().collect::<Vec<_>>(),
            vec![Literal::Int(1), Literal::Int(2)]
        );
    }

    /// `x = 1; while (cond) { x = 2; }` widens x to unknown at the header.
    #[test_log::test]
    fn test_loop_back_edge_widens_to_unknown() {
        let mut builder = ControlFlowGraphBuilder::new();
        let b0 = builder.add_block(vec![assign_int("x", 1)]);
        let b1 = builder.add_block(Vec::new()); // loop header
        let b2 = builder.add_block(vec![assign_int("x", 2)]); // loop body
        let b3 = builder.add_block(Vec::new()); // after the loop
        builder.add_edge(b0, b1, CfgEdgeKind::Unconditional).unwrap();
        builder.add_edge(b1, b2, CfgEdgeKind::ConditionalTrue).unwrap();
        builder.add_edge(b1, b3, CfgEdgeKind::ConditionalFalse).unwrap();
        builder.add_edge(b2, b1, CfgEdgeKind::Unconditional).unwrap();
        let cfg = builder.build().unwrap();

        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let result = ValueContentAnalysis::analyze(&mut context).unwrap();
        let x = lookup_local(&context, "x");

        let data_domain = context.data_domain();
        let header = result.block(b1).unwrap();
        assert!(data_domain.value_or_default(header.input(), x).is_unknown());
        let after = result.block(b3).unwrap();
        assert!(data_domain.value_or_default(after.input(), x).is_unknown());
    }

    /// Code after an unconditional return is unreachable with empty maps.
    #[test]
    fn test_unreachable_block_is_flagged() {
        let mut builder = ControlFlowGraphBuilder::new();
        let b0 = builder.add_block(vec![assign_int("x", 1)]);
        let b1 = builder.add_block(Vec::new());
        let dead = builder.add_block(vec![assign_int("x", 9)]);
        builder.add_edge(b0, b1, CfgEdgeKind::Unconditional).unwrap();
        builder.add_edge(dead, b1, CfgEdgeKind::Unconditional).unwrap();
        let cfg = builder.build().unwrap();

        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let result = ValueContentAnalysis::analyze(&mut context).unwrap();

        let dead_result = result.block(dead).unwrap();
        assert!(!dead_result.is_reachable());
        assert!(dead_result.input().is_empty());
        assert!(dead_result.output().is_empty());

        // The dead predecessor must not pollute the live join either.
        let x = lookup_local(&context, "x");
        let live = result.block(b1).unwrap();
        assert_eq!(
            live.input_value(x),
            Some(&ValueContentValue::literal(Literal::Int(1)))
        );
    }

    /// A cancelled run surfaces `Error::Cancelled` and publishes nothing.
    #[test]
    fn test_cancellation_yields_no_result() {
        let mut builder = ControlFlowGraphBuilder::new();
        builder.add_block(vec![assign_int("x", 1)]);
        let cfg = builder.build().unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain)
            .with_cancellation(token);

        let result = ValueContentAnalysis::analyze(&mut context);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    /// Nested loops feeding conflicting literals converge instead of cycling.
    #[test_log::test]
    fn test_nested_loops_terminate() {
        let mut builder = ControlFlowGraphBuilder::new();
        let b0 = builder.add_block(vec![assign_int("x", 0)]);
        let outer = builder.add_block(Vec::new());
        let inner = builder.add_block(Vec::new());
        let inner_body = builder.add_block(vec![Operation::assign(
            Place::local("x"),
            Expr::binary(
                crate::ir::BinaryOp::Add,
                Expr::read(Place::local("x")),
                Expr::int(1),
            ),
        )]);
        let outer_latch = builder.add_block(vec![assign_int("x", 2)]);
        let exit = builder.add_block(Vec::new());
        builder.add_edge(b0, outer, CfgEdgeKind::Unconditional).unwrap();
        builder.add_edge(outer, inner, CfgEdgeKind::ConditionalTrue).unwrap();
        builder.add_edge(outer, exit, CfgEdgeKind::ConditionalFalse).unwrap();
        builder.add_edge(inner, inner_body, CfgEdgeKind::ConditionalTrue).unwrap();
        builder.add_edge(inner, outer_latch, CfgEdgeKind::ConditionalFalse).unwrap();
        builder.add_edge(inner_body, inner, CfgEdgeKind::Unconditional).unwrap();
        builder.add_edge(outer_latch, outer, CfgEdgeKind::Unconditional).unwrap();
        let cfg = builder.build().unwrap();

        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let result = ValueContentAnalysis::analyze(&mut context).unwrap();
        let x = lookup_local(&context, "x");

        let at_exit = result.block(exit).unwrap();
        assert!(at_exit.is_reachable());
        assert!(context
            .data_domain()
            .value_or_default(at_exit.input(), x)
            .is_unknown());
    }

    /// The pessimism flag decides how opaque calls are modelled.
    #[test]
    fn test_pessimism_controls_call_results() {
        let build = || -> ControlFlowGraph<Operation> {
            let mut builder = ControlFlowGraphBuilder::new();
            builder.add_block(vec![Operation::assign(
                Place::local("x"),
                Expr::call("Helper::Opaque"),
            )]);
            builder.build().unwrap()
        };

        let cfg = build();
        let mut pessimistic = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let result = ValueContentAnalysis::analyze(&mut pessimistic).unwrap();
        let x = lookup_local(&pessimistic, "x");
        assert!(pessimistic
            .data_domain()
            .value_or_default(result.block(cfg.entry()).unwrap().output(), x)
            .is_unknown());

        let cfg = build();
        let mut optimistic = AnalysisContext::new(&cfg, owner(), ValueContentDomain)
            .with_config(AnalysisConfig::optimistic());
        let result = ValueContentAnalysis::analyze(&mut optimistic).unwrap();
        let x = lookup_local(&optimistic, "x");
        assert!(optimistic
            .data_domain()
            .value_or_default(result.block(cfg.entry()).unwrap().output(), x)
            .is_bottom());
    }

    /// Pessimistic call statements reset heap-reached entities to the default.
    #[test]
    fn test_call_statement_clobbers_heap_state() {
        let obj_field = || Place::field(Place::local("obj"), "F");
        let mut builder = ControlFlowGraphBuilder::new();
        let b0 = builder.add_block(vec![
            Operation::assign(obj_field(), Expr::int(1)),
            assign_int("x", 1),
            Operation::call("Helper::Mutate"),
        ]);
        let cfg = builder.build().unwrap();

        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let result = ValueContentAnalysis::analyze(&mut context).unwrap();

        let obj = context
            .entities()
            .lookup(EntityKind::Local, "obj", None)
            .unwrap();
        let field = context
            .entities()
            .lookup(EntityKind::Field, "F", Some(obj))
            .unwrap();
        let x = lookup_local(&context, "x");

        let output = result.block(b0).unwrap().output();
        assert!(context
            .data_domain()
            .value_or_default(output, field)
            .is_unknown());
        // Locals are not heap-reached and survive the call.
        assert_eq!(output.get(x), Some(&ValueContentValue::literal(Literal::Int(1))));
    }

    /// Writes through a many-location reference degrade to weak updates.
    #[test]
    fn test_points_to_forces_weak_update() {
        let mut builder = ControlFlowGraphBuilder::new();
        let b0 = builder.add_block(vec![Operation::assign(
            Place::field(Place::local("obj"), "F"),
            Expr::int(1),
        )]);
        let cfg = builder.build().unwrap();

        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let obj = context.intern_place(&Place::local("obj"));
        let points_to = PointsToAnalysisResult::builder()
            .record(
                obj,
                LocationSet::known([
                    AbstractLocation::new("alloc0"),
                    AbstractLocation::new("alloc1"),
                ]),
            )
            .build();
        let mut context = context.with_points_to_result(Arc::new(points_to));

        let result = ValueContentAnalysis::analyze(&mut context).unwrap();
        let field = context
            .entities()
            .lookup(EntityKind::Field, "F", Some(obj))
            .unwrap();

        // Weak update: merge of the old default with the literal is unknown.
        let output = result.block(b0).unwrap().output();
        assert!(context
            .data_domain()
            .value_or_default(output, field)
            .is_unknown());
    }

    /// Without aliasing evidence, field writes stay strong updates.
    #[test]
    fn test_field_write_is_strong_by_default() {
        let mut builder = ControlFlowGraphBuilder::new();
        let b0 = builder.add_block(vec![Operation::assign(
            Place::field(Place::local("obj"), "F"),
            Expr::int(1),
        )]);
        let cfg = builder.build().unwrap();

        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let result = ValueContentAnalysis::analyze(&mut context).unwrap();

        let obj = context
            .entities()
            .lookup(EntityKind::Local, "obj", None)
            .unwrap();
        let field = context
            .entities()
            .lookup(EntityKind::Field, "F", Some(obj))
            .unwrap();
        assert_eq!(
            result.block(b0).unwrap().output_value(field),
            Some(&ValueContentValue::literal(Literal::Int(1)))
        );
    }

    /// Independent functions analyze in parallel with one shared token.
    #[test]
    fn test_parallel_batch_analysis() {
        let build = |literal: i64| -> ControlFlowGraph<Operation> {
            let mut builder = ControlFlowGraphBuilder::new();
            builder.add_block(vec![assign_int("x", literal)]);
            builder.build().unwrap()
        };
        let graphs: Vec<ControlFlowGraph<Operation>> = (0..8).map(build).collect();
        let functions: Vec<(OwningSymbol, &ControlFlowGraph<Operation>)> = graphs
            .iter()
            .enumerate()
            .map(|(index, cfg)| {
                (
                    OwningSymbol::new(SymbolId::new(index as u32), format!("Method{index}")),
                    cfg,
                )
            })
            .collect();

        let results = ValueContentAnalysis::analyze_all(
            &functions,
            AnalysisConfig::pessimistic(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(results.len(), 8);
        for (index, result) in results.iter().enumerate() {
            assert_eq!(result.owner().id(), SymbolId::new(index as u32));
            assert!(result.block(BlockId::new(0)).unwrap().is_reachable());
        }
    }

    /// The cache hands out one shared result per (symbol, version) key.
    #[test]
    fn test_cached_analysis_is_memoized() {
        let mut builder = ControlFlowGraphBuilder::new();
        builder.add_block(vec![assign_int("x", 3)]);
        let cfg = builder.with_version(1).build().unwrap();

        let cache = AnalysisResultCache::new();
        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let first = ValueContentAnalysis::analyze_cached(&cache, &mut context).unwrap();

        let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
        let second = ValueContentAnalysis::analyze_cached(&cache, &mut context).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }
}
