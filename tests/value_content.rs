//! End-to-end tests of the analysis pipeline through the public API.
//!
//! These tests assemble realistic control flow shapes, run the copy analysis
//! first, feed its result (and the shared entity interner) into the value
//! content analysis, and check the converged block states, including
//! reachability, caching and cancellation behavior.

use std::sync::Arc;

use flowscope::prelude::*;

fn owner() -> OwningSymbol {
    OwningSymbol::new(SymbolId::new(1), "Sample.Program::Compute")
}

fn assign_int(name: &str, value: i64) -> Operation {
    Operation::assign(Place::local(name), Expr::int(value))
}

fn copy_local(target: &str, source: &str) -> Operation {
    Operation::assign(Place::local(target), Expr::read(Place::local(source)))
}

/// Builds the running example:
///
/// ```text
/// b0: x = 1; y = x
/// b1: if (..) -> b2 | b3
/// b2: z = x + 10
/// b3: z = 40
/// b4: join; w = z
/// b5: unreachable (no incoming edges)
/// ```
fn build_pipeline_cfg() -> (
    ControlFlowGraph<Operation>,
    [BlockId; 6],
) {
    let mut builder = ControlFlowGraphBuilder::new();
    let b0 = builder.add_block(vec![assign_int("x", 1), copy_local("y", "x")]);
    let b1 = builder.add_block(Vec::new());
    let b2 = builder.add_block(vec![Operation::assign(
        Place::local("z"),
        Expr::binary(BinaryOp::Add, Expr::read(Place::local("x")), Expr::int(10)),
    )]);
    let b3 = builder.add_block(vec![assign_int("z", 40)]);
    let b4 = builder.add_block(vec![copy_local("w", "z")]);
    let b5 = builder.add_block(vec![assign_int("x", 99)]);
    builder.add_edge(b0, b1, CfgEdgeKind::Unconditional).unwrap();
    builder.add_edge(b1, b2, CfgEdgeKind::ConditionalTrue).unwrap();
    builder.add_edge(b1, b3, CfgEdgeKind::ConditionalFalse).unwrap();
    builder.add_edge(b2, b4, CfgEdgeKind::Unconditional).unwrap();
    builder.add_edge(b3, b4, CfgEdgeKind::Unconditional).unwrap();
    let cfg = builder.with_version(7).build().unwrap();
    (cfg, [b0, b1, b2, b3, b4, b5])
}

#[test]
fn pipeline_copy_then_value_content() {
    let (cfg, [_, b1, _, _, b4, b5]) = build_pipeline_cfg();

    // Copy analysis first; its interner seeds the downstream context.
    let mut copy_context = AnalysisContext::new(&cfg, owner(), CopySetDomain);
    let copies = Arc::new(CopyAnalysis::analyze(&mut copy_context).unwrap());

    let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain)
        .with_entities(copy_context.into_entities())
        .with_copy_result(Arc::clone(&copies));
    let result = ValueContentAnalysis::analyze(&mut context).unwrap();

    let entities = context.entities();
    let x = entities.lookup(EntityKind::Local, "x", None).unwrap();
    let y = entities.lookup(EntityKind::Local, "y", None).unwrap();
    let z = entities.lookup(EntityKind::Local, "z", None).unwrap();
    let w = entities.lookup(EntityKind::Local, "w", None).unwrap();

    // The copy relation x ~ y survives to the join block.
    assert_eq!(copies.copies_on_entry(b4, x), vec![y]);

    // Straight-line propagation: x and its copy y both carry {1}.
    let at_b1 = result.block(b1).unwrap();
    assert_eq!(at_b1.input_value(x), Some(&ValueContentValue::literal(Literal::Int(1))));
    assert_eq!(at_b1.input_value(y), Some(&ValueContentValue::literal(Literal::Int(1))));

    // Constant folding on one branch, plain literal on the other: {11, 40}.
    let at_join = result.block(b4).unwrap();
    let z_value = at_join.input_value(z).unwrap();
    assert!(z_value.is_literal_only());
    assert_eq!(
        z_value.literals().iter().cloned().collect::<Vec<_>>(),
        vec![Literal::Int(11), Literal::Int(40)]
    );

    // w copies z at the join, so it holds the same set on exit.
    assert_eq!(at_join.output_value(w), Some(z_value));

    // The orphaned block is unreachable with empty state.
    let dead = result.block(b5).unwrap();
    assert!(!dead.is_reachable());
    assert!(dead.input().is_empty());
    assert!(dead.output().is_empty());
}

#[test]
fn loop_converges_and_widens() {
    // x = 1; while (cond) { x = x * 2; }
    let mut builder = ControlFlowGraphBuilder::new();
    let b0 = builder.add_block(vec![assign_int("x", 1)]);
    let header = builder.add_block(Vec::new());
    let body = builder.add_block(vec![Operation::assign(
        Place::local("x"),
        Expr::binary(BinaryOp::Mul, Expr::read(Place::local("x")), Expr::int(2)),
    )]);
    let exit = builder.add_block(Vec::new());
    builder.add_edge(b0, header, CfgEdgeKind::Unconditional).unwrap();
    builder.add_edge(header, body, CfgEdgeKind::ConditionalTrue).unwrap();
    builder.add_edge(header, exit, CfgEdgeKind::ConditionalFalse).unwrap();
    builder.add_edge(body, header, CfgEdgeKind::Unconditional).unwrap();
    let cfg = builder.build().unwrap();

    let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
    let result = ValueContentAnalysis::analyze(&mut context).unwrap();

    let x = context.entities().lookup(EntityKind::Local, "x", None).unwrap();
    let after = result.block(exit).unwrap();
    assert!(after.is_reachable());
    // The doubling loop would enumerate literals forever; widening cuts it off.
    assert!(context
        .data_domain()
        .value_or_default(after.input(), x)
        .is_unknown());
}

#[test]
fn cache_shares_results_until_version_bump() {
    let build = |version: u64| {
        let mut builder = ControlFlowGraphBuilder::new();
        builder.add_block(vec![assign_int("x", 5)]);
        builder.with_version(version).build().unwrap()
    };

    let cache = AnalysisResultCache::new();

    let cfg = build(0);
    let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
    let first = ValueContentAnalysis::analyze_cached(&cache, &mut context).unwrap();

    let mut context = AnalysisContext::new(&cfg, owner(), ValueContentDomain);
    let again = ValueContentAnalysis::analyze_cached(&cache, &mut context).unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    // A rebuilt graph carries a new version and misses the cache.
    let rebuilt = build(1);
    let mut context = AnalysisContext::new(&rebuilt, owner(), ValueContentDomain);
    let fresh = ValueContentAnalysis::analyze_cached(&cache, &mut context).unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(cache.len(), 2);

    cache.evict_symbol(owner().id());
    assert!(cache.is_empty());
}

#[test]
fn cancellation_aborts_batch() {
    let graphs: Vec<ControlFlowGraph<Operation>> = (0..4)
        .map(|_| {
            let mut builder = ControlFlowGraphBuilder::new();
            builder.add_block(vec![assign_int("x", 1)]);
            builder.build().unwrap()
        })
        .collect();
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

    let token = CancellationToken::new();
    token.cancel();
    let outcome =
        ValueContentAnalysis::analyze_all(&functions, AnalysisConfig::pessimistic(), &token);
    assert!(matches!(outcome, Err(Error::Cancelled)));
}
