// Hash stability: building the same plan twice (same calls, same
// values) yields equal structural hashes; changing any node's fields
// (including element order in Select/GroupBy/Agg) changes the hash.

use shellspark::plan::{AggExpr, AggFn, ColOp, Format, LineOp, PlanBuilder, Scalar};

#[test]
fn identical_construction_hashes_equal() {
    let build = || {
        PlanBuilder::source("sales.csv", false)
            .parse(Format::Csv, true)
            .unwrap()
            .filter_col("quantity", ColOp::Gt, Scalar::num(0.0))
            .unwrap()
            .group_by(vec!["region"])
            .unwrap()
            .agg(vec![("n".into(), AggExpr::column("quantity"), AggFn::Sum)])
            .unwrap()
            .sort("n", true, true)
            .unwrap()
            .build()
            .unwrap()
    };
    assert_eq!(build().structural_hash(), build().structural_hash());
}

#[test]
fn different_scalar_value_changes_hash() {
    let base = PlanBuilder::source("f.csv", false)
        .parse(Format::Csv, true)
        .unwrap()
        .filter_col("x", ColOp::Eq, Scalar::str("a"))
        .unwrap()
        .build()
        .unwrap();
    let changed = PlanBuilder::source("f.csv", false)
        .parse(Format::Csv, true)
        .unwrap()
        .filter_col("x", ColOp::Eq, Scalar::str("b"))
        .unwrap()
        .build()
        .unwrap();
    assert_ne!(base.structural_hash(), changed.structural_hash());
}

#[test]
fn select_column_order_changes_hash() {
    let a = PlanBuilder::source("f.csv", false)
        .parse(Format::Csv, true)
        .unwrap()
        .select(vec!["a", "b", "c"])
        .unwrap()
        .build()
        .unwrap();
    let b = PlanBuilder::source("f.csv", false)
        .parse(Format::Csv, true)
        .unwrap()
        .select(vec!["c", "b", "a"])
        .unwrap()
        .build()
        .unwrap();
    assert_ne!(a.structural_hash(), b.structural_hash());
}

#[test]
fn group_by_key_order_changes_hash() {
    let a = PlanBuilder::source("f.csv", false)
        .parse(Format::Csv, true)
        .unwrap()
        .group_by(vec!["region", "product"])
        .unwrap()
        .agg(vec![("n".into(), AggExpr::column("*"), AggFn::Count)])
        .unwrap()
        .build()
        .unwrap();
    let b = PlanBuilder::source("f.csv", false)
        .parse(Format::Csv, true)
        .unwrap()
        .group_by(vec!["product", "region"])
        .unwrap()
        .agg(vec![("n".into(), AggExpr::column("*"), AggFn::Count)])
        .unwrap()
        .build()
        .unwrap();
    assert_ne!(a.structural_hash(), b.structural_hash());
}

#[test]
fn agg_item_order_changes_hash() {
    let a = PlanBuilder::source("f.csv", false)
        .parse(Format::Csv, true)
        .unwrap()
        .group_by(vec!["region"])
        .unwrap()
        .agg(vec![
            ("n".into(), AggExpr::column("*"), AggFn::Count),
            ("total".into(), AggExpr::column("price"), AggFn::Sum),
        ])
        .unwrap()
        .build()
        .unwrap();
    let b = PlanBuilder::source("f.csv", false)
        .parse(Format::Csv, true)
        .unwrap()
        .group_by(vec!["region"])
        .unwrap()
        .agg(vec![
            ("total".into(), AggExpr::column("price"), AggFn::Sum),
            ("n".into(), AggExpr::column("*"), AggFn::Count),
        ])
        .unwrap()
        .build()
        .unwrap();
    assert_ne!(a.structural_hash(), b.structural_hash());
}

#[test]
fn different_line_op_changes_hash() {
    let a = PlanBuilder::source("app.log", false)
        .filter_line(LineOp::Contains, "ERROR")
        .unwrap()
        .build()
        .unwrap();
    let b = PlanBuilder::source("app.log", false)
        .filter_line(LineOp::StartsWith, "ERROR")
        .unwrap()
        .build()
        .unwrap();
    assert_ne!(a.structural_hash(), b.structural_hash());
}
