// Cache correctness (spec §8): for a shuffled stream of compiles
// interleaved with clears, the returned command is always byte-equal to
// a freshly assembled one for the same (plan, fingerprint).

use shellspark::assemble;
use shellspark::optimizer::optimize;
use shellspark::plan::{AggExpr, AggFn, ColOp, Format, LineOp, PlanBuilder, Scalar};
use shellspark::registry::{RegistryConfig, ToolRegistry};
use shellspark::Compiler;

fn registry_config() -> RegistryConfig {
    RegistryConfig {
        awk_override: Some("awk".into()),
        grep_override: Some("grep".into()),
        sort_override: Some("sort".into()),
        jq_override: Some("jq".into()),
        tmpdir: Some("/tmp".into()),
    }
}

fn fresh_expected(plan: &shellspark::Plan) -> String {
    let registry = ToolRegistry::new(registry_config());
    assemble::assemble(&optimize(plan), &registry).unwrap()
}

#[test]
fn interleaved_compiles_and_clears_always_match_a_fresh_compile() {
    let compiler = Compiler::new(ToolRegistry::new(registry_config()));

    let plans = vec![
        PlanBuilder::source("app.log", false).filter_line(LineOp::Contains, "ERROR").unwrap().build().unwrap(),
        PlanBuilder::source("users.json", false)
            .parse(Format::Json, false)
            .unwrap()
            .select(vec!["name", "email"])
            .unwrap()
            .build()
            .unwrap(),
        PlanBuilder::source("f.csv", false)
            .parse(Format::Csv, true)
            .unwrap()
            .filter_col("quantity", ColOp::Gt, Scalar::num(0.0))
            .unwrap()
            .group_by(vec!["region"])
            .unwrap()
            .agg(vec![("n".into(), AggExpr::column("quantity"), AggFn::Sum)])
            .unwrap()
            .build()
            .unwrap(),
    ];

    // A shuffled-ish access pattern: repeat each plan, clear mid-stream,
    // and interleave plans with each other.
    let schedule = [0usize, 1, 0, 2, 1, 1, 0, 2, 2, 0];
    for (i, &plan_idx) in schedule.iter().enumerate() {
        let plan = &plans[plan_idx];
        let got = compiler.compile(plan).unwrap();
        let expected = fresh_expected(plan);
        assert_eq!(got, expected, "mismatch at step {i} for plan {plan_idx}");
        if i % 3 == 2 {
            compiler.reset();
        }
    }
}

#[test]
fn cache_hit_returns_byte_identical_command_without_recompiling() {
    let compiler = Compiler::new(ToolRegistry::new(registry_config()));
    let plan = PlanBuilder::source("app.log", false)
        .filter_line(LineOp::Contains, "ERROR")
        .unwrap()
        .build()
        .unwrap();

    let first = compiler.compile(&plan).unwrap();
    let second = compiler.compile(&plan).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, fresh_expected(&plan));
}

#[test]
fn clear_forces_a_fresh_fingerprint_without_changing_the_command_for_equivalent_overrides() {
    let compiler = Compiler::new(ToolRegistry::new(registry_config()));
    let plan = PlanBuilder::source("app.log", false)
        .filter_line(LineOp::Contains, "ERROR")
        .unwrap()
        .build()
        .unwrap();

    let before = compiler.compile(&plan).unwrap();
    compiler.reset();
    let after = compiler.compile(&plan).unwrap();
    assert_eq!(before, after);
}
