// AWK emitter. Handles `Parse(csv)`, `ColFilter`, `Select`, and
// `GroupBy`+`Agg`. Deliberately sticks to POSIX awk syntax — no
// gawk-only extensions — so the same program runs unmodified under
// mawk, gawk, or a vendor `awk`; tool-family divergence is handled at
// the sort/grep layer instead, where BSD and GNU genuinely differ.

use crate::assemble::quote::{awk_string_literal, single_quote};
use crate::backend::{Fragment, StreamFormat};
use crate::error::Result;
use crate::plan::{AggFn, AggItem, ColOp, Scalar};

/// Where the header-to-index map (`h["name"] -> position`) comes from.
#[derive(Debug, Clone)]
pub enum HeaderSource {
    /// Read from the first record at `NR == 1` (true csv with a header line).
    FromFirstRecord,
    /// Known at compile time — a jq-to-tsv conversion or a chained AWK
    /// stage's output, neither of which carries a header line on the wire.
    Static(Vec<String>),
}

/// A fused, contiguous run of AWK-amenable nodes.
#[derive(Debug, Clone, Default)]
pub struct AwkRun {
    pub col_filters: Vec<(String, ColOp, Scalar)>,
    pub select: Option<Vec<String>>,
    pub group_by_agg: Option<(Vec<String>, Vec<AggItem>)>,
}

fn h_lookup(col: &str) -> String {
    format!("$h[{}]", awk_string_literal(col))
}

fn format_awk_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn filter_condition(column: &str, op: ColOp, value: &Scalar) -> String {
    let lhs = h_lookup(column);
    let rhs = match value {
        Scalar::Str(s) => awk_string_literal(s),
        Scalar::Num(n) => format_awk_number(*n),
    };
    format!("{lhs} {} {rhs}", op.awk_operator())
}

fn delim_literal(d: char) -> String {
    awk_string_literal(&d.to_string())
}

/// Emit one AWK invocation for `run`, reading `delim_in`-separated
/// fields (with `header` establishing the name-to-index map) and
/// writing `delim_out`-separated output.
pub fn emit_awk(
    header: HeaderSource,
    delim_in: char,
    delim_out: char,
    input: StreamFormat,
    run: &AwkRun,
) -> Result<Fragment> {
    let mut begin_lines = vec![format!("FS = {}; OFS = {};", delim_literal(delim_in), delim_literal(delim_out))];
    if let HeaderSource::Static(cols) = &header {
        for (i, c) in cols.iter().enumerate() {
            begin_lines.push(format!("h[{}] = {};", awk_string_literal(c), i + 1));
        }
    }
    let begin_block = format!("BEGIN {{ {} }}", begin_lines.join(" "));

    let mut program_parts = vec![begin_block];
    if matches!(header, HeaderSource::FromFirstRecord) {
        program_parts.push("NR == 1 { for (i = 1; i <= NF; i++) h[$i] = i; next }".to_string());
    }

    let filter_guard = if run.col_filters.is_empty() {
        None
    } else {
        let conds: Vec<String> = run
            .col_filters
            .iter()
            .map(|(c, op, v)| filter_condition(c, *op, v))
            .collect();
        Some(format!("if (!({})) next;", conds.join(" && ")))
    };

    let mut body_lines = Vec::new();
    if let Some(guard) = &filter_guard {
        body_lines.push(guard.clone());
    }

    let output: StreamFormat;

    if let Some((keys, items)) = &run.group_by_agg {
        let key_expr = keys.iter().map(|k| h_lookup(k)).collect::<Vec<_>>().join(" SUBSEP ");
        body_lines.push(format!("key = {key_expr};"));
        body_lines.push("_groups[key] = 1;".to_string());

        for (i, item) in items.iter().enumerate() {
            let expr_awk = item.expr.to_awk(h_lookup);
            let var = format!("a{i}");
            match item.func {
                AggFn::Count => body_lines.push(format!("_cnt_{var}[key]++;")),
                AggFn::Sum => body_lines.push(format!("_sum_{var}[key] += ({expr_awk});")),
                AggFn::Avg => {
                    body_lines.push(format!("_sum_{var}[key] += ({expr_awk});"));
                    body_lines.push(format!("_cnt_{var}[key]++;"));
                }
                AggFn::Min => body_lines.push(format!(
                    "if (!(key in _min_{var}) || ({expr_awk}) < _min_{var}[key]) _min_{var}[key] = ({expr_awk});"
                )),
                AggFn::Max => body_lines.push(format!(
                    "if (!(key in _max_{var}) || ({expr_awk}) > _max_{var}[key]) _max_{var}[key] = ({expr_awk});"
                )),
                AggFn::First => body_lines.push(format!(
                    "if (!(key in _first_{var})) _first_{var}[key] = ({expr_awk});"
                )),
                AggFn::Last => body_lines.push(format!("_last_{var}[key] = ({expr_awk});")),
                AggFn::CountDistinct => {
                    body_lines.push(format!("_cdkey = key SUBSEP ({expr_awk});"));
                    body_lines.push(format!(
                        "if (!(_cdkey in _seen_{var})) {{ _seen_{var}[_cdkey] = 1; _cd_{var}[key]++; }}"
                    ));
                }
            }
        }

        program_parts.push(format!("{{\n  {}\n}}", body_lines.join("\n  ")));

        let mut end_lines = vec![
            "for (key in _groups) {".to_string(),
            format!("  n = split(key, parts, SUBSEP);"),
        ];
        let mut out_fields: Vec<String> = (1..=keys.len()).map(|i| format!("parts[{i}]")).collect();
        for (i, item) in items.iter().enumerate() {
            let var = format!("a{i}");
            let expr = match item.func {
                AggFn::Count => format!("_cnt_{var}[key] + 0"),
                AggFn::Sum => format!("_sum_{var}[key] + 0"),
                AggFn::Avg => format!("(_cnt_{var}[key] > 0 ? _sum_{var}[key] / _cnt_{var}[key] : 0)"),
                AggFn::Min => format!("_min_{var}[key]"),
                AggFn::Max => format!("_max_{var}[key]"),
                AggFn::First => format!("_first_{var}[key]"),
                AggFn::Last => format!("_last_{var}[key]"),
                AggFn::CountDistinct => format!("_cd_{var}[key] + 0"),
            };
            out_fields.push(expr);
        }
        end_lines.push(format!("  print {};", out_fields.join(", ")));
        end_lines.push("}".to_string());
        program_parts.push(format!("END {{\n  {}\n}}", end_lines.join("\n  ")));

        let columns: Vec<String> = keys.iter().cloned().chain(items.iter().map(|it| it.alias.clone())).collect();
        output = StreamFormat::Tsv { delim: delim_out, columns };
    } else if let Some(columns) = &run.select {
        let fields = columns.iter().map(|c| h_lookup(c)).collect::<Vec<_>>().join(", ");
        body_lines.push(format!("print {fields};"));
        program_parts.push(format!("{{\n  {}\n}}", body_lines.join("\n  ")));
        output = StreamFormat::Tsv { delim: delim_out, columns: columns.clone() };
    } else {
        body_lines.push("print;".to_string());
        program_parts.push(format!("{{\n  {}\n}}", body_lines.join("\n  ")));
        // A filter-only run re-emits the original record verbatim; we
        // don't know the full column universe (only referenced columns
        // were ever named), so the result is opaque to later stages.
        output = StreamFormat::Raw;
    }

    let program = program_parts.join("\n");
    let command = format!("awk {}", single_quote(&program));
    Ok(Fragment::new(command, input, output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{AggExpr, ArithOp, Operand};

    #[test]
    fn header_run_with_filter_and_groupby_agg() {
        let run = AwkRun {
            col_filters: vec![("quantity".into(), ColOp::Gt, Scalar::num(0.0))],
            select: None,
            group_by_agg: Some((
                vec!["region".into()],
                vec![AggItem {
                    alias: "total_revenue".into(),
                    expr: AggExpr::binop(
                        Operand::Column("price".into()),
                        ArithOp::Mul,
                        Operand::Column("quantity".into()),
                    ),
                    func: AggFn::Sum,
                }],
            )),
        };
        let frag = emit_awk(HeaderSource::FromFirstRecord, ',', ',', StreamFormat::Raw, &run).unwrap();
        assert!(frag.command.contains("NR == 1"));
        assert!(frag.command.contains("_groups[key] = 1;"));
        assert!(frag.command.contains("_sum_a0[key] += (($h[\"price\"] * $h[\"quantity\"]));"));
        assert!(matches!(
            frag.output,
            StreamFormat::Tsv { ref columns, .. }
                if columns == &vec!["region".to_string(), "total_revenue".to_string()]
        ));
    }

    #[test]
    fn static_header_run_skips_nr_guard() {
        let run = AwkRun {
            col_filters: vec![],
            select: Some(vec!["a".into(), "b".into()]),
            group_by_agg: None,
        };
        let frag = emit_awk(
            HeaderSource::Static(vec!["a".into(), "b".into()]),
            '\t',
            '\t',
            StreamFormat::Tsv { delim: '\t', columns: vec!["a".into(), "b".into()] },
            &run,
        )
        .unwrap();
        assert!(!frag.command.contains("NR == 1"));
        assert!(frag.command.contains("h[\"a\"] = 1;"));
    }

    #[test]
    fn pure_filter_run_prints_whole_record() {
        let run = AwkRun {
            col_filters: vec![("status".into(), ColOp::Eq, Scalar::str("ok"))],
            select: None,
            group_by_agg: None,
        };
        let frag = emit_awk(HeaderSource::FromFirstRecord, ',', ',', StreamFormat::Raw, &run).unwrap();
        assert!(frag.command.contains("print;"));
        assert!(matches!(frag.output, StreamFormat::Raw));
    }

    #[test]
    fn column_names_with_quotes_are_escaped_safely() {
        let run = AwkRun {
            col_filters: vec![("weird\"col".into(), ColOp::Eq, Scalar::str("x"))],
            select: None,
            group_by_agg: None,
        };
        let frag = emit_awk(HeaderSource::FromFirstRecord, ',', ',', StreamFormat::Raw, &run).unwrap();
        // the embedded double quote is backslash-escaped for AWK, and
        // the whole program is still a single, balanced shell argument.
        assert!(frag.command.contains("weird\\\"col"));
        assert!(frag.command.starts_with("awk '"));
        assert!(frag.command.ends_with('\''));
    }
}
