// jq emitter. Handles `Parse(json)` and the field-aware operations that
// follow it (`ColFilter`, `Select`), up to but not including
// `GroupBy`/`Agg`/`Sort`, which are delegated to AWK/sort after a
// tab-separation conversion fragment.

use crate::assemble::quote::{jq_string_literal, single_quote};
use crate::backend::{Fragment, StreamFormat};
use crate::error::Result;
use crate::plan::{Node, Scalar};

fn is_bareword(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn field_access(name: &str) -> String {
    if is_bareword(name) {
        format!(".{name}")
    } else {
        format!(".[{}]", jq_string_literal(name))
    }
}

fn select_field(name: &str) -> String {
    if is_bareword(name) {
        name.to_string()
    } else {
        format!("{}: {}", jq_string_literal(name), field_access(name))
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn value_literal(value: &Scalar) -> String {
    match value {
        Scalar::Str(s) => jq_string_literal(s),
        Scalar::Num(n) => format_number(*n),
    }
}

/// Build the jq pipe-stage list (without the enclosing program string)
/// for a contiguous run of `ColFilter`/`Select` nodes.
fn build_stages(run: &[Node]) -> Vec<String> {
    let mut stages = Vec::new();
    for node in run {
        match node {
            Node::ColFilter { column, op, value } => {
                stages.push(format!(
                    "select({} {} {})",
                    field_access(column),
                    op.jq_operator(),
                    value_literal(value)
                ));
            }
            Node::Select { columns } => {
                let fields = columns.iter().map(|c| select_field(c)).collect::<Vec<_>>().join(", ");
                stages.push(format!("{{{fields}}}"));
            }
            other => unreachable!("jq emitter received non field-aware node {:?}", other.kind_name()),
        }
    }
    stages
}

/// Emit one jq invocation covering `run` (a contiguous slice of
/// `ColFilter`/`Select` nodes following a `Parse(json)`).
pub fn emit_jq(run: &[Node]) -> Result<Fragment> {
    let stages = build_stages(run);
    let body = if stages.is_empty() { ".".to_string() } else { stages.join(" | ") };
    let command = format!("jq -c {}", single_quote(&body));
    Ok(Fragment::new(command, StreamFormat::Ndjson, StreamFormat::Ndjson))
}

/// Emit a conversion fragment that projects `columns` out of an ndjson
/// stream into tab-separated values, for handoff to the AWK/sort
/// emitters when the plan needs `GroupBy`/`Agg`/`Sort` after json input.
pub fn emit_jq_to_tsv(columns: &[String]) -> Result<Fragment> {
    let accessors = columns.iter().map(|c| field_access(c)).collect::<Vec<_>>().join(", ");
    let body = format!("[{accessors}] | @tsv");
    let command = format!("jq -r {}", single_quote(&body));
    Ok(Fragment::new(
        command,
        StreamFormat::Ndjson,
        StreamFormat::Tsv { delim: '\t', columns: columns.to_vec() },
    ))
}
