// Pipeline assembler. Walks the optimized plan leaf to root, delegates
// contiguous runs of nodes to the one emitter that can fuse them, and
// joins the resulting fragments with ` | `. This is the one place that
// knows how all four backends compose; each backend only knows its own
// utility.

pub mod cache;
pub mod quote;

use crate::backend::{awk, grep, jq, sort as sort_backend};
use crate::backend::awk::{AwkRun, HeaderSource};
use crate::backend::{Fragment, StreamFormat};
use crate::error::{CompileError, Result};
use crate::plan::{AggItem, Format, Node, Plan, Workers};
use crate::registry::ToolRegistry;
use quote::{render, ShellArg};

fn gather_col_filters(nodes: &[Node]) -> (Vec<(String, crate::plan::ColOp, crate::plan::Scalar)>, usize) {
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(Node::ColFilter { column, op, value }) = nodes.get(i) {
        out.push((column.clone(), *op, value.clone()));
        i += 1;
    }
    (out, i)
}

/// Gather a contiguous `ColFilter*` then optional `Select` or
/// `GroupBy`+`Agg` run for the AWK emitter.
fn gather_awk_run(nodes: &[Node]) -> (AwkRun, usize) {
    let (col_filters, mut i) = gather_col_filters(nodes);
    let mut select = None;
    let mut group_by_agg = None;
    match (nodes.get(i), nodes.get(i + 1)) {
        (Some(Node::Select { columns }), _) => {
            select = Some(columns.clone());
            i += 1;
        }
        (Some(Node::GroupBy { keys }), Some(Node::Agg { items })) => {
            group_by_agg = Some((keys.clone(), items.clone()));
            i += 2;
        }
        _ => {}
    }
    (AwkRun { col_filters, select, group_by_agg }, i)
}

/// Gather a contiguous `ColFilter*` then optional `Select` run for the
/// jq emitter. Stops before `GroupBy`/`Agg`, which jq never performs.
fn gather_jq_run(nodes: &[Node]) -> (Vec<Node>, usize) {
    let (col_filters, mut i) = gather_col_filters(nodes);
    let mut run: Vec<Node> = col_filters
        .into_iter()
        .map(|(column, op, value)| Node::ColFilter { column, op, value })
        .collect();
    if let Some(node @ Node::Select { .. }) = nodes.get(i) {
        run.push(node.clone());
        i += 1;
    }
    (run, i)
}

/// The columns a `GroupBy`+`Agg` pair needs present on its input: the
/// grouping keys, then any column an aggregation expression references
/// that isn't already a key, in first-seen order.
fn group_agg_input_columns(keys: &[String], items: &[AggItem]) -> Vec<String> {
    let mut cols: Vec<String> = keys.to_vec();
    for item in items {
        for c in item.expr.referenced_columns() {
            if !cols.iter().any(|existing| existing == c) {
                cols.push(c.to_string());
            }
        }
    }
    cols
}

fn column_position(columns: &[String], name: &str) -> Option<usize> {
    columns.iter().position(|c| c == name).map(|p| p + 1)
}

fn split_glob(pattern: &str) -> (String, String) {
    match pattern.rfind('/') {
        Some(pos) => (pattern[..pos].to_string(), pattern[pos + 1..].to_string()),
        None => (".".to_string(), pattern.to_string()),
    }
}

/// Assemble the full shell command line for `plan` against the tools
/// resolved by `registry`.
#[tracing::instrument(skip(plan, registry))]
pub fn assemble(plan: &Plan, registry: &ToolRegistry) -> Result<String> {
    let nodes = plan.nodes();
    let (source_pattern, source_is_glob) = match nodes.first() {
        Some(Node::Source { pattern, is_glob }) => (pattern.clone(), *is_glob),
        _ => return Err(CompileError::plan("Source", "a plan must begin with a Source node")),
    };

    let workers = nodes.iter().find_map(|n| match n {
        Node::Parallel { workers } => Some(*workers),
        _ => None,
    });
    if workers.is_some() && plan.has_global_state() {
        return Err(CompileError::plan(
            "Parallel",
            "Parallel is incompatible with a plan containing Sort, Distinct, GroupBy/Agg, or Limit",
        ));
    }

    let mut fragments: Vec<Fragment> = Vec::new();
    let mut current_format = StreamFormat::Raw;
    let mut preceded_by_sort = false;
    let mut idx = 1; // nodes[0] is the Source, handled separately above

    while idx < nodes.len() {
        match &nodes[idx] {
            Node::Parallel { .. } => {
                idx += 1;
            }
            Node::Parse { format: Format::Text, .. } => {
                idx += 1;
            }
            Node::Parse { format: Format::Csv, has_header: false } => {
                // No header line means no name-to-index map; the builder
                // already forbids any field-aware node downstream.
                idx += 1;
            }
            Node::Parse { format: Format::Csv, has_header: true } => {
                let (run, consumed) = gather_awk_run(&nodes[idx + 1..]);
                let frag = awk::emit_awk(HeaderSource::FromFirstRecord, ',', ',', current_format.clone(), &run)?;
                current_format = frag.output.clone();
                fragments.push(frag);
                idx += 1 + consumed;
                preceded_by_sort = false;
            }
            Node::Parse { format: Format::Json, .. } => {
                let (run, consumed) = gather_jq_run(&nodes[idx + 1..]);
                let next_is_group_by = matches!(nodes.get(idx + 1 + consumed), Some(Node::GroupBy { .. }));
                if consumed == 0 && next_is_group_by {
                    // GroupBy/Agg handles its own jq-to-tsv conversion; an
                    // identity `jq -c '.'` stage here would be a no-op.
                    current_format = StreamFormat::Ndjson;
                } else {
                    registry.resolve_jq().ok_or_else(|| CompileError::unsupported("jq"))?;
                    let frag = jq::emit_jq(&run)?;
                    current_format = frag.output.clone();
                    fragments.push(frag);
                }
                idx += 1 + consumed;
                preceded_by_sort = false;
            }
            Node::LineFilter { kind, pattern } => {
                let grep_info = registry.resolve_grep()?;
                let frag = grep::emit_line_filter(*kind, pattern, &grep_info, current_format.clone())?;
                current_format = frag.output.clone();
                fragments.push(frag);
                idx += 1;
                preceded_by_sort = false;
            }
            Node::ColFilter { .. } | Node::Select { .. } => match &current_format {
                StreamFormat::Tsv { delim, columns } => {
                    let (delim, columns) = (*delim, columns.clone());
                    let (run, consumed) = gather_awk_run(&nodes[idx..]);
                    let frag = awk::emit_awk(
                        HeaderSource::Static(columns),
                        delim,
                        delim,
                        current_format.clone(),
                        &run,
                    )?;
                    current_format = frag.output.clone();
                    fragments.push(frag);
                    idx += consumed;
                    preceded_by_sort = false;
                }
                StreamFormat::Ndjson => {
                    let (run, consumed) = gather_jq_run(&nodes[idx..]);
                    registry.resolve_jq().ok_or_else(|| CompileError::unsupported("jq"))?;
                    let frag = jq::emit_jq(&run)?;
                    current_format = frag.output.clone();
                    fragments.push(frag);
                    idx += consumed;
                    preceded_by_sort = false;
                }
                StreamFormat::Raw => {
                    return Err(CompileError::plan(
                        nodes[idx].kind_name(),
                        "requires a preceding Parse node establishing field structure",
                    ));
                }
            },
            Node::GroupBy { keys } => {
                let items = match nodes.get(idx + 1) {
                    Some(Node::Agg { items }) => items.clone(),
                    _ => return Err(CompileError::plan("GroupBy", "GroupBy must be immediately followed by Agg")),
                };
                match &current_format {
                    StreamFormat::Tsv { delim, columns } => {
                        let (delim, columns) = (*delim, columns.clone());
                        let run = AwkRun {
                            col_filters: Vec::new(),
                            select: None,
                            group_by_agg: Some((keys.clone(), items)),
                        };
                        let frag =
                            awk::emit_awk(HeaderSource::Static(columns), delim, delim, current_format.clone(), &run)?;
                        current_format = frag.output.clone();
                        fragments.push(frag);
                    }
                    StreamFormat::Ndjson => {
                        registry.resolve_jq().ok_or_else(|| CompileError::unsupported("jq"))?;
                        let input_columns = group_agg_input_columns(keys, &items);
                        let conv = jq::emit_jq_to_tsv(&input_columns)?;
                        current_format = conv.output.clone();
                        fragments.push(conv);

                        let run = AwkRun {
                            col_filters: Vec::new(),
                            select: None,
                            group_by_agg: Some((keys.clone(), items)),
                        };
                        let frag = awk::emit_awk(
                            HeaderSource::Static(input_columns),
                            '\t',
                            '\t',
                            current_format.clone(),
                            &run,
                        )?;
                        current_format = frag.output.clone();
                        fragments.push(frag);
                    }
                    StreamFormat::Raw => {
                        return Err(CompileError::plan(
                            "GroupBy",
                            "requires a preceding Parse node establishing field structure",
                        ));
                    }
                }
                idx += 2;
                preceded_by_sort = false;
            }
            Node::Agg { .. } => {
                // Only ever reached if a GroupBy/Agg pair got separated,
                // which the builder and optimizer both prevent.
                return Err(CompileError::plan("Agg", "Agg must immediately follow GroupBy"));
            }
            Node::Sort { key, descending, numeric } => {
                let (delim, columns) = match &current_format {
                    StreamFormat::Tsv { delim, columns } => (*delim, columns.clone()),
                    _ => {
                        return Err(CompileError::plan(
                            "Sort",
                            "requires a preceding field-aware stage with a known column list",
                        ))
                    }
                };
                let pos = column_position(&columns, key)
                    .ok_or_else(|| CompileError::plan("Sort", format!("unknown sort key '{key}'")))?;
                let sort_info = registry.resolve_sort()?;
                let frag = sort_backend::emit_sort(
                    pos,
                    *descending,
                    *numeric,
                    delim,
                    columns,
                    &sort_info,
                    &registry.tmpdir(),
                    registry.cpu_count(),
                )?;
                current_format = frag.output.clone();
                fragments.push(frag);
                idx += 1;
                preceded_by_sort = true;
            }
            Node::Distinct => {
                if preceded_by_sort {
                    fragments.push(sort_backend::emit_uniq(current_format.clone()));
                } else {
                    let sort_info = registry.resolve_sort()?;
                    let frag = sort_backend::emit_distinct_sort(
                        current_format.clone(),
                        &sort_info,
                        &registry.tmpdir(),
                        registry.cpu_count(),
                    )?;
                    fragments.push(frag);
                }
                idx += 1;
                preceded_by_sort = false;
            }
            Node::Limit { n } => {
                fragments.push(sort_backend::emit_limit(*n, current_format.clone()));
                idx += 1;
                preceded_by_sort = false;
            }
            Node::Source { .. } => {
                idx += 1;
            }
        }
    }

    if fragments.is_empty() {
        return Err(CompileError::plan("Plan", "a plan must contain at least one processing operation"));
    }

    let piped_from = |start: usize| -> String {
        fragments[start..].iter().map(|f| f.command.clone()).collect::<Vec<_>>().join(" | ")
    };

    if let Some(workers) = workers {
        let (dir, name) = split_glob(&source_pattern);
        let n = match workers {
            Workers::Auto => registry.cpu_count(),
            Workers::Fixed(k) => k as usize,
        };
        let prefix = render(&[
            ShellArg::Flag("find"),
            ShellArg::Quoted(dir),
            ShellArg::Flag("-name"),
            ShellArg::Quoted(name),
            ShellArg::Flag("-print0"),
            ShellArg::Raw("|".to_string()),
            ShellArg::Flag("xargs"),
            ShellArg::Flag("-0"),
            ShellArg::Raw(format!("-P{n}")),
        ])?;
        let first = format!("{prefix} {}", fragments[0].command);
        let rest = piped_from(1);
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(format!("{first} | {rest}"))
        }
    } else {
        let arg = if source_is_glob { source_pattern.clone() } else { render(&[ShellArg::Quoted(source_pattern.clone())])? };
        let first = format!("{} {arg}", fragments[0].command);
        let rest = piped_from(1);
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(format!("{first} | {rest}"))
        }
    }
}
