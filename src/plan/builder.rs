// Fluent, persistent plan builder. Each call consumes `self` and
// returns a new builder; nothing is mutated in place, matching the
// "replaced wholesale, never mutated" lifecycle from the data model.
//
// Per design note 1, the internal primitives are explicit constructors
// (`filter_line`, `filter_col`); the `name__op` keyword convention is
// sugar layered on top in `filter_kw`, not the other way around.

use crate::error::{CompileError, Result};
use crate::plan::{AggExpr, AggFn, AggItem, ColOp, Format, LineOp, Node, Plan, Scalar, Workers};

#[derive(Debug, Clone)]
pub struct PlanBuilder {
    nodes: Vec<Node>,
    parsed: Option<(Format, bool)>,
    pending_group_by: bool,
    has_parallel: bool,
}

impl PlanBuilder {
    /// Start a new plan at its one and only `Source`.
    pub fn source(pattern: impl Into<String>, is_glob: bool) -> Self {
        PlanBuilder {
            nodes: vec![Node::Source { pattern: pattern.into(), is_glob }],
            parsed: None,
            pending_group_by: false,
            has_parallel: false,
        }
    }

    /// Declare the upstream stream's structure. May be called at most
    /// once, directly after `Source`.
    pub fn parse(mut self, format: Format, has_header: bool) -> Result<Self> {
        if self.parsed.is_some() {
            return Err(CompileError::plan("Parse", "at most one Parse node is allowed"));
        }
        if self.nodes.len() != 1 {
            return Err(CompileError::plan("Parse", "Parse must immediately follow Source"));
        }
        self.parsed = Some((format, has_header));
        self.nodes.push(Node::Parse { format, has_header });
        Ok(self)
    }

    /// Predicate on the raw line, with no field awareness. Legal with
    /// or without a preceding `Parse`. `Regex` patterns are validated
    /// eagerly with the `regex` crate so a malformed pattern fails at
    /// build time rather than surfacing as a cryptic `grep -E` error
    /// from the compiled pipeline.
    pub fn filter_line(mut self, kind: LineOp, pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if matches!(kind, LineOp::Regex) {
            regex::Regex::new(&pattern)
                .map_err(|e| CompileError::plan("LineFilter", format!("invalid regex '{pattern}': {e}")))?;
        }
        self.nodes.push(Node::LineFilter { kind, pattern });
        Ok(self)
    }

    /// Predicate on a named field. Requires a preceding `Parse`, and for
    /// csv requires `has_header = true`.
    pub fn filter_col(mut self, column: impl Into<String>, op: ColOp, value: Scalar) -> Result<Self> {
        self.require_field_aware("ColFilter")?;
        self.nodes.push(Node::ColFilter { column: column.into(), op, value });
        Ok(self)
    }

    /// Sugar for the `name__operator=value` keyword convention: `line__contains`
    /// routes to `filter_line`; any other column name routes to `filter_col`.
    pub fn filter_kw(self, keyword: &str, value: Scalar) -> Result<Self> {
        let (name, op) = keyword
            .rsplit_once("__")
            .ok_or_else(|| CompileError::plan("filter", format!("'{keyword}' is missing an __operator suffix")))?;

        if name == "line" {
            let line_op = parse_line_op(op)
                .ok_or_else(|| CompileError::plan("filter", format!("'{op}' is not a valid line operator")))?;
            let pattern = match value {
                Scalar::Str(s) => s,
                Scalar::Num(n) => n.to_string(),
            };
            self.filter_line(line_op, pattern)
        } else {
            let col_op = parse_col_op(op)
                .ok_or_else(|| CompileError::plan("filter", format!("'{op}' is not a valid column operator")))?;
            self.filter_col(name, col_op, value)
        }
    }

    /// Ordered projection. Preserves the given order; duplicates allowed.
    pub fn select(mut self, columns: Vec<impl Into<String>>) -> Result<Self> {
        self.require_field_aware("Select")?;
        self.nodes.push(Node::Select { columns: columns.into_iter().map(Into::into).collect() });
        Ok(self)
    }

    /// Marks grouping columns. Must be immediately followed by `agg`.
    pub fn group_by(mut self, keys: Vec<impl Into<String>>) -> Result<Self> {
        self.require_field_aware("GroupBy")?;
        if self.pending_group_by {
            return Err(CompileError::plan("GroupBy", "GroupBy must be immediately followed by Agg"));
        }
        self.pending_group_by = true;
        self.nodes.push(Node::GroupBy { keys: keys.into_iter().map(Into::into).collect() });
        Ok(self)
    }

    /// Defines output columns. Requires the most recent node to be `GroupBy`.
    pub fn agg(mut self, items: Vec<(String, AggExpr, AggFn)>) -> Result<Self> {
        if !self.pending_group_by {
            return Err(CompileError::plan("Agg", "Agg must immediately follow GroupBy"));
        }
        for (alias, expr, func) in &items {
            if matches!(func, AggFn::Count) {
                continue; // count's expr may legitimately be the "*" column sentinel
            }
            if let AggExpr::Column(c) = expr {
                if c == "*" {
                    return Err(CompileError::plan(
                        "Agg",
                        format!("'*' is only valid with fn=count (alias '{alias}')"),
                    ));
                }
            }
        }
        self.pending_group_by = false;
        self.nodes.push(Node::Agg {
            items: items
                .into_iter()
                .map(|(alias, expr, func)| AggItem { alias, expr, func })
                .collect(),
        });
        Ok(self)
    }

    /// Total order by a single key.
    pub fn sort(mut self, key: impl Into<String>, descending: bool, numeric: bool) -> Result<Self> {
        if self.pending_group_by {
            return Err(CompileError::plan("Sort", "GroupBy must be immediately followed by Agg"));
        }
        self.nodes.push(Node::Sort { key: key.into(), descending, numeric });
        Ok(self)
    }

    /// Take the first `n` rows. `n` must be positive.
    pub fn limit(mut self, n: u64) -> Result<Self> {
        if n == 0 {
            return Err(CompileError::plan("Limit", "n must be a positive integer"));
        }
        self.nodes.push(Node::Limit { n });
        Ok(self)
    }

    /// Deduplicate whole records.
    pub fn distinct(mut self) -> Self {
        self.nodes.push(Node::Distinct);
        self
    }

    /// Request multi-file parallelism for the pipeline prefix. The
    /// global-state legality check runs at compile time, since later
    /// builder calls may still introduce a violating node.
    pub fn parallel(mut self, workers: Workers) -> Result<Self> {
        if self.has_parallel {
            return Err(CompileError::plan("Parallel", "Parallel may appear at most once"));
        }
        self.has_parallel = true;
        self.nodes.push(Node::Parallel { workers });
        Ok(self)
    }

    /// Finalize the plan, checking invariants that can only be known
    /// once construction stops (e.g. a dangling `GroupBy`).
    pub fn build(self) -> Result<Plan> {
        if self.pending_group_by {
            return Err(CompileError::plan("GroupBy", "GroupBy must be immediately followed by Agg"));
        }
        Ok(Plan::from_nodes(self.nodes))
    }

    fn require_field_aware(&self, node: &str) -> Result<()> {
        match self.parsed {
            Some((Format::Csv, true)) | Some((Format::Json, _)) => Ok(()),
            Some((Format::Csv, false)) => Err(CompileError::plan(
                node,
                "csv Parse must have has_header=true for field-aware operations",
            )),
            Some((Format::Text, _)) => Err(CompileError::plan(node, "text Parse has no named fields")),
            None => Err(CompileError::plan(node, "requires a preceding Parse node")),
        }
    }
}

fn parse_line_op(op: &str) -> Option<LineOp> {
    match op {
        "contains" => Some(LineOp::Contains),
        "regex" => Some(LineOp::Regex),
        "startswith" => Some(LineOp::StartsWith),
        "endswith" => Some(LineOp::EndsWith),
        _ => None,
    }
}

fn parse_col_op(op: &str) -> Option<ColOp> {
    match op {
        "eq" => Some(ColOp::Eq),
        "ne" => Some(ColOp::Ne),
        "lt" => Some(ColOp::Lt),
        "le" | "lte" => Some(ColOp::Le),
        "gt" => Some(ColOp::Gt),
        "ge" | "gte" => Some(ColOp::Ge),
        _ => None,
    }
}
