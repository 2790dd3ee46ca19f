// Immutable, structurally-hashable query plan.
//
// A `Plan` is a linear chain of `Node`s, leaf (`Source`) first. There
// is no branching: every node has at most one child, so the chain is
// just a `Vec<Node>` in construction order. Nodes are never mutated —
// the builder and optimizer both produce new `Plan`s wholesale.

pub mod builder;
pub mod expr;

pub use builder::PlanBuilder;
pub use expr::{AggExpr, ArithOp, Operand};

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};

/// Upstream byte-stream structure declared by a `Parse` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    Csv,
    Json,
    Text,
}

/// Operators recognized by whole-line predicates (`LineFilter`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineOp {
    Contains,
    Regex,
    StartsWith,
    EndsWith,
}

/// Operators recognized by field predicates (`ColFilter`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ColOp {
    pub fn awk_operator(self) -> &'static str {
        match self {
            ColOp::Eq => "==",
            ColOp::Ne => "!=",
            ColOp::Lt => "<",
            ColOp::Le => "<=",
            ColOp::Gt => ">",
            ColOp::Ge => ">=",
        }
    }

    pub fn jq_operator(self) -> &'static str {
        self.awk_operator()
    }
}

/// A literal value carried by a `ColFilter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Scalar {
    Str(String),
    Num(f64),
}

impl Scalar {
    pub fn str(s: impl Into<String>) -> Self {
        Scalar::Str(s.into())
    }

    pub fn num(n: f64) -> Self {
        Scalar::Num(n)
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            (Scalar::Num(a), Scalar::Num(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}
impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Scalar::Str(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Scalar::Num(n) => {
                1u8.hash(state);
                n.to_bits().hash(state);
            }
        }
    }
}

/// Aggregation functions accepted by an `Agg` item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
    CountDistinct,
}

/// One `(alias, expression, function)` entry of an `Agg` node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggItem {
    pub alias: String,
    pub expr: AggExpr,
    pub func: AggFn,
}

/// How many workers a `Parallel` annotation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Workers {
    Auto,
    Fixed(u32),
}

/// One node of the plan chain. See `spec.md` §3 for the full semantics
/// of each variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    Source { pattern: String, is_glob: bool },
    Parse { format: Format, has_header: bool },
    LineFilter { kind: LineOp, pattern: String },
    ColFilter { column: String, op: ColOp, value: Scalar },
    Select { columns: Vec<String> },
    GroupBy { keys: Vec<String> },
    Agg { items: Vec<AggItem> },
    Sort { key: String, descending: bool, numeric: bool },
    Limit { n: u64 },
    Distinct,
    Parallel { workers: Workers },
}

impl Node {
    /// Short, stable name used in error messages — never a full dump.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Source { .. } => "Source",
            Node::Parse { .. } => "Parse",
            Node::LineFilter { .. } => "LineFilter",
            Node::ColFilter { .. } => "ColFilter",
            Node::Select { .. } => "Select",
            Node::GroupBy { .. } => "GroupBy",
            Node::Agg { .. } => "Agg",
            Node::Sort { .. } => "Sort",
            Node::Limit { .. } => "Limit",
            Node::Distinct => "Distinct",
            Node::Parallel { .. } => "Parallel",
        }
    }

    /// True for the four operators that require a final, non-distributable
    /// reduction step and therefore cannot coexist with `Parallel`.
    pub fn is_global_state(&self) -> bool {
        matches!(
            self,
            Node::Sort { .. } | Node::Distinct | Node::GroupBy { .. } | Node::Agg { .. } | Node::Limit { .. }
        )
    }
}

/// An immutable, structurally-hashable chain of plan nodes, leaf
/// (`Source`) first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Plan {
    nodes: Vec<Node>,
}

impl Plan {
    pub fn empty() -> Self {
        Plan { nodes: Vec::new() }
    }

    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        Plan { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn source(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// True iff any node in the plan is a global-state operator. Used
    /// by the compiler to enforce the `Parallel` legality rule, which
    /// is checked at compile time rather than build time since later
    /// builder calls may introduce a violation.
    pub fn has_global_state(&self) -> bool {
        self.nodes.iter().any(Node::is_global_state)
    }

    pub fn has_parallel(&self) -> bool {
        self.nodes.iter().any(|n| matches!(n, Node::Parallel { .. }))
    }

    /// A process-stable structural hash. Two plans built from the same
    /// sequence of calls with the same field values hash equal; any
    /// field difference, including element order in `Select`/`GroupBy`/
    /// `Agg`, changes the hash.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.nodes.hash(&mut hasher);
        hasher.finish()
    }
}
