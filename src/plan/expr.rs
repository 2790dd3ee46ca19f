// Aggregation-column arithmetic sub-language.
//
// Resolves the open question in the design notes about aggregation
// columns like `"price * quantity"`: we support a bare column
// reference, or one binary operation between two operands where each
// operand is a column name or a numeric literal.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn awk_symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// One operand of an `AggExpr::BinOp`: either a column reference or a
/// numeric literal. Stored as a fixed-precision decimal string so two
/// expressions built from the same literal text hash equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Column(String),
    Literal(String),
}

/// The value an `Agg` item aggregates. `Column` covers the common case;
/// `BinOp` covers the `col op col` / `col op const` shapes documented
/// as an open question in the spec and resolved here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggExpr {
    Column(String),
    BinOp(Operand, ArithOp, Operand),
}

impl AggExpr {
    pub fn column(name: impl Into<String>) -> Self {
        AggExpr::Column(name.into())
    }

    pub fn binop(lhs: Operand, op: ArithOp, rhs: Operand) -> Self {
        AggExpr::BinOp(lhs, op, rhs)
    }

    /// Columns referenced by this expression, for invariant checking and
    /// for working out which columns a jq-to-tsv conversion must carry
    /// through for a downstream aggregation. `"*"` is the count-star
    /// sentinel, not a real column, so it is never reported here.
    pub fn referenced_columns(&self) -> Vec<&str> {
        match self {
            AggExpr::Column(c) if c == "*" => vec![],
            AggExpr::Column(c) => vec![c.as_str()],
            AggExpr::BinOp(lhs, _, rhs) => [lhs, rhs]
                .into_iter()
                .filter_map(|o| match o {
                    Operand::Column(c) => Some(c.as_str()),
                    Operand::Literal(_) => None,
                })
                .collect(),
        }
    }

    /// Render as an AWK expression, given a function that maps a column
    /// name to its header-map lookup text (e.g. `$h["price"]`).
    pub fn to_awk<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> String,
    {
        match self {
            AggExpr::Column(c) => lookup(c),
            AggExpr::BinOp(lhs, op, rhs) => format!(
                "({} {} {})",
                operand_awk(lhs, &lookup),
                op.awk_symbol(),
                operand_awk(rhs, &lookup)
            ),
        }
    }
}

fn operand_awk<F>(op: &Operand, lookup: &F) -> String
where
    F: Fn(&str) -> String,
{
    match op {
        Operand::Column(c) => lookup(c),
        Operand::Literal(lit) => lit.clone(),
    }
}

impl fmt::Display for AggExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggExpr::Column(c) => write!(f, "{c}"),
            AggExpr::BinOp(lhs, op, rhs) => {
                write!(f, "{} {} {}", display_operand(lhs), op.awk_symbol(), display_operand(rhs))
            }
        }
    }
}

fn display_operand(op: &Operand) -> String {
    match op {
        Operand::Column(c) => c.clone(),
        Operand::Literal(lit) => lit.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_column_round_trips_to_awk() {
        let expr = AggExpr::column("price");
        assert_eq!(expr.to_awk(|c| format!("$h[\"{c}\"]")), "$h[\"price\"]");
    }

    #[test]
    fn binop_emits_parenthesized_awk_expr() {
        let expr = AggExpr::binop(
            Operand::Column("price".into()),
            ArithOp::Mul,
            Operand::Column("quantity".into()),
        );
        assert_eq!(
            expr.to_awk(|c| format!("$h[\"{c}\"]")),
            "($h[\"price\"] * $h[\"quantity\"])"
        );
    }

    #[test]
    fn count_star_sentinel_references_no_column() {
        let expr = AggExpr::column("*");
        assert!(expr.referenced_columns().is_empty());
    }

    #[test]
    fn binop_with_literal_operand() {
        let expr = AggExpr::binop(
            Operand::Column("price".into()),
            ArithOp::Sub,
            Operand::Literal("1".into()),
        );
        assert_eq!(expr.referenced_columns(), vec!["price"]);
        assert_eq!(expr.to_awk(|c| format!("$h[\"{c}\"]")), "($h[\"price\"] - 1)");
    }
}
