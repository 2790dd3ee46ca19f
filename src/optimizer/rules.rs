// Individual optimizer passes. Each scans the node chain left to right
// and applies the first eligible rewrite it finds; `optimizer::optimize`
// re-invokes a pass until it reports no further change, so a pass only
// needs to make local progress, not find every opportunity in one call.

use crate::plan::{Node, Plan};

/// Move a `ColFilter` above an immediately preceding `Select` when the
/// filter only references columns the `Select` retains. Never crosses a
/// `Parse` node, since raw-line semantics differ from parsed semantics —
/// this rule only ever swaps a `Select` with its successor, so a `Parse`
/// earlier in the chain is untouched.
pub fn filter_pushdown(plan: &Plan) -> Option<Plan> {
    let nodes = plan.nodes();
    for i in 0..nodes.len().saturating_sub(1) {
        if let (Node::Select { columns }, Node::ColFilter { column, .. }) = (&nodes[i], &nodes[i + 1]) {
            if columns.iter().any(|c| c == column) {
                let mut rewritten = nodes.to_vec();
                rewritten.swap(i, i + 1);
                return Some(Plan::from_nodes(rewritten));
            }
        }
    }
    None
}

/// Collapse two structurally-equal filters in immediate succession.
pub fn duplicate_filter_elimination(plan: &Plan) -> Option<Plan> {
    let nodes = plan.nodes();
    for i in 0..nodes.len().saturating_sub(1) {
        let is_filter = matches!(nodes[i], Node::LineFilter { .. } | Node::ColFilter { .. });
        if is_filter && nodes[i] == nodes[i + 1] {
            let mut rewritten = nodes.to_vec();
            rewritten.remove(i + 1);
            return Some(Plan::from_nodes(rewritten));
        }
    }
    None
}

/// Remove a `Distinct` that immediately follows `Agg` — grouping already
/// produces unique keys.
pub fn post_groupby_distinct_elimination(plan: &Plan) -> Option<Plan> {
    let nodes = plan.nodes();
    for i in 0..nodes.len().saturating_sub(1) {
        if matches!(nodes[i], Node::Agg { .. }) && matches!(nodes[i + 1], Node::Distinct) {
            let mut rewritten = nodes.to_vec();
            rewritten.remove(i + 1);
            return Some(Plan::from_nodes(rewritten));
        }
    }
    None
}

/// Collapse two consecutive `Limit`s to the smaller `n`. Never pushes a
/// `Limit` past a `Sort` — there is no such rewrite here by design,
/// since that would change which rows survive.
pub fn limit_coalescing(plan: &Plan) -> Option<Plan> {
    let nodes = plan.nodes();
    for i in 0..nodes.len().saturating_sub(1) {
        if let (Node::Limit { n: n1 }, Node::Limit { n: n2 }) = (&nodes[i], &nodes[i + 1]) {
            let mut rewritten = nodes.to_vec();
            rewritten[i] = Node::Limit { n: (*n1).min(*n2) };
            rewritten.remove(i + 1);
            return Some(Plan::from_nodes(rewritten));
        }
    }
    None
}
