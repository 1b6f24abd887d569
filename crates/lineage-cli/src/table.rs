// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Table rendering for diffs and graphs.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use lineage_core::{Diff, NodeId, ProvenanceGraph};
use serde_json::Value;

fn base_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn show(value: &Value) -> String {
    value.to_string()
}

/// One row per difference: kind, dotted path, old and new values.
pub fn diff_table(diffs: &[Diff]) -> Table {
    let mut table = base_table(&["kind", "path", "old", "new"]);
    for entry in diffs {
        let (kind, old, new) = match entry {
            Diff::Added { new, .. } => ("added", String::new(), show(new)),
            Diff::Removed { old, .. } => ("removed", show(old), String::new()),
            Diff::Changed { old, new, .. } => ("changed", show(old), show(new)),
        };
        table.add_row(vec![kind.to_owned(), entry.dotted_path(), old, new]);
    }
    table
}

/// Nodes in depth-first order from the root, children in creation order.
/// Labels are indented by depth; the current node is marked with `*`.
pub fn node_table<T, A>(graph: &ProvenanceGraph<T, A>) -> Table {
    let mut table = base_table(&["", "id", "label", "kind", "diffs", "notes"]);
    for (depth, id) in walk(graph) {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let marker = if id == graph.current() { "*" } else { "" };
        let (diffs, notes) = node
            .artifacts()
            .map_or((String::new(), String::new()), |artifacts| {
                (
                    artifacts.diffs.len().to_string(),
                    artifacts.extra.len().to_string(),
                )
            });
        table.add_row(vec![
            marker.to_owned(),
            id.to_string(),
            format!("{}{}", "  ".repeat(depth), node.label()),
            node.metadata().kind.clone().unwrap_or_default(),
            diffs,
            notes,
        ]);
    }
    table
}

fn walk<T, A>(graph: &ProvenanceGraph<T, A>) -> Vec<(usize, &NodeId)> {
    let mut order = Vec::with_capacity(graph.len());
    let mut stack = vec![(0, graph.root())];
    while let Some((depth, id)) = stack.pop() {
        order.push((depth, id));
        if let Some(node) = graph.node(id) {
            stack.extend(node.children().iter().rev().map(|child| (depth + 1, child)));
        }
    }
    order
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use lineage_core::{graph, SystemStamper};
    use serde_json::json;

    #[test]
    fn diff_table_lists_each_entry() {
        let diffs = lineage_core::diff(&json!({ "a": 1, "b": 2 }), &json!({ "a": 3, "c": 4 }));
        let rendered = diff_table(&diffs).to_string();
        assert!(rendered.contains("changed"));
        assert!(rendered.contains("removed"));
        assert!(rendered.contains("added"));
    }

    #[test]
    fn node_table_walks_branches_depth_first() {
        let mut stamper = SystemStamper;
        let g: ProvenanceGraph<Value, Value> =
            graph::create_graph(json!(0), "Root", &mut stamper);
        let g = graph::apply_action(
            &g,
            lineage_core::Action::from_fn("first", |_| json!(1)),
            &mut stamper,
        )
        .unwrap();
        let g = graph::go_back_one_step(&g).unwrap();
        let g = graph::apply_action(
            &g,
            lineage_core::Action::from_fn("second", |_| json!(2)),
            &mut stamper,
        )
        .unwrap();

        let order: Vec<&str> = walk(&g)
            .into_iter()
            .map(|(_, id)| g.node(id).unwrap().label())
            .collect();
        assert_eq!(order, ["Root", "first", "second"]);

        let rendered = node_table(&g).to_string();
        assert!(rendered.contains("  second"));
        assert!(rendered.contains('*'));
    }
}
