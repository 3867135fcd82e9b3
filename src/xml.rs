//! Path helpers over roxmltree nodes.
//!
//! Paths are `>`-separated child element names (`rt-entry>nh>to`), matched on
//! local names so Junos namespace prefixes do not matter.

use roxmltree::Node;
use std::str::FromStr;

/// Every node reached by following `path` through all matching children.
pub(crate) fn all<'a, 'i>(node: Node<'a, 'i>, path: &str) -> Vec<Node<'a, 'i>> {
    let mut current = vec![node];
    for segment in path.split('>') {
        current = current
            .into_iter()
            .flat_map(|n| n.children().filter(move |c| c.has_tag_name(segment)))
            .collect();
    }
    current
}

/// First node reached by `path`.
pub(crate) fn child<'a, 'i>(node: Node<'a, 'i>, path: &str) -> Option<Node<'a, 'i>> {
    all(node, path).into_iter().next()
}

/// First descendant (or `node` itself) with the given element name.
pub(crate) fn find<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.descendants().find(|n| n.has_tag_name(name))
}

/// Trimmed text of the first node at `path`; empty when missing.
pub(crate) fn text(node: Node<'_, '_>, path: &str) -> String {
    child(node, path)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Trimmed text of every node at `path`.
pub(crate) fn texts(node: Node<'_, '_>, path: &str) -> Vec<String> {
    all(node, path)
        .into_iter()
        .filter_map(|n| n.text())
        .map(|t| t.trim().to_string())
        .collect()
}

/// Numeric value at `path`; zero when missing or malformed.
pub(crate) fn number<T: FromStr + Default>(node: Node<'_, '_>, path: &str) -> T {
    text(node, path).parse().unwrap_or_default()
}

/// Decode every node at `path` with `f`.
pub(crate) fn list<'a, 'i, T>(
    node: Node<'a, 'i>,
    path: &str,
    f: impl Fn(Node<'a, 'i>) -> T,
) -> Vec<T> {
    all(node, path).into_iter().map(f).collect()
}
