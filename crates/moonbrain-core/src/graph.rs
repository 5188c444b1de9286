//! Note graph derivation and merging.
//!
//! Every note, published or private, contributes one node to its author's
//! graph and one link per linked article that points at another note
//! (`id:<note-id>`).
//! Merges are set unions: links are unique per `(source, target)` and nodes
//! are unique per note id.

use std::collections::HashSet;

use crate::defaults::LINK_ID_PREFIX;
use crate::models::{GraphNodeLinks, GraphNoteLink, GraphNoteNode, Note};

/// Merge `incoming` links into `existing`, keeping each `(source, target)`
/// pair once.
///
/// Order is `existing` first, then new pairs from `incoming` in the order
/// they appear.
///
/// ```
/// use moonbrain_core::{merge_links, GraphNoteLink};
///
/// let link = |s: &str, t: &str| GraphNoteLink { source: s.into(), target: t.into() };
/// let merged = merge_links(&[link("a", "b")], &[link("a", "b"), link("b", "c")]);
/// assert_eq!(merged, vec![link("a", "b"), link("b", "c")]);
/// ```
pub fn merge_links(existing: &[GraphNoteLink], incoming: &[GraphNoteLink]) -> Vec<GraphNoteLink> {
    let mut seen: HashSet<(&str, &str)> = existing
        .iter()
        .map(|l| (l.source.as_str(), l.target.as_str()))
        .collect();

    let mut merged = existing.to_vec();
    for link in incoming {
        if seen.insert((link.source.as_str(), link.target.as_str())) {
            merged.push(link.clone());
        }
    }
    merged
}

/// Insert `node` into `existing`, replacing any node with the same id.
pub fn merge_nodes(existing: &[GraphNoteNode], node: GraphNoteNode) -> Vec<GraphNoteNode> {
    let mut merged = existing.to_vec();
    match merged.iter_mut().find(|n| n.id == node.id) {
        Some(slot) => *slot = node,
        None => merged.push(node),
    }
    merged
}

/// Extract the target note id from a linked article URL.
///
/// Only URLs of the form `id:<value>` with a non-empty value qualify.
pub fn extract_link_id(url: &str) -> Option<&str> {
    url.strip_prefix(LINK_ID_PREFIX).filter(|id| !id.is_empty())
}

/// Derive the graph node for a note.
pub fn node_for_note(note: &Note) -> GraphNoteNode {
    let weight = note
        .meta
        .linked_articles
        .as_ref()
        .map_or(0, |links| links.len());

    GraphNoteNode {
        id: note.id.clone(),
        title: note.meta.title.clone().unwrap_or_default(),
        weight: i32::try_from(weight).unwrap_or(i32::MAX),
    }
}

/// Derive the outgoing links of a note from its linked articles.
pub fn related_links(note: &Note) -> Vec<GraphNoteLink> {
    note.meta
        .linked_articles
        .iter()
        .flatten()
        .filter_map(|article| extract_link_id(&article.url))
        .map(|target| GraphNoteLink {
            source: note.id.clone(),
            target: target.to_string(),
        })
        .collect()
}

/// Node plus links for a note, ready to merge into its author's graph.
pub fn graph_update_for_note(note: &Note) -> GraphNodeLinks {
    GraphNodeLinks {
        node: node_for_note(note),
        links: related_links(note),
    }
}
