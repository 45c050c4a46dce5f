//! Entity graph: clusters resolved spans into records.
//!
//! One node per resolved span. Edges join two spans when:
//! - a proximity fact links them,
//! - their categories are complementary (NAME with anything, ADDRESS with
//!   PHONE or EMAIL) and they sit within the proximity window, or
//! - they carry the same value and category inside one paragraph.
//!
//! Connected components become entities. Entities refer to spans by their
//! index in the [`ResolvedSpanSet`].

use once_cell::sync::Lazy;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Dfs;
use pii_common::{Category, SpanKey};
use pii_config::{ProximityWindow, SanitizerConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::proximity::{within_window, ProximityFact};
use crate::resolve::ResolvedSpanSet;

/// Why two spans were joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Proximity,
    Complementary,
    RepeatedValue,
}

/// A cluster of spans believed to describe one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    /// A span with no qualifying edges.
    Singleton {
        id: usize,
        span: usize,
        categories: BTreeSet<Category>,
    },
    /// Two or more connected spans, ascending by index.
    Cluster {
        id: usize,
        spans: Vec<usize>,
        categories: BTreeSet<Category>,
    },
}

impl Entity {
    pub fn id(&self) -> usize {
        match self {
            Entity::Singleton { id, .. } | Entity::Cluster { id, .. } => *id,
        }
    }

    /// Member span indices, ascending.
    pub fn members(&self) -> &[usize] {
        match self {
            Entity::Singleton { span, .. } => std::slice::from_ref(span),
            Entity::Cluster { spans, .. } => spans,
        }
    }

    pub fn categories_present(&self) -> &BTreeSet<Category> {
        match self {
            Entity::Singleton { categories, .. } | Entity::Cluster { categories, .. } => {
                categories
            }
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, Entity::Cluster { .. })
    }
}

/// Whether two categories describe facets of one record.
pub fn is_complementary(a: Category, b: Category) -> bool {
    if a == b {
        return false;
    }
    if a == Category::Name || b == Category::Name {
        return true;
    }
    matches!(
        (a, b),
        (Category::Address, Category::Phone)
            | (Category::Address, Category::Email)
            | (Category::Phone, Category::Address)
            | (Category::Email, Category::Address)
    )
}

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").unwrap());

/// Paragraph number of each byte offset in `starts` (paragraphs are
/// separated by blank lines).
fn paragraph_ids(text: &str, starts: &[usize]) -> Vec<usize> {
    let breaks: Vec<usize> = PARAGRAPH_BREAK.find_iter(text).map(|m| m.end()).collect();
    starts
        .iter()
        .map(|&s| breaks.partition_point(|&b| b <= s))
        .collect()
}

/// The span graph for one resolved set.
pub struct EntityGraph {
    graph: UnGraph<usize, EdgeKind>,
}

impl EntityGraph {
    /// Build the graph; node `i` is resolved span `i`.
    pub fn build(
        text: &str,
        resolved: &ResolvedSpanSet,
        facts: &[ProximityFact],
        window: ProximityWindow,
    ) -> Self {
        let spans = resolved.spans();
        let mut graph = UnGraph::<usize, EdgeKind>::with_capacity(spans.len(), spans.len());
        let nodes: Vec<NodeIndex> = (0..spans.len()).map(|i| graph.add_node(i)).collect();

        let index_of: HashMap<SpanKey, usize> =
            spans.iter().enumerate().map(|(i, s)| (s.key(), i)).collect();

        let add_edge = |graph: &mut UnGraph<usize, EdgeKind>, i: usize, j: usize, kind: EdgeKind| {
            if i != j && graph.find_edge(nodes[i], nodes[j]).is_none() {
                graph.add_edge(nodes[i], nodes[j], kind);
            }
        };

        // Facts about candidates that lost resolution are ignored.
        for fact in facts {
            if let (Some(&i), Some(&j)) = (index_of.get(&fact.a), index_of.get(&fact.b)) {
                add_edge(&mut graph, i, j, EdgeKind::Proximity);
            }
        }

        for i in 0..spans.len() {
            for j in i + 1..spans.len() {
                if !within_window(text, &spans[i], &spans[j], window) {
                    break;
                }
                if is_complementary(spans[i].category, spans[j].category) {
                    add_edge(&mut graph, i, j, EdgeKind::Complementary);
                }
            }
        }

        let starts: Vec<usize> = spans.iter().map(|s| s.start).collect();
        let paragraphs = paragraph_ids(text, &starts);
        let mut repeated: BTreeMap<(usize, Category, &str), usize> = BTreeMap::new();
        for (i, span) in spans.iter().enumerate() {
            let key = (paragraphs[i], span.category, span.matched_text.as_str());
            match repeated.get(&key) {
                Some(&first) => add_edge(&mut graph, first, i, EdgeKind::RepeatedValue),
                None => {
                    repeated.insert(key, i);
                }
            }
        }

        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges as `(lower index, higher index, kind)`, sorted.
    pub fn edges(&self) -> Vec<(usize, usize, EdgeKind)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                let (a, b) = (self.graph[a], self.graph[b]);
                Some((a.min(b), a.max(b), self.graph[e]))
            })
            .collect();
        edges.sort_by_key(|&(a, b, _)| (a, b));
        edges
    }

    /// Connected components, each ascending, ordered by smallest member.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.graph.node_count()];
        let mut components = Vec::new();

        for start in self.graph.node_indices() {
            if seen[start.index()] {
                continue;
            }
            let mut members = Vec::new();
            let mut dfs = Dfs::new(&self.graph, start);
            while let Some(node) = dfs.next(&self.graph) {
                seen[node.index()] = true;
                members.push(self.graph[node]);
            }
            members.sort_unstable();
            components.push(members);
        }

        components
    }
}

/// Cluster `resolved` into entities.
///
/// With the graph disabled every span is its own singleton. Entity ids are
/// assigned in order of each entity's first span.
pub fn build_entities(
    text: &str,
    resolved: &ResolvedSpanSet,
    facts: &[ProximityFact],
    config: &SanitizerConfig,
) -> Vec<Entity> {
    let components: Vec<Vec<usize>> = if config.graph.enabled {
        let graph = EntityGraph::build(text, resolved, facts, config.proximity.window);
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "entity graph built"
        );
        graph.components()
    } else {
        (0..resolved.len()).map(|i| vec![i]).collect()
    };

    components
        .into_iter()
        .enumerate()
        .map(|(id, members)| {
            let categories: BTreeSet<Category> = members
                .iter()
                .filter_map(|&i| resolved.get(i).map(|s| s.category))
                .collect();
            match members.as_slice() {
                [only] => Entity::Singleton {
                    id,
                    span: *only,
                    categories,
                },
                _ => Entity::Cluster {
                    id,
                    spans: members,
                    categories,
                },
            }
        })
        .collect()
}
