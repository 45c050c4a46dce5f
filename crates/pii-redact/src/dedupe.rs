//! Deduplication of repeated values for reporting.
//!
//! Deduplication never changes what is redacted. Inside an entity the first
//! mention of a `(category, value)` pair is primary and later mentions point
//! at it. Across entities identical values are only reported as linked; the
//! entities themselves are left as built.

use pii_common::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::graph::Entity;
use crate::resolve::ResolvedSpanSet;

/// A repeated mention inside one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duplicate {
    pub span: usize,
    pub duplicate_of: usize,
}

/// An entity with its canonical and duplicate mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    pub entity: Entity,
    /// One span per distinct `(category, value)`, ascending.
    pub primary_spans: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<Duplicate>,
}

impl EntityView {
    /// The primary span `span` repeats, if it is a duplicate.
    pub fn duplicate_of(&self, span: usize) -> Option<usize> {
        self.duplicates
            .iter()
            .find(|d| d.span == span)
            .map(|d| d.duplicate_of)
    }
}

/// The same value appearing in more than one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueLink {
    pub category: Category,
    /// Every span carrying the value, ascending.
    pub spans: Vec<usize>,
    /// Entities those spans belong to, ascending.
    pub entities: Vec<usize>,
}

/// Output of [`dedupe`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduplication {
    pub entities: Vec<EntityView>,
    pub links: Vec<ValueLink>,
}

impl Deduplication {
    /// Number of distinct `(category, value)` pairs across the document.
    pub fn unique_values(&self) -> usize {
        let in_entities: usize = self.entities.iter().map(|e| e.primary_spans.len()).sum();
        // Each link joins values that were counted once per entity.
        let overcount: usize = self
            .links
            .iter()
            .map(|l| l.entities.len().saturating_sub(1))
            .sum();
        in_entities - overcount
    }
}

/// Annotate `entities` with duplicate mentions and cross-entity links.
pub fn dedupe(entities: Vec<Entity>, resolved: &ResolvedSpanSet) -> Deduplication {
    let spans = resolved.spans();
    let mut by_value: BTreeMap<(Category, &str), Vec<(usize, usize)>> = BTreeMap::new();

    let views = entities
        .into_iter()
        .map(|entity| {
            let mut first_seen: BTreeMap<(Category, &str), usize> = BTreeMap::new();
            let mut primary_spans = Vec::new();
            let mut duplicates = Vec::new();

            for &index in entity.members() {
                let Some(span) = spans.get(index) else {
                    continue;
                };
                let key = (span.category, span.matched_text.as_str());
                by_value.entry(key).or_default().push((index, entity.id()));

                match first_seen.get(&key) {
                    Some(&primary) => duplicates.push(Duplicate {
                        span: index,
                        duplicate_of: primary,
                    }),
                    None => {
                        first_seen.insert(key, index);
                        primary_spans.push(index);
                    }
                }
            }

            EntityView {
                entity,
                primary_spans,
                duplicates,
            }
        })
        .collect();

    let mut links: Vec<ValueLink> = by_value
        .into_iter()
        .filter_map(|((category, _), members)| {
            let mut entities: Vec<usize> = members.iter().map(|&(_, e)| e).collect();
            entities.sort_unstable();
            entities.dedup();
            if entities.len() < 2 {
                return None;
            }
            let mut spans: Vec<usize> = members.iter().map(|&(s, _)| s).collect();
            spans.sort_unstable();
            Some(ValueLink {
                category,
                spans,
                entities,
            })
        })
        .collect();
    links.sort_by_key(|l| l.spans.first().copied());

    Deduplication {
        entities: views,
        links,
    }
}
