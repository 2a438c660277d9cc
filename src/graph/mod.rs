//! Object graph: record model, reachability closure and DOT rendering.
//!
//! Objects and their typed links are extracted once per source set and then
//! treated as read-only; the traversal filters a copy and the renderer turns
//! that copy into a Graphviz document.

mod render;
mod traversal;

pub use render::{render_dot, RenderOptions, RenderReport};
pub use traversal::{filter_reachable, reachable_ids, Worklist};

use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ident::HashId;

/// Placeholder for a missing object name or link type.
pub const UNKNOWN: &str = "Unknown";

/// A directed, typed edge to another object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target object id.
    pub id: HashId,
    /// Link category, e.g. `BasicSig` or `Reference`.
    #[serde(rename = "type")]
    pub link_type: String,
}

impl Link {
    pub fn new(id: HashId, link_type: impl Into<String>) -> Self {
        Self {
            id,
            link_type: link_type.into(),
        }
    }
}

/// A placed object in a map unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: HashId,
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

impl Object {
    pub fn new(id: HashId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            links: Vec::new(),
        }
    }

    pub fn with_link(mut self, target: HashId, link_type: impl Into<String>) -> Self {
        self.links.push(Link::new(target, link_type));
        self
    }

    /// True if this object is `id` itself or links to it.
    pub fn is_associated_with(&self, id: HashId) -> bool {
        self.id == id || self.links.iter().any(|l| l.id == id)
    }
}

/// How records sharing a HashId (e.g. static/dynamic variants) are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every record participates and is emitted.
    #[default]
    KeepAll,
    /// Only the first record per HashId exists as far as traversal and output are concerned.
    FirstWins,
}

impl DuplicatePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DuplicatePolicy::KeepAll => "keep_all",
            DuplicatePolicy::FirstWins => "first_wins",
        }
    }

    /// View of `objects` the traversal should run over.
    pub fn apply(self, objects: &[Object]) -> Cow<'_, [Object]> {
        match self {
            DuplicatePolicy::KeepAll => Cow::Borrowed(objects),
            DuplicatePolicy::FirstWins => {
                let mut seen = HashSet::new();
                let firsts: Vec<Object> = objects
                    .iter()
                    .filter(|o| seen.insert(o.id))
                    .cloned()
                    .collect();
                if firsts.len() < objects.len() {
                    log::debug!(
                        "first_wins: dropped {} duplicate record(s)",
                        objects.len() - firsts.len()
                    );
                }
                Cow::Owned(firsts)
            }
        }
    }
}
