// Locale document handling
//
// A locale document is a JSON object whose leaves are (mostly) strings:
// - tree: merge, flatten and lookup operations on `serde_json` values
// - store: `<lang>.json` files in a locales directory

pub mod store;
pub mod tree;

pub use store::*;
pub use tree::*;

use serde_json::{Map, Value};

/// Nested locale document
pub type LocaleTree = Map<String, Value>;

/// Flattened `a.b.c` view of a locale document, in document order
pub type FlatLocale = Map<String, Value>;

/// How a dictionary is merged into an existing locale document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Recurse into objects present on both sides
    #[default]
    Deep,
    /// Replace each top-level value wholesale
    Shallow,
}

impl MergeStrategy {
    pub fn merge(&self, base: &mut LocaleTree, updates: &LocaleTree) -> MergeStats {
        match self {
            MergeStrategy::Deep => deep_merge(base, updates),
            MergeStrategy::Shallow => shallow_merge(base, updates),
        }
    }
}

/// Counts of leaves touched by a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MergeStats {
    pub added: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl MergeStats {
    pub fn absorb(&mut self, other: MergeStats) {
        self.added += other.added;
        self.changed += other.changed;
        self.unchanged += other.unchanged;
    }

    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.changed == 0
    }
}
