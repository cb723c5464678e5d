//! Named collections of guarded functions and scripts.
//!
//! A [`Collection`] only stores metadata. It answers "what is in here" for
//! listings and tooling; calling stays with the guards themselves.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GuardKind, GuardMetadata};

/// What a collected entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Query guard.
    Query,
    /// Mutation guard.
    Mutation,
    /// Script entrypoint.
    Script,
}

impl ItemKind {
    /// Every kind, in listing order.
    pub const ALL: [ItemKind; 3] = [ItemKind::Query, ItemKind::Mutation, ItemKind::Script];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Query => "query",
            ItemKind::Mutation => "mutation",
            ItemKind::Script => "script",
        }
    }

    fn heading(&self) -> &'static str {
        match self {
            ItemKind::Query => "Queries",
            ItemKind::Mutation => "Mutations",
            ItemKind::Script => "Scripts",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GuardKind> for ItemKind {
    fn from(kind: GuardKind) -> Self {
        match kind {
            GuardKind::Query => ItemKind::Query,
            GuardKind::Mutation => ItemKind::Mutation,
        }
    }
}

/// One entry of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedItem {
    /// Function or script name.
    pub name: String,
    /// Entry kind.
    pub kind: ItemKind,
    /// Human readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the input model.
    pub input_model: String,
}

impl From<&GuardMetadata> for CollectedItem {
    fn from(meta: &GuardMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            kind: meta.kind.into(),
            description: meta.description.clone(),
            input_model: meta.input_model.clone(),
        }
    }
}

/// A named, ordered set of collected items.
///
/// # Examples
///
/// ```
/// use quickscript_guard::{CollectedItem, Collection, ItemKind};
///
/// let tools = Collection::new("tools").with(CollectedItem {
///     name: "cleanup".into(),
///     kind: ItemKind::Script,
///     description: Some("Remove stale files".into()),
///     input_model: "NoArgs".into(),
/// });
///
/// assert_eq!(tools.of_kind(ItemKind::Script).count(), 1);
/// assert!(tools.render().contains("cleanup"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Collection name.
    pub name: String,
    /// Items in insertion order.
    pub items: Vec<CollectedItem>,
}

impl Collection {
    /// An empty collection.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Vec::new(),
        }
    }

    /// Adds an item, replacing an earlier one with the same name and kind.
    pub fn add(&mut self, item: impl Into<CollectedItem>) {
        let item = item.into();
        match self
            .items
            .iter_mut()
            .find(|existing| existing.name == item.name && existing.kind == item.kind)
        {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, item: impl Into<CollectedItem>) -> Self {
        self.add(item);
        self
    }

    /// Merges several collections into one named `name`.
    pub fn bundle<'a>(name: &str, collections: impl IntoIterator<Item = &'a Collection>) -> Self {
        let mut bundled = Self::new(name);
        for collection in collections {
            for item in &collection.items {
                bundled.add(item.clone());
            }
        }
        bundled
    }

    /// Items of `kind`, in insertion order.
    pub fn of_kind(&self, kind: ItemKind) -> impl Iterator<Item = &CollectedItem> {
        self.items.iter().filter(move |item| item.kind == kind)
    }

    /// A copy holding only items of `kind`.
    pub fn filter(&self, kind: ItemKind) -> Self {
        Self {
            name: self.name.clone(),
            items: self.of_kind(kind).cloned().collect(),
        }
    }

    /// First item called `name`.
    pub fn find(&self, name: &str) -> Option<&CollectedItem> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the collection holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Text listing grouped by kind. Empty groups are omitted.
    pub fn render(&self) -> String {
        let width = self
            .items
            .iter()
            .map(|item| item.name.len())
            .max()
            .unwrap_or(0);

        let mut out = format!("{}\n", self.name);
        for kind in ItemKind::ALL {
            let mut group = self.of_kind(kind).peekable();
            if group.peek().is_none() {
                continue;
            }
            out.push_str(&format!("\n{}:\n", kind.heading()));
            for item in group {
                match &item.description {
                    Some(description) => {
                        out.push_str(&format!("  {:<width$}  {description}\n", item.name));
                    }
                    None => out.push_str(&format!("  {}\n", item.name)),
                }
            }
        }
        out
    }
}
