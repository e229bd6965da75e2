use std::cmp::Ordering;
use std::fmt::Debug;

/// A record that can live in a timeline
///
/// Identity is the `id`; two values with the same id describe the same item even
/// when their contents differ. `PartialEq` is only consulted to tell a repeated
/// delivery apart from an edit.
pub trait Item: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Globally unique identifier
    fn id(&self) -> &str;

    /// Primary sort key, usually a creation timestamp
    fn sort_key(&self) -> i64;

    fn key(&self) -> ItemKey {
        ItemKey::of(self)
    }
}

/// A lightweight `(sort_key, id)` pair used for ordering
///
/// This type is designed for use in sorted collections where items need to be
/// ordered by timestamp while identity stays with the id. The item data itself
/// is stored separately, keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub sort_key: i64,
    pub id: String,
}

impl ItemKey {
    pub fn new(sort_key: i64, id: impl Into<String>) -> Self {
        Self {
            sort_key,
            id: id.into(),
        }
    }

    pub fn of<T: Item + ?Sized>(item: &T) -> Self {
        Self::new(item.sort_key(), item.id())
    }
}

impl PartialOrd for ItemKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ItemKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Sort by timestamp first (primary key), then by id (tie-break)
        match self.sort_key.cmp(&other.sort_key) {
            Ordering::Equal => self.id.cmp(&other.id),
            other => other,
        }
    }
}
