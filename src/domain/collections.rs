use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fmt;

use sorted_vec::{FindOrInsert, ReverseSortedSet, SortedSet};

use crate::domain::{
    item::{Item, ItemKey},
    order::Order,
};

/// The result of merging one item into an [`OrderedItems`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// A new item was spliced in at this index
    Inserted(usize),
    /// An existing item was replaced in place at this index
    Replaced(usize),
    /// The item at this index was removed
    Removed(usize),
    /// Nothing changed (duplicate delivery, unknown id or deleted id)
    Unchanged,
}

impl Merge {
    pub fn is_changed(&self) -> bool {
        !matches!(self, Merge::Unchanged)
    }
}

#[derive(Debug, Clone)]
enum Keys {
    Ascending(SortedSet<ItemKey>),
    Descending(ReverseSortedSet<ItemKey>),
}

impl Keys {
    fn new(order: Order) -> Self {
        match order {
            Order::OldestFirst => Keys::Ascending(SortedSet::new()),
            Order::NewestFirst => Keys::Descending(ReverseSortedSet::new()),
        }
    }

    fn len(&self) -> usize {
        match self {
            Keys::Ascending(keys) => keys.len(),
            Keys::Descending(keys) => keys.len(),
        }
    }

    fn get(&self, index: usize) -> Option<&ItemKey> {
        match self {
            Keys::Ascending(keys) => keys.get(index),
            Keys::Descending(keys) => keys.get(index).map(|key| &key.0),
        }
    }

    fn position(&self, key: &ItemKey) -> Option<usize> {
        match self {
            Keys::Ascending(keys) => keys.binary_search(key).ok(),
            Keys::Descending(keys) => keys.binary_search(&Reverse(key.clone())).ok(),
        }
    }

    fn find_or_insert(&mut self, key: ItemKey) -> FindOrInsert {
        match self {
            Keys::Ascending(keys) => keys.find_or_insert(key),
            Keys::Descending(keys) => keys.find_or_insert(Reverse(key)),
        }
    }

    fn remove_index(&mut self, index: usize) {
        match self {
            Keys::Ascending(keys) => {
                keys.remove_index(index);
            }
            Keys::Descending(keys) => {
                keys.remove_index(index);
            }
        }
    }

    fn clear(&mut self) {
        match self {
            Keys::Ascending(keys) => keys.clear(),
            Keys::Descending(keys) => keys.clear(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    key: ItemKey,
    item: T,
}

/// An ordered set of items with automatic deduplication
///
/// Items are kept sorted by `(sort_key, id)` in the given [`Order`] and looked up
/// by id in constant time. The key an item was first inserted with decides its
/// position for as long as it stays in the set, so replacing an item never
/// moves it.
///
/// Deleted ids are remembered until [`clear`](Self::clear), so a redelivered
/// insert or a page fetched before the delete cannot bring them back.
#[derive(Debug, Clone)]
pub struct OrderedItems<T> {
    order: Order,
    keys: Keys,
    entries: HashMap<String, Entry<T>>,
    deleted: HashSet<String>,
}

impl<T: Item> OrderedItems<T> {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            keys: Keys::new(order),
            entries: HashMap::new(),
            deleted: HashSet::new(),
        }
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Whether `id` was deleted since the last clear
    pub fn is_deleted(&self, id: &str) -> bool {
        self.deleted.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id).map(|entry| &entry.item)
    }

    /// Gets an item by display index
    pub fn get_index(&self, index: usize) -> Option<&T> {
        let key = self.keys.get(index)?;
        self.get(&key.id)
    }

    /// Display index of an item
    pub fn position(&self, id: &str) -> Option<usize> {
        let entry = self.entries.get(id)?;
        self.keys.position(&entry.key)
    }

    pub fn first(&self) -> Option<&T> {
        self.get_index(0)
    }

    pub fn last(&self) -> Option<&T> {
        self.get_index(self.len().checked_sub(1)?)
    }

    /// The key of the oldest item, wherever it is displayed
    pub fn oldest_key(&self) -> Option<&ItemKey> {
        match self.order {
            Order::NewestFirst => self.keys.get(self.len().checked_sub(1)?),
            Order::OldestFirst => self.keys.get(0),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |index| self.get_index(index))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(Item::id).collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Inserts an item at its sorted position
    ///
    /// An id that is already present is treated as a replacement: an identical
    /// copy is ignored, a different one takes over the existing slot. Deleted
    /// ids are ignored.
    pub fn insert(&mut self, item: T) -> Merge {
        if self.deleted.contains(item.id()) {
            return Merge::Unchanged;
        }
        if self.entries.contains_key(item.id()) {
            return self.replace(item);
        }

        let key = item.key();
        let merge = match self.keys.find_or_insert(key.clone()) {
            FindOrInsert::Inserted(index) => Merge::Inserted(index),
            FindOrInsert::Found(_) => return Merge::Unchanged,
        };
        self.entries.insert(key.id.clone(), Entry { key, item });

        debug_assert_eq!(self.keys.len(), self.entries.len());
        merge
    }

    /// Replaces an item in place; unknown ids are ignored
    pub fn replace(&mut self, item: T) -> Merge {
        let Some(entry) = self.entries.get_mut(item.id()) else {
            return Merge::Unchanged;
        };
        if entry.item == item {
            return Merge::Unchanged;
        }
        entry.item = item;

        let key = entry.key.clone();
        self.keys
            .position(&key)
            .map_or(Merge::Unchanged, Merge::Replaced)
    }

    /// Removes an item and remembers its id
    ///
    /// Unknown ids are remembered too, since a delete may arrive before the
    /// insert it cancels.
    pub fn remove(&mut self, id: &str) -> Merge {
        self.deleted.insert(id.to_owned());
        let Some(index) = self.position(id) else {
            return Merge::Unchanged;
        };
        self.keys.remove_index(index);
        self.entries.remove(id);

        debug_assert_eq!(self.keys.len(), self.entries.len());
        Merge::Removed(index)
    }

    /// Inserts every item and returns how many were new
    pub fn merge_all(&mut self, items: impl IntoIterator<Item = T>) -> usize {
        items
            .into_iter()
            .map(|item| self.insert(item))
            .filter(|merge| matches!(merge, Merge::Inserted(_)))
            .count()
    }

    /// Drops every item and every remembered delete
    pub fn clear(&mut self) {
        self.keys.clear();
        self.entries.clear();
        self.deleted.clear();
    }
}

impl<T: Item> fmt::Display for OrderedItems<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderedItems[{} items]", self.len())
    }
}
