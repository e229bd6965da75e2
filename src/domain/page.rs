use crate::domain::{cursor::Cursor, item::Item};

/// One page returned by a fetcher
///
/// `next_cursor == None` always implies `has_more == false`; the constructors
/// enforce it so that a sloppy fetcher cannot leave pagination spinning.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    next_cursor: Option<Cursor>,
    has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<Cursor>, has_more: bool) -> Self {
        let has_more = has_more && next_cursor.is_some();
        Self {
            items,
            next_cursor,
            has_more,
        }
    }

    /// An empty, final page
    pub fn empty() -> Self {
        Self::new(Vec::new(), None, false)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_parts(self) -> (Vec<T>, Option<Cursor>, bool) {
        (self.items, self.next_cursor, self.has_more)
    }
}

impl<T: Item> Page<T> {
    /// Build a page from items in fetch order
    ///
    /// The next cursor points at the last item, and a page shorter than `limit`
    /// is taken to be the final one.
    pub fn from_items(items: Vec<T>, limit: usize) -> Self {
        let next_cursor = items.last().map(Cursor::from_item);
        let has_more = limit > 0 && items.len() >= limit;
        Self::new(items, next_cursor, has_more)
    }
}
