//! Domain layer: items, cursors, pages, and the ordered item set
//!
//! Nothing in here performs I/O; every type is usable from a plain unit test.

pub mod collections;
pub mod cursor;
pub mod item;
pub mod order;
pub mod page;

pub use collections::{Merge, OrderedItems};
pub use cursor::{Cursor, CursorCodec, CursorToken};
pub use item::{Item, ItemKey};
pub use order::{Edge, Order, TimelineKind};
pub use page::Page;
