//! Merging out-of-band push events into the ordered item list

use crate::domain::{
    collections::{Merge, OrderedItems},
    item::Item,
    order::Order,
};

/// One event delivered by a push source
///
/// Sources deliver at least once and in no particular order; every variant is
/// safe to apply again.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent<T> {
    Insert(T),
    Update(T),
    Delete(String),
}

impl<T: Item> PushEvent<T> {
    pub fn id(&self) -> &str {
        match self {
            PushEvent::Insert(item) | PushEvent::Update(item) => item.id(),
            PushEvent::Delete(id) => id,
        }
    }
}

/// Apply a push event to the list
///
/// - inserts of new ids go to their sorted position, so a late delivery lands
///   where it belongs instead of at the tail
/// - inserts of known ids are no-ops unless the content changed, in which case
///   they act as updates
/// - updates replace in place and never move an item; unknown ids are ignored
/// - deletes remove the item and keep later inserts of the same id out, so a
///   replayed insert cannot undo a delete
pub fn reconcile<T: Item>(items: &mut OrderedItems<T>, event: PushEvent<T>) -> Merge {
    let id = event.id().to_owned();
    let merge = match event {
        PushEvent::Insert(item) => items.insert(item),
        PushEvent::Update(item) => items.replace(item),
        PushEvent::Delete(id) => items.remove(&id),
    };

    match merge {
        Merge::Inserted(index) if is_out_of_order(items, index) => {
            log::debug!("Out-of-order delivery of {id} spliced in at {index}");
        }
        Merge::Unchanged => {
            log::trace!("Push event for {id} changed nothing");
        }
        _ => {}
    }

    merge
}

/// Whether an insert landed somewhere other than the live edge
fn is_out_of_order<T: Item>(items: &OrderedItems<T>, index: usize) -> bool {
    match items.order() {
        Order::NewestFirst => index != 0,
        Order::OldestFirst => index + 1 != items.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ChatMessage;
    use pretty_assertions::assert_eq;

    fn m1() -> ChatMessage {
        ChatMessage::at("A", "10:00", "first")
    }

    fn m2() -> ChatMessage {
        ChatMessage::at("B", "10:01", "second")
    }

    fn loaded_chat() -> OrderedItems<ChatMessage> {
        let mut items = OrderedItems::new(Order::OldestFirst);
        items.insert(m1());
        items.insert(m2());
        items
    }

    #[test]
    fn test_duplicate_delivery_keeps_list() {
        let mut items = loaded_chat();

        let merge = reconcile(&mut items, PushEvent::Insert(m2()));

        assert_eq!(merge, Merge::Unchanged);
        assert_eq!(items.to_vec(), vec![m1(), m2()]);
    }

    #[test]
    fn test_out_of_order_delivery_is_sorted() {
        let mut items = loaded_chat();
        let m0 = ChatMessage::at("Z", "09:59", "zeroth");

        let merge = reconcile(&mut items, PushEvent::Insert(m0.clone()));

        assert_eq!(merge, Merge::Inserted(0));
        assert_eq!(items.to_vec(), vec![m0, m1(), m2()]);
    }

    #[test]
    fn test_feed_insert_goes_to_head() {
        let mut items = OrderedItems::new(Order::NewestFirst);
        items.insert(m1());
        items.insert(m2());
        let fresh = ChatMessage::at("C", "10:02", "fresh");

        let merge = reconcile(&mut items, PushEvent::Insert(fresh.clone()));

        assert_eq!(merge, Merge::Inserted(0));
        assert_eq!(items.to_vec(), vec![fresh, m2(), m1()]);
    }

    #[test]
    fn test_insert_with_changed_content_is_update() {
        let mut items = loaded_chat();
        let edited = ChatMessage::at("A", "10:00", "edited");

        let merge = reconcile(&mut items, PushEvent::Insert(edited.clone()));

        assert_eq!(merge, Merge::Replaced(0));
        assert_eq!(items.to_vec(), vec![edited, m2()]);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut items = loaded_chat();
        let mut edited = m1();
        edited.content = "edited".into();

        let merge = reconcile(&mut items, PushEvent::Update(edited.clone()));

        assert_eq!(merge, Merge::Replaced(0));
        assert_eq!(items.to_vec(), vec![edited, m2()]);
    }

    #[test]
    fn test_update_unknown_is_ignored() {
        let mut items = loaded_chat();

        let merge = reconcile(
            &mut items,
            PushEvent::Update(ChatMessage::at("Q", "10:05", "ghost")),
        );

        assert_eq!(merge, Merge::Unchanged);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_delete() {
        let mut items = loaded_chat();

        assert_eq!(
            reconcile(&mut items, PushEvent::Delete("A".into())),
            Merge::Removed(0)
        );
        assert_eq!(
            reconcile(&mut items, PushEvent::Delete("A".into())),
            Merge::Unchanged
        );
        assert_eq!(items.to_vec(), vec![m2()]);
    }

    #[test]
    fn test_redelivered_insert_after_delete_is_ignored() {
        let once = [PushEvent::Insert(m1()), PushEvent::Delete("A".into())];
        let replayed = [
            PushEvent::Insert(m1()),
            PushEvent::Delete("A".into()),
            PushEvent::Insert(m1()),
        ];

        let mut first = loaded_chat();
        for event in once {
            reconcile(&mut first, event);
        }
        let mut second = loaded_chat();
        for event in replayed {
            reconcile(&mut second, event);
        }

        assert_eq!(first.ids(), vec!["B"]);
        assert_eq!(second.ids(), first.ids());
    }

    #[test]
    fn test_delete_and_insert_commute() {
        let events = vec![
            PushEvent::Insert(ChatMessage::new("C", 30, "x")),
            PushEvent::Delete("C".into()),
            PushEvent::Insert(ChatMessage::new("D", 40, "x")),
        ];

        let mut forward = loaded_chat();
        for event in events.iter().cloned() {
            reconcile(&mut forward, event);
        }
        let mut backward = loaded_chat();
        for event in events.into_iter().rev() {
            reconcile(&mut backward, event);
        }

        assert_eq!(forward.ids(), vec!["D", "A", "B"]);
        assert_eq!(backward.ids(), forward.ids());
    }

    #[test]
    fn test_inserts_commute() {
        let events: Vec<_> = [("A", 10), ("B", 30), ("C", 20), ("D", 20), ("A", 10)]
            .into_iter()
            .map(|(id, t)| PushEvent::Insert(ChatMessage::new(id, t, "x")))
            .collect();

        let mut forward = OrderedItems::new(Order::OldestFirst);
        for event in events.iter().cloned() {
            reconcile(&mut forward, event);
        }
        let mut backward = OrderedItems::new(Order::OldestFirst);
        for event in events.iter().rev().cloned() {
            reconcile(&mut backward, event);
        }

        assert_eq!(forward.to_vec(), backward.to_vec());
        assert_eq!(forward.ids(), vec!["A", "C", "D", "B"]);
    }
}
