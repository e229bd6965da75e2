use serde::Deserialize;
use strum::{Display, EnumString};

/// The kind of collection a timeline shows
///
/// The kind decides the canonical order of items and which scroll edge asks
/// for older data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    /// Posts, newest first; older pages extend the bottom
    #[default]
    Feed,
    /// Messages, oldest first; older pages extend the top
    Chat,
}

impl TimelineKind {
    pub fn order(&self) -> Order {
        match self {
            TimelineKind::Feed => Order::NewestFirst,
            TimelineKind::Chat => Order::OldestFirst,
        }
    }

    /// The scroll edge that requests older items
    pub fn load_edge(&self) -> Edge {
        match self {
            TimelineKind::Feed => Edge::Bottom,
            TimelineKind::Chat => Edge::Top,
        }
    }
}

/// Display order of a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Bottom,
}
