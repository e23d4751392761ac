use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Ordering of a feed, sent as the `sortby` query parameter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortBy {
    #[default]
    Top,
    Hot,
    New,
}

/// Time window of a feed, sent as the `duration` query parameter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    Year,
    #[default]
    AllTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedFilters {
    pub sort_by: SortBy,
    pub window: TimeWindow,
}

impl FeedFilters {
    pub fn new(sort_by: SortBy, window: TimeWindow) -> Self {
        Self { sort_by, window }
    }

    /// Applies a change, returning whether any dimension actually moved.
    pub fn apply(&mut self, change: FilterChange) -> bool {
        match change {
            FilterChange::SortBy(sort_by) if sort_by != self.sort_by => {
                self.sort_by = sort_by;
                true
            }
            FilterChange::Window(window) if window != self.window => {
                self.window = window;
                true
            }
            _ => false,
        }
    }
}

/// One dimension of a filter change requested by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    SortBy(SortBy),
    Window(TimeWindow),
}
