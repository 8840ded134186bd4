pub mod filter;
pub mod merge;
pub mod types;

pub use filter::{build_view, count_browsers, visible_rows, BrowserCounts, BrowserFilter, FilterQuery, ProfileView};
pub use merge::{merge_profiles, orphaned_profiles, CloudProfile, LinkedProfile, MergedProfile};
pub use types::{BrowserKind, LocalProfile, ProfileGroup, DEFAULT_GROUP};
