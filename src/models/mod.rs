pub mod filter;
pub mod release;

pub use filter::{Filter, FilterDownloads, MaxDownloadsUnit, TagsMatchLogic};
pub use release::{FilterStatus, Implementation, Protocol, Release};
