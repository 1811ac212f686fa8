// Ecofeed: activity feed aggregation for a zero-waste social platform.
//
// This is the library root. Each module corresponds to one layer of the
// feed: pure record handling, the API collaborator, and the stateful engine
// the web and mobile surfaces drive.

pub mod activity;
pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod output;
