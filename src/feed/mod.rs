// Feed assembly — queries, composition, and the stateful engine that
// surfaces drive.

pub mod composer;
pub mod engine;
pub mod query;
