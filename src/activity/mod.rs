// Activity records — normalization, classification, filtering, paging.
//
// Everything in here is pure: no I/O, no shared state. The feed engine
// composes these pieces around the API collaborator.

pub mod category;
pub mod event;
pub mod filter;
pub mod paginator;
pub mod reactions;
