//! Aggregator for the DMR workspace; re-exports the [`dmr`] parser facade.

pub use dmr::*;
