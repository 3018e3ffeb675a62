//! Shared test fixtures for the repo-sync workspace.
//!
//! Provides an in-memory [`FakeRepoHost`] that records every call made to
//! it, plus small builders for repository records. Nothing here touches the
//! network.

mod fixtures;

pub use fixtures::*;
