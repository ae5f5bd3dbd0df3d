//! A lazily paged, hierarchical item cache for virtualized lists and tree grids.
//!
//! For host-side workflows (expansion by item identity, row resolution, pending scroll
//! targets), see the `paging-cache-adapter` crate.
//!
//! The dataset may be huge or unbounded and may be tree-shaped. Only the pages that are actually
//! requested get fetched, while the consumer sees a single zero-based *flat index* space that
//! linearizes every expanded branch.
//!
//! It is UI-agnostic. The rendering layer is expected to:
//! - ask for flat indexes (`ensure_flat_index_loaded`, `ensure_flat_index_children_loaded`)
//! - resolve flat indexes to items (`flat_index_info`) and paths to flat indexes
//!   (`flat_index_by_path`)
//! - re-query when a [`DataEvent`] reports that a page arrived
//!
//! Fetching is delegated to an injected data provider that answers through a one-shot
//! [`PageCallback`].
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod cache;
mod callback;
mod controller;
mod error;
mod helpers;
mod options;
mod types;

#[cfg(test)]
mod tests;

pub use cache::Cache;
pub use callback::PageCallback;
pub use controller::DataProviderController;
pub use error::Error;
pub use helpers::{FlatIndexInfo, LAST, flat_index_by_path, flat_index_info};
pub use options::{ControllerOptions, DataProvider, DataProviderParams, EventListener, IsExpanded};
pub use types::{CachePath, DataEvent, FetchParams, ListenerId, RequestId};
