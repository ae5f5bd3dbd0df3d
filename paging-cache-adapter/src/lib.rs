//! Adapter utilities for the `paging-cache` crate.
//!
//! The `paging-cache` crate owns the page cache and the flat index math. This crate provides the
//! framework-neutral workflows a tree grid or list component builds on top of it:
//!
//! - Expansion tracked by item identity ([`ExpandedKeys`], [`ItemKey`])
//! - Row resolution that loads whatever a rendered row is missing ([`RowState`])
//! - Refresh lists and scroll-to-path targets that survive asynchronous loading
//!
//! No UI bindings live here.
#![forbid(unsafe_code)]

mod expansion;
mod key;
mod row;
mod source;


pub use expansion::ExpandedKeys;
pub use key::ItemKey;
pub use row::RowState;
pub use source::{ItemId, TreeDataSource};
