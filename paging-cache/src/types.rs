use core::fmt;
use core::ops::Deref;

use smallvec::SmallVec;

/// Addresses a cache from the root by the parent-local index of every expanded item on the way
/// down.
///
/// The root cache has an empty path; the length of a path is the tree level of the cache it
/// addresses.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CachePath(SmallVec<[usize; 4]>);

impl CachePath {
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    pub fn level(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The index of the owning item inside the parent cache, `None` for the root.
    pub fn parent_index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Returns the path of the sub-cache that belongs to the item at `index` in this cache.
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.0.push(index);
        path
    }

    /// Returns the path of the parent cache, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(SmallVec::from_slice(parent)))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub(crate) fn push(&mut self, index: usize) {
        self.0.push(index);
    }
}

impl Deref for CachePath {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<&[usize]> for CachePath {
    fn from(path: &[usize]) -> Self {
        Self(SmallVec::from_slice(path))
    }
}

impl fmt::Debug for CachePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Identifies one page request issued by a controller. Never reused within a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestId(pub u64);

/// Identifies a registered event listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Parameters handed to the data provider for a single page.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FetchParams<T, P = ()> {
    pub page: usize,
    pub page_size: usize,
    /// The expanded item whose children are requested; `None` for root-level pages.
    pub parent_item: Option<T>,
    /// Extra parameters (sorting, filtering, ...) from the `data_provider_params` supplier.
    pub extra: P,
}

/// Notifications emitted while a page goes through its fetch.
///
/// For every request the order is `PageRequested`, `PageReceived`, `PageLoaded`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataEvent {
    /// The provider is about to be called for the page.
    PageRequested { level: usize, page: usize },
    /// Items were stored and effective sizes recomputed. The request still counts as pending.
    PageReceived { level: usize, page: usize },
    /// The request is no longer pending.
    PageLoaded { level: usize, page: usize },
}

impl DataEvent {
    pub fn level(&self) -> usize {
        match *self {
            Self::PageRequested { level, .. }
            | Self::PageReceived { level, .. }
            | Self::PageLoaded { level, .. } => level,
        }
    }

    pub fn page(&self) -> usize {
        match *self {
            Self::PageRequested { page, .. }
            | Self::PageReceived { page, .. }
            | Self::PageLoaded { page, .. } => page,
        }
    }
}
