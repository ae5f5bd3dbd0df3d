use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::RequestId;

/// One level of the hierarchical item cache.
///
/// A cache owns the loaded items of its level, the bookkeeping of in-flight page requests and
/// the sub-caches of its expanded items. Sub-caches are owned by their parent and keyed by the
/// parent-local index of the item they belong to; there is no upward pointer. The controller
/// addresses caches from the root with a [`CachePath`](crate::CachePath).
#[derive(Clone, Debug)]
pub struct Cache<T> {
    size: usize,
    effective_size: usize,
    page_size: usize,
    parent_index: Option<usize>,
    items: BTreeMap<usize, T>,
    pending_requests: BTreeMap<usize, RequestId>,
    sub_caches: BTreeMap<usize, Cache<T>>,
}

impl<T> Cache<T> {
    /// Creates a root cache.
    ///
    /// A `page_size` of 0 is treated as 1.
    pub fn new(page_size: usize, size: usize) -> Self {
        Self::with_parent(None, page_size, size)
    }

    fn with_parent(parent_index: Option<usize>, page_size: usize, size: usize) -> Self {
        Self {
            size,
            effective_size: size,
            page_size: page_size.max(1),
            parent_index,
            items: BTreeMap::new(),
            pending_requests: BTreeMap::new(),
            sub_caches: BTreeMap::new(),
        }
    }

    /// Number of direct children at this level, independent of expansion.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Sets the number of items at this level.
    ///
    /// Loaded items beyond the new size are kept; only effective sizes change, and only after
    /// the next [`recalculate_effective_size`](Self::recalculate_effective_size).
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    /// Number of rows this subtree contributes to the flattened view.
    pub fn effective_size(&self) -> usize {
        self.effective_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Index of the owning item inside the parent cache, `None` for the root.
    pub fn parent_index(&self) -> Option<usize> {
        self.parent_index
    }

    pub fn is_root(&self) -> bool {
        self.parent_index.is_none()
    }

    pub fn item(&self, index: usize) -> Option<&T> {
        self.items.get(&index)
    }

    /// Iterates over the loaded items in index order.
    pub fn items(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items.iter().map(|(&index, item)| (index, item))
    }

    pub fn loaded_len(&self) -> usize {
        self.items.len()
    }

    pub fn page_of(&self, index: usize) -> usize {
        index / self.page_size
    }

    /// Whether this cache or any of its descendants has a pending request.
    pub fn is_loading(&self) -> bool {
        !self.pending_requests.is_empty() || self.sub_caches.values().any(Cache::is_loading)
    }

    pub fn has_pending_request(&self, page: usize) -> bool {
        self.pending_requests.contains_key(&page)
    }

    pub fn pending_request(&self, page: usize) -> Option<RequestId> {
        self.pending_requests.get(&page).copied()
    }

    /// Pages of this level with an in-flight request, ascending.
    pub fn pending_pages(&self) -> impl Iterator<Item = usize> {
        self.pending_requests.keys().copied()
    }

    pub(crate) fn register_request(&mut self, page: usize, request: RequestId) {
        self.pending_requests.insert(page, request);
    }

    pub(crate) fn clear_request(&mut self, page: usize, request: RequestId) {
        if self.pending_requests.get(&page) == Some(&request) {
            self.pending_requests.remove(&page);
        }
    }

    /// Recomputes the effective size of this cache and all of its descendants, children first.
    ///
    /// `parent_item` is the item owning this cache (`None` for the root, or when the item is not
    /// loaded). A cache whose parent item is collapsed contributes 0, whatever it has loaded.
    pub fn recalculate_effective_size(
        &mut self,
        parent_item: Option<&T>,
        is_expanded: &dyn Fn(&T) -> bool,
    ) {
        let mut total = self.size;
        for (index, sub_cache) in self.sub_caches.iter_mut() {
            sub_cache.recalculate_effective_size(self.items.get(index), is_expanded);
            total = total.saturating_add(sub_cache.effective_size);
        }

        self.effective_size = match parent_item {
            Some(item) if !is_expanded(item) => 0,
            _ => total,
        };
    }

    /// Stores `items` starting at the first index of `page`, replacing what was there.
    ///
    /// Does not touch `size` and does not recompute effective sizes.
    pub fn set_page(&mut self, page: usize, items: impl IntoIterator<Item = T>) {
        let start = page.saturating_mul(self.page_size);
        for (offset, item) in items.into_iter().enumerate() {
            self.items.insert(start.saturating_add(offset), item);
        }
    }

    /// Whether the first item of `page` is loaded.
    pub fn is_page_loaded(&self, page: usize) -> bool {
        self.items
            .contains_key(&page.saturating_mul(self.page_size))
    }

    pub fn get_sub_cache(&self, index: usize) -> Option<&Cache<T>> {
        self.sub_caches.get(&index)
    }

    pub fn get_sub_cache_mut(&mut self, index: usize) -> Option<&mut Cache<T>> {
        self.sub_caches.get_mut(&index)
    }

    /// Creates an empty sub-cache for the item at `index`, replacing any existing one.
    pub fn create_sub_cache(&mut self, index: usize) -> &mut Cache<T> {
        let sub_cache = Cache::with_parent(Some(index), self.page_size, 0);
        match self.sub_caches.entry(index) {
            Entry::Occupied(mut entry) => {
                entry.insert(sub_cache);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(sub_cache),
        }
    }

    /// Detaches the sub-cache of the item at `index`. Pending requests of the removed subtree
    /// become orphaned.
    pub fn remove_sub_cache(&mut self, index: usize) -> Option<Cache<T>> {
        self.sub_caches.remove(&index)
    }

    /// Iterates over the sub-caches ordered by the index of their owning item.
    pub fn sub_caches(&self) -> impl Iterator<Item = (usize, &Cache<T>)> {
        self.sub_caches.iter().map(|(&index, cache)| (index, cache))
    }

    pub fn sub_cache_count(&self) -> usize {
        self.sub_caches.len()
    }

    /// Converts an index at this level into a flat index within this cache's subtree.
    ///
    /// `index` is clamped into `[0, size - 1]`; the rows of every expanded sibling subtree
    /// that precedes it are added.
    pub fn get_flat_index(&self, index: usize) -> usize {
        let clamped = index.min(self.size.saturating_sub(1));
        self.sub_caches
            .range(..clamped)
            .fold(clamped, |flat_index, (_, sub_cache)| {
                flat_index.saturating_add(sub_cache.effective_size)
            })
    }

    /// Follows `path` down from this cache. An empty path returns `self`.
    pub fn descendant(&self, path: &[usize]) -> Option<&Cache<T>> {
        path.iter()
            .try_fold(self, |cache, index| cache.sub_caches.get(index))
    }

    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Cache<T>> {
        path.iter()
            .try_fold(self, |cache, index| cache.sub_caches.get_mut(index))
    }
}
