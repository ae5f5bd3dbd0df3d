use core::ops::Range;
use std::sync::Arc;

use paging_cache::{ControllerOptions, DataProviderController, FetchParams, PageCallback};

use crate::{ExpandedKeys, ItemKey, RowState};

/// Maps an item to its identity.
pub type ItemId<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Refresh {
    None,
    Loaded,
    All,
}

/// A framework-neutral data source for tree grids and lists that wraps a
/// `paging_cache::DataProviderController`.
///
/// It adds the workflows a host component usually builds around the controller:
/// - expansion tracked by item identity (survives cache clears and reloads)
/// - row resolution that requests whatever a rendered row is missing
/// - a refresh list of rendered rows after pages arrive
/// - scroll-to-path requests that are retried until the target stops moving
///
/// It does not hold any UI objects. Hosts drive it by calling:
/// - `set_rendered_range` when the set of rendered rows changes
/// - `row(flat_index)` for every row they render
/// - `process_responses()` whenever asynchronous pages may have arrived
pub struct TreeDataSource<T, K, P = ()> {
    controller: DataProviderController<T, P>,
    item_id: ItemId<T, K>,
    expanded: ExpandedKeys<K>,
    rendered: Range<usize>,
    size_known: bool,
    has_data: bool,
    seen_pages: u64,
    refresh: Refresh,
    scroll_target: Option<usize>,
    pending_scroll: Option<Vec<usize>>,
}

fn expansion_predicate<T: 'static, K: ItemKey>(
    expanded: &ExpandedKeys<K>,
    item_id: &ItemId<T, K>,
) -> impl Fn(&T) -> bool + Send + Sync + 'static {
    let expanded = expanded.clone();
    let item_id = Arc::clone(item_id);
    move |item: &T| expanded.contains(&item_id(item))
}

impl<T: Clone + 'static, K: ItemKey, P: 'static> TreeDataSource<T, K, P> {
    /// Creates the data source and requests the first page if a provider is configured.
    ///
    /// `options.is_expanded` is replaced by a predicate over the source's expanded keys.
    pub fn new(
        options: ControllerOptions<T, P>,
        item_id: impl Fn(&T) -> K + Send + Sync + 'static,
    ) -> Self {
        let item_id: ItemId<T, K> = Arc::new(item_id);
        let expanded = ExpandedKeys::new();
        let size_known = options.size > 0;
        let options = options.with_is_expanded(expansion_predicate(&expanded, &item_id));
        let mut source = Self {
            controller: DataProviderController::new(options),
            item_id,
            expanded,
            rendered: 0..0,
            size_known,
            has_data: false,
            seen_pages: 0,
            refresh: Refresh::None,
            scroll_target: None,
            pending_scroll: None,
        };
        source.ensure_first_page_loaded();
        source
    }

    pub fn controller(&self) -> &DataProviderController<T, P> {
        &self.controller
    }

    /// Direct access to the wrapped controller.
    ///
    /// Replacing its `is_expanded` predicate detaches it from this source's expanded keys.
    pub fn controller_mut(&mut self) -> &mut DataProviderController<T, P> {
        &mut self.controller
    }

    pub fn effective_size(&self) -> usize {
        self.controller.effective_size()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    /// Whether any page arrived since the last reset.
    pub fn has_data(&self) -> bool {
        self.has_data
    }

    pub fn item_id(&self, item: &T) -> K {
        (self.item_id)(item)
    }

    pub fn is_expanded(&self, item: &T) -> bool {
        self.expanded.contains(&self.item_id(item))
    }

    pub fn expanded_keys(&self) -> &ExpandedKeys<K> {
        &self.expanded
    }

    /// Returns `true` if the item was collapsed before.
    pub fn expand_item(&mut self, item: &T) -> bool {
        let changed = self.expanded.insert(self.item_id(item));
        if changed {
            self.on_expansion_changed();
        }
        changed
    }

    /// Returns `true` if the item was expanded before.
    pub fn collapse_item(&mut self, item: &T) -> bool {
        let changed = self.expanded.remove(&self.item_id(item));
        if changed {
            self.on_expansion_changed();
        }
        changed
    }

    pub fn set_expanded_items<'a>(&mut self, items: impl IntoIterator<Item = &'a T>)
    where
        T: 'a,
    {
        let keys: Vec<K> = items.into_iter().map(|item| self.item_id(item)).collect();
        self.set_expanded_keys(keys);
    }

    pub fn set_expanded_keys(&mut self, keys: impl IntoIterator<Item = K>) {
        self.expanded.replace(keys);
        self.on_expansion_changed();
    }

    fn on_expansion_changed(&mut self) {
        self.controller.recalculate_effective_size();
        self.refresh = Refresh::All;
    }

    /// Tree depth of the row at `flat_index` (root = 0).
    pub fn level(&self, flat_index: usize) -> usize {
        self.controller.flat_index_info(flat_index).level
    }

    pub fn set_size(&mut self, size: usize) {
        self.size_known = true;
        self.controller.set_size(size);
        self.refresh = Refresh::All;
    }

    /// Changes the page size. Cached pages are discarded only when the value actually changes.
    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size == self.controller.page_size() {
            return;
        }
        self.controller.set_page_size(page_size);
        self.reset_data();
    }

    pub fn set_data_provider(
        &mut self,
        f: impl Fn(FetchParams<T, P>, PageCallback<T>) + Send + Sync + 'static,
    ) {
        self.controller.set_data_provider(f);
        self.reset_data();
    }

    /// Discards every cached page and requests the first page again. Expansion is kept.
    pub fn clear_cache(&mut self) {
        self.controller.clear_cache();
        self.reset_data();
    }

    fn reset_data(&mut self) {
        self.has_data = false;
        self.refresh = Refresh::All;
        self.ensure_first_page_loaded();
    }

    /// Requests the first root page unless some data already arrived.
    pub fn ensure_first_page_loaded(&mut self) {
        if !self.has_data {
            self.controller.ensure_first_page_loaded();
        }
        self.settle();
    }

    pub fn rendered_range(&self) -> Range<usize> {
        self.rendered.clone()
    }

    /// Tells the source which flat indexes the host currently renders.
    pub fn set_rendered_range(&mut self, range: Range<usize>) {
        self.rendered = range;
    }

    /// Resolves a row without requesting anything.
    pub fn peek(&self, flat_index: usize) -> RowState<'_, T> {
        if flat_index >= self.controller.effective_size() {
            return RowState::OutOfRange;
        }
        let info = self.controller.flat_index_info(flat_index);
        match info.item {
            Some(item) => RowState::Loaded {
                item,
                level: info.level,
            },
            None => RowState::Loading,
        }
    }

    /// Resolves a row for rendering.
    ///
    /// A missing row requests its page; a loaded, expanded row requests its children.
    pub fn row(&mut self, flat_index: usize) -> RowState<'_, T> {
        if flat_index >= self.controller.effective_size() {
            return RowState::OutOfRange;
        }
        let expanded = self
            .controller
            .flat_index_info(flat_index)
            .item
            .map(|item| self.controller.is_expanded(item));
        match expanded {
            Some(true) => self.controller.ensure_flat_index_children_loaded(flat_index),
            Some(false) => {}
            None => self.controller.ensure_flat_index_loaded(flat_index),
        }
        self.settle();
        self.peek(flat_index)
    }

    /// Applies asynchronously delivered pages. Returns the number of pages applied.
    pub fn process_responses(&mut self) -> usize {
        let applied = self.controller.process_responses();
        self.settle();
        applied
    }

    /// Rendered rows the host should render again, once per change.
    ///
    /// After an expansion, size or cache change every rendered row is listed; after pages
    /// arrive, only the rendered rows whose item is now loaded.
    pub fn take_rows_to_refresh(&mut self) -> Vec<usize> {
        let refresh = core::mem::replace(&mut self.refresh, Refresh::None);
        let end = self.rendered.end.min(self.controller.effective_size());
        let rows = self.rendered.start..end;
        match refresh {
            Refresh::None => Vec::new(),
            Refresh::All => rows.collect(),
            Refresh::Loaded => rows
                .filter(|&flat_index| self.controller.flat_index_info(flat_index).item.is_some())
                .collect(),
        }
    }

    /// Returns `true` (and warns with `feature = "tracing"`) when no size was ever given and
    /// nothing is loaded, which leaves the host with zero rows.
    pub fn check_size(&self) -> bool {
        let missing = !self.size_known && self.controller.effective_size() == 0;
        #[cfg(feature = "tracing")]
        if missing {
            tracing::warn!(
                target: "paging_cache_adapter",
                "no size known: call `set_size` or report a size from the data provider"
            );
        }
        missing
    }

    /// Resolves per-level `indexes` (see `DataProviderController::flat_index_by_path`) to the
    /// flat index to scroll to.
    ///
    /// Revealing the target can load pages and sub-levels synchronously, which moves deeper
    /// targets, so the lookup repeats until it is stable. If pages are still loading, the path
    /// is kept and resolved again after the next arrival; read the latest target with
    /// [`take_scroll_target`](Self::take_scroll_target).
    pub fn scroll_to_index(&mut self, indexes: &[usize]) -> usize {
        self.pending_scroll = None;
        let mut target = self.controller.flat_index_by_path(indexes);
        loop {
            self.reveal(target);
            let next = self.controller.flat_index_by_path(indexes);
            if next == target {
                break;
            }
            target = next;
        }

        self.scroll_target = Some(target);
        if self.controller.is_loading() {
            self.pending_scroll = Some(indexes.to_vec());
        }
        target
    }

    pub fn take_scroll_target(&mut self) -> Option<usize> {
        self.scroll_target.take()
    }

    pub fn pending_scroll_path(&self) -> Option<&[usize]> {
        self.pending_scroll.as_deref()
    }

    fn reveal(&mut self, flat_index: usize) {
        self.controller.ensure_flat_index_loaded(flat_index);
        self.controller.ensure_flat_index_children_loaded(flat_index);
        self.settle();
    }

    fn settle(&mut self) {
        let mut received = false;
        while self.seen_pages != self.controller.applied_pages() {
            self.seen_pages = self.controller.applied_pages();
            received = true;
            self.has_data = true;
            for flat_index in self.rendered.clone() {
                self.controller.ensure_flat_index_children_loaded(flat_index);
            }
        }
        if !received {
            return;
        }

        if self.refresh == Refresh::None {
            self.refresh = Refresh::Loaded;
        }
        if let Some(path) = self.pending_scroll.take() {
            self.scroll_to_index(&path);
        }
    }
}

impl<T, K, P> core::fmt::Debug for TreeDataSource<T, K, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TreeDataSource")
            .field("controller", &self.controller)
            .field("rendered", &self.rendered)
            .field("has_data", &self.has_data)
            .field("scroll_target", &self.scroll_target)
            .field("pending_scroll", &self.pending_scroll)
            .finish_non_exhaustive()
    }
}
