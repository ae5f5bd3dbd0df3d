use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::callback::PageResponse;
use crate::helpers;
use crate::{
    Cache, CachePath, ControllerOptions, DataEvent, Error, EventListener, FetchParams,
    FlatIndexInfo, ListenerId, PageCallback, RequestId,
};

/// Lazily loads a hierarchical dataset page by page and exposes it through a flat index space.
///
/// The controller owns the root [`Cache`] and drives all page fetches. It is UI-agnostic: the
/// rendering layer asks for flat indexes with `ensure_*` and re-queries after it is notified.
///
/// All cache mutation happens on the thread that owns the controller. Callbacks resolved later
/// (or on another thread) are picked up by [`process_responses`](Self::process_responses).
pub struct DataProviderController<T, P = ()> {
    options: ControllerOptions<T, P>,
    root: Cache<T>,
    listeners: Vec<(ListenerId, EventListener)>,
    next_listener_id: u64,
    next_request_id: u64,
    applied_pages: u64,
    responses_tx: Sender<PageResponse<T>>,
    responses_rx: Receiver<PageResponse<T>>,
}

impl<T: Clone + 'static, P: 'static> DataProviderController<T, P> {
    /// Creates a controller with an empty root cache of `options.size` items.
    ///
    /// A page size of 0 is coerced to 1. Use [`try_new`](Self::try_new) to reject it instead.
    pub fn new(mut options: ControllerOptions<T, P>) -> Self {
        if options.page_size == 0 {
            pwarn!("DataProviderController::new: page_size 0 coerced to 1");
            options.page_size = 1;
        }
        pdebug!(
            size = options.size,
            page_size = options.page_size,
            has_data_provider = options.data_provider.is_some(),
            "DataProviderController::new"
        );
        let (responses_tx, responses_rx) = crossbeam_channel::unbounded();
        Self {
            root: Cache::new(options.page_size, options.size),
            options,
            listeners: Vec::new(),
            next_listener_id: 0,
            next_request_id: 0,
            applied_pages: 0,
            responses_tx,
            responses_rx,
        }
    }

    pub fn try_new(options: ControllerOptions<T, P>) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self::new(options))
    }

    pub fn options(&self) -> &ControllerOptions<T, P> {
        &self.options
    }

    pub fn size(&self) -> usize {
        self.options.size
    }

    pub fn page_size(&self) -> usize {
        self.options.page_size
    }

    /// Number of rows of the whole flattened tree.
    pub fn effective_size(&self) -> usize {
        self.root.effective_size()
    }

    pub fn root_cache(&self) -> &Cache<T> {
        &self.root
    }

    pub fn cache(&self, path: &[usize]) -> Option<&Cache<T>> {
        self.root.descendant(path)
    }

    pub fn is_expanded(&self, item: &T) -> bool {
        (self.options.is_expanded)(item)
    }

    /// Whether any cache of the tree has a pending request.
    pub fn is_loading(&self) -> bool {
        self.root.is_loading()
    }

    /// Number of page responses applied to the live tree so far.
    pub fn applied_pages(&self) -> u64 {
        self.applied_pages
    }

    pub fn set_size(&mut self, size: usize) {
        self.options.size = size;
        self.root.set_size(size);
        self.recalculate_effective_size();
    }

    /// Changes the page size and discards every cached page.
    ///
    /// A page size of 0 is coerced to 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size == 0 {
            pwarn!("set_page_size: page_size 0 coerced to 1");
        }
        self.options.page_size = page_size.max(1);
        self.clear_cache();
    }

    pub fn try_set_page_size(&mut self, page_size: usize) -> Result<(), Error> {
        if page_size == 0 {
            return Err(Error::ZeroPageSize);
        }
        self.set_page_size(page_size);
        Ok(())
    }

    /// Replaces the data provider and discards every cached page. Responses to requests of the
    /// previous provider are ignored.
    pub fn set_data_provider(
        &mut self,
        f: impl Fn(FetchParams<T, P>, PageCallback<T>) + Send + Sync + 'static,
    ) {
        self.options.data_provider = Some(Arc::new(f));
        self.clear_cache();
    }

    /// Removes the data provider and discards every cached page.
    pub fn remove_data_provider(&mut self) {
        self.options.data_provider = None;
        self.clear_cache();
    }

    pub fn set_is_expanded(&mut self, f: impl Fn(&T) -> bool + Send + Sync + 'static) {
        self.options.is_expanded = Arc::new(f);
        self.recalculate_effective_size();
    }

    pub fn set_data_provider_params(&mut self, f: impl Fn() -> P + Send + Sync + 'static) {
        self.options.data_provider_params = Arc::new(f);
    }

    /// Recomputes effective sizes of the whole tree. Call after expansion state changes.
    pub fn recalculate_effective_size(&mut self) {
        self.root
            .recalculate_effective_size(None, &*self.options.is_expanded);
    }

    /// Replaces the whole tree with an empty root cache of the configured size.
    ///
    /// Requests still in flight become orphaned; their responses are dropped.
    pub fn clear_cache(&mut self) {
        pdebug!(
            size = self.options.size,
            page_size = self.options.page_size,
            "clear_cache"
        );
        self.root = Cache::new(self.options.page_size, self.options.size);
    }

    /// Detaches the sub-cache of the item at `item_path` (per-level indexes, root first) and
    /// recomputes effective sizes.
    pub fn remove_sub_cache(&mut self, item_path: &[usize]) -> Option<Cache<T>> {
        let (&index, parent_path) = item_path.split_last()?;
        let removed = self.root.descendant_mut(parent_path)?.remove_sub_cache(index)?;
        self.recalculate_effective_size();
        Some(removed)
    }

    pub fn flat_index_info(&self, flat_index: usize) -> FlatIndexInfo<'_, T> {
        helpers::flat_index_info(&self.root, flat_index)
    }

    /// See [`helpers::flat_index_by_path`](crate::flat_index_by_path).
    pub fn flat_index_by_path(&self, path: &[usize]) -> usize {
        helpers::flat_index_by_path(&self.root, path)
    }

    /// Requests the page holding `flat_index` unless its item is already loaded or the page is
    /// already pending.
    pub fn ensure_flat_index_loaded(&mut self, flat_index: usize) {
        let FlatIndexInfo {
            item, path, page, ..
        } = self.flat_index_info(flat_index);
        if item.is_some() {
            return;
        }
        self.load_cache_page(path, page);
    }

    /// When the item at `flat_index` is loaded and expanded, makes sure its sub-cache exists and
    /// its first page is requested.
    pub fn ensure_flat_index_children_loaded(&mut self, flat_index: usize) {
        let info = self.flat_index_info(flat_index);
        let Some(item) = info.item else {
            return;
        };
        if !self.is_expanded(item) {
            return;
        }
        let index = info.index;
        let parent_path = info.path;

        let Some(cache) = self.root.descendant_mut(&parent_path) else {
            return;
        };
        if cache.get_sub_cache(index).is_none() {
            ptrace!(level = parent_path.level(), index, "creating sub-cache");
            cache.create_sub_cache(index);
        }
        let first_page_loaded = cache
            .get_sub_cache(index)
            .is_some_and(|sub_cache| sub_cache.is_page_loaded(0));
        if !first_page_loaded {
            self.load_cache_page(parent_path.child(index), 0);
        }
    }

    pub fn ensure_first_page_loaded(&mut self) {
        if !self.root.is_page_loaded(0) {
            self.load_cache_page(CachePath::root(), 0);
        }
    }

    /// Applies every response that arrived since the last call. Returns the number of pages
    /// applied to the live tree; orphaned responses are dropped and not counted.
    pub fn process_responses(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(response) = self.responses_rx.try_recv() {
            if self.apply_response(response) {
                applied += 1;
            }
        }
        applied
    }

    pub fn add_listener(&mut self, f: impl Fn(&DataEvent) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Arc::new(f)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn emit(&self, event: DataEvent) {
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }

    fn load_cache_page(&mut self, path: CachePath, page: usize) {
        let Some(provider) = self.options.data_provider.clone() else {
            return;
        };
        let request = RequestId(self.next_request_id);
        let Some(cache) = self.root.descendant_mut(&path) else {
            return;
        };
        if cache.has_pending_request(page) {
            ptrace!(level = path.level(), page, "page already requested");
            return;
        }
        cache.register_request(page, request);
        self.next_request_id += 1;

        let parent_item = path
            .split_last()
            .and_then(|(&index, parent_path)| self.root.descendant(parent_path)?.item(index))
            .cloned();
        let params = FetchParams {
            page,
            page_size: self.options.page_size,
            parent_item,
            extra: (self.options.data_provider_params)(),
        };

        let level = path.level();
        ptrace!(level, page, request = request.0, "requesting page");
        self.emit(DataEvent::PageRequested { level, page });

        let callback = PageCallback::new(request, path, page, self.responses_tx.clone());
        provider(params, callback);

        self.process_responses();
    }

    fn apply_response(&mut self, response: PageResponse<T>) -> bool {
        let PageResponse {
            request,
            path,
            page,
            items,
            size,
        } = response;

        let Some(cache) = self.root.descendant_mut(&path) else {
            ptrace!(request = request.0, "dropping response for a discarded cache");
            return false;
        };
        if cache.pending_request(page) != Some(request) {
            ptrace!(request = request.0, page, "dropping orphaned response");
            return false;
        }

        match size {
            Some(size) => cache.set_size(size),
            None if !path.is_root() => cache.set_size(items.len()),
            None => {}
        }
        pdebug!(
            level = path.level(),
            page,
            items = items.len(),
            size = cache.size(),
            "page received"
        );
        cache.set_page(page, items);

        self.recalculate_effective_size();
        self.applied_pages += 1;

        let level = path.level();
        self.emit(DataEvent::PageReceived { level, page });

        if let Some(cache) = self.root.descendant_mut(&path) {
            cache.clear_request(page, request);
        }

        self.emit(DataEvent::PageLoaded { level, page });
        true
    }
}

impl<T, P> core::fmt::Debug for DataProviderController<T, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DataProviderController")
            .field("options", &self.options)
            .field("effective_size", &self.root.effective_size())
            .field("listeners", &self.listeners.len())
            .field("applied_pages", &self.applied_pages)
            .finish_non_exhaustive()
    }
}
