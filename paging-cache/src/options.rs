use std::sync::Arc;

use crate::{DataEvent, Error, FetchParams, PageCallback};

/// Decides whether an item's children are part of the flattened view.
pub type IsExpanded<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Fetches one page of items.
///
/// The provider must eventually resolve the [`PageCallback`] exactly once, either before
/// returning or later from anywhere (the callback is `Send`). Failures are the provider's own
/// business: a callback that is never resolved keeps its page pending.
pub type DataProvider<T, P = ()> = Arc<dyn Fn(FetchParams<T, P>, PageCallback<T>) + Send + Sync>;

/// Supplies extra parameters (sort orders, filters, ...) merged into every fetch.
pub type DataProviderParams<P> = Arc<dyn Fn() -> P + Send + Sync>;

/// Receives [`DataEvent`]s.
pub type EventListener = Arc<dyn Fn(&DataEvent) + Send + Sync>;

/// Configuration for [`crate::DataProviderController`].
///
/// Cheap to clone: closures are stored in `Arc`s.
pub struct ControllerOptions<T, P = ()> {
    /// Number of root-level items. Root pages resolved with a size override it on the root
    /// cache, not here.
    pub size: usize,
    /// Number of items per fetch. Must be greater than zero.
    pub page_size: usize,
    pub is_expanded: IsExpanded<T>,
    /// Without a provider, page loads are no-ops.
    pub data_provider: Option<DataProvider<T, P>>,
    pub data_provider_params: DataProviderParams<P>,
}

impl<T, P> Clone for ControllerOptions<T, P> {
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            page_size: self.page_size,
            is_expanded: Arc::clone(&self.is_expanded),
            data_provider: self.data_provider.clone(),
            data_provider_params: Arc::clone(&self.data_provider_params),
        }
    }
}

impl<T: 'static, P: Default + 'static> ControllerOptions<T, P> {
    /// Creates options with no provider, nothing expanded and default extra parameters.
    pub fn new(size: usize, page_size: usize) -> Self {
        Self {
            size,
            page_size,
            is_expanded: Arc::new(|_: &T| false),
            data_provider: None,
            data_provider_params: Arc::new(P::default),
        }
    }
}

impl<T, P> ControllerOptions<T, P> {
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_is_expanded(mut self, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.is_expanded = Arc::new(f);
        self
    }

    pub fn with_data_provider(
        mut self,
        f: impl Fn(FetchParams<T, P>, PageCallback<T>) + Send + Sync + 'static,
    ) -> Self {
        self.data_provider = Some(Arc::new(f));
        self
    }

    pub fn with_data_provider_params(mut self, f: impl Fn() -> P + Send + Sync + 'static) -> Self {
        self.data_provider_params = Arc::new(f);
        self
    }

    /// Checks the options without coercing anything.
    pub fn validate(&self) -> Result<(), Error> {
        if self.page_size == 0 {
            return Err(Error::ZeroPageSize);
        }
        Ok(())
    }
}

impl<T, P> core::fmt::Debug for ControllerOptions<T, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControllerOptions")
            .field("size", &self.size)
            .field("page_size", &self.page_size)
            .field("has_data_provider", &self.data_provider.is_some())
            .finish_non_exhaustive()
    }
}
