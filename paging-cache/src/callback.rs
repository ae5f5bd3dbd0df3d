use core::fmt;

use crossbeam_channel::Sender;

use crate::{CachePath, Error, RequestId};

pub(crate) struct PageResponse<T> {
    pub(crate) request: RequestId,
    pub(crate) path: CachePath,
    pub(crate) page: usize,
    pub(crate) items: Vec<T>,
    pub(crate) size: Option<usize>,
}

/// Completion handle passed to the data provider together with the fetch parameters.
///
/// Resolving consumes the handle, so a request can be answered at most once. The handle is
/// `Send`: a provider may move it to another thread and resolve it there. The response is only
/// applied when the owning controller processes it on its own thread, either right after the
/// provider returns (synchronous providers) or in
/// [`DataProviderController::process_responses`](crate::DataProviderController::process_responses).
#[must_use = "an unresolved page callback leaves the page pending forever"]
pub struct PageCallback<T> {
    request: RequestId,
    path: CachePath,
    page: usize,
    tx: Sender<PageResponse<T>>,
}

impl<T> PageCallback<T> {
    pub(crate) fn new(
        request: RequestId,
        path: CachePath,
        page: usize,
        tx: Sender<PageResponse<T>>,
    ) -> Self {
        Self {
            request,
            path,
            page,
            tx,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Tree level of the cache the page belongs to (root = 0).
    pub fn level(&self) -> usize {
        self.path.level()
    }

    /// Delivers the page.
    ///
    /// `size` is the total number of items at the requested level, when the provider knows it.
    /// Sub-levels without a size take the number of returned items as their size; the root
    /// level keeps the size configured on the controller.
    ///
    /// Responses for caches that were discarded in the meantime are dropped silently.
    pub fn resolve(self, items: impl IntoIterator<Item = T>, size: Option<usize>) {
        if let Err(_err) = self.try_resolve(items, size) {
            ptrace!(error = %_err, "page callback resolved without a controller");
        }
    }

    /// Same as [`resolve`](Self::resolve), but reports a dropped controller.
    pub fn try_resolve(
        self,
        items: impl IntoIterator<Item = T>,
        size: Option<usize>,
    ) -> Result<(), Error> {
        let request = self.request;
        self.tx
            .send(PageResponse {
                request,
                path: self.path,
                page: self.page,
                items: items.into_iter().collect(),
                size,
            })
            .map_err(|_| Error::Disconnected { request })
    }
}

impl<T> fmt::Debug for PageCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageCallback")
            .field("request", &self.request)
            .field("path", &self.path)
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}
