//! Render service - manages worker threads, the shared cache and in-flight requests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::backend::PdfBackend;
use super::cache::PageCache;
use super::request::{
    CancelToken, RenderFault, RenderKind, RenderParams, RenderRequest, RenderResponse, RequestId,
};
use super::types::{DocumentSource, EncodedImage, OpenOptions};
use super::worker::{WorkerContext, render_worker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRequest {
    page: usize,
    kind: RenderKind,
}

/// Manages PDF rendering with worker threads and caching
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    pending_requests: HashMap<RequestId, PendingRequest>,
    in_flight: HashMap<(usize, RenderKind), RequestId>,
    cache: Arc<Mutex<PageCache>>,
    cancel: CancelToken,
    num_workers: usize,
}

impl RenderService {
    /// Spawn `num_workers` threads, each with its own document handle
    #[must_use]
    pub fn spawn(
        backend: Arc<dyn PdfBackend>,
        source: DocumentSource,
        options: OpenOptions,
        num_workers: usize,
        cache_size: usize,
    ) -> Self {
        let cache = Arc::new(Mutex::new(PageCache::new(cache_size)));
        let cancel = CancelToken::new();

        // MPMC: every worker pulls from the same request queue
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        for _ in 0..num_workers.max(1) {
            let ctx = WorkerContext {
                backend: Arc::clone(&backend),
                source: source.clone(),
                options: options.clone(),
                cache: Arc::clone(&cache),
                cancel: cancel.clone(),
            };
            let rx = request_rx.clone();
            let tx = response_tx.clone();

            std::thread::spawn(move || {
                render_worker(ctx, rx, tx);
            });
        }

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            pending_requests: HashMap::new(),
            in_flight: HashMap::new(),
            cache,
            cancel,
            num_workers: num_workers.max(1),
        }
    }

    /// Render a batch of pages and wait until every one of them settles.
    ///
    /// Results come back in the order of `pages`. A page that fails, or that
    /// has not settled when `timeout` runs out, yields an error; the others
    /// are unaffected.
    pub fn render_all(
        &mut self,
        pages: &[usize],
        params: RenderParams,
        timeout: Duration,
    ) -> Vec<Result<Arc<EncodedImage>, RenderFault>> {
        let ids: Vec<RequestId> = pages
            .iter()
            .map(|&page| self.request_page(page, params))
            .collect();

        let mut settled: HashMap<RequestId, Result<Arc<EncodedImage>, RenderFault>> =
            HashMap::new();
        let deadline = Instant::now() + timeout;

        let distinct: HashSet<RequestId> = ids.iter().copied().collect();
        while settled.len() < distinct.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(response) = self.wait_response(remaining) else {
                warn!(
                    "Initial render timed out with {} of {} pages settled",
                    settled.len(),
                    ids.len()
                );
                break;
            };

            let id = response.id();
            let outcome = match response {
                RenderResponse::Page { image, .. } => Ok(image),
                RenderResponse::Error { error, .. } => Err(error),
                RenderResponse::Cancelled { .. } => Err(RenderFault::Cancelled),
                other => {
                    debug!("Ignoring unrelated response during initial render: {other:?}");
                    continue;
                }
            };
            if distinct.contains(&id) {
                settled.insert(id, outcome);
            }
        }

        ids.iter()
            .map(|id| {
                settled
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| Err(RenderFault::generic("render did not settle in time")))
            })
            .collect()
    }

    /// Request a full-quality page render. A page already being rendered
    /// is not queued again; its pending id is returned instead.
    pub fn request_page(&mut self, page: usize, params: RenderParams) -> RequestId {
        self.submit(page, RenderKind::Page, |id| RenderRequest::Page {
            id,
            page,
            params,
        })
    }

    /// Request a thumbnail render
    pub fn request_thumbnail(&mut self, page: usize, params: RenderParams) -> RequestId {
        self.submit(page, RenderKind::Thumbnail, |id| RenderRequest::Thumbnail {
            id,
            page,
            params,
        })
    }

    /// Request the link overlay of a page rendered into the given box
    pub fn request_annotations(
        &mut self,
        page: usize,
        target_width: u32,
        target_height: u32,
    ) -> RequestId {
        self.submit(page, RenderKind::Annotations, |id| {
            RenderRequest::Annotations {
                id,
                page,
                target_width,
                target_height,
            }
        })
    }

    fn submit(
        &mut self,
        page: usize,
        kind: RenderKind,
        request: impl FnOnce(RequestId) -> RenderRequest,
    ) -> RequestId {
        if let Some(&id) = self.in_flight.get(&(page, kind)) {
            debug!("Page {page} {kind:?} already in flight as {id:?}");
            return id;
        }

        let id = self.next_id();
        if self.request_tx.send(request(id)).is_err() {
            warn!("Render workers are gone; dropping request for page {page}");
            return id;
        }
        self.pending_requests
            .insert(id, PendingRequest { page, kind });
        self.in_flight.insert((page, kind), id);
        id
    }

    /// Requests sent to the workers and not answered yet
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending_requests.len()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending_requests.is_empty()
    }

    /// Poll for completed render responses without blocking
    pub fn poll_responses(&mut self) -> Vec<RenderResponse> {
        let mut responses = vec![];
        while let Ok(response) = self.response_rx.try_recv() {
            self.settle(&response);
            responses.push(response);
        }
        responses
    }

    /// Block for at most `timeout` waiting for the next response
    pub fn wait_response(&mut self, timeout: Duration) -> Option<RenderResponse> {
        if self.pending_requests.is_empty() {
            return None;
        }
        match self.response_rx.recv_timeout(timeout) {
            Ok(response) => {
                self.settle(&response);
                Some(response)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Render response channel disconnected");
                None
            }
        }
    }

    fn settle(&mut self, response: &RenderResponse) {
        if let Some(pending) = self.pending_requests.remove(&response.id()) {
            self.in_flight.remove(&(pending.page, pending.kind));
        }
    }

    /// Number of images currently memoized by the workers
    #[must_use]
    pub fn cached_images(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Stop rendering: queued requests are answered as cancelled and the
    /// workers exit once the queue drains
    pub fn shutdown(&self) {
        self.cancel.cancel();
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
