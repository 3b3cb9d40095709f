//! PDF rendering infrastructure

mod backend;
mod cache;
#[cfg(feature = "pdf")]
mod mupdf_backend;
mod request;
mod service;
mod types;
mod worker;

pub use backend::{OpenError, OpenErrorKind, PdfBackend, PdfDocument};
pub use cache::{CacheKey, PageCache};
#[cfg(feature = "pdf")]
pub use mupdf_backend::MuPdfBackend;
pub use request::{
    CancelToken, RenderFault, RenderKind, RenderParams, RenderRequest, RenderResponse, RequestId,
};
pub use service::RenderService;
pub use types::*;
pub use worker::{encode_jpeg, render_page};

/// Render threads spawned per viewer
pub const DEFAULT_WORKERS: usize = 2;

/// Encoded images memoized across all workers
pub const DEFAULT_CACHE_SIZE: usize = 32;
