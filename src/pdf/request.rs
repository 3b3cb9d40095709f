//! Render request and response types

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::types::EncodedImage;
use crate::annotations::AnnotationOverlay;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// What a render is for; full pages and thumbnails are tracked separately
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderKind {
    Page,
    Thumbnail,
    Annotations,
}

/// Parameters for rasterizing a page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    /// Box the page is fitted into, in pixels
    pub target_width: u32,
    pub target_height: u32,
    /// JPEG quality in `0.0..=1.0`
    pub quality: f32,
}

impl RenderParams {
    #[must_use]
    pub const fn new(target_width: u32, target_height: u32, quality: f32) -> Self {
        Self {
            target_width,
            target_height,
            quality,
        }
    }

    /// Quality mapped onto the encoder's 1..=100 scale
    #[must_use]
    pub fn encoder_quality(&self) -> u8 {
        let q = if self.quality.is_finite() {
            self.quality.clamp(0.0, 1.0)
        } else {
            0.85
        };
        ((q * 100.0).round() as u8).max(1)
    }
}

/// Cooperative cancellation flag shared with the workers
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Full-quality page for the book
    Page {
        id: RequestId,
        page: usize,
        params: RenderParams,
    },

    /// Low-resolution image for the thumbnail grid
    Thumbnail {
        id: RequestId,
        page: usize,
        params: RenderParams,
    },

    /// Link overlay for a page rendered into the given box
    Annotations {
        id: RequestId,
        page: usize,
        target_width: u32,
        target_height: u32,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from the render pipeline; always scoped to one page
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderFault {
    #[error("document is corrupt: {0}")]
    Corrupt(String),

    #[error("page {0} does not exist")]
    MissingPage(usize),

    #[error("no drawing surface: {0}")]
    NoSurface(String),

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("document could not be opened by the worker: {0}")]
    Unavailable(String),

    #[error("render cancelled")]
    Cancelled,

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    Page {
        id: RequestId,
        page: usize,
        image: Arc<EncodedImage>,
    },

    Thumbnail {
        id: RequestId,
        page: usize,
        image: Arc<EncodedImage>,
    },

    /// `None` when the page carries no external links
    Annotations {
        id: RequestId,
        page: usize,
        overlay: Option<AnnotationOverlay>,
    },

    /// The service was torn down before the request ran
    Cancelled { id: RequestId, page: usize },

    Error {
        id: RequestId,
        page: usize,
        kind: RenderKind,
        error: RenderFault,
    },
}

impl RenderResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Page { id, .. }
            | Self::Thumbnail { id, .. }
            | Self::Annotations { id, .. }
            | Self::Cancelled { id, .. }
            | Self::Error { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn page(&self) -> usize {
        match self {
            Self::Page { page, .. }
            | Self::Thumbnail { page, .. }
            | Self::Annotations { page, .. }
            | Self::Cancelled { page, .. }
            | Self::Error { page, .. } => *page,
        }
    }
}
