//! Seams to the PDF-decoding collaborator

use image::RgbImage;

use super::request::RenderFault;
use super::types::{DocumentSource, OpenOptions, PageSize, RawAnnotation};

/// Why a document could not be opened
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenErrorKind {
    /// Nothing exists at the given location
    Missing,
    /// The bytes are not a PDF
    InvalidFormat,
    /// The bytes could not be read (permissions, transport, CORS-style refusal)
    Unreadable,
    PasswordProtected,
    /// The server answered 404
    NotFound,
    Unknown,
}

/// Failure reported by [`PdfBackend::open`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {detail}")]
pub struct OpenError {
    pub kind: OpenErrorKind,
    pub detail: String,
}

impl OpenError {
    pub fn new(kind: OpenErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// An opened document handle.
///
/// Handles are created per thread and never shared, so implementations do not
/// need to be `Send`. Page indices are 0-based.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Intrinsic size of a page at scale 1
    fn page_size(&self, index: usize) -> Result<PageSize, RenderFault>;

    /// Rasterize a page at a uniform scale
    fn rasterize(&self, index: usize, scale: f32) -> Result<RgbImage, RenderFault>;

    /// Annotations attached to a page
    fn annotations(&self, index: usize) -> Result<Vec<RawAnnotation>, RenderFault>;
}

/// Opens documents; shared by every render worker
pub trait PdfBackend: Send + Sync {
    fn open(
        &self,
        source: &DocumentSource,
        options: &OpenOptions,
    ) -> Result<Box<dyn PdfDocument>, OpenError>;
}
