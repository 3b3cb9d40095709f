//! In-memory fakes for the decoding collaborator, shared by unit and integration tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};

use crate::pdf::{
    DocumentSource, OpenError, OpenErrorKind, OpenOptions, PageSize, PdfBackend, PdfDocument,
    RawAnnotation, RenderFault,
};

/// Synthetic document: page sizes, annotations and scripted failures
#[derive(Clone, Debug)]
pub struct FakeDocument {
    pages: Vec<PageSize>,
    annotations: HashMap<usize, Vec<RawAnnotation>>,
    failing_pages: HashSet<usize>,
    annotations_fail: bool,
    renders: Arc<Mutex<HashMap<usize, usize>>>,
}

impl FakeDocument {
    /// `count` pages, all of the same intrinsic size
    #[must_use]
    pub fn uniform(count: usize, size: PageSize) -> Self {
        Self {
            pages: vec![size; count],
            annotations: HashMap::new(),
            failing_pages: HashSet::new(),
            annotations_fail: false,
            renders: Arc::default(),
        }
    }

    /// Rasterizing `page` fails with a corrupt-document fault
    #[must_use]
    pub fn failing_page(mut self, page: usize) -> Self {
        self.failing_pages.insert(page);
        self
    }

    #[must_use]
    pub fn with_annotations(mut self, page: usize, annotations: Vec<RawAnnotation>) -> Self {
        self.annotations.insert(page, annotations);
        self
    }

    /// Every annotation lookup fails
    #[must_use]
    pub fn without_annotation_support(mut self) -> Self {
        self.annotations_fail = true;
        self
    }

    fn size(&self, index: usize) -> Result<PageSize, RenderFault> {
        self.pages
            .get(index)
            .copied()
            .ok_or(RenderFault::MissingPage(index))
    }
}

impl PdfDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, RenderFault> {
        self.size(index)
    }

    fn rasterize(&self, index: usize, scale: f32) -> Result<RgbImage, RenderFault> {
        let size = self.size(index)?;
        *self
            .renders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(index)
            .or_default() += 1;

        if self.failing_pages.contains(&index) {
            return Err(RenderFault::Corrupt(format!("page {index} is damaged")));
        }

        let (width, height) = size.scaled(scale);
        // Gradient keyed on the page index so pages encode differently
        let shade = (index * 37 % 200) as u8;
        Ok(RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x % 256) as u8,
                (y % 256) as u8,
                shade.wrapping_add(((x + y) % 56) as u8),
            ])
        }))
    }

    fn annotations(&self, index: usize) -> Result<Vec<RawAnnotation>, RenderFault> {
        self.size(index)?;
        if self.annotations_fail {
            return Err(RenderFault::generic("annotations unsupported"));
        }
        Ok(self.annotations.get(&index).cloned().unwrap_or_default())
    }
}

/// Backend handing out clones of one [`FakeDocument`], or failing to open
#[derive(Clone, Debug)]
pub struct FakeBackend {
    document: Result<FakeDocument, OpenErrorKind>,
    opens: Arc<AtomicUsize>,
}

impl FakeBackend {
    #[must_use]
    pub fn new(document: FakeDocument) -> Self {
        Self {
            document: Ok(document),
            opens: Arc::default(),
        }
    }

    /// Every `open` fails with `kind`
    #[must_use]
    pub fn unopenable(kind: OpenErrorKind) -> Self {
        Self {
            document: Err(kind),
            opens: Arc::default(),
        }
    }

    /// How many times `page` has been rasterized, across all handles
    #[must_use]
    pub fn render_count(&self, page: usize) -> usize {
        self.document.as_ref().map_or(0, |doc| {
            doc.renders
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(&page)
                .copied()
                .unwrap_or(0)
        })
    }

    /// Total rasterizations across all pages
    #[must_use]
    pub fn total_renders(&self) -> usize {
        self.document.as_ref().map_or(0, |doc| {
            doc.renders
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .values()
                .sum()
        })
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl PdfBackend for FakeBackend {
    fn open(
        &self,
        source: &DocumentSource,
        _options: &OpenOptions,
    ) -> Result<Box<dyn PdfDocument>, OpenError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if source.is_empty() {
            return Err(OpenError::new(OpenErrorKind::Missing, "empty document source"));
        }
        match &self.document {
            Ok(doc) => Ok(Box::new(doc.clone())),
            Err(kind) => Err(OpenError::new(kind.clone(), format!("cannot open {source}"))),
        }
    }
}

/// Letter-sized pages, the common case in tests
#[must_use]
pub fn letter_document(count: usize) -> FakeDocument {
    FakeDocument::uniform(count, PageSize::new(612.0, 792.0))
}
