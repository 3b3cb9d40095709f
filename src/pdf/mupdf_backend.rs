//! MuPDF-backed decoding collaborator

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};

use image::RgbImage;
use log::{debug, info};
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::backend::{OpenError, OpenErrorKind, PdfBackend, PdfDocument};
use super::request::RenderFault;
use super::types::{DocumentSource, OpenOptions, PageSize, RawAnnotation};

/// Opens documents with MuPDF. Remote documents are downloaded once and the
/// bytes are shared by every worker that opens the same URL.
#[derive(Default)]
pub struct MuPdfBackend {
    downloads: Mutex<HashMap<String, Arc<Vec<u8>>>>,
}

impl MuPdfBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fetch(&self, url: &str, options: &OpenOptions) -> Result<Arc<Vec<u8>>, OpenError> {
        let mut downloads = self
            .downloads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(bytes) = downloads.get(url) {
            return Ok(Arc::clone(bytes));
        }

        info!("Fetching {url}");
        let mut request = ureq::get(url);
        for (name, value) in &options.http_headers {
            request = request.set(name, value);
        }

        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(404, _) => {
                OpenError::new(OpenErrorKind::NotFound, format!("{url} returned 404"))
            }
            ureq::Error::Status(code, _) => OpenError::new(
                OpenErrorKind::Unreadable,
                format!("{url} returned HTTP {code}"),
            ),
            ureq::Error::Transport(t) => OpenError::new(OpenErrorKind::Unreadable, t.to_string()),
        })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| OpenError::new(OpenErrorKind::Unreadable, e.to_string()))?;
        debug!("Fetched {} bytes from {url}", bytes.len());

        let bytes = Arc::new(bytes);
        downloads.insert(url.to_string(), Arc::clone(&bytes));
        Ok(bytes)
    }
}

impl PdfBackend for MuPdfBackend {
    fn open(
        &self,
        source: &DocumentSource,
        options: &OpenOptions,
    ) -> Result<Box<dyn PdfDocument>, OpenError> {
        if source.is_empty() {
            return Err(OpenError::new(OpenErrorKind::Missing, "no document given"));
        }

        let doc = match source {
            DocumentSource::Url(url) => match source.local_path() {
                Some(path) => open_path(&path)?,
                None => {
                    let bytes = self.fetch(url, options)?;
                    Document::from_bytes(&bytes, "application/pdf")
                        .map_err(|e| OpenError::new(OpenErrorKind::InvalidFormat, e.to_string()))?
                }
            },
            DocumentSource::Path(path) => open_path(path)?,
        };

        if doc.needs_password().unwrap_or(false) {
            return Err(OpenError::new(
                OpenErrorKind::PasswordProtected,
                format!("{source} is encrypted"),
            ));
        }

        let page_count = doc
            .page_count()
            .map_err(|e| OpenError::new(OpenErrorKind::InvalidFormat, e.to_string()))?;
        if page_count <= 0 {
            return Err(OpenError::new(
                OpenErrorKind::InvalidFormat,
                format!("{source} has no pages"),
            ));
        }

        Ok(Box::new(MuPdfDocument {
            doc,
            page_count: page_count as usize,
        }))
    }
}

fn open_path(path: &Path) -> Result<Document, OpenError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Err(OpenError::new(
                OpenErrorKind::Unreadable,
                format!("{} is not a file", path.display()),
            ));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OpenError::new(
                OpenErrorKind::Missing,
                format!("{} does not exist", path.display()),
            ));
        }
        Err(e) => return Err(OpenError::new(OpenErrorKind::Unreadable, e.to_string())),
    }

    Document::open(path.to_string_lossy().as_ref())
        .map_err(|e| OpenError::new(OpenErrorKind::InvalidFormat, e.to_string()))
}

struct MuPdfDocument {
    doc: Document,
    page_count: usize,
}

impl MuPdfDocument {
    fn load(&self, index: usize) -> Result<mupdf::Page, RenderFault> {
        if index >= self.page_count {
            return Err(RenderFault::MissingPage(index));
        }
        self.doc
            .load_page(index as i32)
            .map_err(|e| RenderFault::Corrupt(e.to_string()))
    }
}

impl PdfDocument for MuPdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, index: usize) -> Result<PageSize, RenderFault> {
        let bounds = self
            .load(index)?
            .bounds()
            .map_err(|e| RenderFault::Corrupt(e.to_string()))?;
        Ok(PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }

    fn rasterize(&self, index: usize, scale: f32) -> Result<RgbImage, RenderFault> {
        let page = self.load(index)?;
        let rgb = Colorspace::device_rgb();
        let pixmap = page
            .to_pixmap(&Matrix::new_scale(scale, scale), &rgb, false, false)
            .map_err(|e| RenderFault::NoSurface(e.to_string()))?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let pixels = pixmap_to_rgb(&pixmap)?;
        RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderFault::NoSurface("pixmap size mismatch".to_string()))
    }

    fn annotations(&self, index: usize) -> Result<Vec<RawAnnotation>, RenderFault> {
        let page = self.load(index)?;
        let bounds = page
            .bounds()
            .map_err(|e| RenderFault::Corrupt(e.to_string()))?;
        let height = bounds.y1 - bounds.y0;
        let links = page
            .links()
            .map_err(|e| RenderFault::generic(e.to_string()))?;

        // MuPDF reports top-left origin rects; annotations carry PDF space
        Ok(links
            .map(|link| {
                let r = link.bounds;
                RawAnnotation {
                    subtype: "Link".to_string(),
                    rect: [
                        r.x0 - bounds.x0,
                        height - (r.y1 - bounds.y0),
                        r.x1 - bounds.x0,
                        height - (r.y0 - bounds.y0),
                    ],
                    url: (!link.uri.is_empty()).then(|| link.uri.clone()),
                    action_url: None,
                    unsafe_url: None,
                    dest_page: link.dest.map(|dest| dest.loc.page_number as usize),
                }
            })
            .collect())
    }
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, RenderFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(RenderFault::NoSurface(format!(
            "unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(RenderFault::NoSurface("pixmap buffer size mismatch".to_string()));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }
    Ok(out)
}
