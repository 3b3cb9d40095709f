//! PDF render worker - runs in separate thread(s)

use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use log::{debug, warn};

use super::backend::{PdfBackend, PdfDocument};
use super::cache::{CacheKey, PageCache};
use super::request::{
    CancelToken, RenderFault, RenderKind, RenderParams, RenderRequest, RenderResponse, RequestId,
};
use super::types::{DocumentSource, EncodedImage, OpenOptions};
use crate::annotations::{AnnotationOverlay, build_overlay};

/// Everything a worker thread needs, moved into it at spawn time
pub struct WorkerContext {
    pub backend: Arc<dyn PdfBackend>,
    pub source: DocumentSource,
    pub options: OpenOptions,
    pub cache: Arc<Mutex<PageCache>>,
    pub cancel: CancelToken,
}

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn render_worker(
    ctx: WorkerContext,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    let doc = match ctx.backend.open(&ctx.source, &ctx.options) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Render worker could not open {}: {e}", ctx.source);
            // Every request still gets an answer so nobody waits forever
            for request in requests {
                let Some((id, page, kind)) = describe(&request) else {
                    break;
                };
                let _ = responses.send(RenderResponse::Error {
                    id,
                    page,
                    kind,
                    error: RenderFault::Unavailable(e.detail.clone()),
                });
            }
            return;
        }
    };

    for request in requests {
        if let Some((id, page, _)) = describe(&request) {
            if ctx.cancel.is_cancelled() {
                let _ = responses.send(RenderResponse::Cancelled { id, page });
                continue;
            }
        }

        match request {
            RenderRequest::Page { id, page, params } => {
                handle_image_request(
                    doc.as_ref(),
                    id,
                    page,
                    RenderKind::Page,
                    &params,
                    &ctx.cache,
                    &responses,
                );
            }
            RenderRequest::Thumbnail { id, page, params } => {
                handle_image_request(
                    doc.as_ref(),
                    id,
                    page,
                    RenderKind::Thumbnail,
                    &params,
                    &ctx.cache,
                    &responses,
                );
            }
            RenderRequest::Annotations {
                id,
                page,
                target_width,
                target_height,
            } => {
                let response = match page_overlay(doc.as_ref(), page, target_width, target_height)
                {
                    Ok(overlay) => RenderResponse::Annotations { id, page, overlay },
                    Err(error) => RenderResponse::Error {
                        id,
                        page,
                        kind: RenderKind::Annotations,
                        error,
                    },
                };
                let _ = responses.send(response);
            }
            RenderRequest::Shutdown => break,
        }
    }
}

fn describe(request: &RenderRequest) -> Option<(RequestId, usize, RenderKind)> {
    match request {
        RenderRequest::Page { id, page, .. } => Some((*id, *page, RenderKind::Page)),
        RenderRequest::Thumbnail { id, page, .. } => Some((*id, *page, RenderKind::Thumbnail)),
        RenderRequest::Annotations { id, page, .. } => Some((*id, *page, RenderKind::Annotations)),
        RenderRequest::Shutdown => None,
    }
}

fn handle_image_request(
    doc: &dyn PdfDocument,
    id: RequestId,
    page: usize,
    kind: RenderKind,
    params: &RenderParams,
    cache: &Arc<Mutex<PageCache>>,
    responses: &Sender<RenderResponse>,
) {
    let key = CacheKey::from_params(page, kind, params);
    let cached = cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);

    let result = match cached {
        Some(image) => {
            debug!("Render cache hit for page {page} ({kind:?})");
            Ok(image)
        }
        None => render_page(doc, page, params).map(|image| {
            cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key, image)
        }),
    };

    let response = match (result, kind) {
        (Ok(image), RenderKind::Thumbnail) => RenderResponse::Thumbnail { id, page, image },
        (Ok(image), _) => RenderResponse::Page { id, page, image },
        (Err(error), kind) => RenderResponse::Error {
            id,
            page,
            kind,
            error,
        },
    };
    let _ = responses.send(response);
}

/// Rasterize one page fitted into the target box and encode it as JPEG.
///
/// The scale is uniform (`min` of both axis ratios) so the page keeps its
/// own aspect ratio; the result is never stretched to fill the box.
pub fn render_page(
    doc: &dyn PdfDocument,
    page: usize,
    params: &RenderParams,
) -> Result<EncodedImage, RenderFault> {
    if page >= doc.page_count() {
        return Err(RenderFault::MissingPage(page));
    }

    let intrinsic = doc.page_size(page)?;
    let scale = intrinsic.fit_scale(params.target_width, params.target_height);
    if !scale.is_finite() || scale <= 0.0 {
        return Err(RenderFault::NoSurface(format!(
            "cannot fit page {page} into {}x{}",
            params.target_width, params.target_height
        )));
    }

    let pixels = doc.rasterize(page, scale)?;
    encode_jpeg(&pixels, params.encoder_quality())
}

/// Encode an RGB raster as baseline JPEG
pub fn encode_jpeg(pixels: &RgbImage, quality: u8) -> Result<EncodedImage, RenderFault> {
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(RenderFault::NoSurface("empty raster".to_string()));
    }

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(pixels)
        .map_err(|e| RenderFault::Encode(e.to_string()))?;

    Ok(EncodedImage {
        width: pixels.width(),
        height: pixels.height(),
        mime: "image/jpeg",
        bytes,
    })
}

fn page_overlay(
    doc: &dyn PdfDocument,
    page: usize,
    target_width: u32,
    target_height: u32,
) -> Result<Option<AnnotationOverlay>, RenderFault> {
    if page >= doc.page_count() {
        return Err(RenderFault::MissingPage(page));
    }
    let intrinsic = doc.page_size(page)?;
    let annotations = doc.annotations(page)?;
    Ok(build_overlay(
        &annotations,
        intrinsic,
        target_width,
        target_height,
    ))
}
