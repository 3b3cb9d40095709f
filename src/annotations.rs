//! Link overlays positioned over rendered page images
//!
//! PDF link rectangles live in page space with a bottom-left origin. The
//! overlay flips them to a top-left origin and scales them by the same
//! factor the page image was rendered with, so each region lands exactly
//! on the link it came from.

use serde::Serialize;

use crate::pdf::{PageSize, RawAnnotation};

/// Clickable region that opens `url` in a new browsing context
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinkRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub url: String,
}

impl LinkRegion {
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// All link regions of one page, sized to the rendered image
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnnotationOverlay {
    pub width: f32,
    pub height: f32,
    pub regions: Vec<LinkRegion>,
}

impl AnnotationOverlay {
    /// Topmost region under the point, if any
    #[must_use]
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&LinkRegion> {
        self.regions.iter().rev().find(|region| region.contains(x, y))
    }
}

/// Build the overlay for a page rendered into `target_width` x `target_height`.
///
/// Returns `None` when the page has no link annotation with an external URL.
#[must_use]
pub fn build_overlay(
    annotations: &[RawAnnotation],
    intrinsic: PageSize,
    target_width: u32,
    target_height: u32,
) -> Option<AnnotationOverlay> {
    let scale = intrinsic.fit_scale(target_width, target_height);
    let width = intrinsic.width * scale;
    let height = intrinsic.height * scale;

    let regions: Vec<LinkRegion> = annotations
        .iter()
        .filter(|ann| ann.is_link())
        .filter_map(|ann| {
            let url = ann.target_url()?;
            let [x0, y0, x1, y1] = ann.rect;
            let left = x0.min(x1) * scale;
            let right = x0.max(x1) * scale;
            let top = height - y0.max(y1) * scale;
            let bottom = height - y0.min(y1) * scale;

            Some(LinkRegion {
                x: left,
                y: top,
                width: right - left,
                height: bottom - top,
                url: url.to_string(),
            })
        })
        .collect();

    if regions.is_empty() {
        None
    } else {
        Some(AnnotationOverlay {
            width,
            height,
            regions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> PageSize {
        PageSize::new(600.0, 800.0)
    }

    #[test]
    fn flips_and_scales_link_rect() {
        let links = vec![RawAnnotation::link(
            [60.0, 700.0, 160.0, 740.0],
            "https://example.com",
        )];

        // Half-size render
        let overlay = build_overlay(&links, page(), 300, 400).expect("overlay");
        assert_eq!(overlay.width, 300.0);
        assert_eq!(overlay.height, 400.0);

        let region = &overlay.regions[0];
        assert_eq!(region.x, 30.0);
        assert_eq!(region.y, 30.0);
        assert_eq!(region.width, 50.0);
        assert_eq!(region.height, 20.0);
        assert_eq!(region.url, "https://example.com");
    }

    #[test]
    fn skips_non_links_and_links_without_url() {
        let mut widget = RawAnnotation::link([0.0, 0.0, 10.0, 10.0], "https://x");
        widget.subtype = "Widget".to_string();
        let mut internal = RawAnnotation::link([0.0, 0.0, 10.0, 10.0], "");
        internal.url = None;
        internal.dest_page = Some(3);

        assert!(build_overlay(&[widget, internal], page(), 300, 400).is_none());
    }

    #[test]
    fn action_url_is_used_when_direct_url_missing() {
        let mut ann = RawAnnotation::link([0.0, 0.0, 600.0, 800.0], "");
        ann.url = None;
        ann.action_url = Some("https://action".to_string());

        let overlay = build_overlay(&[ann], page(), 600, 800).expect("overlay");
        assert_eq!(overlay.regions[0].url, "https://action");
        assert_eq!(overlay.regions[0].y, 0.0);
    }

    #[test]
    fn hit_test_finds_region() {
        let links = vec![
            RawAnnotation::link([0.0, 0.0, 300.0, 400.0], "https://bottom-left"),
            RawAnnotation::link([300.0, 400.0, 600.0, 800.0], "https://top-right"),
        ];
        let overlay = build_overlay(&links, page(), 600, 800).expect("overlay");

        assert_eq!(
            overlay.hit_test(450.0, 100.0).map(|r| r.url.as_str()),
            Some("https://top-right")
        );
        assert_eq!(
            overlay.hit_test(100.0, 700.0).map(|r| r.url.as_str()),
            Some("https://bottom-left")
        );
    }
}
