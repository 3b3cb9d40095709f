//! Responsive layout engine
//!
//! Turns viewport size, container width and the document's aspect ratio
//! hint into page and book pixel dimensions, and classifies the device so
//! the viewer knows whether to show one page or a two-page spread.

use serde::{Deserialize, Serialize};

/// Narrowest page the layout will ever produce
pub const MIN_PAGE_WIDTH: u32 = 200;

/// Horizontal room reserved for the side navigation buttons in spread mode
const SPREAD_SIDE_RESERVE: u32 = 120;

const SINGLE_HEIGHT_CAP: f64 = 0.75;
const SPREAD_HEIGHT_CAP: f64 = 0.80;

const MOBILE_SIDE_PAD: u32 = 12;
const TABLET_SIDE_PAD: u32 = 20;

/// Viewport width thresholds used for device classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoints {
    #[serde(default = "default_mobile")]
    pub mobile: u32,
    #[serde(default = "default_tablet")]
    pub tablet: u32,
    #[serde(default = "default_desktop")]
    pub desktop: u32,
}

fn default_mobile() -> u32 {
    480
}

fn default_tablet() -> u32 {
    768
}

fn default_desktop() -> u32 {
    1024
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            mobile: default_mobile(),
            tablet: default_tablet(),
            desktop: default_desktop(),
        }
    }
}

/// Host page measurements the layout is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Width of the element hosting the book; 0 means "unknown"
    pub container_width: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            container_width: width,
        }
    }

    #[must_use]
    pub const fn with_container(mut self, container_width: u32) -> Self {
        self.container_width = container_width;
        self
    }
}

/// Pre-scaling size hint for the document (only its ratio matters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSize {
    pub width: u32,
    pub height: u32,
}

impl BaseSize {
    pub const DEFAULT: Self = Self {
        width: 450,
        height: 600,
    };

    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Falls back to the default hint when either side is zero
    #[must_use]
    pub fn or_default(self) -> Self {
        if self.width == 0 || self.height == 0 {
            Self::DEFAULT
        } else {
            self
        }
    }

    fn aspect_ratio(self) -> f64 {
        let base = self.or_default();
        f64::from(base.height) / f64::from(base.width)
    }
}

impl Default for BaseSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Derived book geometry; recomputed on every resize, never mutated in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub is_single: bool,
    pub is_mobile: bool,
    pub is_tablet: bool,
    pub page_width: u32,
    pub page_height: u32,
    pub book_width: u32,
    pub book_height: u32,
}

impl Dimensions {
    /// True when the book frame needs to be re-laid out to go from `self` to `other`
    #[must_use]
    pub fn book_differs(&self, other: &Dimensions) -> bool {
        self.book_width != other.book_width
            || self.book_height != other.book_height
            || self.is_single != other.is_single
    }

    /// Horizontal offset applied to the whole book so a lone cover page
    /// sits centered against the gutter. Zero in single-page mode.
    #[must_use]
    pub fn cover_shift(&self, showing_cover: bool) -> i32 {
        if self.is_single || !showing_cover {
            0
        } else {
            -((f64::from(self.page_width) / 2.0).round() as i32)
        }
    }

    /// Thumbnail tile height for a tile `thumb_width` pixels wide
    #[must_use]
    pub fn thumbnail_height(&self, thumb_width: u32) -> u32 {
        let ratio = f64::from(self.page_height) / f64::from(self.page_width.max(1));
        ((f64::from(thumb_width) * ratio).round() as u32).max(1)
    }
}

/// Compute dimensions with the default breakpoints
#[must_use]
pub fn compute_dimensions(
    viewport_width: u32,
    viewport_height: u32,
    container_width: u32,
    base_width: u32,
    base_height: u32,
) -> Dimensions {
    compute_dimensions_with(
        &Breakpoints::default(),
        Viewport::new(viewport_width, viewport_height).with_container(container_width),
        BaseSize::new(base_width, base_height),
    )
}

/// Compute dimensions for a viewport using the given breakpoints
#[must_use]
pub fn compute_dimensions_with(
    breakpoints: &Breakpoints,
    viewport: Viewport,
    base: BaseSize,
) -> Dimensions {
    let base = base.or_default();
    let window_width = viewport.width;
    let container_width = if viewport.container_width == 0 {
        window_width
    } else {
        viewport.container_width
    };

    let is_mobile = window_width <= breakpoints.mobile;
    let is_tablet = window_width > breakpoints.mobile && window_width <= breakpoints.tablet;
    let is_single = window_width <= breakpoints.tablet;

    let aspect = base.aspect_ratio();

    let (page_width, page_height) = if is_single {
        let side_pad = if is_mobile {
            MOBILE_SIDE_PAD
        } else {
            TABLET_SIDE_PAD
        };
        let usable = container_width.min(window_width).saturating_sub(side_pad * 2);
        let width = usable.max(MIN_PAGE_WIDTH);
        cap_height(width, aspect, viewport.height, SINGLE_HEIGHT_CAP)
    } else {
        let available = container_width
            .saturating_sub(SPREAD_SIDE_RESERVE)
            .min(base.width.saturating_mul(2));
        let width = (available / 2).min(base.width).max(MIN_PAGE_WIDTH);
        cap_height(width, aspect, viewport.height, SPREAD_HEIGHT_CAP)
    };

    Dimensions {
        is_single,
        is_mobile,
        is_tablet,
        page_width,
        page_height,
        book_width: if is_single {
            page_width
        } else {
            page_width.saturating_mul(2)
        },
        book_height: page_height,
    }
}

/// Derive the height from the width, then shrink both if the page would
/// run past `fraction` of the viewport height.
fn cap_height(width: u32, aspect: f64, viewport_height: u32, fraction: f64) -> (u32, u32) {
    let height = (f64::from(width) * aspect).round() as u32;
    let max_height = ((f64::from(viewport_height) * fraction).floor() as u32).max(1);

    if height <= max_height {
        return (width, height.max(1));
    }

    let capped_width = (f64::from(max_height) / aspect).round() as u32;
    (capped_width.max(MIN_PAGE_WIDTH), max_height)
}
