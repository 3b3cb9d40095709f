//! Zoom and pan overlay for the book area
//!
//! The overlay transform is `scale(s) translate(tx, ty)` with the origin at
//! the centre of the book area. Translation is expressed in unscaled pixels,
//! so keeping the content inside the area bounds means
//! `|t| <= size * (s - 1) / (2 * s)` on each axis.

use serde::Serialize;

use crate::input::Point;
use crate::settings::ViewerConfig;

/// Current overlay transform
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ZoomState {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl ZoomState {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    #[must_use]
    pub fn is_zoomed(&self) -> bool {
        self.scale > 1.0
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Scale limits and the fixed steps the gestures use
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomBounds {
    pub min: f32,
    pub max: f32,
    /// Scale applied by toggles (button, double-click, double-tap, wheel)
    pub toggle: f32,
    /// Pinch at or below this scale resets to identity
    pub pinch_reset: f32,
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self::from(&ViewerConfig::default())
    }
}

impl From<&ViewerConfig> for ZoomBounds {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            min: config.min_zoom,
            max: config.max_zoom,
            toggle: config.zoom_scale,
            pinch_reset: config.pinch_reset_threshold,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PinchStart {
    distance: f32,
    scale: f32,
    midpoint: Point,
}

#[derive(Clone, Copy, Debug)]
struct DragStart {
    pointer: Point,
    translate_x: f32,
    translate_y: f32,
}

/// Owns the zoom state of one viewer and applies gestures to it.
///
/// Every mutating method returns `true` when the visible transform changed.
#[derive(Debug)]
pub struct ZoomController {
    state: ZoomState,
    bounds: ZoomBounds,
    width: f32,
    height: f32,
    pinch: Option<PinchStart>,
    drag: Option<DragStart>,
}

impl ZoomController {
    #[must_use]
    pub fn new(bounds: ZoomBounds, width: f32, height: f32) -> Self {
        Self {
            state: ZoomState::IDENTITY,
            bounds,
            width,
            height,
            pinch: None,
            drag: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ZoomState {
        self.state
    }

    #[must_use]
    pub fn is_zoomed(&self) -> bool {
        self.state.is_zoomed()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Size of the zoomable area; does not touch the current transform
    pub fn set_area(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Back to 1x with no pan; also abandons any gesture in progress
    pub fn reset(&mut self) -> bool {
        self.pinch = None;
        self.drag = None;
        let changed = self.state != ZoomState::IDENTITY;
        self.state = ZoomState::IDENTITY;
        changed
    }

    /// Keep the pan inside the content bounds at `scale`
    #[must_use]
    pub fn clamp_pan(&self, tx: f32, ty: f32, scale: f32) -> (f32, f32) {
        let max_x = max_offset(self.width, scale);
        let max_y = max_offset(self.height, scale);
        (tx.clamp(-max_x, max_x), ty.clamp(-max_y, max_y))
    }

    /// Zoom to the toggle scale keeping `anchor` visually fixed, or reset if
    /// already zoomed. Returns whether the overlay is zoomed afterwards.
    pub fn toggle_at(&mut self, anchor: Point) -> bool {
        if self.is_zoomed() {
            self.reset();
            return false;
        }
        self.zoom_to(self.bounds.toggle, anchor);
        self.is_zoomed()
    }

    /// Toggle anchored at the centre of the area (the toolbar button)
    pub fn toggle_centered(&mut self) -> bool {
        self.toggle_at(Point::new(self.width / 2.0, self.height / 2.0))
    }

    /// Wheel up from 1x zooms in at the pointer; wheel down while zoomed resets
    pub fn wheel(&mut self, delta_y: f32, at: Point) -> bool {
        if delta_y < 0.0 && !self.is_zoomed() {
            self.toggle_at(at);
            true
        } else if delta_y > 0.0 && self.is_zoomed() {
            self.reset()
        } else {
            false
        }
    }

    pub fn begin_pinch(&mut self, a: Point, b: Point) {
        self.drag = None;
        self.pinch = Some(PinchStart {
            distance: a.distance(b),
            scale: self.state.scale,
            midpoint: a.midpoint(b),
        });
    }

    /// Scale relative to the pinch start, anchored at the starting midpoint
    pub fn update_pinch(&mut self, a: Point, b: Point) -> bool {
        let Some(start) = self.pinch else {
            return false;
        };
        if start.distance <= f32::EPSILON {
            return false;
        }

        let scale = (start.scale * (a.distance(b) / start.distance))
            .clamp(self.bounds.min, self.bounds.max);
        if scale <= self.bounds.pinch_reset {
            let changed = self.state != ZoomState::IDENTITY;
            self.state = ZoomState::IDENTITY;
            return changed;
        }

        let before = self.state;
        self.zoom_to(scale, start.midpoint);
        self.state != before
    }

    pub fn end_pinch(&mut self) {
        self.pinch = None;
    }

    #[must_use]
    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    /// Start panning; ignored at 1x
    pub fn begin_drag(&mut self, at: Point) -> bool {
        if !self.is_zoomed() {
            return false;
        }
        self.drag = Some(DragStart {
            pointer: at,
            translate_x: self.state.translate_x,
            translate_y: self.state.translate_y,
        });
        true
    }

    pub fn drag_to(&mut self, at: Point) -> bool {
        let Some(start) = self.drag else {
            return false;
        };
        if !self.is_zoomed() {
            self.drag = None;
            return false;
        }

        let scale = self.state.scale;
        let dx = (at.x - start.pointer.x) / scale;
        let dy = (at.y - start.pointer.y) / scale;
        let (tx, ty) = self.clamp_pan(start.translate_x + dx, start.translate_y + dy, scale);

        let before = self.state;
        self.state.translate_x = tx;
        self.state.translate_y = ty;
        self.state != before
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    fn zoom_to(&mut self, scale: f32, anchor: Point) {
        let scale = scale.clamp(self.bounds.min, self.bounds.max);
        let tx = -(anchor.x - self.width / 2.0) / scale;
        let ty = -(anchor.y - self.height / 2.0) / scale;
        let (tx, ty) = self.clamp_pan(tx, ty, scale);
        self.state = ZoomState {
            scale,
            translate_x: tx,
            translate_y: ty,
        };
    }
}

fn max_offset(size: f32, scale: f32) -> f32 {
    if scale <= 1.0 {
        0.0
    } else {
        size * (scale - 1.0) / (2.0 * scale)
    }
}
