//! Pointer, touch and keyboard input recognition
//!
//! The recognizers here only classify raw input; the viewer decides what a
//! recognized gesture does (and whether it is enabled in the current mode).

use std::time::{Duration, Instant};

use serde::Serialize;

/// Position relative to the top-left corner of the zoomable book area
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Enter,
    Other,
}

/// Relative page move requested by a gesture or key
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

impl Key {
    /// Page move bound to this key, if any
    #[must_use]
    pub fn direction(self) -> Option<Direction> {
        match self {
            Key::ArrowLeft => Some(Direction::Prev),
            Key::ArrowRight => Some(Direction::Next),
            _ => None,
        }
    }
}

/// Recognizes two single-finger taps ending within `window` of each other
#[derive(Debug)]
pub struct DoubleTapDetector {
    window: Duration,
    last_tap: Option<Instant>,
}

impl DoubleTapDetector {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_tap: None,
        }
    }

    /// Register a tap; returns true when it completes a double tap
    pub fn tap(&mut self, now: Instant) -> bool {
        let double = self
            .last_tap
            .is_some_and(|last| now.saturating_duration_since(last) < self.window);
        self.last_tap = Some(now);
        double
    }
}

/// Recognizes a horizontal swipe from touch start to touch end
#[derive(Debug)]
pub struct SwipeTracker {
    threshold: f32,
    start: Option<Point>,
}

impl SwipeTracker {
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            start: None,
        }
    }

    pub fn begin(&mut self, at: Point) {
        self.start = Some(at);
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }

    /// Finish the touch. A swipe needs more horizontal than vertical travel
    /// and more than `threshold` pixels of it; leftward travel means next.
    pub fn finish(&mut self, at: Point) -> Option<Direction> {
        let start = self.start.take()?;
        let dx = at.x - start.x;
        let dy = at.y - start.y;
        if dx.abs() <= self.threshold || dx.abs() <= dy.abs() {
            return None;
        }
        Some(if dx < 0.0 {
            Direction::Next
        } else {
            Direction::Prev
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_tap_within_window() {
        let mut detector = DoubleTapDetector::new(Duration::from_millis(300));
        let t0 = Instant::now();

        assert!(!detector.tap(t0));
        assert!(detector.tap(t0 + Duration::from_millis(200)));
        // Third tap pairs with the second one
        assert!(detector.tap(t0 + Duration::from_millis(350)));
        assert!(!detector.tap(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn swipe_needs_distance_and_horizontal_bias() {
        let mut swipe = SwipeTracker::new(50.0);

        swipe.begin(Point::new(200.0, 100.0));
        assert_eq!(swipe.finish(Point::new(120.0, 110.0)), Some(Direction::Next));

        swipe.begin(Point::new(100.0, 100.0));
        assert_eq!(swipe.finish(Point::new(180.0, 90.0)), Some(Direction::Prev));

        swipe.begin(Point::new(100.0, 100.0));
        assert_eq!(swipe.finish(Point::new(140.0, 100.0)), None);

        swipe.begin(Point::new(100.0, 100.0));
        assert_eq!(swipe.finish(Point::new(170.0, 200.0)), None);

        // No start recorded
        assert_eq!(swipe.finish(Point::new(0.0, 0.0)), None);
    }

    #[test]
    fn arrow_keys_map_to_directions() {
        assert_eq!(Key::ArrowLeft.direction(), Some(Direction::Prev));
        assert_eq!(Key::ArrowRight.direction(), Some(Direction::Next));
        assert_eq!(Key::Enter.direction(), None);
    }
}
