//! Page-corner fold hint shown while the pointer nears a bottom corner

use super::flipbook::Corner;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HintAction {
    Open(Corner),
    Close,
}

#[derive(Debug)]
pub struct CornerHint {
    zone: f32,
    active: Option<Corner>,
}

impl CornerHint {
    #[must_use]
    pub fn new(zone: f32) -> Self {
        Self { zone, active: None }
    }

    #[must_use]
    pub fn active(&self) -> Option<Corner> {
        self.active
    }

    /// Pointer at (`x`, `y`) inside a book of `width` x `height`
    pub fn pointer_moved(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        zoomed: bool,
    ) -> Option<HintAction> {
        if zoomed {
            return self.close();
        }

        let near_bottom = y > height - self.zone;
        let corner = if near_bottom && x > width - self.zone {
            Some(Corner::BottomRight)
        } else if near_bottom && x < self.zone {
            Some(Corner::BottomLeft)
        } else {
            None
        };

        match corner {
            Some(corner) if self.active != Some(corner) => {
                self.active = Some(corner);
                Some(HintAction::Open(corner))
            }
            Some(_) => None,
            None => self.close(),
        }
    }

    pub fn pointer_left(&mut self) -> Option<HintAction> {
        self.close()
    }

    fn close(&mut self) -> Option<HintAction> {
        self.active.take().map(|_| HintAction::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_once_per_corner_and_closes_on_exit() {
        let mut hint = CornerHint::new(80.0);

        assert_eq!(
            hint.pointer_moved(880.0, 590.0, 900.0, 600.0, false),
            Some(HintAction::Open(Corner::BottomRight))
        );
        assert_eq!(hint.pointer_moved(870.0, 580.0, 900.0, 600.0, false), None);
        assert_eq!(
            hint.pointer_moved(10.0, 590.0, 900.0, 600.0, false),
            Some(HintAction::Open(Corner::BottomLeft))
        );
        assert_eq!(
            hint.pointer_moved(450.0, 300.0, 900.0, 600.0, false),
            Some(HintAction::Close)
        );
        assert_eq!(hint.pointer_moved(450.0, 300.0, 900.0, 600.0, false), None);
    }

    #[test]
    fn zoom_suppresses_hint() {
        let mut hint = CornerHint::new(80.0);
        hint.pointer_moved(880.0, 590.0, 900.0, 600.0, false);
        assert_eq!(
            hint.pointer_moved(880.0, 590.0, 900.0, 600.0, true),
            Some(HintAction::Close)
        );
        assert_eq!(hint.pointer_moved(880.0, 590.0, 900.0, 600.0, true), None);
        assert_eq!(hint.pointer_left(), None);
    }
}
