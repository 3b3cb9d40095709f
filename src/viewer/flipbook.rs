//! Page-flip widget seam and an in-process model of the widget

use serde::Serialize;

use crate::layout::Dimensions;

/// Construction geometry and behaviour of the flip-book widget
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WidgetOptions {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub fixed_size: bool,
    pub auto_size: bool,
    pub draw_shadow: bool,
    pub max_shadow_opacity: f32,
    pub flipping_time_ms: u64,
    pub use_portrait: bool,
    pub start_page: usize,
    pub show_cover: bool,
    pub mobile_scroll_support: bool,
    pub disable_flip_by_click: bool,
    pub click_event_forward: bool,
    pub use_mouse_events: bool,
    pub show_page_corners: bool,
    pub show_navigation: bool,
}

impl WidgetOptions {
    #[must_use]
    pub fn for_dimensions(dims: &Dimensions) -> Self {
        Self {
            width: dims.page_width,
            height: dims.page_height,
            min_width: dims.page_width,
            max_width: dims.page_width,
            min_height: dims.page_height,
            max_height: dims.page_height,
            fixed_size: true,
            auto_size: false,
            draw_shadow: !dims.is_mobile,
            max_shadow_opacity: 0.4,
            flipping_time_ms: if dims.is_mobile { 350 } else { 600 },
            use_portrait: dims.is_single,
            start_page: 0,
            show_cover: true,
            mobile_scroll_support: false,
            disable_flip_by_click: true,
            click_event_forward: false,
            use_mouse_events: !dims.is_single,
            show_page_corners: false,
            show_navigation: false,
        }
    }
}

/// The only geometry the widget accepts after construction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometryUpdate {
    pub width: u32,
    pub height: u32,
    pub use_portrait: bool,
}

impl From<&Dimensions> for GeometryUpdate {
    fn from(dims: &Dimensions) -> Self {
        Self {
            width: dims.page_width,
            height: dims.page_height,
            use_portrait: dims.is_single,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetState {
    Idle,
    Read,
    Flipping,
    FoldCorner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    BottomLeft,
    BottomRight,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WidgetEvent {
    Init { page: usize },
    ChangeState(WidgetState),
    /// A flip settled on this page index
    Flip(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    #[error("invalid page geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("no pages to display")]
    NoPages,

    #[error("widget is not initialized")]
    NotInitialized,
}

/// Contract of the page-flip widget.
///
/// Events are queued by the widget and drained by the owner with
/// [`PageFlip::take_events`]; nothing calls back into the owner.
pub trait PageFlip {
    fn construct(options: WidgetOptions) -> Result<Self, WidgetError>
    where
        Self: Sized;

    /// Bind `count` page elements; emits `Init`
    fn load_pages(&mut self, count: usize) -> Result<(), WidgetError>;

    fn flip(&mut self, index: usize);
    fn flip_next(&mut self);
    fn flip_prev(&mut self);

    fn flip_corner(&mut self, corner: Corner);
    fn close_corner(&mut self);

    /// Change page size and orientation in place
    fn update(&mut self, geometry: GeometryUpdate) -> Result<(), WidgetError>;

    fn current_page_index(&self) -> usize;

    fn take_events(&mut self) -> Vec<WidgetEvent>;
}

/// Widget model without rendering: portrait shows one page per step,
/// landscape shows spreads anchored at even indices.
#[derive(Debug)]
pub struct HeadlessFlipBook {
    options: WidgetOptions,
    page_count: usize,
    current: usize,
    state: WidgetState,
    events: Vec<WidgetEvent>,
}

impl HeadlessFlipBook {
    #[must_use]
    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    #[must_use]
    pub fn state(&self) -> WidgetState {
        self.state
    }

    fn landscape(&self) -> bool {
        !self.options.use_portrait
    }

    fn snap(&self, index: usize) -> usize {
        let index = index.min(self.page_count.saturating_sub(1));
        if self.landscape() && index % 2 == 1 {
            index - 1
        } else {
            index
        }
    }

    fn step(&self) -> usize {
        if self.landscape() { 2 } else { 1 }
    }

    fn go_to(&mut self, target: usize) {
        if self.page_count == 0 {
            return;
        }
        let target = self.snap(target);
        if target == self.current {
            return;
        }
        self.current = target;
        self.events.push(WidgetEvent::ChangeState(WidgetState::Flipping));
        self.events.push(WidgetEvent::Flip(target));
        self.events.push(WidgetEvent::ChangeState(WidgetState::Read));
        self.state = WidgetState::Read;
    }
}

impl PageFlip for HeadlessFlipBook {
    fn construct(options: WidgetOptions) -> Result<Self, WidgetError> {
        if options.width == 0 || options.height == 0 {
            return Err(WidgetError::InvalidGeometry {
                width: options.width,
                height: options.height,
            });
        }
        Ok(Self {
            current: options.start_page,
            options,
            page_count: 0,
            state: WidgetState::Idle,
            events: Vec::new(),
        })
    }

    fn load_pages(&mut self, count: usize) -> Result<(), WidgetError> {
        if count == 0 {
            return Err(WidgetError::NoPages);
        }
        self.page_count = count;
        self.current = self.snap(self.current);
        self.state = WidgetState::Read;
        self.events.push(WidgetEvent::Init {
            page: self.current,
        });
        Ok(())
    }

    fn flip(&mut self, index: usize) {
        self.go_to(index);
    }

    fn flip_next(&mut self) {
        let target = self.current + self.step();
        if target < self.page_count {
            self.go_to(target);
        }
    }

    fn flip_prev(&mut self) {
        if self.current > 0 {
            self.go_to(self.current.saturating_sub(self.step()));
        }
    }

    fn flip_corner(&mut self, _corner: Corner) {
        if self.state != WidgetState::FoldCorner {
            self.state = WidgetState::FoldCorner;
            self.events
                .push(WidgetEvent::ChangeState(WidgetState::FoldCorner));
        }
    }

    fn close_corner(&mut self) {
        if self.state == WidgetState::FoldCorner {
            self.state = WidgetState::Read;
            self.events.push(WidgetEvent::ChangeState(WidgetState::Read));
        }
    }

    fn update(&mut self, geometry: GeometryUpdate) -> Result<(), WidgetError> {
        if self.page_count == 0 {
            return Err(WidgetError::NotInitialized);
        }
        if geometry.width == 0 || geometry.height == 0 {
            return Err(WidgetError::InvalidGeometry {
                width: geometry.width,
                height: geometry.height,
            });
        }
        self.options.width = geometry.width;
        self.options.height = geometry.height;
        self.options.min_width = geometry.width;
        self.options.max_width = geometry.width;
        self.options.min_height = geometry.height;
        self.options.max_height = geometry.height;
        self.options.use_portrait = geometry.use_portrait;

        let snapped = self.snap(self.current);
        if snapped != self.current {
            self.current = snapped;
            self.events.push(WidgetEvent::Flip(snapped));
        }
        Ok(())
    }

    fn current_page_index(&self) -> usize {
        self.current
    }

    fn take_events(&mut self) -> Vec<WidgetEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_dimensions;

    fn book(width: u32, pages: usize) -> HeadlessFlipBook {
        let dims = compute_dimensions(width, 800, width, 450, 600);
        let mut book = HeadlessFlipBook::construct(WidgetOptions::for_dimensions(&dims)).unwrap();
        book.load_pages(pages).unwrap();
        book
    }

    #[test]
    fn options_follow_device_class() {
        let mobile = compute_dimensions(400, 900, 400, 450, 600);
        let options = WidgetOptions::for_dimensions(&mobile);
        assert_eq!(options.flipping_time_ms, 350);
        assert!(!options.draw_shadow);
        assert!(options.use_portrait);
        assert!(!options.use_mouse_events);

        let desktop = compute_dimensions(1200, 800, 1200, 450, 600);
        let options = WidgetOptions::for_dimensions(&desktop);
        assert_eq!(options.flipping_time_ms, 600);
        assert!(options.draw_shadow);
        assert!(!options.use_portrait);
        assert_eq!(options.min_width, options.max_width);
    }

    #[test]
    fn landscape_steps_by_spread() {
        let mut book = book(1200, 10);
        assert_eq!(
            book.take_events(),
            vec![WidgetEvent::Init { page: 0 }]
        );

        book.flip_next();
        assert_eq!(book.current_page_index(), 2);
        book.flip(7);
        assert_eq!(book.current_page_index(), 6);
        book.flip(99);
        assert_eq!(book.current_page_index(), 8);
        book.flip_next();
        assert_eq!(book.current_page_index(), 8);
    }

    #[test]
    fn portrait_steps_by_page() {
        let mut book = book(400, 3);
        book.flip_next();
        book.flip_next();
        book.flip_next();
        assert_eq!(book.current_page_index(), 2);
        book.flip_prev();
        assert_eq!(book.current_page_index(), 1);
    }

    #[test]
    fn flip_emits_state_and_flip_events() {
        let mut book = book(1200, 10);
        book.take_events();
        book.flip(4);
        assert_eq!(
            book.take_events(),
            vec![
                WidgetEvent::ChangeState(WidgetState::Flipping),
                WidgetEvent::Flip(4),
                WidgetEvent::ChangeState(WidgetState::Read),
            ]
        );
        book.flip(4);
        assert!(book.take_events().is_empty());
    }

    #[test]
    fn update_to_landscape_resnaps_odd_page() {
        let mut book = book(400, 10);
        book.flip(3);
        book.take_events();

        book.update(GeometryUpdate {
            width: 450,
            height: 600,
            use_portrait: false,
        })
        .unwrap();
        assert_eq!(book.current_page_index(), 2);
        assert_eq!(book.take_events(), vec![WidgetEvent::Flip(2)]);
    }

    #[test]
    fn zero_geometry_is_rejected() {
        let mut options = WidgetOptions::for_dimensions(&compute_dimensions(1200, 800, 1200, 450, 600));
        options.width = 0;
        assert!(matches!(
            HeadlessFlipBook::construct(options),
            Err(WidgetError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn corner_hint_folds_and_closes() {
        let mut book = book(1200, 4);
        book.take_events();
        book.flip_corner(Corner::BottomRight);
        book.flip_corner(Corner::BottomLeft);
        assert_eq!(book.state(), WidgetState::FoldCorner);
        book.close_corner();
        assert_eq!(book.state(), WidgetState::Read);
        assert_eq!(book.take_events().len(), 2);
    }
}
