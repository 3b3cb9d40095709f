//! Viewer state machine

use std::ops::RangeInclusive;
use std::sync::Arc;

use log::debug;
use serde::Serialize;

use super::events::ViewerEvent;
use super::flipbook::WidgetState;
use crate::annotations::AnnotationOverlay;
use crate::layout::Dimensions;
use crate::pdf::{EncodedImage, RenderFault};

/// Load progress of one page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
    Error,
}

#[derive(Clone, Debug)]
pub struct PageEntry {
    pub state: LoadState,
    pub image: Option<Arc<EncodedImage>>,
    pub overlay: Option<AnnotationOverlay>,
}

impl PageEntry {
    fn placeholder() -> Self {
        Self {
            state: LoadState::NotLoaded,
            image: None,
            overlay: None,
        }
    }
}

/// Pages rendered around the current index after every settled flip
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LazyWindow {
    pub behind: usize,
    pub ahead: usize,
}

impl Default for LazyWindow {
    fn default() -> Self {
        Self {
            behind: 2,
            ahead: 4,
        }
    }
}

impl LazyWindow {
    /// Window around `index`, clipped to the document
    #[must_use]
    pub fn around(&self, index: usize, page_count: usize) -> RangeInclusive<usize> {
        let start = index.saturating_sub(self.behind);
        let end = (index + self.ahead).min(page_count.saturating_sub(1));
        start..=end
    }
}

/// Current state of one viewer
#[derive(Clone, Debug)]
pub struct ViewerState {
    pub page_count: usize,

    /// Page index shown by the widget (0-indexed)
    pub current: usize,

    pub dimensions: Dimensions,
    pub pages: Vec<PageEntry>,

    /// Horizontal shift applied to the book while the cover is shown
    pub cover_shift: i32,

    pub widget_state: WidgetState,

    /// Mirrors the zoom overlay; flips are refused while set
    pub zoomed: bool,

    window: LazyWindow,
}

impl ViewerState {
    /// Build the state from the outcome of the initial renders, one result
    /// per leading page. Failed pages stay placeholders.
    #[must_use]
    pub fn new(
        page_count: usize,
        dimensions: Dimensions,
        window: LazyWindow,
        initial: Vec<Result<Arc<EncodedImage>, RenderFault>>,
    ) -> Self {
        let mut pages = vec![PageEntry::placeholder(); page_count];
        for (entry, result) in pages.iter_mut().zip(initial) {
            if let Ok(image) = result {
                entry.state = LoadState::Loaded;
                entry.image = Some(image);
            }
        }

        Self {
            page_count,
            current: 0,
            cover_shift: dimensions.cover_shift(true),
            dimensions,
            pages,
            widget_state: WidgetState::Idle,
            zoomed: false,
            window,
        }
    }

    /// Effects that bring a freshly built viewer on screen
    #[must_use]
    pub fn initial_effects(&self) -> Vec<Effect> {
        let mut effects = vec![Effect::SyncToolbar];
        effects.extend(
            self.pages
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.state == LoadState::Loaded)
                .map(|(index, _)| Effect::FetchAnnotations(index)),
        );
        effects
    }

    /// Index a flip to `target` actually lands on: clamped to the document
    /// and, for spreads, snapped to the even page of its pair
    #[must_use]
    pub fn canonical_index(&self, target: usize) -> usize {
        let index = target.min(self.page_count.saturating_sub(1));
        if !self.dimensions.is_single && index > 0 && index % 2 == 1 {
            index - 1
        } else {
            index
        }
    }

    #[must_use]
    pub fn last_index(&self) -> usize {
        self.canonical_index(self.page_count.saturating_sub(1))
    }

    #[must_use]
    pub fn at_first(&self) -> bool {
        self.current == 0
    }

    #[must_use]
    pub fn at_last(&self) -> bool {
        self.current >= self.last_index()
    }

    #[must_use]
    pub fn page(&self, index: usize) -> Option<&PageEntry> {
        self.pages.get(index)
    }

    /// Apply a command and return resulting effects
    ///
    /// A resize that keeps the book size produces no effects, so zoom and
    /// pan survive it; only an applied geometry change resets zoom.
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Flip(target) => {
                if self.zoomed {
                    return vec![Effect::ResetZoom];
                }
                let target = self.canonical_index(target);
                if target == self.current {
                    vec![]
                } else {
                    vec![Effect::FlipWidget(target)]
                }
            }

            Command::FlipNext => {
                if self.zoomed {
                    vec![Effect::ResetZoom]
                } else if self.at_last() {
                    vec![]
                } else {
                    vec![Effect::FlipWidgetNext]
                }
            }

            Command::FlipPrev => {
                if self.zoomed {
                    vec![Effect::ResetZoom]
                } else if self.at_first() {
                    vec![]
                } else {
                    vec![Effect::FlipWidgetPrev]
                }
            }

            Command::GoToPage(display) => {
                let clamped = display.clamp(1, self.page_count.max(1) as i64);
                self.apply(Command::Flip(clamped as usize - 1))
            }

            Command::WidgetInitialized => vec![Effect::Notify(ViewerEvent::Init)],

            Command::WidgetStateChanged(state) => {
                self.widget_state = state;
                let mut effects = vec![];
                if state == WidgetState::Flipping && self.zoomed {
                    effects.push(Effect::ResetZoom);
                }
                effects.push(Effect::SyncToolbar);
                effects.push(Effect::Notify(ViewerEvent::ChangeState(state)));
                effects
            }

            Command::WidgetFlipped(index) => {
                let index = index.min(self.page_count.saturating_sub(1));
                self.current = index;
                self.cover_shift = self.dimensions.cover_shift(index == 0);

                let mut effects = vec![
                    Effect::SyncToolbar,
                    Effect::Notify(ViewerEvent::Flip(index)),
                ];
                effects.extend(self.schedule_window(index));
                effects
            }

            Command::PageRendered { page, image } => {
                let Some(entry) = self.pages.get_mut(page) else {
                    return vec![];
                };
                if entry.state == LoadState::Loaded {
                    return vec![];
                }
                entry.state = LoadState::Loaded;
                entry.image = Some(image);
                vec![
                    Effect::FetchAnnotations(page),
                    Effect::Notify(ViewerEvent::PageLoaded(page)),
                ]
            }

            Command::PageFailed(page) => {
                let Some(entry) = self.pages.get_mut(page) else {
                    return vec![];
                };
                if entry.state == LoadState::Loaded {
                    return vec![];
                }
                entry.state = LoadState::Error;
                vec![Effect::Notify(ViewerEvent::PageFailed(page))]
            }

            Command::OverlayReady { page, overlay } => {
                if let Some(entry) = self.pages.get_mut(page) {
                    entry.overlay = overlay;
                }
                vec![]
            }

            Command::Resized(dimensions) => {
                if dimensions.book_differs(&self.dimensions) {
                    vec![Effect::UpdateGeometry(dimensions)]
                } else {
                    vec![]
                }
            }

            Command::GeometryApplied(dimensions) => {
                self.dimensions = dimensions;
                let current = self.canonical_index(self.current);
                self.cover_shift = dimensions.cover_shift(current == 0);
                vec![
                    Effect::Reflow(current),
                    Effect::ResetZoom,
                    Effect::SyncToolbar,
                    Effect::Notify(ViewerEvent::Resize(dimensions)),
                ]
            }

            Command::ZoomChanged(zoomed) => {
                self.zoomed = zoomed;
                vec![]
            }
        }
    }

    /// Move every untouched page in the window around `index` to loading
    fn schedule_window(&mut self, index: usize) -> Vec<Effect> {
        let mut effects = vec![];
        for page in self.window.around(index, self.page_count) {
            if let Some(entry) = self.pages.get_mut(page) {
                if entry.state == LoadState::NotLoaded {
                    entry.state = LoadState::Loading;
                    effects.push(Effect::Render(page));
                }
            }
        }
        if !effects.is_empty() {
            debug!("Lazy window around {index} scheduled {} renders", effects.len());
        }
        effects
    }
}

/// Commands that modify viewer state
#[derive(Debug)]
pub enum Command {
    /// Flip to a page index
    Flip(usize),
    FlipNext,
    FlipPrev,

    /// Flip to a 1-based page number as typed by the user
    GoToPage(i64),

    WidgetInitialized,
    WidgetStateChanged(WidgetState),

    /// The widget settled on this index
    WidgetFlipped(usize),

    PageRendered {
        page: usize,
        image: Arc<EncodedImage>,
    },
    PageFailed(usize),

    /// `None` clears the overlay of a page without links
    OverlayReady {
        page: usize,
        overlay: Option<AnnotationOverlay>,
    },

    /// New layout computed after a (debounced) resize
    Resized(Dimensions),

    /// The widget accepted the new geometry
    GeometryApplied(Dimensions),

    ZoomChanged(bool),
}

/// Side effects produced by state changes
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FlipWidget(usize),
    FlipWidgetNext,
    FlipWidgetPrev,

    /// Re-apply the page after a geometry change so the widget redraws
    Reflow(usize),

    ResetZoom,

    /// Render a page at full quality with the current dimensions
    Render(usize),
    FetchAnnotations(usize),

    UpdateGeometry(Dimensions),
    SyncToolbar,
    Notify(ViewerEvent),
}
