//! Flip-book viewer: owns the widget, the render service and every controller
//!
//! All state is mutated on the thread that owns the [`Viewer`]. Render work
//! runs on the service's workers; its results are applied by [`Viewer::tick`]
//! or [`Viewer::settle`].

mod corner_hint;
mod events;
mod flipbook;
mod ready;
mod resize;
mod state;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde::Serialize;

pub use corner_hint::{CornerHint, HintAction};
pub use events::{EventBus, SubscriptionId, ViewerEvent};
pub use flipbook::{
    Corner, GeometryUpdate, HeadlessFlipBook, PageFlip, WidgetError, WidgetEvent, WidgetOptions,
    WidgetState,
};
pub use ready::{ReadyHandle, ReadySignal};
pub use resize::ResizeDebouncer;
pub use state::{Command, Effect, LazyWindow, LoadState, PageEntry, ViewerState};

use crate::annotations::LinkRegion;
use crate::error::ViewerError;
use crate::input::{Direction, DoubleTapDetector, Key, Point, SwipeTracker};
use crate::layout::{BaseSize, Dimensions, Viewport, compute_dimensions_with};
use crate::pdf::{
    DocumentSource, OpenError, OpenErrorKind, OpenOptions, PdfBackend, RenderKind, RenderParams,
    RenderResponse, RenderService,
};
use crate::settings::ViewerConfig;
use crate::thumbnails::ThumbnailPanel;
use crate::toolbar::{BlurOutcome, ContainerStyle, FullscreenHost, ToolbarState};
use crate::zoom::{ZoomBounds, ZoomController, ZoomState};

/// Viewer driven by the in-process widget model
pub type HeadlessViewer = Viewer<HeadlessFlipBook>;

pub struct Viewer<W: PageFlip> {
    config: ViewerConfig,
    base: BaseSize,
    viewport: Viewport,
    state: ViewerState,
    widget: W,
    service: RenderService,
    zoom: ZoomController,
    toolbar: ToolbarState,
    thumbnails: ThumbnailPanel,
    events: EventBus,
    resize: ResizeDebouncer,
    corner: CornerHint,
    double_tap: DoubleTapDetector,
    swipe: SwipeTracker,
    container_style: ContainerStyle,
}

impl<W: PageFlip> Viewer<W> {
    /// Open `source` and build the book.
    ///
    /// Waits for `ready`, opens the document, renders the leading pages
    /// (join-all, partial failures tolerated) and constructs the widget.
    pub fn open(
        backend: Arc<dyn PdfBackend>,
        source: DocumentSource,
        base: BaseSize,
        viewport: Viewport,
        config: ViewerConfig,
        ready: ReadySignal,
    ) -> Result<Self, ViewerError> {
        Self::open_with_events(
            backend,
            source,
            base,
            viewport,
            config,
            ready,
            EventBus::new(),
        )
    }

    /// Like [`Viewer::open`], with subscribers attached before the widget
    /// initializes so they also see [`ViewerEvent::Init`]
    pub fn open_with_events(
        backend: Arc<dyn PdfBackend>,
        source: DocumentSource,
        base: BaseSize,
        viewport: Viewport,
        config: ViewerConfig,
        ready: ReadySignal,
        events: EventBus,
    ) -> Result<Self, ViewerError> {
        ready.wait(config.ready_timeout())?;

        if source.is_empty() {
            error!("No document source given");
            return Err(OpenError::new(OpenErrorKind::Missing, "no source given").into());
        }

        let options = OpenOptions::default();
        let page_count = match backend.open(&source, &options) {
            Ok(doc) => doc.page_count(),
            Err(e) => {
                error!("Failed to open {source}: {e}");
                return Err(e.into());
            }
        };
        if page_count == 0 {
            error!("{source} has no pages");
            return Err(OpenError::new(OpenErrorKind::InvalidFormat, "document has no pages").into());
        }

        let dims = compute_dimensions_with(&config.breakpoints, viewport, base);
        info!(
            "Opened {source}: {page_count} pages, {}x{} per page, {}",
            dims.page_width,
            dims.page_height,
            if dims.is_single { "single" } else { "spread" }
        );

        let mut service = RenderService::spawn(
            backend,
            source,
            options,
            config.workers,
            config.cache_size,
        );

        let leading: Vec<usize> = (0..config.initial_pages.min(page_count)).collect();
        let results = service.render_all(
            &leading,
            RenderParams::new(dims.page_width, dims.page_height, config.initial_quality),
            config.initial_render_timeout(),
        );
        for (page, result) in leading.iter().zip(&results) {
            if let Err(e) = result {
                warn!("Initial render of page {} failed: {e}", page + 1);
            }
        }

        let window = LazyWindow {
            behind: config.lazy_behind,
            ahead: config.lazy_ahead,
        };
        let state = ViewerState::new(page_count, dims, window, results);

        let widget = W::construct(WidgetOptions::for_dimensions(&dims))
            .and_then(|mut widget| {
                widget.load_pages(page_count)?;
                Ok(widget)
            })
            .map_err(|e| {
                error!("Error creating flipbook: {e}");
                ViewerError::from(e)
            })?;

        let thumb_height = dims.thumbnail_height(config.thumbnail_width);
        let mut viewer = Self {
            base,
            viewport,
            widget,
            service,
            zoom: ZoomController::new(
                ZoomBounds::from(&config),
                dims.book_width as f32,
                dims.book_height as f32,
            ),
            toolbar: ToolbarState::new(page_count, dims.is_single),
            thumbnails: ThumbnailPanel::new(page_count, config.thumbnail_width, thumb_height),
            events,
            resize: ResizeDebouncer::new(config.resize_debounce()),
            corner: CornerHint::new(config.corner_zone),
            double_tap: DoubleTapDetector::new(config.double_tap_window()),
            swipe: SwipeTracker::new(config.swipe_distance),
            container_style: ContainerStyle::INLINE,
            state,
            config,
        };

        let mut queue = VecDeque::new();
        for effect in viewer.state.initial_effects() {
            viewer.execute(effect, &mut queue);
        }
        viewer.run(queue);
        Ok(viewer)
    }

    #[must_use]
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.state.dimensions
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn base_size(&self) -> BaseSize {
        self.base
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.current
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.state.page_count
    }

    #[must_use]
    pub fn toolbar(&self) -> &ToolbarState {
        &self.toolbar
    }

    #[must_use]
    pub fn thumbnails(&self) -> &ThumbnailPanel {
        &self.thumbnails
    }

    #[must_use]
    pub fn zoom(&self) -> ZoomState {
        self.zoom.state()
    }

    #[must_use]
    pub fn widget(&self) -> &W {
        &self.widget
    }

    #[must_use]
    pub fn container_style(&self) -> ContainerStyle {
        self.container_style
    }

    /// Render, thumbnail and annotation requests not answered yet
    #[must_use]
    pub fn pending_renders(&self) -> usize {
        self.service.pending_count()
    }

    /// Encoded images memoized by the render workers
    #[must_use]
    pub fn cached_renders(&self) -> usize {
        self.service.cached_images()
    }

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&ViewerEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Navigation

    pub fn flip(&mut self, index: usize) {
        self.dispatch(Command::Flip(index));
    }

    /// Toolbar, side and mobile "next" buttons all land here
    pub fn flip_next(&mut self) {
        self.dispatch(Command::FlipNext);
    }

    pub fn flip_prev(&mut self) {
        self.dispatch(Command::FlipPrev);
    }

    pub fn first(&mut self) {
        self.dispatch(Command::Flip(0));
    }

    pub fn last(&mut self) {
        self.dispatch(Command::Flip(self.state.page_count.saturating_sub(1)));
    }

    /// 1-based page number; clamped to the document
    pub fn go_to_page(&mut self, page: i64) {
        self.dispatch(Command::GoToPage(page));
    }

    fn step(&mut self, direction: Direction) {
        match direction {
            Direction::Prev => self.flip_prev(),
            Direction::Next => self.flip_next(),
        }
    }

    /// Keyboard navigation, spread mode only. Returns true if consumed.
    pub fn key(&mut self, key: Key) -> bool {
        if self.state.dimensions.is_single || self.toolbar.input_focused {
            return false;
        }
        match key.direction() {
            Some(direction) => {
                self.step(direction);
                true
            }
            None => false,
        }
    }

    pub fn focus_page_input(&mut self) {
        self.toolbar.focus_input();
    }

    pub fn type_page_input(&mut self, text: &str) {
        self.toolbar.type_input(text);
    }

    /// Key pressed while the page input has focus
    pub fn page_input_key(&mut self, key: Key) {
        if key == Key::Enter {
            let page = self.toolbar.confirm_input();
            self.go_to_page(page);
            self.sync_toolbar();
        }
    }

    pub fn blur_page_input(&mut self) {
        match self.toolbar.blur_input(self.state.current) {
            BlurOutcome::Navigate(page) => self.go_to_page(page),
            BlurOutcome::Revert | BlurOutcome::Ignored => {}
        }
        self.sync_toolbar();
    }

    // ------------------------------------------------------------------
    // Zoom and gestures

    /// Toolbar zoom button
    pub fn toggle_zoom(&mut self) {
        self.zoom.toggle_centered();
        self.zoom_changed();
    }

    /// Double-click zoom, spread mode only
    pub fn double_click(&mut self, at: Point) {
        if self.state.dimensions.is_single {
            return;
        }
        self.zoom.toggle_at(at);
        self.zoom_changed();
    }

    pub fn wheel(&mut self, delta_y: f32, at: Point) {
        if self.zoom.wheel(delta_y, at) {
            self.zoom_changed();
        }
    }

    pub fn mouse_down(&mut self, at: Point) {
        self.zoom.begin_drag(at);
    }

    /// Pointer movement over the book: pans while dragging, otherwise drives
    /// the corner hint in spread mode
    pub fn mouse_move(&mut self, at: Point) {
        if self.zoom.is_dragging() {
            if self.zoom.drag_to(at) {
                self.zoom_changed();
            }
            return;
        }
        if self.state.dimensions.is_single {
            return;
        }
        let dims = self.state.dimensions;
        let action = self.corner.pointer_moved(
            at.x - self.state.cover_shift as f32,
            at.y,
            dims.book_width as f32,
            dims.book_height as f32,
            self.zoom.is_zoomed(),
        );
        self.apply_hint(action);
    }

    pub fn mouse_up(&mut self) {
        self.zoom.end_drag();
    }

    pub fn mouse_leave(&mut self) {
        let action = self.corner.pointer_left();
        self.apply_hint(action);
    }

    /// Touches currently on the book area, after a finger went down
    pub fn touch_start(&mut self, touches: &[Point]) {
        let single = self.state.dimensions.is_single;
        match touches {
            [a, b] if single => self.zoom.begin_pinch(*a, *b),
            [p] => {
                self.zoom.begin_drag(*p);
                if single {
                    self.swipe.begin(*p);
                }
            }
            _ => {}
        }
    }

    pub fn touch_move(&mut self, touches: &[Point]) {
        let changed = match touches {
            [a, b] if self.zoom.is_pinching() => self.zoom.update_pinch(*a, *b),
            [p] if self.zoom.is_dragging() => self.zoom.drag_to(*p),
            _ => false,
        };
        if changed {
            self.zoom_changed();
        }
    }

    /// A finger lifted at `lifted`; `remaining` fingers stay down
    pub fn touch_end(&mut self, lifted: Point, remaining: usize, now: Instant) {
        let single = self.state.dimensions.is_single;
        if single && self.double_tap.tap(now) {
            self.zoom.toggle_at(lifted);
            self.zoom_changed();
        }
        if remaining < 2 {
            self.zoom.end_pinch();
        }
        self.zoom.end_drag();

        if single {
            if self.zoom.is_zoomed() {
                self.swipe.cancel();
            } else if let Some(direction) = self.swipe.finish(lifted) {
                self.step(direction);
            }
        }
    }

    fn zoom_changed(&mut self) {
        let zoom = self.zoom.state();
        self.toolbar.set_zoomed(zoom.is_zoomed());
        if zoom.is_zoomed() {
            let action = self.corner.pointer_left();
            self.apply_hint(action);
        }
        self.dispatch(Command::ZoomChanged(zoom.is_zoomed()));
        self.events.emit(&ViewerEvent::ZoomChanged(zoom));
    }

    fn apply_hint(&mut self, action: Option<HintAction>) {
        match action {
            Some(HintAction::Open(corner)) => self.widget.flip_corner(corner),
            Some(HintAction::Close) => self.widget.close_corner(),
            None => return,
        }
        self.run(VecDeque::new());
    }

    // ------------------------------------------------------------------
    // Thumbnails and fullscreen

    pub fn toggle_thumbnails(&mut self) {
        self.thumbnails.toggle(self.state.current);
        self.toolbar.thumbnails_active = self.thumbnails.is_open();
    }

    pub fn close_thumbnails(&mut self) {
        self.thumbnails.close();
        self.toolbar.thumbnails_active = false;
    }

    /// Tiles that scrolled into view; renders the ones not yet cached
    pub fn thumbnails_visible(&mut self, pages: impl IntoIterator<Item = usize>) {
        let params = RenderParams::new(
            self.thumbnails.thumb_width,
            self.thumbnails.thumb_height,
            self.config.thumbnail_quality,
        );
        for page in self.thumbnails.visible(pages) {
            self.service.request_thumbnail(page, params);
        }
    }

    pub fn click_thumbnail(&mut self, page: usize) {
        let page = self.thumbnails.click(page);
        self.toolbar.thumbnails_active = false;
        self.go_to_page(page as i64 + 1);
    }

    pub fn take_thumbnail_scroll(&mut self) -> Option<usize> {
        self.thumbnails.take_scroll_target()
    }

    pub fn toggle_fullscreen(&mut self, host: &mut impl FullscreenHost) {
        if host.is_fullscreen() {
            host.exit_fullscreen();
        } else {
            host.request_fullscreen();
        }
    }

    /// Fullscreen entered or left, by any means
    pub fn fullscreen_changed(&mut self, fullscreen: bool) {
        self.container_style = ContainerStyle::for_fullscreen(fullscreen);
        self.toolbar.set_fullscreen(fullscreen);
    }

    // ------------------------------------------------------------------
    // Resize and render results

    /// Record a viewport change; applied by [`Viewer::tick`] once resizes
    /// stop for the debounce window
    pub fn resize(&mut self, viewport: Viewport, now: Instant) {
        self.resize.push(viewport, now);
    }

    /// Apply any pending resize immediately
    pub fn flush_resize(&mut self) {
        if let Some(viewport) = self.resize.flush() {
            self.apply_viewport(viewport);
        }
    }

    fn apply_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let dims = compute_dimensions_with(&self.config.breakpoints, viewport, self.base);
        self.dispatch(Command::Resized(dims));
    }

    /// Apply due resizes and every render result that has arrived
    pub fn tick(&mut self, now: Instant) {
        if let Some(viewport) = self.resize.poll(now) {
            self.apply_viewport(viewport);
        }
        for response in self.service.poll_responses() {
            self.handle_response(response);
        }
    }

    /// Wait until no render is outstanding. Returns false on timeout.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.service.has_pending() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.service.wait_response(remaining) {
                Some(response) => self.handle_response(response),
                None => return !self.service.has_pending(),
            }
        }
        true
    }

    fn handle_response(&mut self, response: RenderResponse) {
        match response {
            RenderResponse::Page { page, image, .. } => {
                self.dispatch(Command::PageRendered { page, image });
            }
            RenderResponse::Thumbnail { page, image, .. } => {
                self.thumbnails.rendered(page, image);
            }
            RenderResponse::Annotations { page, overlay, .. } => {
                self.dispatch(Command::OverlayReady { page, overlay });
            }
            RenderResponse::Cancelled { page, .. } => {
                debug!("Render of page {} cancelled", page + 1);
            }
            RenderResponse::Error {
                page, kind, error, ..
            } => match kind {
                RenderKind::Page => {
                    warn!("Page {} failed to render: {error}", page + 1);
                    self.dispatch(Command::PageFailed(page));
                }
                RenderKind::Thumbnail => {
                    warn!("Thumbnail {} failed to render: {error}", page + 1);
                    self.thumbnails.failed(page);
                }
                RenderKind::Annotations => {
                    debug!("No annotations for page {}: {error}", page + 1);
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Command loop

    fn dispatch(&mut self, cmd: Command) {
        self.run(VecDeque::from([cmd]));
    }

    /// Drain the command queue; widget events raised along the way are
    /// queued as further commands
    fn run(&mut self, mut queue: VecDeque<Command>) {
        queue.extend(self.widget_commands());
        while let Some(cmd) = queue.pop_front() {
            for effect in self.state.apply(cmd) {
                self.execute(effect, &mut queue);
            }
        }
    }

    fn widget_commands(&mut self) -> Vec<Command> {
        self.widget
            .take_events()
            .into_iter()
            .map(|event| match event {
                WidgetEvent::Init { .. } => Command::WidgetInitialized,
                WidgetEvent::ChangeState(state) => Command::WidgetStateChanged(state),
                WidgetEvent::Flip(index) => Command::WidgetFlipped(index),
            })
            .collect()
    }

    fn execute(&mut self, effect: Effect, queue: &mut VecDeque<Command>) {
        match effect {
            Effect::FlipWidget(index) | Effect::Reflow(index) => self.widget.flip(index),
            Effect::FlipWidgetNext => self.widget.flip_next(),
            Effect::FlipWidgetPrev => self.widget.flip_prev(),

            Effect::ResetZoom => {
                if self.zoom.reset() {
                    self.toolbar.set_zoomed(false);
                    self.events.emit(&ViewerEvent::ZoomChanged(self.zoom.state()));
                }
                queue.push_back(Command::ZoomChanged(false));
            }

            Effect::Render(page) => {
                let dims = self.state.dimensions;
                self.service.request_page(
                    page,
                    RenderParams::new(dims.page_width, dims.page_height, self.config.lazy_quality),
                );
            }

            Effect::FetchAnnotations(page) => {
                let dims = self.state.dimensions;
                self.service
                    .request_annotations(page, dims.page_width, dims.page_height);
            }

            Effect::UpdateGeometry(dims) => match self.widget.update(GeometryUpdate::from(&dims)) {
                Ok(()) => queue.push_back(Command::GeometryApplied(dims)),
                Err(e) => warn!("Error updating flipbook on resize: {e}"),
            },

            Effect::SyncToolbar => self.sync_toolbar(),

            Effect::Notify(event) => {
                match &event {
                    ViewerEvent::Flip(index) => self.thumbnails.on_flip(*index),
                    ViewerEvent::Resize(dims) => {
                        self.zoom
                            .set_area(dims.book_width as f32, dims.book_height as f32);
                        self.thumbnails
                            .set_thumb_height(dims.thumbnail_height(self.config.thumbnail_width));
                    }
                    _ => {}
                }
                self.events.emit(&event);
            }
        }
        queue.extend(self.widget_commands());
    }

    fn sync_toolbar(&mut self) {
        self.toolbar.apply_layout(self.state.dimensions.is_single);
        self.toolbar
            .sync(self.state.current, self.state.last_index());
    }

    /// Serializable view of everything a host needs to draw the viewer
    #[must_use]
    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            page_count: self.state.page_count,
            current_index: self.state.current,
            page_label: self.toolbar.page_label(),
            dimensions: self.state.dimensions,
            cover_shift: self.state.cover_shift,
            widget_state: self.state.widget_state,
            zoom: self.zoom.state(),
            toolbar: self.toolbar.clone(),
            thumbnails_open: self.thumbnails.is_open(),
            container_style: self.container_style,
            pending_renders: self.pending_renders(),
            cached_renders: self.cached_renders(),
            pages: self
                .state
                .pages
                .iter()
                .enumerate()
                .map(|(index, entry)| PageSnapshot {
                    index,
                    state: entry.state,
                    image: entry
                        .image
                        .as_ref()
                        .map(|image| (image.width, image.height)),
                    links: entry
                        .overlay
                        .as_ref()
                        .map(|overlay| overlay.regions.clone())
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PageSnapshot {
    pub index: usize,
    pub state: LoadState,
    /// Pixel size of the rendered image
    pub image: Option<(u32, u32)>,
    pub links: Vec<LinkRegion>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ViewerSnapshot {
    pub page_count: usize,
    pub current_index: usize,
    pub page_label: String,
    pub dimensions: Dimensions,
    pub cover_shift: i32,
    pub widget_state: WidgetState,
    pub zoom: ZoomState,
    pub toolbar: ToolbarState,
    pub thumbnails_open: bool,
    pub container_style: ContainerStyle,
    pub pending_renders: usize,
    pub cached_renders: usize,
    pub pages: Vec<PageSnapshot>,
}
