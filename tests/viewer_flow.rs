use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use flipbook::input::{Key, Point};
use flipbook::pdf::{DocumentSource, RawAnnotation};
use flipbook::test_utils::{FakeBackend, FakeDocument, letter_document};
use flipbook::thumbnails::ThumbState;
use flipbook::toolbar::ButtonFace;
use flipbook::viewer::{EventBus, LoadState, PageFlip, WidgetState};
use flipbook::{BaseSize, HeadlessViewer, ReadySignal, ViewerConfig, ViewerEvent, Viewport};

const SETTLE: Duration = Duration::from_secs(10);

fn desktop() -> Viewport {
    Viewport::new(1200, 800)
}

fn phone() -> Viewport {
    Viewport::new(400, 900)
}

fn open_with(document: FakeDocument, viewport: Viewport) -> (HeadlessViewer, FakeBackend) {
    let backend = FakeBackend::new(document);
    let mut viewer = HeadlessViewer::open(
        Arc::new(backend.clone()),
        DocumentSource::Path(PathBuf::from("book.pdf")),
        BaseSize::new(450, 600),
        viewport,
        ViewerConfig::default(),
        ReadySignal::ready(),
    )
    .unwrap();
    assert!(viewer.settle(SETTLE));
    (viewer, backend)
}

fn open(pages: usize, viewport: Viewport) -> HeadlessViewer {
    open_with(letter_document(pages), viewport).0
}

fn load_states(viewer: &HeadlessViewer) -> Vec<LoadState> {
    viewer.state().pages.iter().map(|p| p.state).collect()
}

fn record_events(viewer: &mut HeadlessViewer) -> Rc<RefCell<Vec<ViewerEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    viewer.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    seen
}

#[test]
fn five_page_book_on_desktop() {
    let viewer = open(5, desktop());

    assert_eq!(
        load_states(&viewer),
        vec![
            LoadState::Loaded,
            LoadState::Loaded,
            LoadState::Loaded,
            LoadState::NotLoaded,
            LoadState::NotLoaded,
        ]
    );

    let dims = viewer.dimensions();
    assert!(!dims.is_single);
    assert_eq!((dims.page_width, dims.page_height), (450, 600));
    assert_eq!(viewer.state().cover_shift, -225);

    let toolbar = viewer.toolbar();
    assert_eq!(toolbar.page_label(), "1/5");
    assert!(toolbar.first.disabled && toolbar.prev.disabled);
    assert!(!toolbar.next.disabled && !toolbar.last.disabled);
    assert!(!toolbar.mobile_next.visible);

    let options = viewer.widget().options();
    assert!(!options.use_portrait);
    assert!(options.draw_shadow);
    assert_eq!(options.width, 450);
}

#[test]
fn resize_to_phone_switches_to_single_page() {
    let mut viewer = open(5, desktop());
    let events = record_events(&mut viewer);

    let t0 = Instant::now();
    viewer.resize(Viewport::new(800, 800), t0);
    viewer.resize(phone(), t0 + Duration::from_millis(100));
    viewer.tick(t0 + Duration::from_millis(200));
    assert!(!viewer.dimensions().is_single, "still debouncing");

    viewer.tick(t0 + Duration::from_millis(300));
    let dims = viewer.dimensions();
    assert!(dims.is_single && dims.is_mobile);
    assert_eq!(viewer.state().cover_shift, 0);
    assert!(viewer.widget().options().use_portrait);
    assert_eq!(viewer.widget().options().width, dims.page_width);

    let toolbar = viewer.toolbar();
    assert!(toolbar.mobile_prev.visible && !toolbar.mobile_prev.disabled);
    assert!(toolbar.mobile_next.visible && !toolbar.mobile_next.disabled);
    assert!(!toolbar.first.visible && !toolbar.last.visible);
    assert!(!toolbar.divider_visible);

    let resizes = events
        .borrow()
        .iter()
        .filter(|e| matches!(e, ViewerEvent::Resize(_)))
        .count();
    assert_eq!(resizes, 1);
}

#[test]
fn resize_within_same_book_size_is_ignored() {
    let mut viewer = open(5, desktop());
    let events = record_events(&mut viewer);

    // Wider window, same 450px pages
    viewer.resize(Viewport::new(1400, 800), Instant::now());
    viewer.flush_resize();

    assert!(events.borrow().is_empty());
    assert_eq!(viewer.viewport().width, 1400);
}

#[test]
fn resize_within_same_book_size_keeps_zoom() {
    let mut viewer = open(5, desktop());
    viewer.toggle_zoom();
    assert!(viewer.zoom().is_zoomed());

    viewer.resize(Viewport::new(1400, 800), Instant::now());
    viewer.flush_resize();
    assert!(viewer.zoom().is_zoomed());

    viewer.resize(phone(), Instant::now());
    viewer.flush_resize();
    assert!(!viewer.zoom().is_zoomed());
}

#[test]
fn flipping_loads_lazy_window() {
    let mut viewer = open(20, phone());

    viewer.go_to_page(11);
    assert_eq!(viewer.current_index(), 10);
    assert!(viewer.settle(SETTLE));

    let states = load_states(&viewer);
    for page in 0..20 {
        let expected = if page < 3 || (8..=14).contains(&page) {
            LoadState::Loaded
        } else {
            LoadState::NotLoaded
        };
        assert_eq!(states[page], expected, "page {page}");
    }
    assert_eq!(viewer.toolbar().page_label(), "11/20");
}

#[test]
fn spread_mode_snaps_to_even_pages() {
    let mut viewer = open(10, desktop());

    viewer.go_to_page(4);
    assert_eq!(viewer.current_index(), 2);
    assert_eq!(viewer.widget().current_page_index(), 2);
    assert_eq!(viewer.state().cover_shift, 0);

    viewer.last();
    assert_eq!(viewer.current_index(), 8);
    assert!(viewer.toolbar().next.disabled);

    viewer.flip_prev();
    assert_eq!(viewer.current_index(), 6);
}

#[test]
fn flipping_to_current_page_does_nothing() {
    let mut viewer = open(6, phone());
    let events = record_events(&mut viewer);

    viewer.go_to_page(3);
    viewer.go_to_page(3);
    viewer.flip(2);

    let flips: Vec<_> = events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            ViewerEvent::Flip(index) => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(flips, vec![2]);
}

#[test]
fn out_of_range_page_numbers_clamp() {
    let mut viewer = open(6, phone());

    viewer.go_to_page(99);
    assert_eq!(viewer.current_index(), 5);
    assert!(viewer.toolbar().next.disabled);

    viewer.go_to_page(-3);
    assert_eq!(viewer.current_index(), 0);
}

#[test]
fn zoom_blocks_flip_until_reset() {
    let mut viewer = open(6, desktop());

    viewer.toggle_zoom();
    assert!(viewer.zoom().is_zoomed());
    assert_eq!(viewer.toolbar().zoom_button, ButtonFace::ZOOM_OUT);

    viewer.flip_next();
    assert_eq!(viewer.current_index(), 0);
    assert!(!viewer.zoom().is_zoomed());
    assert_eq!(viewer.toolbar().zoom_button, ButtonFace::ZOOM_IN);

    viewer.flip_next();
    assert_eq!(viewer.current_index(), 2);
}

#[test]
fn keyboard_navigation_only_in_spread_mode() {
    let mut viewer = open(6, desktop());
    assert!(viewer.key(Key::ArrowRight));
    assert_eq!(viewer.current_index(), 2);
    assert!(viewer.key(Key::ArrowLeft));
    assert_eq!(viewer.current_index(), 0);
    assert!(!viewer.key(Key::Enter));

    let mut mobile = open(6, phone());
    assert!(!mobile.key(Key::ArrowRight));
    assert_eq!(mobile.current_index(), 0);
}

#[test]
fn page_input_navigates_on_enter_once() {
    let mut viewer = open(8, phone());
    let events = record_events(&mut viewer);

    viewer.focus_page_input();
    viewer.type_page_input("5");
    viewer.page_input_key(Key::Enter);
    viewer.blur_page_input();

    assert_eq!(viewer.current_index(), 4);
    assert_eq!(viewer.toolbar().page_input, "5");
    let flips = events
        .borrow()
        .iter()
        .filter(|e| matches!(e, ViewerEvent::Flip(_)))
        .count();
    assert_eq!(flips, 1);

    viewer.type_page_input("nope");
    viewer.blur_page_input();
    assert_eq!(viewer.current_index(), 4);
    assert_eq!(viewer.toolbar().page_input, "5");
}

#[test]
fn swipe_and_double_tap_on_phone() {
    let mut viewer = open(6, phone());
    let t0 = Instant::now();

    viewer.touch_start(&[Point::new(300.0, 200.0)]);
    viewer.touch_end(Point::new(100.0, 210.0), 0, t0);
    assert_eq!(viewer.current_index(), 1);

    // Second tap soon after the first toggles zoom instead of flipping
    viewer.touch_start(&[Point::new(150.0, 200.0)]);
    viewer.touch_end(Point::new(150.0, 200.0), 0, t0 + Duration::from_millis(120));
    assert!(viewer.zoom().is_zoomed());

    viewer.touch_start(&[Point::new(300.0, 200.0)]);
    viewer.touch_end(
        Point::new(100.0, 210.0),
        0,
        t0 + Duration::from_millis(2000),
    );
    assert_eq!(viewer.current_index(), 1);
}

#[test]
fn corner_hint_follows_pointer_in_spread_mode() {
    let mut viewer = open(6, desktop());

    // Book is shifted left by half a page while the cover shows
    viewer.mouse_move(Point::new(660.0, 590.0));
    assert_eq!(viewer.state().widget_state, WidgetState::FoldCorner);

    viewer.mouse_leave();
    assert_eq!(viewer.state().widget_state, WidgetState::Read);
}

#[test]
fn links_become_overlays_after_render() {
    let document = letter_document(3).with_annotations(
        0,
        vec![RawAnnotation::link(
            [72.0, 700.0, 272.0, 740.0],
            "https://example.com",
        )],
    );
    let (viewer, _) = open_with(document, desktop());

    let overlay = viewer
        .state()
        .page(0)
        .and_then(|page| page.overlay.as_ref())
        .expect("overlay for page 1");
    assert_eq!(overlay.regions.len(), 1);
    let region = &overlay.regions[0];
    assert!(overlay.hit_test(region.x + 1.0, region.y + 1.0).is_some());
    assert_eq!(region.url, "https://example.com");

    assert!(viewer.state().page(1).is_some_and(|p| p.overlay.is_none()));

    let snapshot = viewer.snapshot();
    assert_eq!(snapshot.pages[0].links.len(), 1);
}

#[test]
fn failed_page_stays_placeholder_then_errors() {
    let (mut viewer, backend) = open_with(letter_document(6).failing_page(1), phone());
    let events = record_events(&mut viewer);

    assert_eq!(viewer.state().pages[1].state, LoadState::NotLoaded);
    assert_eq!(viewer.state().pages[0].state, LoadState::Loaded);

    viewer.flip_next();
    assert!(viewer.settle(SETTLE));

    assert_eq!(viewer.state().pages[1].state, LoadState::Error);
    assert!(events.borrow().contains(&ViewerEvent::PageFailed(1)));
    assert_eq!(backend.render_count(1), 2);
}

#[test]
fn thumbnails_render_and_navigate() {
    let mut viewer = open(5, phone());

    viewer.toggle_thumbnails();
    assert!(viewer.toolbar().thumbnails_active);
    assert_eq!(viewer.take_thumbnail_scroll(), Some(0));

    viewer.thumbnails_visible(0..5);
    assert!(viewer.settle(SETTLE));
    for page in 0..5 {
        assert_eq!(
            viewer.thumbnails().tile(page).map(|t| t.state),
            Some(ThumbState::Loaded)
        );
    }
    let thumb = viewer.thumbnails().image(2).expect("thumbnail");
    assert!(thumb.width <= viewer.thumbnails().thumb_width);

    viewer.click_thumbnail(3);
    assert_eq!(viewer.current_index(), 3);
    assert!(!viewer.thumbnails().is_open());
    assert!(!viewer.toolbar().thumbnails_active);
}

#[test]
fn thumbnail_height_tracks_resized_pages() {
    let mut viewer = open(5, desktop());
    assert_eq!(viewer.thumbnails().thumb_height, 120);

    viewer.resize(Viewport::new(300, 80), Instant::now());
    viewer.flush_resize();
    let dims = viewer.dimensions();
    assert!(dims.is_single);
    assert_eq!(viewer.thumbnails().thumb_height, dims.thumbnail_height(90));
    assert_ne!(viewer.thumbnails().thumb_height, 120);
}

#[test]
fn fullscreen_toggle_restyles_container() {
    struct Host(bool);
    impl flipbook::toolbar::FullscreenHost for Host {
        fn is_fullscreen(&self) -> bool {
            self.0
        }
        fn request_fullscreen(&mut self) {
            self.0 = true;
        }
        fn exit_fullscreen(&mut self) {
            self.0 = false;
        }
    }

    let mut viewer = open(3, desktop());
    let mut host = Host(false);

    viewer.toggle_fullscreen(&mut host);
    assert!(host.0);
    viewer.fullscreen_changed(true);
    assert_eq!(
        viewer.container_style(),
        flipbook::toolbar::ContainerStyle::FULLSCREEN
    );
    assert_eq!(viewer.toolbar().fullscreen_button, ButtonFace::EXIT_FULLSCREEN);

    viewer.toggle_fullscreen(&mut host);
    viewer.fullscreen_changed(false);
    assert_eq!(viewer.toolbar().fullscreen_button, ButtonFace::FULLSCREEN);
}

#[test]
fn snapshot_serializes() {
    let viewer = open(4, desktop());
    let json = serde_json::to_value(viewer.snapshot()).unwrap();

    assert_eq!(json["page_count"], 4);
    assert_eq!(json["page_label"], "1/4");
    assert_eq!(json["pages"][0]["state"], "loaded");
    assert_eq!(json["pages"][3]["state"], "not_loaded");
    assert_eq!(json["dimensions"]["book_width"], 900);
    assert_eq!(json["pending_renders"], 0);
    assert!(json["cached_renders"].as_u64().unwrap() >= 3);
}

#[test]
fn early_subscribers_see_init() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut events = EventBus::new();
    events.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    let viewer = HeadlessViewer::open_with_events(
        Arc::new(FakeBackend::new(letter_document(3))),
        DocumentSource::Path(PathBuf::from("book.pdf")),
        BaseSize::DEFAULT,
        desktop(),
        ViewerConfig::default(),
        ReadySignal::ready(),
        events,
    )
    .unwrap();

    assert_eq!(seen.borrow().first(), Some(&ViewerEvent::Init));
    assert_eq!(viewer.page_count(), 3);
}
