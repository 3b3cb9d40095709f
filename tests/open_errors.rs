use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use flipbook::pdf::{DocumentSource, OpenErrorKind};
use flipbook::test_utils::{FakeBackend, letter_document};
use flipbook::{BaseSize, HeadlessViewer, ReadySignal, ViewerConfig, ViewerError, Viewport};

fn try_open(
    backend: FakeBackend,
    source: DocumentSource,
    config: ViewerConfig,
    ready: ReadySignal,
) -> Result<HeadlessViewer, ViewerError> {
    HeadlessViewer::open(
        Arc::new(backend),
        source,
        BaseSize::DEFAULT,
        Viewport::new(1200, 800),
        config,
        ready,
    )
}

fn book() -> DocumentSource {
    DocumentSource::Path(PathBuf::from("book.pdf"))
}

#[test]
fn each_open_failure_has_its_own_message() {
    let kinds = [
        OpenErrorKind::Missing,
        OpenErrorKind::InvalidFormat,
        OpenErrorKind::Unreadable,
        OpenErrorKind::PasswordProtected,
        OpenErrorKind::NotFound,
        OpenErrorKind::Unknown,
    ];

    let mut messages = Vec::new();
    for kind in kinds.clone() {
        let err = try_open(
            FakeBackend::unopenable(kind.clone()),
            book(),
            ViewerConfig::default(),
            ReadySignal::ready(),
        )
        .err()
        .expect("open should fail");

        match &err {
            ViewerError::DocumentOpen(open) => assert_eq!(open.kind, kind),
            other => panic!("unexpected error {other:?}"),
        }
        let screen = err.error_screen();
        assert_eq!(screen.retry_label, "Reload");
        messages.push(screen.message);
    }

    messages.sort();
    messages.dedup();
    assert_eq!(messages.len(), kinds.len());
}

#[test]
fn empty_source_is_missing_without_touching_backend() {
    let backend = FakeBackend::new(letter_document(3));
    let err = try_open(
        backend.clone(),
        DocumentSource::Url("  ".to_string()),
        ViewerConfig::default(),
        ReadySignal::ready(),
    )
    .err()
    .expect("open should fail");

    assert!(matches!(
        err,
        ViewerError::DocumentOpen(ref open) if open.kind == OpenErrorKind::Missing
    ));
    assert_eq!(backend.open_count(), 0);
}

#[test]
fn unresolved_dependencies_time_out() {
    let config = ViewerConfig {
        ready_timeout_ms: 30,
        ..ViewerConfig::default()
    };
    let (signal, _handle) = ReadySignal::channel();
    let backend = FakeBackend::new(letter_document(3));

    let err = try_open(backend.clone(), book(), config, signal)
        .err()
        .expect("open should time out");

    match err {
        ViewerError::DependencyUnavailable { waited_ms } => assert!(waited_ms >= 25),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(backend.open_count(), 0);
}

#[test]
fn dependencies_resolved_late_still_open() {
    let (signal, handle) = ReadySignal::channel();
    let resolver = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        handle.resolve();
    });

    let viewer = try_open(
        FakeBackend::new(letter_document(2)),
        book(),
        ViewerConfig::default(),
        signal,
    )
    .unwrap();
    resolver.join().unwrap();

    assert_eq!(viewer.page_count(), 2);
}

#[test]
fn every_initial_page_failing_still_builds_the_book() {
    let document = letter_document(3)
        .failing_page(0)
        .failing_page(1)
        .failing_page(2);
    let viewer = try_open(
        FakeBackend::new(document),
        book(),
        ViewerConfig::default(),
        ReadySignal::ready(),
    )
    .unwrap();

    assert!(
        viewer
            .state()
            .pages
            .iter()
            .all(|page| page.image.is_none())
    );
    assert_eq!(viewer.toolbar().page_label(), "1/3");
}
