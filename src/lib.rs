// Export modules for use in tests and by the command-line host
pub mod annotations;
pub mod error;
pub mod input;
pub mod layout;
pub mod panic_handler;
pub mod pdf;
pub mod settings;
pub mod thumbnails;
pub mod toolbar;
pub mod viewer;
pub mod zoom;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the viewer entry points
pub use error::{ErrorScreen, ViewerError};
pub use layout::{BaseSize, Dimensions, Viewport, compute_dimensions};
pub use settings::ViewerConfig;
pub use viewer::{HeadlessViewer, ReadySignal, Viewer, ViewerEvent, ViewerSnapshot};
