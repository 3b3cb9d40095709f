//! Fatal viewer failures and their user-facing presentation

use serde::Serialize;

use crate::pdf::{OpenError, OpenErrorKind};
use crate::viewer::WidgetError;

/// Failures that take down the whole viewer.
///
/// Page-scoped render failures are not represented here; they leave one page
/// at its placeholder and are reported as [`crate::pdf::RenderFault`].
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("required components did not become ready within {waited_ms} ms")]
    DependencyUnavailable { waited_ms: u64 },

    #[error("failed to open document: {0}")]
    DocumentOpen(#[from] OpenError),

    #[error("failed to construct the flip-book: {0}")]
    WidgetConstruction(#[from] WidgetError),
}

/// What the host shows in place of the book
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorScreen {
    pub message: String,
    pub hint: String,
    pub retry_label: String,
}

impl ViewerError {
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DependencyUnavailable { .. } => "The PDF viewer could not be loaded.",
            Self::DocumentOpen(e) => match e.kind {
                OpenErrorKind::Missing => "The PDF file is missing.",
                OpenErrorKind::InvalidFormat => "The file is not a valid PDF.",
                OpenErrorKind::Unreadable => "The PDF could not be read. It may be blocked by the server.",
                OpenErrorKind::PasswordProtected => "This PDF is password protected.",
                OpenErrorKind::NotFound => "The PDF file was not found.",
                OpenErrorKind::Unknown => "The PDF could not be loaded.",
            },
            Self::WidgetConstruction(_) => "The flip-book could not be created.",
        }
    }

    #[must_use]
    pub fn error_screen(&self) -> ErrorScreen {
        ErrorScreen {
            message: self.user_message().to_string(),
            hint: "Try reloading the page.".to_string(),
            retry_label: "Reload".to_string(),
        }
    }
}
