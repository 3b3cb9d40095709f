//! Toolbar and navigation controls kept in sync with the viewer
//!
//! Desktop navigation (first/prev/next/last, the side buttons) is disabled at
//! the document boundaries. The mobile prev/next pair is never disabled.

use serde::Serialize;

/// Icon and tooltip of a toggle button
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonFace {
    pub icon: &'static str,
    pub title: &'static str,
}

impl ButtonFace {
    pub const ZOOM_IN: Self = Self {
        icon: "zoom-in",
        title: "Zoom in",
    };
    pub const ZOOM_OUT: Self = Self {
        icon: "zoom-out",
        title: "Zoom out",
    };
    pub const FULLSCREEN: Self = Self {
        icon: "fullscreen",
        title: "Fullscreen",
    };
    pub const EXIT_FULLSCREEN: Self = Self {
        icon: "exit-fullscreen",
        title: "Exit fullscreen",
    };
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Control {
    pub visible: bool,
    pub disabled: bool,
}

impl Control {
    const fn shown(disabled: bool) -> Self {
        Self {
            visible: true,
            disabled,
        }
    }
}

/// What the page-number input asks for when it loses focus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurOutcome {
    /// Navigate to this 1-based page (unclamped)
    Navigate(i64),
    /// Not a number; the input was reset to the current page
    Revert,
    /// The blur follows an Enter that already navigated
    Ignored,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolbarState {
    pub page_input: String,
    pub total: usize,
    pub input_focused: bool,

    pub first: Control,
    pub prev: Control,
    pub next: Control,
    pub last: Control,

    /// Desktop buttons beside the book
    pub side_prev: Control,
    pub side_next: Control,

    /// Bottom-bar buttons shown in single-page mode
    pub mobile_prev: Control,
    pub mobile_next: Control,

    pub divider_visible: bool,

    pub zoom_button: ButtonFace,
    pub fullscreen_button: ButtonFace,
    pub thumbnails_active: bool,

    #[serde(skip)]
    navigating: bool,
}

impl ToolbarState {
    #[must_use]
    pub fn new(total: usize, is_single: bool) -> Self {
        let mut toolbar = Self {
            page_input: "1".to_string(),
            total,
            input_focused: false,
            first: Control::default(),
            prev: Control::default(),
            next: Control::default(),
            last: Control::default(),
            side_prev: Control::default(),
            side_next: Control::default(),
            mobile_prev: Control::default(),
            mobile_next: Control::default(),
            divider_visible: false,
            zoom_button: ButtonFace::ZOOM_IN,
            fullscreen_button: ButtonFace::FULLSCREEN,
            thumbnails_active: false,
            navigating: false,
        };
        toolbar.apply_layout(is_single);
        toolbar.sync(0, total.saturating_sub(1));
        toolbar
    }

    /// `current / total` as displayed beside the input
    #[must_use]
    pub fn page_label(&self) -> String {
        format!("{}/{}", self.page_input, self.total)
    }

    /// Reflect the current page index; `last_index` is the last page the
    /// book can settle on
    pub fn sync(&mut self, current: usize, last_index: usize) {
        if !self.input_focused {
            self.page_input = (current + 1).to_string();
        }
        let at_first = current == 0;
        let at_last = current >= last_index;

        self.first.disabled = at_first;
        self.prev.disabled = at_first;
        self.side_prev.disabled = at_first;
        self.next.disabled = at_last;
        self.last.disabled = at_last;
        self.side_next.disabled = at_last;
    }

    /// Show the controls that belong to single-page or spread mode
    pub fn apply_layout(&mut self, is_single: bool) {
        self.mobile_prev = Control {
            visible: is_single,
            disabled: false,
        };
        self.mobile_next = Control {
            visible: is_single,
            disabled: false,
        };
        self.first.visible = !is_single;
        self.last.visible = !is_single;
        self.prev = Control::shown(self.prev.disabled);
        self.next = Control::shown(self.next.disabled);
        self.side_prev.visible = !is_single;
        self.side_next.visible = !is_single;
        self.divider_visible = !is_single;
    }

    pub fn set_zoomed(&mut self, zoomed: bool) {
        self.zoom_button = if zoomed {
            ButtonFace::ZOOM_OUT
        } else {
            ButtonFace::ZOOM_IN
        };
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen_button = if fullscreen {
            ButtonFace::EXIT_FULLSCREEN
        } else {
            ButtonFace::FULLSCREEN
        };
    }

    pub fn focus_input(&mut self) {
        self.input_focused = true;
    }

    pub fn type_input(&mut self, text: &str) {
        self.input_focused = true;
        self.page_input = text.to_string();
    }

    /// Enter in the page input: returns the page to go to and blurs
    pub fn confirm_input(&mut self) -> i64 {
        self.navigating = true;
        self.input_focused = false;
        parse_page_number(&self.page_input).unwrap_or(1)
    }

    /// Focus leaves the page input
    pub fn blur_input(&mut self, current: usize) -> BlurOutcome {
        self.input_focused = false;
        if std::mem::take(&mut self.navigating) {
            return BlurOutcome::Ignored;
        }
        match parse_page_number(&self.page_input) {
            Some(page) => BlurOutcome::Navigate(page),
            None => {
                self.page_input = (current + 1).to_string();
                BlurOutcome::Revert
            }
        }
    }
}

/// Leading integer of the input, ignoring surrounding whitespace and any
/// trailing garbage (`"12abc"` is 12)
#[must_use]
pub fn parse_page_number(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    digits[..end]
        .parse::<i64>()
        .ok()
        .map(|n| n.saturating_mul(sign))
}

/// Something that can put the viewer container into fullscreen
pub trait FullscreenHost {
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&mut self);
    fn exit_fullscreen(&mut self);
}

/// Inline styles of the outer container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ContainerStyle {
    pub display: Option<&'static str>,
    pub flex_direction: Option<&'static str>,
    pub align_items: Option<&'static str>,
    pub justify_content: Option<&'static str>,
    pub width: Option<&'static str>,
    pub height: Option<&'static str>,
    pub padding: Option<&'static str>,
    pub margin: Option<&'static str>,
    pub background: Option<&'static str>,
    pub box_sizing: Option<&'static str>,
}

impl ContainerStyle {
    /// Centered, full-viewport, dark background
    pub const FULLSCREEN: Self = Self {
        display: Some("flex"),
        flex_direction: Some("column"),
        align_items: Some("center"),
        justify_content: Some("center"),
        width: Some("100vw"),
        height: Some("100vh"),
        padding: Some("0"),
        margin: Some("0"),
        background: Some("#1a1a1a"),
        box_sizing: Some("border-box"),
    };

    pub const INLINE: Self = Self {
        display: None,
        flex_direction: None,
        align_items: Some("flex-start"),
        justify_content: Some("center"),
        width: None,
        height: None,
        padding: None,
        margin: None,
        background: None,
        box_sizing: None,
    };

    #[must_use]
    pub fn for_fullscreen(fullscreen: bool) -> Self {
        if fullscreen {
            Self::FULLSCREEN
        } else {
            Self::INLINE
        }
    }
}
