//! Core types shared by the decoding backend and the render pipeline

use std::fmt;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;

const FILE_SCHEME: &str = "file://";
const LOCALHOST: &str = "localhost";

/// Where a document is loaded from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentSource {
    /// `http://`, `https://` or `file://` URL
    Url(String),
    /// Local filesystem path
    Path(PathBuf),
}

impl DocumentSource {
    /// Interpret a user-supplied string as a URL when it has a known scheme,
    /// otherwise as a local path
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("file://")
        {
            Self::Url(input.to_string())
        } else {
            Self::Path(PathBuf::from(input))
        }
    }

    /// Filesystem path for plain paths and `file://` URLs, `None` for
    /// sources that have to be fetched
    #[must_use]
    pub fn local_path(&self) -> Option<PathBuf> {
        match self {
            Self::Path(path) => Some(path.clone()),
            Self::Url(url) => {
                let scheme = url.get(..FILE_SCHEME.len())?;
                if !scheme.eq_ignore_ascii_case(FILE_SCHEME) {
                    return None;
                }
                let rest = &url[FILE_SCHEME.len()..];
                let rest = match rest.get(..LOCALHOST.len()) {
                    Some(host) if host.eq_ignore_ascii_case(LOCALHOST) => &rest[LOCALHOST.len()..],
                    _ => rest,
                };
                let decoded = percent_decode_str(rest).decode_utf8_lossy();
                Some(PathBuf::from(decoded.as_ref()))
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Url(url) => url.trim().is_empty(),
            Self::Path(path) => path.as_os_str().is_empty(),
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Options passed to the backend when opening a document
#[derive(Clone, Debug)]
pub struct OpenOptions {
    /// Headers sent when the source has to be fetched over HTTP(S)
    pub http_headers: Vec<(String, String)>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            http_headers: vec![
                ("Cache-Control".to_string(), "no-cache".to_string()),
                ("Accept".to_string(), "application/pdf".to_string()),
            ],
        }
    }
}

/// Intrinsic page size in PDF points at scale 1
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Uniform scale that fits the page inside the target box without stretching
    #[must_use]
    pub fn fit_scale(&self, target_width: u32, target_height: u32) -> f32 {
        if self.width <= 0.0 || self.height <= 0.0 {
            return 1.0;
        }
        (target_width as f32 / self.width).min(target_height as f32 / self.height)
    }

    /// Pixel size of the page rasterized at `scale`
    #[must_use]
    pub fn scaled(&self, scale: f32) -> (u32, u32) {
        (
            ((self.width * scale).round() as u32).max(1),
            ((self.height * scale).round() as u32).max(1),
        )
    }
}

/// One annotation as reported by the decoding backend
#[derive(Clone, Debug, PartialEq)]
pub struct RawAnnotation {
    /// Annotation subtype, e.g. `Link`
    pub subtype: String,
    /// `[x0, y0, x1, y1]` in PDF space (bottom-left origin)
    pub rect: [f32; 4],
    pub url: Option<String>,
    /// URL carried by a URI action rather than the annotation itself
    pub action_url: Option<String>,
    pub unsafe_url: Option<String>,
    /// Internal destination page, if any
    pub dest_page: Option<usize>,
}

impl RawAnnotation {
    #[must_use]
    pub fn link(rect: [f32; 4], url: impl Into<String>) -> Self {
        Self {
            subtype: "Link".to_string(),
            rect,
            url: Some(url.into()),
            action_url: None,
            unsafe_url: None,
            dest_page: None,
        }
    }

    #[must_use]
    pub fn is_link(&self) -> bool {
        self.subtype == "Link"
    }

    /// First non-empty external target
    #[must_use]
    pub fn target_url(&self) -> Option<&str> {
        [&self.url, &self.action_url, &self.unsafe_url]
            .into_iter()
            .filter_map(|candidate| candidate.as_deref())
            .find(|url| !url.is_empty())
    }
}

/// Encoded page image as handed to the page elements
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    /// `data:` URL suitable for an image element source
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls_resolve_to_decoded_paths() {
        assert_eq!(
            DocumentSource::parse("FILE:///tmp/a.pdf").local_path(),
            Some(PathBuf::from("/tmp/a.pdf"))
        );
        assert_eq!(
            DocumentSource::parse("file:///home/me/my%20doc.pdf").local_path(),
            Some(PathBuf::from("/home/me/my doc.pdf"))
        );
        assert_eq!(
            DocumentSource::parse("file://localhost/srv/b%2Bc.pdf").local_path(),
            Some(PathBuf::from("/srv/b+c.pdf"))
        );
        assert_eq!(
            DocumentSource::parse("docs/a%20b.pdf").local_path(),
            Some(PathBuf::from("docs/a%20b.pdf"))
        );
        assert_eq!(DocumentSource::parse("https://example.com/a.pdf").local_path(), None);
    }

    #[test]
    fn parse_recognizes_url_schemes() {
        assert!(matches!(
            DocumentSource::parse("https://example.com/a.pdf"),
            DocumentSource::Url(_)
        ));
        assert!(matches!(
            DocumentSource::parse("FILE:///tmp/a.pdf"),
            DocumentSource::Url(_)
        ));
        assert_eq!(
            DocumentSource::parse("docs/a.pdf"),
            DocumentSource::Path(PathBuf::from("docs/a.pdf"))
        );
    }

    #[test]
    fn fit_scale_never_stretches() {
        let letter = PageSize::new(612.0, 792.0);
        let scale = letter.fit_scale(450, 600);
        assert!((scale - 450.0 / 612.0).abs() < 1e-6);

        let (w, h) = letter.scaled(scale);
        assert_eq!(w, 450);
        assert!(h <= 600);
    }

    #[test]
    fn target_url_prefers_direct_url() {
        let mut ann = RawAnnotation::link([0.0, 0.0, 10.0, 10.0], "");
        ann.action_url = Some("https://action.example".to_string());
        assert_eq!(ann.target_url(), Some("https://action.example"));

        ann.url = Some("https://direct.example".to_string());
        assert_eq!(ann.target_url(), Some("https://direct.example"));
    }

    #[test]
    fn data_url_has_mime_prefix() {
        let image = EncodedImage {
            width: 1,
            height: 1,
            mime: "image/jpeg",
            bytes: vec![0xFF, 0xD8],
        };
        assert_eq!(image.data_url(), "data:image/jpeg;base64,/9g=");
    }
}
