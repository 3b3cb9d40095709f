//! Thumbnail grid rendered lazily as tiles scroll into view

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::pdf::EncodedImage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbState {
    Empty,
    Loading,
    Loaded,
    Error,
}

/// Rendered thumbnails by page index; never evicted
#[derive(Debug, Default)]
pub struct ThumbnailCache {
    images: HashMap<usize, Arc<EncodedImage>>,
}

impl ThumbnailCache {
    #[must_use]
    pub fn get(&self, page: usize) -> Option<Arc<EncodedImage>> {
        self.images.get(&page).cloned()
    }

    pub fn insert(&mut self, page: usize, image: Arc<EncodedImage>) {
        self.images.insert(page, image);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ThumbTile {
    pub state: ThumbState,
    /// Still watched for visibility
    pub observed: bool,
}

#[derive(Debug)]
pub struct ThumbnailPanel {
    tiles: Vec<ThumbTile>,
    cache: ThumbnailCache,
    open: bool,
    active: usize,
    scroll_target: Option<usize>,
    pub thumb_width: u32,
    pub thumb_height: u32,
}

impl ThumbnailPanel {
    #[must_use]
    pub fn new(page_count: usize, thumb_width: u32, thumb_height: u32) -> Self {
        Self {
            tiles: vec![
                ThumbTile {
                    state: ThumbState::Empty,
                    observed: true,
                };
                page_count
            ],
            cache: ThumbnailCache::default(),
            open: false,
            active: 0,
            scroll_target: None,
            thumb_width,
            thumb_height,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Highlighted page index
    #[must_use]
    pub fn active(&self) -> usize {
        self.active
    }

    #[must_use]
    pub fn tile(&self, page: usize) -> Option<&ThumbTile> {
        self.tiles.get(page)
    }

    #[must_use]
    pub fn image(&self, page: usize) -> Option<Arc<EncodedImage>> {
        self.cache.get(page)
    }

    /// Page the grid should scroll to, consumed by the host
    pub fn take_scroll_target(&mut self) -> Option<usize> {
        self.scroll_target.take()
    }

    pub fn open(&mut self, current: usize) {
        self.open = true;
        self.active = current;
        self.scroll_target = Some(current);
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle(&mut self, current: usize) {
        if self.open {
            self.close();
        } else {
            self.open(current);
        }
    }

    /// Tiles rendered from now on use this height
    pub fn set_thumb_height(&mut self, height: u32) {
        self.thumb_height = height.max(1);
    }

    pub fn on_flip(&mut self, index: usize) {
        self.active = index;
        if self.open {
            self.scroll_target = Some(index);
        }
    }

    /// Tiles that became visible. Returns the pages that need a render; pages
    /// already cached are filled in directly.
    pub fn visible(&mut self, pages: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut to_render = vec![];
        for page in pages {
            let Some(tile) = self.tiles.get_mut(page) else {
                continue;
            };
            if !tile.observed || matches!(tile.state, ThumbState::Loaded | ThumbState::Loading) {
                continue;
            }
            if self.cache.get(page).is_some() {
                tile.state = ThumbState::Loaded;
                tile.observed = false;
            } else {
                tile.state = ThumbState::Loading;
                to_render.push(page);
            }
        }
        to_render
    }

    pub fn rendered(&mut self, page: usize, image: Arc<EncodedImage>) {
        self.cache.insert(page, image);
        if let Some(tile) = self.tiles.get_mut(page) {
            tile.state = ThumbState::Loaded;
            tile.observed = false;
        }
    }

    /// The tile shows an error marker and is retried on its next visibility
    pub fn failed(&mut self, page: usize) {
        if let Some(tile) = self.tiles.get_mut(page) {
            tile.state = ThumbState::Error;
        }
    }

    /// Tile click: the page to flip to; the panel closes
    pub fn click(&mut self, page: usize) -> usize {
        self.close();
        page
    }

    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Arc<EncodedImage> {
        Arc::new(EncodedImage {
            width: 90,
            height: 120,
            mime: "image/jpeg",
            bytes: vec![1, 2, 3],
        })
    }

    #[test]
    fn visible_tiles_render_once() {
        let mut panel = ThumbnailPanel::new(10, 90, 120);
        assert_eq!(panel.visible(0..4), vec![0, 1, 2, 3]);
        assert_eq!(panel.visible(0..6), vec![4, 5]);

        panel.rendered(2, image());
        assert_eq!(panel.tile(2).map(|t| t.state), Some(ThumbState::Loaded));
        assert!(panel.visible([2]).is_empty());
        assert_eq!(panel.cached(), 1);
    }

    #[test]
    fn failed_tile_retries_when_visible_again() {
        let mut panel = ThumbnailPanel::new(3, 90, 120);
        assert_eq!(panel.visible([1]), vec![1]);
        panel.failed(1);
        assert_eq!(panel.tile(1).map(|t| t.state), Some(ThumbState::Error));
        assert_eq!(panel.visible([1]), vec![1]);
    }

    #[test]
    fn flip_moves_highlight_and_scrolls_only_when_open() {
        let mut panel = ThumbnailPanel::new(10, 90, 120);
        panel.on_flip(4);
        assert_eq!(panel.active(), 4);
        assert_eq!(panel.take_scroll_target(), None);

        panel.toggle(4);
        assert_eq!(panel.take_scroll_target(), Some(4));
        panel.on_flip(6);
        assert_eq!(panel.take_scroll_target(), Some(6));

        assert_eq!(panel.click(8), 8);
        assert!(!panel.is_open());
    }

    #[test]
    fn thumb_height_follows_geometry() {
        let mut panel = ThumbnailPanel::new(3, 90, 120);
        panel.set_thumb_height(27);
        assert_eq!(panel.thumb_height, 27);
        panel.set_thumb_height(0);
        assert_eq!(panel.thumb_height, 1);
    }
}
