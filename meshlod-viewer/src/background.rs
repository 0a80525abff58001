//! Scene background images

use crate::ViewerResult;
use image::RgbaImage;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A decoded background image, cheap to clone
#[derive(Clone)]
pub struct BackgroundImage {
    name: String,
    pixels: Arc<RgbaImage>,
}

impl BackgroundImage {
    pub fn new(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            pixels: Arc::new(pixels),
        }
    }

    /// Decode the image at `path`; the format follows the file extension
    pub fn load(name: impl Into<String>, path: &Path) -> ViewerResult<Self> {
        let pixels = image::open(path)?.to_rgba8();
        Ok(Self::new(name, pixels))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl fmt::Debug for BackgroundImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundImage")
            .field("name", &self.name)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

/// Empty names and "none" in any case remove the background
pub fn clears_background(name: &str) -> bool {
    name.is_empty() || name.eq_ignore_ascii_case("none")
}
