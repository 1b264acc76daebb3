//! CPU-side copy of a texture's pixels for color queries
//!
//! The cache keeps the last copy it read and only goes back to the source
//! after [`PixelCache::refresh`] has invalidated it. Reads outside the image
//! return transparent black instead of failing.

use bytemuck::{Pod, Zeroable};
use ember_core::Color;

/// One RGBA8 pixel
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_color(self) -> Color {
        Color::new(
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        )
    }
}

/// Something whose pixels can be read back, typically a GPU texture
pub trait PixelSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Fill `out` (`width * height` pixels, row-major) with the current contents.
    fn read_pixels(&self, out: &mut [Rgba8]);
}

/// Row-major RGBA8 image held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl MemoryImage {
    /// Returns `None` if `pixels` does not hold exactly `width * height` entries.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba8>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, color: Rgba8) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba8) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }
}

impl PixelSource for MemoryImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn read_pixels(&self, out: &mut [Rgba8]) {
        out.copy_from_slice(&self.pixels);
    }
}

/// Lazily refreshed pixel copy of a [`PixelSource`]
pub struct PixelCache<S: PixelSource> {
    source: S,
    width: u32,
    height: u32,
    data: Vec<Rgba8>,
    is_cached: bool,
}

impl<S: PixelSource> PixelCache<S> {
    /// Cache `source`, reading its pixels immediately.
    pub fn new(source: S) -> Self {
        let width = source.width();
        let height = source.height();
        let mut cache = Self {
            source,
            width,
            height,
            data: vec![Rgba8::TRANSPARENT; width as usize * height as usize],
            is_cached: false,
        };
        cache.ensure_cached();
        cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the source. The cache is not invalidated; call
    /// [`refresh`](PixelCache::refresh) after changing the pixels or the size.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Width of the cached copy
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_cached(&self) -> bool {
        self.is_cached
    }

    /// Drop the cached copy; the next read fetches a new one.
    pub fn refresh(&mut self) {
        self.is_cached = false;
    }

    fn ensure_cached(&mut self) {
        if !self.is_cached {
            self.width = self.source.width();
            self.height = self.source.height();
            self.data
                .resize(self.width as usize * self.height as usize, Rgba8::TRANSPARENT);
            self.source.read_pixels(&mut self.data);
            self.is_cached = true;
        }
    }

    /// Pixel at `(x, y)`, or transparent black outside the image.
    pub fn get_pixel(&mut self, x: i64, y: i64) -> Rgba8 {
        // An invalidated cache is checked against the size it will be refilled at
        let (width, height) = if self.is_cached {
            (self.width, self.height)
        } else {
            (self.source.width(), self.source.height())
        };
        let in_bounds =
            (0..i64::from(width)).contains(&x) && (0..i64::from(height)).contains(&y);
        if !in_bounds {
            return Rgba8::TRANSPARENT;
        }
        self.ensure_cached();
        self.data[(x + y * i64::from(self.width)) as usize]
    }

    pub fn rgba(&mut self, x: i64, y: i64) -> [u8; 4] {
        self.get_pixel(x, y).to_array()
    }

    pub fn red(&mut self, x: i64, y: i64) -> u8 {
        self.get_pixel(x, y).r
    }

    pub fn green(&mut self, x: i64, y: i64) -> u8 {
        self.get_pixel(x, y).g
    }

    pub fn blue(&mut self, x: i64, y: i64) -> u8 {
        self.get_pixel(x, y).b
    }

    pub fn alpha(&mut self, x: i64, y: i64) -> u8 {
        self.get_pixel(x, y).a
    }

    pub fn is_transparent(&mut self, x: i64, y: i64) -> bool {
        self.alpha(x, y) == 0
    }

    /// Raw RGBA bytes of the whole image, row-major.
    pub fn to_blob(&mut self) -> Vec<u8> {
        self.ensure_cached();
        bytemuck::cast_slice(&self.data).to_vec()
    }
}
