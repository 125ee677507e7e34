//! Render surface, greyscale frame captures and frame stacks.

use serde::{Deserialize, Serialize};

/// Intensity a normalised frame's brightest pixel maps to.
pub const PEAK_INTENSITY: f32 = 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colour(pub u8, pub u8, pub u8);

impl Colour {
    pub const BLACK: Colour = Colour(0, 0, 0);
    pub const WHITE: Colour = Colour(255, 255, 255);

    /// Greyscale intensity (Rec.601 weights).
    pub fn luma(&self) -> f32 {
        0.299 * self.0 as f32 + 0.587 * self.1 as f32 + 0.114 * self.2 as f32
    }
}

/// Anything the stimulus can be drawn onto and captured from.
///
/// Coordinates are pixels with x growing right and y growing down. Drawing
/// outside the surface is clipped, never an error.
pub trait Surface {
    fn size(&self) -> (usize, usize);
    fn fill(&mut self, colour: Colour);
    /// Filled axis-aligned square of side `side` centred on `centre`.
    fn fill_square(&mut self, centre: (f64, f64), side: u32, colour: Colour);
    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), width: u32, colour: Colour);
    /// Circle outline `width` pixels thick, drawn inward from `radius`.
    /// A width of 0 fills the disc.
    fn draw_circle(&mut self, centre: (f64, f64), radius: f64, width: u32, colour: Colour);
    fn capture_frame(&self) -> Frame;
}

/// In-memory RGB raster.
#[derive(Debug, Clone)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Colour>,
}

impl Raster {
    pub fn new(width: usize, height: usize, background: Colour) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width * height],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Colour> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    fn put(&mut self, x: i64, y: i64, colour: Colour) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        self.pixels[y as usize * self.width + x as usize] = colour;
    }

    fn stamp(&mut self, x: i64, y: i64, brush: u32, colour: Colour) {
        let brush = brush.max(1) as i64;
        let offset = (brush - 1) / 2;
        for by in 0..brush {
            for bx in 0..brush {
                self.put(x - offset + bx, y - offset + by, colour);
            }
        }
    }

    fn line_cells(x0: i64, y0: i64, x1: i64, y1: i64) -> Vec<(i64, i64)> {
        let mut cells = Vec::new();
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut cx = x0;
        let mut cy = y0;
        loop {
            cells.push((cx, cy));
            if cx == x1 && cy == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; cx += sx; }
            if e2 <= dx { err += dx; cy += sy; }
        }
        cells
    }
}

impl Surface for Raster {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn fill(&mut self, colour: Colour) {
        self.pixels.fill(colour);
    }

    fn fill_square(&mut self, centre: (f64, f64), side: u32, colour: Colour) {
        let half = side as f64 / 2.0;
        let x0 = (centre.0 - half).floor() as i64;
        let y0 = (centre.1 - half).floor() as i64;
        for dy in 0..side as i64 {
            for dx in 0..side as i64 {
                self.put(x0 + dx, y0 + dy, colour);
            }
        }
    }

    fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), width: u32, colour: Colour) {
        let cells = Self::line_cells(
            from.0.round() as i64,
            from.1.round() as i64,
            to.0.round() as i64,
            to.1.round() as i64,
        );
        for (x, y) in cells {
            self.stamp(x, y, width, colour);
        }
    }

    fn draw_circle(&mut self, centre: (f64, f64), radius: f64, width: u32, colour: Colour) {
        let outer = radius + 0.5;
        let inner = if width == 0 { f64::NEG_INFINITY } else { radius - width as f64 + 0.5 };
        let x_min = (centre.0 - outer).floor() as i64;
        let x_max = (centre.0 + outer).ceil() as i64;
        let y_min = (centre.1 - outer).floor() as i64;
        let y_max = (centre.1 + outer).ceil() as i64;
        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let d = (x as f64 - centre.0).hypot(y as f64 - centre.1);
                if d <= outer && d > inner {
                    self.put(x, y, colour);
                }
            }
        }
    }

    fn capture_frame(&self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            data: self.pixels.iter().map(Colour::luma).collect(),
        }
    }
}

/// One greyscale capture of a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Frame {
    pub fn from_pixels(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    /// Row-major intensities.
    pub fn pixels(&self) -> &[f32] {
        &self.data
    }

    pub fn peak(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }

    /// Rescale so the brightest pixel equals `peak`. An all-black frame
    /// has nothing to scale and comes back unchanged.
    pub fn normalized(&self, peak: f32) -> Frame {
        let max = self.peak();
        if max <= 0.0 {
            return self.clone();
        }
        let scale = peak / max;
        Frame {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| v * scale).collect(),
        }
    }

    /// Intensities rounded and clamped into bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .collect()
    }
}

/// Ordered frames of one size.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStack {
    width: usize,
    height: usize,
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, frames: Vec::new() }
    }

    pub fn with_capacity(width: usize, height: usize, capacity: usize) -> Self {
        Self { width, height, frames: Vec::with_capacity(capacity) }
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn len(&self) -> usize { self.frames.len() }
    pub fn is_empty(&self) -> bool { self.frames.is_empty() }

    /// Frames of a different size are dropped; a stack never mixes sizes.
    pub fn push(&mut self, frame: Frame) -> bool {
        if frame.width != self.width || frame.height != self.height {
            return false;
        }
        self.frames.push(frame);
        true
    }

    /// Append another stack's frames in order.
    pub fn extend(&mut self, other: FrameStack) {
        for frame in other.frames {
            self.push(frame);
        }
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }
}

impl<'a> IntoIterator for &'a FrameStack {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
