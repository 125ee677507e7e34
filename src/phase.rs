//! The capture protocol shared by every phase of a trial, plus the two
//! static phases: the fixation marker and the blank interval.

use rand::RngCore;
use tracing::trace;

use crate::config::Config;
use crate::raster::{Colour, Frame, FrameStack, Surface, PEAK_INTENSITY};

/// Frames left to show out of a fixed budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    duration: usize,
    remaining: usize,
}

impl Countdown {
    pub fn new(duration: usize) -> Self {
        Self { duration, remaining: duration }
    }

    pub fn duration(&self) -> usize { self.duration }
    pub fn remaining(&self) -> usize { self.remaining }
    pub fn is_done(&self) -> bool { self.remaining == 0 }

    fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn rewind(&mut self) {
        self.remaining = self.duration;
    }
}

/// A stretch of a trial that shows a fixed number of frames.
pub trait Phase {
    fn countdown(&self) -> &Countdown;
    fn countdown_mut(&mut self) -> &mut Countdown;
    /// Paint the current state onto the surface, background included.
    fn draw(&self, surface: &mut dyn Surface);
    /// Evolve after a frame has been captured.
    fn step(&mut self, _rng: &mut dyn RngCore) {}

    fn duration(&self) -> usize {
        self.countdown().duration()
    }

    fn remaining(&self) -> usize {
        self.countdown().remaining()
    }

    fn rewind(&mut self) {
        self.countdown_mut().rewind();
    }
}

/// Produce the next frame of `phase`: draw, capture, normalise, then step.
/// Returns `None` once the frame budget is spent.
pub fn tick<P: Phase + ?Sized>(
    phase: &mut P,
    surface: &mut dyn Surface,
    rng: &mut dyn RngCore,
) -> Option<Frame> {
    if phase.countdown().is_done() {
        return None;
    }
    phase.draw(surface);
    let frame = surface.capture_frame().normalized(PEAK_INTENSITY);
    phase.step(rng);
    phase.countdown_mut().consume();
    trace!(remaining = phase.remaining(), "captured frame");
    Some(frame)
}

/// Run a phase to completion and rewind it for reuse. Always returns
/// exactly `duration()` frames.
pub fn record<P: Phase + ?Sized>(
    phase: &mut P,
    surface: &mut dyn Surface,
    rng: &mut dyn RngCore,
) -> FrameStack {
    let (width, height) = surface.size();
    let mut frames = FrameStack::with_capacity(width, height, phase.remaining());
    while let Some(frame) = tick(phase, surface, rng) {
        frames.push(frame);
    }
    phase.rewind();
    frames
}

/// Fixation cross with the aperture outline.
#[derive(Debug, Clone)]
pub struct FixationMarker {
    centre: (f64, f64),
    half_extent: (f64, f64),
    line_width: u32,
    colour: Colour,
    aperture_radius: f64,
    aperture_width: u32,
    aperture_colour: Colour,
    background: Colour,
    countdown: Countdown,
}

impl FixationMarker {
    pub fn from_config(config: &Config) -> Self {
        Self {
            centre: config.window.centre(),
            half_extent: (config.fixation.half_extent[0], config.fixation.half_extent[1]),
            line_width: config.fixation.line_width,
            colour: config.fixation.colour,
            aperture_radius: config.aperture.radius,
            aperture_width: config.aperture.line_width,
            aperture_colour: config.aperture.colour,
            background: config.window.background,
            countdown: Countdown::new(config.timing.fixation_frames),
        }
    }

    /// Cross and aperture only, over whatever is already on the surface.
    pub fn draw_overlay(&self, surface: &mut dyn Surface) {
        let (cx, cy) = self.centre;
        let (hw, hh) = self.half_extent;
        surface.draw_line((cx - hw, cy), (cx + hw, cy), self.line_width, self.colour);
        surface.draw_line((cx, cy - hh), (cx, cy + hh), self.line_width, self.colour);
        surface.draw_circle(self.centre, self.aperture_radius, self.aperture_width, self.aperture_colour);
    }
}

impl Phase for FixationMarker {
    fn countdown(&self) -> &Countdown { &self.countdown }
    fn countdown_mut(&mut self) -> &mut Countdown { &mut self.countdown }

    fn draw(&self, surface: &mut dyn Surface) {
        surface.fill(self.background);
        self.draw_overlay(surface);
    }
}

/// Background only, for the inter-trial interval.
#[derive(Debug, Clone)]
pub struct BlankInterval {
    background: Colour,
    countdown: Countdown,
}

impl BlankInterval {
    pub fn new(background: Colour, frames: usize) -> Self {
        Self { background, countdown: Countdown::new(frames) }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.window.background, config.timing.blank_frames)
    }
}

impl Phase for BlankInterval {
    fn countdown(&self) -> &Countdown { &self.countdown }
    fn countdown_mut(&mut self) -> &mut Countdown { &mut self.countdown }

    fn draw(&self, surface: &mut dyn Surface) {
        surface.fill(self.background);
    }
}
