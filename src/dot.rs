use rand::Rng;

use crate::geometry::{cartesian_to_polar, normalize_degrees, polar_to_cartesian};
use crate::raster::{Colour, Surface};

/// Half-width of the angular jitter applied when a dot re-enters.
const REENTRY_JITTER: f64 = 90.0;

/// Shared parameters for every dot of one population.
#[derive(Debug, Clone, Copy)]
pub struct DotParams {
    /// Aperture centre in pixels.
    pub centre: (f64, f64),
    /// Signal direction in degrees.
    pub global_direction: f64,
    /// Probability that a dot follows `global_direction`.
    pub coherence: f64,
    /// Pixels per frame.
    pub speed: f64,
    /// Radius at which a dot is recycled (aperture radius minus dot size).
    pub max_radius: f64,
    pub colour: Colour,
    pub size: u32,
}

/// One random dot. Position is kept relative to the aperture centre, with
/// `(angle, radius)` as its polar mirror.
#[derive(Debug, Clone)]
pub struct Dot {
    centre: (f64, f64),
    x: f64,
    y: f64,
    angle: f64,
    radius: f64,
    direction: f64,
    speed: f64,
    dx: f64,
    dy: f64,
    max_radius: f64,
    colour: Colour,
    size: u32,
}

impl Dot {
    /// Place a dot at `initial_radius` on a uniformly random angle. The dot
    /// takes the global direction with probability `coherence`, otherwise a
    /// uniformly random one.
    pub fn new<R: Rng + ?Sized>(params: &DotParams, initial_radius: f64, rng: &mut R) -> Self {
        let angle = rng.gen_range(0.0..360.0);
        let direction = if rng.gen_bool(params.coherence) {
            normalize_degrees(params.global_direction)
        } else {
            rng.gen_range(0.0..360.0)
        };
        let (x, y) = polar_to_cartesian(angle, initial_radius);
        let (dx, dy) = polar_to_cartesian(direction, params.speed);
        Self {
            centre: params.centre,
            x,
            y,
            angle,
            radius: initial_radius,
            direction,
            speed: params.speed,
            dx,
            dy,
            max_radius: params.max_radius,
            colour: params.colour,
            size: params.size,
        }
    }

    pub fn position(&self) -> (f64, f64) { (self.x, self.y) }
    pub fn angle(&self) -> f64 { self.angle }
    pub fn radius(&self) -> f64 { self.radius }
    pub fn direction(&self) -> f64 { self.direction }
    pub fn speed(&self) -> f64 { self.speed }
    pub fn velocity(&self) -> (f64, f64) { (self.dx, self.dy) }
    pub fn max_radius(&self) -> f64 { self.max_radius }
    pub fn colour(&self) -> Colour { self.colour }
    pub fn size(&self) -> u32 { self.size }

    /// Position in surface pixels.
    pub fn screen_position(&self) -> (f64, f64) {
        (self.centre.0 + self.x, self.centre.1 + self.y)
    }

    /// Advance one frame.
    ///
    /// A dot sitting on the rim is recycled before it translates. A dot that
    /// would cross the rim during this frame is recycled and takes its step
    /// from the re-entry point instead, so `radius <= max_radius` holds
    /// after every call.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.radius >= self.max_radius {
            self.reset_position(rng);
        }
        self.translate();
        if self.radius > self.max_radius {
            self.reset_position(rng);
            self.translate();
        }
        // re-entry near ±90° jitter runs almost tangent to the rim
        if self.radius > self.max_radius {
            self.place(self.angle, self.max_radius);
        }
    }

    /// Re-enter on the rim, upstream of the direction of travel.
    pub fn reset_position<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let jitter = rng.gen_range(-REENTRY_JITTER..=REENTRY_JITTER);
        let angle = normalize_degrees(self.direction - 180.0 + jitter);
        self.place(angle, self.max_radius);
    }

    fn place(&mut self, angle: f64, radius: f64) {
        let (x, y) = polar_to_cartesian(angle, radius);
        self.x = x;
        self.y = y;
        self.angle = angle;
        self.radius = radius;
    }

    fn translate(&mut self) {
        self.x += self.dx;
        self.y += self.dy;
        let (angle, radius) = cartesian_to_polar(self.x, self.y);
        self.angle = angle;
        self.radius = radius;
    }
}

/// Draw a dot as a filled square at its current position.
pub fn render(dot: &Dot, surface: &mut dyn Surface) {
    surface.fill_square(dot.screen_position(), dot.size(), dot.colour());
}
