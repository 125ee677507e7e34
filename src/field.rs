use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};
use tracing::debug;

use crate::config::Config;
use crate::dot::{self, Dot, DotParams};
use crate::phase::{self, Countdown, FixationMarker, Phase};
use crate::raster::{Colour, FrameStack, Surface};

/// Motion direction a field starts with before its first trial.
pub const DEFAULT_DIRECTION: f64 = 180.0;

/// Distribution over integer radii `[0, max_radius)` with weight
/// proportional to the radius. Rings further out have more circumference,
/// so this keeps dot density per unit area flat across the aperture.
pub fn radius_distribution(max_radius: usize) -> crate::Result<WeightedIndex<f64>> {
    WeightedIndex::new((0..max_radius).map(|r| r as f64))
        .map_err(|e| crate::Error::Sampling(format!("max radius {}: {}", max_radius, e)))
}

/// Draw `n` initial radii from [`radius_distribution`].
pub fn sample_radii<R: Rng + ?Sized>(max_radius: usize, n: usize, rng: &mut R) -> crate::Result<Vec<f64>> {
    let dist = radius_distribution(max_radius)?;
    Ok((0..n).map(|_| dist.sample(rng) as f64).collect())
}

/// The dot population inside the aperture.
///
/// The number of dots is fixed for the field's lifetime; a new sample
/// replaces every dot at once.
#[derive(Debug, Clone)]
pub struct DotField {
    dots: Vec<Dot>,
    n_dots: usize,
    params: DotParams,
    aperture_radius: f64,
    background: Colour,
    overlay: Option<FixationMarker>,
    radii: WeightedIndex<f64>,
    countdown: Countdown,
}

impl DotField {
    /// Build a field and sample its first population. The config is
    /// validated first, so bad parameters never reach the sampler.
    pub fn from_config<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> crate::Result<Self> {
        config.validate()?;
        let max_radius = config.max_radius();
        let radii = radius_distribution(max_radius.floor() as usize)?;
        let overlay = config
            .fixation
            .overlay_during_stimulus
            .then(|| FixationMarker::from_config(config));
        let mut field = Self {
            dots: Vec::with_capacity(config.dots.count),
            n_dots: config.dots.count,
            params: DotParams {
                centre: config.window.centre(),
                global_direction: DEFAULT_DIRECTION,
                coherence: config.dots.coherence,
                speed: config.dots.speed,
                max_radius,
                colour: config.dots.colour,
                size: config.dots.size,
            },
            aperture_radius: config.aperture.radius,
            background: config.window.background,
            overlay,
            radii,
            countdown: Countdown::new(config.timing.stimulus_frames),
        };
        field.sample_dots(rng);
        Ok(field)
    }

    pub fn dots(&self) -> &[Dot] { &self.dots }
    pub fn len(&self) -> usize { self.n_dots }
    pub fn is_empty(&self) -> bool { self.n_dots == 0 }
    pub fn global_direction(&self) -> f64 { self.params.global_direction }
    pub fn coherence(&self) -> f64 { self.params.coherence }
    pub fn aperture_radius(&self) -> f64 { self.aperture_radius }
    pub fn max_radius(&self) -> f64 { self.params.max_radius }

    /// Replace the population with `n_dots` fresh dots carrying the current
    /// direction and coherence.
    pub fn sample_dots<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let params = self.params;
        let radii = &self.radii;
        self.dots = (0..self.n_dots)
            .map(|_| {
                let radius = radii.sample(rng) as f64;
                Dot::new(&params, radius, rng)
            })
            .collect();
    }

    /// Set the signal direction and resample every dot. Called once per
    /// trial before the stimulus runs.
    pub fn new_sample<R: Rng + ?Sized>(&mut self, direction: f64, rng: &mut R) {
        self.params.global_direction = direction;
        self.sample_dots(rng);
        self.countdown.rewind();
        debug!(direction, coherence = self.params.coherence, dots = self.n_dots, "resampled dot field");
    }

    /// Move every dot one frame. Dots do not interact.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for dot in &mut self.dots {
            dot.step(rng);
        }
    }

    /// Clear to the background, draw the optional fixation overlay, then
    /// every dot.
    pub fn render_frame(&self, surface: &mut dyn Surface) {
        surface.fill(self.background);
        if let Some(overlay) = &self.overlay {
            overlay.draw_overlay(surface);
        }
        for d in &self.dots {
            dot::render(d, surface);
        }
    }

    /// Capture exactly `duration()` frames, advancing after each, then
    /// rewind the countdown for the next trial.
    pub fn run(&mut self, surface: &mut dyn Surface, rng: &mut dyn RngCore) -> FrameStack {
        phase::record(self, surface, rng)
    }
}

impl Phase for DotField {
    fn countdown(&self) -> &Countdown { &self.countdown }
    fn countdown_mut(&mut self) -> &mut Countdown { &mut self.countdown }

    fn draw(&self, surface: &mut dyn Surface) {
        self.render_frame(surface);
    }

    fn step(&mut self, rng: &mut dyn RngCore) {
        self.advance(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(coherence: f64) -> Config {
        let mut config = Config::default();
        config.dots.coherence = coherence;
        config
    }

    #[test]
    fn radii_favour_the_outer_rings() {
        let mut rng = StdRng::seed_from_u64(10);
        let radii = sample_radii(100, 20_000, &mut rng).unwrap();
        assert!(radii.iter().all(|&r| (0.0..100.0).contains(&r)));
        assert!(!radii.contains(&0.0));

        // weight ∝ r puts 1225/4950 of the mass below r = 50
        let inner = radii.iter().filter(|&&r| r < 50.0).count() as f64 / radii.len() as f64;
        assert!((0.22..0.28).contains(&inner), "inner fraction {}", inner);

        let mut quartiles = [0usize; 4];
        for r in &radii {
            quartiles[(*r as usize) / 25] += 1;
        }
        assert!(quartiles.windows(2).all(|w| w[0] < w[1]), "{:?}", quartiles);
    }

    #[test]
    fn density_per_area_is_flat() {
        let mut rng = StdRng::seed_from_u64(11);
        let radii = sample_radii(100, 40_000, &mut rng).unwrap();
        // equal-area annuli: [0, 50), [50, 70.7), [70.7, 86.6), [86.6, 100)
        let edges = [0.0, 50.0, 50.0 * 2f64.sqrt(), 50.0 * 3f64.sqrt(), 100.0];
        let counts: Vec<usize> = edges
            .windows(2)
            .map(|e| radii.iter().filter(|&&r| r >= e[0] && r < e[1]).count())
            .collect();
        let mean = radii.len() as f64 / 4.0;
        for c in counts {
            assert!((c as f64 - mean).abs() / mean < 0.1, "annulus count {} vs {}", c, mean);
        }
    }

    #[test]
    fn too_small_aperture_is_a_sampling_error() {
        let mut rng = StdRng::seed_from_u64(12);
        assert!(matches!(sample_radii(1, 10, &mut rng), Err(crate::Error::Sampling(_))));
        assert!(matches!(sample_radii(0, 10, &mut rng), Err(crate::Error::Sampling(_))));
    }

    #[test]
    fn invalid_coherence_is_a_config_error() {
        let mut rng = StdRng::seed_from_u64(19);
        for coherence in [1.5, -0.1, f64::NAN] {
            let result = DotField::from_config(&config(coherence), &mut rng);
            assert!(matches!(result, Err(crate::Error::Config(_))), "{}", coherence);
        }
    }

    #[test]
    fn full_coherence_means_every_dot_follows_signal() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut field = DotField::from_config(&config(1.0), &mut rng).unwrap();
        field.new_sample(45.0, &mut rng);
        assert_eq!(field.global_direction(), 45.0);
        assert!(field.dots().iter().all(|d| d.direction() == 45.0));
    }

    #[test]
    fn zero_coherence_directions_are_uniform() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut field = DotField::from_config(&config(0.0), &mut rng).unwrap();
        let mut bins = [0usize; 12];
        let mut total = 0usize;
        for _ in 0..180 {
            field.new_sample(90.0, &mut rng);
            for d in field.dots() {
                bins[(d.direction() / 30.0) as usize % 12] += 1;
                total += 1;
            }
        }
        let expected = total as f64 / 12.0;
        let chi2: f64 = bins
            .iter()
            .map(|&o| (o as f64 - expected).powi(2) / expected)
            .sum();
        // 11 degrees of freedom, p = 0.001
        assert!(chi2 < 31.26, "chi-square {} over {:?}", chi2, bins);
    }

    #[test]
    fn partial_coherence_splits_roughly_by_probability() {
        let mut rng = StdRng::seed_from_u64(15);
        let mut field = DotField::from_config(&config(0.3), &mut rng).unwrap();
        let mut signal = 0usize;
        let mut total = 0usize;
        for _ in 0..50 {
            field.new_sample(270.0, &mut rng);
            signal += field.dots().iter().filter(|d| d.direction() == 270.0).count();
            total += field.len();
        }
        let fraction = signal as f64 / total as f64;
        assert!((fraction - 0.3).abs() < 0.03, "signal fraction {}", fraction);
    }

    #[test]
    fn population_size_is_constant() {
        let mut rng = StdRng::seed_from_u64(16);
        let cfg = config(0.5);
        let mut field = DotField::from_config(&cfg, &mut rng).unwrap();
        assert_eq!(field.dots().len(), cfg.dots.count);
        for direction in [0.0, 112.0, 315.0] {
            field.new_sample(direction, &mut rng);
            for _ in 0..10 {
                field.advance(&mut rng);
            }
            assert_eq!(field.dots().len(), cfg.dots.count);
        }
    }

    #[test]
    fn run_returns_duration_frames_and_rewinds() {
        let cfg = config(1.0);
        let mut rng = StdRng::seed_from_u64(17);
        let mut raster = Raster::new(cfg.window.width, cfg.window.height, cfg.window.background);
        let mut field = DotField::from_config(&cfg, &mut rng).unwrap();
        field.new_sample(0.0, &mut rng);
        let frames = field.run(&mut raster, &mut rng);
        assert_eq!(frames.len(), cfg.timing.stimulus_frames);
        assert_eq!(field.remaining(), cfg.timing.stimulus_frames);
        assert!(frames.iter().all(|f| f.peak() > 254.0));
        for d in field.dots() {
            assert!(d.radius() <= field.max_radius() + 1e-9);
        }
    }

    #[test]
    fn frames_change_as_dots_move() {
        let cfg = config(1.0);
        let mut rng = StdRng::seed_from_u64(18);
        let mut raster = Raster::new(cfg.window.width, cfg.window.height, cfg.window.background);
        let mut field = DotField::from_config(&cfg, &mut rng).unwrap();
        let frames = field.run(&mut raster, &mut rng);
        assert_ne!(frames.get(0), frames.get(1));
    }
}
