//! Condition lists, the per-trial phase sequence, and the session driver
//! that walks a whole experiment one frame at a time.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use tracing::{debug, info};

use crate::config::Config;
use crate::field::DotField;
use crate::phase::{self, BlankInterval, FixationMarker, Phase};
use crate::raster::{Frame, FrameStack, Raster, Surface};

/// Each angle repeated `repetitions` times, angles in the given order with
/// their repeats contiguous, then optionally shuffled.
pub fn build_trials<R: Rng + ?Sized>(
    repetitions: usize,
    angles: &[f64],
    shuffle: bool,
    rng: &mut R,
) -> Vec<f64> {
    let mut trials: Vec<f64> = angles
        .iter()
        .flat_map(|&angle| std::iter::repeat(angle).take(repetitions))
        .collect();
    if shuffle {
        trials.shuffle(rng);
    }
    trials
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Fixation,
    Stimulus,
    Blank,
}

impl TrialPhase {
    pub fn label(&self) -> &'static str {
        match self {
            TrialPhase::Fixation => "fixation",
            TrialPhase::Stimulus => "stimulus",
            TrialPhase::Blank => "blank",
        }
    }
}

/// Fixation, then the dot field, then the blank interval, every phase run
/// for its full frame count.
#[derive(Debug, Clone)]
pub struct TrialSequencer {
    fixation: FixationMarker,
    field: DotField,
    blank: BlankInterval,
    direction: f64,
    current: Option<TrialPhase>,
}

impl TrialSequencer {
    pub fn from_config<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> crate::Result<Self> {
        Ok(Self {
            fixation: FixationMarker::from_config(config),
            field: DotField::from_config(config, rng)?,
            blank: BlankInterval::from_config(config),
            direction: crate::field::DEFAULT_DIRECTION,
            current: None,
        })
    }

    pub fn field(&self) -> &DotField { &self.field }
    pub fn direction(&self) -> f64 { self.direction }
    /// Phase of the trial in progress, `None` between trials.
    pub fn current_phase(&self) -> Option<TrialPhase> { self.current }
    pub fn is_active(&self) -> bool { self.current.is_some() }

    pub fn frames_per_trial(&self) -> usize {
        self.fixation.duration() + self.field.duration() + self.blank.duration()
    }

    /// Record one whole trial and return its frames in phase order.
    pub fn run_trial(
        &mut self,
        direction: f64,
        surface: &mut dyn Surface,
        rng: &mut dyn RngCore,
    ) -> FrameStack {
        debug!(direction, "running trial");
        self.direction = direction;
        self.current = None;
        let mut frames = phase::record(&mut self.fixation, surface, rng);
        self.field.new_sample(direction, rng);
        frames.extend(self.field.run(surface, rng));
        frames.extend(phase::record(&mut self.blank, surface, rng));
        frames
    }

    /// Arm a trial for frame-by-frame playback with [`Self::tick`].
    pub fn begin(&mut self, direction: f64) {
        debug!(direction, "beginning trial");
        self.fixation.rewind();
        self.field.rewind();
        self.blank.rewind();
        self.direction = direction;
        self.current = Some(TrialPhase::Fixation);
    }

    /// Next frame of the armed trial, or `None` once its blank interval is
    /// over. Produces the same frames as [`Self::run_trial`] for the same
    /// random stream.
    pub fn tick(
        &mut self,
        surface: &mut dyn Surface,
        rng: &mut dyn RngCore,
    ) -> Option<(TrialPhase, Frame)> {
        loop {
            let current = self.current?;
            let frame = match current {
                TrialPhase::Fixation => phase::tick(&mut self.fixation, surface, rng),
                TrialPhase::Stimulus => phase::tick(&mut self.field, surface, rng),
                TrialPhase::Blank => phase::tick(&mut self.blank, surface, rng),
            };
            if let Some(frame) = frame {
                return Some((current, frame));
            }
            self.current = match current {
                TrialPhase::Fixation => {
                    self.fixation.rewind();
                    self.field.new_sample(self.direction, rng);
                    Some(TrialPhase::Stimulus)
                }
                TrialPhase::Stimulus => {
                    self.field.rewind();
                    Some(TrialPhase::Blank)
                }
                TrialPhase::Blank => {
                    self.blank.rewind();
                    None
                }
            };
            if let Some(next) = self.current {
                debug!(phase = next.label(), "phase transition");
            }
        }
    }
}

/// One frame of a running session.
#[derive(Debug, Clone)]
pub struct SessionFrame {
    pub trial_index: usize,
    pub direction: f64,
    pub phase: TrialPhase,
    pub frame: Frame,
}

/// A whole experiment: the condition list, the sequencer, the surface it
/// draws on and the random stream everything draws from.
#[derive(Debug, Clone)]
pub struct Session {
    trials: Vec<f64>,
    index: usize,
    sequencer: TrialSequencer,
    surface: Raster,
    rng: StdRng,
}

impl Session {
    /// Validates the config before anything is sampled.
    pub fn new(config: &Config) -> crate::Result<Self> {
        config.validate()?;
        let mut rng = config.rng();
        let experiment = &config.experiment;
        let trials = build_trials(experiment.repetitions, &experiment.angles, experiment.shuffle, &mut rng);
        let sequencer = TrialSequencer::from_config(config, &mut rng)?;
        let surface = Raster::new(config.window.width, config.window.height, config.window.background);
        info!(trials = trials.len(), frames_per_trial = sequencer.frames_per_trial(), "session ready");
        Ok(Self { trials, index: 0, sequencer, surface, rng })
    }

    pub fn trials(&self) -> &[f64] { &self.trials }
    pub fn surface(&self) -> &Raster { &self.surface }
    pub fn sequencer(&self) -> &TrialSequencer { &self.sequencer }
    pub fn is_finished(&self) -> bool { self.index >= self.trials.len() }

    /// Index of the trial being played (or next to play).
    pub fn trial_index(&self) -> usize { self.index }

    pub fn current_direction(&self) -> Option<f64> {
        self.trials.get(self.index).copied()
    }

    /// Pump one frame, starting the next trial when the previous one ends.
    pub fn tick(&mut self) -> Option<SessionFrame> {
        while let Some(direction) = self.current_direction() {
            if !self.sequencer.is_active() {
                self.sequencer.begin(direction);
            }
            if let Some((phase, frame)) = self.sequencer.tick(&mut self.surface, &mut self.rng) {
                return Some(SessionFrame { trial_index: self.index, direction, phase, frame });
            }
            self.index += 1;
        }
        None
    }

    /// Record every remaining trial, handing each one's frames to `sink`
    /// together with its index and direction. Stops at the first error.
    pub fn run_all<F>(&mut self, mut sink: F) -> crate::Result<()>
    where
        F: FnMut(usize, f64, FrameStack) -> crate::Result<()>,
    {
        info!(remaining = self.trials.len() - self.index, "running session");
        while let Some(direction) = self.current_direction() {
            let frames = self.sequencer.run_trial(direction, &mut self.surface, &mut self.rng);
            sink(self.index, direction, frames)?;
            self.index += 1;
        }
        info!("session finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.window.width = 120;
        config.window.height = 120;
        config.aperture.radius = 50.0;
        config.dots.count = 40;
        config.timing.fixation_frames = 3;
        config.timing.stimulus_frames = 5;
        config.timing.blank_frames = 4;
        config.experiment.angles = vec![0.0, 90.0];
        config.experiment.repetitions = 2;
        config.experiment.seed = Some(21);
        config
    }

    #[test]
    fn unshuffled_trials_keep_repeats_contiguous() {
        let mut rng = StdRng::seed_from_u64(1);
        let trials = build_trials(5, &[0.0, 90.0], false, &mut rng);
        assert_eq!(trials, vec![0.0, 0.0, 0.0, 0.0, 0.0, 90.0, 90.0, 90.0, 90.0, 90.0]);
    }

    #[test]
    fn shuffled_trials_are_a_permutation() {
        let angles = [0.0, 45.0, 90.0, 112.0, 240.0, 315.0];
        let mut rng = StdRng::seed_from_u64(2);
        let trials = build_trials(5, &angles, true, &mut rng);
        assert_eq!(trials.len(), 30);
        for angle in angles {
            assert_eq!(trials.iter().filter(|&&t| t == angle).count(), 5);
        }
        let mut sorted = trials.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(sorted, build_trials(5, &angles, false, &mut rng));
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let angles = [0.0, 90.0, 135.0];
        let a = build_trials(10, &angles, true, &mut StdRng::seed_from_u64(3));
        let b = build_trials(10, &angles, true, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn empty_inputs_give_empty_lists() {
        let mut rng = StdRng::seed_from_u64(4);
        assert!(build_trials(0, &[0.0, 90.0], true, &mut rng).is_empty());
        assert!(build_trials(3, &[], true, &mut rng).is_empty());
    }

    #[test]
    fn sequencer_rejects_invalid_config() {
        let mut config = small_config();
        config.dots.coherence = 1.5;
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            TrialSequencer::from_config(&config, &mut rng),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn run_trial_returns_all_phases_in_order() {
        let config = small_config();
        let mut rng = StdRng::seed_from_u64(5);
        let mut surface = Raster::new(config.window.width, config.window.height, config.window.background);
        let mut seq = TrialSequencer::from_config(&config, &mut rng).unwrap();
        for direction in [0.0, 112.5, 359.0] {
            let frames = seq.run_trial(direction, &mut surface, &mut rng);
            assert_eq!(frames.len(), config.frames_per_trial());
            assert_eq!(seq.field().global_direction(), direction);
            // blank frames close the trial
            assert!(frames.iter().skip(8).all(|f| f.peak() == 0.0));
            assert!(frames.iter().take(8).all(|f| f.peak() > 0.0));
        }
    }

    #[test]
    fn tick_playback_matches_run_trial() {
        let config = small_config();
        let mut surface = Raster::new(config.window.width, config.window.height, config.window.background);

        let mut rng = StdRng::seed_from_u64(6);
        let mut seq = TrialSequencer::from_config(&config, &mut rng).unwrap();
        let recorded = seq.run_trial(90.0, &mut surface, &mut rng);

        let mut rng = StdRng::seed_from_u64(6);
        let mut seq = TrialSequencer::from_config(&config, &mut rng).unwrap();
        seq.begin(90.0);
        let mut phases = Vec::new();
        let mut played = FrameStack::new(config.window.width, config.window.height);
        while let Some((phase, frame)) = seq.tick(&mut surface, &mut rng) {
            phases.push(phase);
            played.push(frame);
        }
        assert_eq!(played, recorded);
        assert!(!seq.is_active());

        let expected: Vec<TrialPhase> = std::iter::repeat(TrialPhase::Fixation)
            .take(3)
            .chain(std::iter::repeat(TrialPhase::Stimulus).take(5))
            .chain(std::iter::repeat(TrialPhase::Blank).take(4))
            .collect();
        assert_eq!(phases, expected);
    }

    #[test]
    fn session_plays_every_trial() {
        let config = small_config();
        let mut session = Session::new(&config).unwrap();
        assert_eq!(session.trials().len(), 4);
        let mut count = 0;
        let mut seen = Vec::new();
        while let Some(frame) = session.tick() {
            count += 1;
            if seen.last() != Some(&frame.trial_index) {
                seen.push(frame.trial_index);
            }
        }
        assert_eq!(count, 4 * config.frames_per_trial());
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(session.is_finished());
        assert!(session.tick().is_none());
    }

    #[test]
    fn run_all_hands_out_each_trial() {
        let config = small_config();
        let mut session = Session::new(&config).unwrap();
        let trials = session.trials().to_vec();
        let mut got = Vec::new();
        session
            .run_all(|index, direction, frames| {
                assert_eq!(frames.len(), config.frames_per_trial());
                got.push((index, direction));
                Ok(())
            })
            .unwrap();
        let expected: Vec<(usize, f64)> = trials.into_iter().enumerate().collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn invalid_config_fails_before_sampling() {
        let mut config = small_config();
        config.dots.coherence = 1.5;
        assert!(matches!(Session::new(&config), Err(crate::Error::Config(_))));
    }
}
