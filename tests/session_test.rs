//! End-to-end runs through the public API: config in, frames on disk out.

use rdk::export::{read_stack, trial_file_name, write_stack};
use rdk::trial::TrialPhase;
use rdk::{Config, Session};
use tempfile::TempDir;

fn config(seed: u64) -> Config {
    let mut config = Config::default();
    config.window.width = 160;
    config.window.height = 160;
    config.aperture.radius = 70.0;
    config.dots.count = 80;
    config.dots.coherence = 0.5;
    config.timing.fixation_frames = 4;
    config.timing.stimulus_frames = 10;
    config.timing.blank_frames = 6;
    config.experiment.angles = vec![0.0, 90.0, 225.0];
    config.experiment.repetitions = 2;
    config.experiment.seed = Some(seed);
    config
}

#[test]
fn session_exports_every_trial() {
    let dir = TempDir::new().unwrap();
    let config = config(11);
    let mut session = Session::new(&config).unwrap();
    let trials = session.trials().to_vec();
    assert_eq!(trials.len(), 6);

    session
        .run_all(|index, direction, frames| {
            write_stack(&dir.path().join(trial_file_name(index, direction)), &frames)
        })
        .unwrap();

    for (index, direction) in trials.iter().enumerate() {
        let stack = read_stack(&dir.path().join(trial_file_name(index, *direction))).unwrap();
        assert_eq!(stack.len(), config.frames_per_trial());
        assert_eq!((stack.width(), stack.height()), (160, 160));
        // every non-blank frame is normalised to full scale
        for (i, frame) in stack.iter().enumerate() {
            let peak = frame.peak();
            if i < 14 {
                assert_eq!(peak, 255.0, "trial {} frame {}", index, i);
            } else {
                assert_eq!(peak, 0.0, "trial {} frame {}", index, i);
            }
        }
    }
}

#[test]
fn same_seed_same_frames() {
    let mut a = Session::new(&config(5)).unwrap();
    let mut b = Session::new(&config(5)).unwrap();
    assert_eq!(a.trials(), b.trials());
    for _ in 0..50 {
        let fa = a.tick().unwrap();
        let fb = b.tick().unwrap();
        assert_eq!(fa.phase, fb.phase);
        assert_eq!(fa.frame, fb.frame);
    }
}

#[test]
fn phases_follow_fixed_order_for_every_trial() {
    let config = config(8);
    let mut session = Session::new(&config).unwrap();
    let mut per_trial: Vec<Vec<TrialPhase>> = vec![Vec::new(); session.trials().len()];
    while let Some(f) = session.tick() {
        per_trial[f.trial_index].push(f.phase);
    }
    for phases in per_trial {
        assert_eq!(phases.len(), config.frames_per_trial());
        assert!(phases[..4].iter().all(|p| *p == TrialPhase::Fixation));
        assert!(phases[4..14].iter().all(|p| *p == TrialPhase::Stimulus));
        assert!(phases[14..].iter().all(|p| *p == TrialPhase::Blank));
    }
}

#[test]
fn dots_stay_inside_the_aperture_for_a_whole_session() {
    let config = config(13);
    let mut session = Session::new(&config).unwrap();
    while let Some(f) = session.tick() {
        if f.phase == TrialPhase::Stimulus {
            let field = session.sequencer().field();
            assert_eq!(field.dots().len(), config.dots.count);
            for dot in field.dots() {
                let (x, y) = dot.position();
                assert!(x.hypot(y) <= config.max_radius() + 1e-9);
            }
        }
    }
}
