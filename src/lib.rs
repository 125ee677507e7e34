//! # rdk
//!
//! Random-dot motion kinematogram (RDK) generation for psychophysics.
//!
//! A field of small dots is shown inside a circular aperture. Each dot moves
//! in the global signal direction with probability `coherence`, otherwise in
//! a direction of its own. Dots that leave the aperture re-enter from the
//! upstream edge. A trial is a fixation phase, the moving dots, and a blank
//! inter-trial interval, all captured frame by frame.
//!
//! ## Modules
//!
//! - [`geometry`]: polar/cartesian helpers (degrees throughout)
//! - [`raster`]: the render surface, greyscale frames and frame stacks
//! - [`dot`]: a single dot and its kinematics
//! - [`field`]: the dot population inside the aperture
//! - [`phase`]: fixation, blank interval and the shared capture protocol
//! - [`trial`]: condition lists, trial sequencing and the session driver
//! - [`config`]: TOML configuration with validation
//! - [`export`]: writing captured frames to disk
//!
//! Frame count is the only unit of time in the library. Pacing against a
//! wall clock belongs to whoever pumps [`trial::Session::tick`].

pub mod config;
pub mod dot;
pub mod export;
pub mod field;
pub mod geometry;
pub mod phase;
pub mod raster;
pub mod trial;

pub use config::Config;
pub use dot::Dot;
pub use field::DotField;
pub use phase::{BlankInterval, FixationMarker, Phase};
pub use raster::{Colour, Frame, FrameStack, Raster, Surface};
pub use trial::{build_trials, Session, TrialPhase, TrialSequencer};

/// Result type alias for the kinematogram library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the kinematogram library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
