//! Command-Line Interface

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use rdk::Config;

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG: &str = "rdk.toml";

/// Random-dot motion kinematogram generator
#[derive(Parser, Debug)]
#[command(name = "rdk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ./rdk.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every trial headless and write the captured frames
    Run {
        /// Output directory
        #[arg(short, long, default_value = "frames")]
        out: PathBuf,

        /// Also write each frame as a PGM image
        #[arg(long)]
        pgm: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Play the session live in the terminal
    Preview {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the effective configuration as TOML
    Config {
        #[command(flatten)]
        overrides: Overrides,
    },
}

impl Commands {
    pub fn overrides(&self) -> &Overrides {
        match self {
            Commands::Run { overrides, .. }
            | Commands::Preview { overrides }
            | Commands::Config { overrides } => overrides,
        }
    }
}

/// Per-run parameter overrides, applied on top of the config file
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Motion coherence in [0, 1]
    #[arg(long)]
    pub coherence: Option<f64>,

    /// Random seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Trials per motion direction
    #[arg(long)]
    pub repetitions: Option<usize>,

    /// Motion directions in degrees, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub angles: Option<Vec<f64>>,

    /// Keep the condition list in order
    #[arg(long)]
    pub no_shuffle: bool,

    /// Number of dots
    #[arg(long)]
    pub dots: Option<usize>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(coherence) = self.coherence {
            config.dots.coherence = coherence;
        }
        if let Some(seed) = self.seed {
            config.experiment.seed = Some(seed);
        }
        if let Some(repetitions) = self.repetitions {
            config.experiment.repetitions = repetitions;
        }
        if let Some(angles) = &self.angles {
            config.experiment.angles = angles.clone();
        }
        if self.no_shuffle {
            config.experiment.shuffle = false;
        }
        if let Some(dots) = self.dots {
            config.dots.count = dots;
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_with_overrides() {
        let cli = Cli::try_parse_from([
            "rdk", "run", "--out", "out", "--pgm", "--coherence", "0.25", "--angles", "-90,0,90",
            "--no-shuffle", "--seed", "4",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.command.overrides().apply(&mut config);
        assert_eq!(config.dots.coherence, 0.25);
        assert_eq!(config.experiment.angles, vec![-90.0, 0.0, 90.0]);
        assert!(!config.experiment.shuffle);
        assert_eq!(config.experiment.seed, Some(4));
        match cli.command {
            Commands::Run { out, pgm, .. } => {
                assert_eq!(out, PathBuf::from("out"));
                assert!(pgm);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn no_overrides_leave_config_alone() {
        let cli = Cli::try_parse_from(["rdk", "preview"]).unwrap();
        let mut config = Config::default();
        cli.command.overrides().apply(&mut config);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rdk", "config", "-v", "--config", "x.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
