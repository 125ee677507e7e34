use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{info, warn};

use rdk::trial::{Session, TrialPhase};
use rdk::Config;

/// What the status bar shows about the frame on screen.
#[derive(Clone, Copy)]
pub struct Status {
    pub trial_index: usize,
    pub direction: f64,
    pub phase: TrialPhase,
}

pub struct App {
    pub should_quit: bool,
    pub paused: bool,
    pub finished: bool,
    pub config: Config,
    pub session: Session,
    pub status: Option<Status>,
    pub frames_shown: u64,
}

impl App {
    pub fn new(config: Config) -> rdk::Result<Self> {
        let session = Session::new(&config)?;
        Ok(Self {
            should_quit: false,
            paused: false,
            finished: false,
            config,
            session,
            status: None,
            frames_shown: 0,
        })
    }

    pub fn on_tick(&mut self) {
        if self.paused || self.finished {
            return;
        }
        match self.session.tick() {
            Some(f) => {
                self.status = Some(Status {
                    trial_index: f.trial_index,
                    direction: f.direction,
                    phase: f.phase,
                });
                self.frames_shown += 1;
            }
            None => {
                self.finished = true;
                info!(frames = self.frames_shown, "preview session complete");
            }
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        // Ctrl+C always quits
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('p') | KeyCode::Char('P') => {
                if !self.finished {
                    self.paused = !self.paused;
                }
            }
            KeyCode::Char('r') | KeyCode::Char('R') => self.restart(),
            KeyCode::Enter | KeyCode::Char(' ') => {
                if self.finished {
                    self.restart();
                }
            }
            _ => {}
        }
    }

    /// Fresh session from the same config. A seeded config replays the
    /// same stimulus.
    fn restart(&mut self) {
        match Session::new(&self.config) {
            Ok(session) => {
                self.session = session;
                self.status = None;
                self.paused = false;
                self.finished = false;
                self.frames_shown = 0;
            }
            Err(e) => warn!(error = %e, "could not restart session"),
        }
    }
}
