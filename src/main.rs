mod app;
mod cli;
mod event;
mod ui;

use std::io;
use std::path::{Path, PathBuf};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use cli::{Cli, Commands, DEFAULT_CONFIG};
use event::{Event, EventHandler};
use rdk::{export, Config, Session};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    // The preview owns the terminal, so keep logging quiet there unless asked
    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Preview { .. }, false) => "warn",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(Path::new(DEFAULT_CONFIG))?,
    };
    cli.command.overrides().apply(&mut config);
    config.validate()?;

    match cli.command {
        Commands::Run { out, pgm, .. } => run_export(&config, &out, pgm)?,
        Commands::Preview { .. } => run_preview(config)?,
        Commands::Config { .. } => println!("{}", config.to_toml()?),
    }

    Ok(())
}

fn run_export(config: &Config, out: &PathBuf, pgm: bool) -> anyhow::Result<()> {
    let mut session = Session::new(config)?;
    info!(out = %out.display(), trials = session.trials().len(), "exporting session");
    session.run_all(|index, direction, frames| {
        export::write_stack(&out.join(export::trial_file_name(index, direction)), &frames)?;
        if pgm {
            let prefix = format!("trial_{:03}", index);
            export::write_pgm_sequence(&out.join(&prefix), &prefix, &frames)?;
        }
        Ok(())
    })?;
    Ok(())
}

fn run_preview(config: Config) -> anyhow::Result<()> {
    // Build before touching the terminal so errors print normally
    let mut app = App::new(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let event_handler = EventHandler::from_fps(app.config.window.fps);
    let result = preview_loop(&mut terminal, &mut app, &event_handler);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.map_err(Into::into)
}

fn preview_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        match events.next()? {
            Event::Tick => app.on_tick(),
            Event::Key(key) => app.on_key(key),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
