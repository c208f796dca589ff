use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use typequote::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, Overrides, Settings, SourceKind},
    quote,
    runtime::{CrosstermEventSource, EventSource, Runner},
};

const LOG_ENV: &str = "TYPEQUOTE_LOG";

/// typing speed practice: type the quote, get your wpm
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type the quote shown on screen as fast and accurately as you can. The clock starts on your first keystroke; finishing the text reports elapsed time, words per minute, errors and accuracy."
)]
pub struct Cli {
    /// text to type (also used for every new quote unless --source is given)
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// file to pull quotes from: JSON collection or one quote per line
    #[clap(short = 'q', long)]
    quotes: Option<PathBuf>,

    /// where new quotes come from
    #[clap(short = 's', long, value_enum)]
    source: Option<SourceKind>,

    /// number of sentences per quote for the sentences source
    #[clap(short = 'n', long)]
    sentences: Option<usize>,

    /// config file to use instead of the default location
    #[clap(long)]
    config: Option<PathBuf>,

    /// log file to write to instead of the default location
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            prompt: self.prompt.clone(),
            quotes_file: self.quotes.clone(),
            source: self.source,
            sentences: self.sentences,
        }
    }

    fn config_store(&self) -> FileConfigStore {
        match self.config {
            Some(ref path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let log_path = cli
        .log_file
        .clone()
        .or_else(AppDirs::log_path)
        .unwrap_or_else(|| PathBuf::from("typequote.log"));
    let _log_guard = init_logging(&log_path)?;

    let store = cli.config_store();
    let config = store.load();
    let settings = Settings::resolve(&config, cli.overrides());
    info!(?settings, config = %store.path().display(), "starting");

    if cli.save_config {
        store.save(&Config::from(&settings))?;
    }

    let source = quote::source_for(&settings)?;
    let mut app = App::new(settings.initial_target.clone(), source);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(settings.tick_rate_ms),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(ref err) = result {
        warn!(error = %err, "exited with error");
    }
    result
}

/// File logging: the terminal belongs to the UI, so nothing goes to stdout.
fn init_logging(path: &Path) -> Result<WorkerGuard, Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

fn start_tui<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    while !app.should_quit() {
        let event = runner.step();
        if app.handle_event(event, SystemTime::now()) {
            terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        }
    }

    info!("quitting");
    Ok(())
}
