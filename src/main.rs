mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::KeyCode,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use facedrop::{
    app_dirs::AppDirs,
    catalog::ChallengeCatalog,
    classifier::{Classifier, KeyboardClassifier, LineClassifier, ReplayClassifier},
    config::{ConfigStore, FileConfigStore, GameConfig},
    error::{ClassifierError, ClassifierResult, ConfigError},
    logging,
    matcher::ClassificationReading,
    runtime::{
        input_for_key, CrosstermEventSource, FixedTicker, FrameClock, GameEvent, IdleEventSource,
        Runner, Ticker,
    },
    InputEvent, Phase, Session, SessionEvent, TickReport,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs,
    io::{self, stdin, Write},
    path::PathBuf,
};
use tracing::{info, warn};

/// How long the miss indicator stays on screen, in seconds.
const MISS_FLASH_SECS: f64 = 0.6;

/// match your facial expression to the falling emoji before it hits the ground
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A falling-emoji expression game. An external classifier watches your face; match each falling emoji before it reaches the ground. Without --classifier, number keys stand in for expressions."
)]
pub struct Cli {
    /// config file to load (defaults to the platform config directory)
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// labels file with one "<index> <label>" per line, replacing the configured catalog
    #[clap(short = 'l', long)]
    labels: Option<PathBuf>,

    /// program printing "<label> <confidence>" lines from a live expression classifier
    #[clap(long, value_name = "PROGRAM")]
    classifier: Option<String>,

    /// argument passed to the classifier program as is (repeat for several)
    #[clap(
        long = "classifier-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        requires = "classifier"
    )]
    classifier_args: Vec<String>,

    /// number of lives at the start of a session
    #[clap(long)]
    lives: Option<u32>,

    /// minimum classifier confidence that counts as a match
    #[clap(short = 't', long)]
    threshold: Option<f64>,

    /// fall speed in play-area units per second
    #[clap(long)]
    fall_velocity: Option<f64>,

    /// seconds a matched emoji stays on screen before the next one drops
    #[clap(long)]
    pop_duration: Option<f64>,

    /// ticks per second
    #[clap(long)]
    tick_rate: Option<u32>,

    /// begin playing immediately instead of showing the start screen
    #[clap(long)]
    skip_start: bool,

    /// run without a terminal UI, reading readings from stdin (or --classifier) and printing JSON events
    #[clap(long)]
    headless: bool,

    /// seed for the challenge shuffle and spawn positions
    #[clap(long)]
    seed: Option<u64>,

    /// write logs here instead of the default state directory
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// persist the resolved settings to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    /// Config file values with command line overrides applied on top.
    fn resolve_config(&self) -> Result<GameConfig, ConfigError> {
        let mut cfg = self.config_store().load();

        if let Some(path) = &self.labels {
            let text = fs::read_to_string(path)?;
            cfg.catalog = ChallengeCatalog::from_labels(&text)?.ids().to_vec();
        }
        if let Some(lives) = self.lives {
            cfg.starting_lives = lives;
        }
        if let Some(threshold) = self.threshold {
            cfg.confidence_threshold = threshold;
        }
        if let Some(v) = self.fall_velocity {
            cfg.fall_velocity = v;
        }
        if let Some(p) = self.pop_duration {
            cfg.pop_duration_secs = p;
        }
        if let Some(hz) = self.tick_rate {
            cfg.tick_rate_hz = hz;
        }
        if self.skip_start {
            cfg.skip_start_screen = true;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// The live classifier process, if one was asked for.
    fn spawn_classifier(&self) -> ClassifierResult<Option<LineClassifier>> {
        self.classifier
            .as_deref()
            .map(|program| LineClassifier::spawn_command(program, &self.classifier_args))
            .transpose()
    }

    fn build_session(&self, config: GameConfig) -> Result<Session, Box<dyn Error>> {
        let session = match self.seed {
            Some(seed) => Session::with_seed(config, seed)?,
            None => Session::new(config)?,
        };
        Ok(session)
    }
}

/// Where readings come from in the interactive game.
#[derive(Debug)]
pub enum GameClassifier {
    Keyboard(KeyboardClassifier),
    Live(LineClassifier),
}

impl GameClassifier {
    fn press(&mut self, c: char) {
        if let GameClassifier::Keyboard(kb) = self {
            kb.press(c);
        }
    }

    fn clear_pending(&mut self) {
        if let GameClassifier::Keyboard(kb) = self {
            kb.clear();
        }
    }

    fn is_disconnected(&self) -> bool {
        matches!(self, GameClassifier::Live(live) if live.is_disconnected())
    }

    pub fn keyboard_labels(&self) -> Option<&[String]> {
        match self {
            GameClassifier::Keyboard(kb) => Some(kb.labels()),
            GameClassifier::Live(_) => None,
        }
    }
}

impl Classifier for GameClassifier {
    fn classify(&mut self) -> ClassifierResult<Option<ClassificationReading>> {
        match self {
            GameClassifier::Keyboard(kb) => kb.classify(),
            GameClassifier::Live(live) => live.classify(),
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub session: Session,
    pub classifier: GameClassifier,
    /// Seconds left on the miss indicator.
    pub miss_flash: f64,
    /// The live classifier stream has closed; the session is no longer ticked.
    pub classifier_lost: bool,
}

impl App {
    pub fn new(cli: &Cli, config: GameConfig) -> Result<Self, Box<dyn Error>> {
        let session = cli.build_session(config)?;
        let classifier = match cli.spawn_classifier()? {
            Some(live) => GameClassifier::Live(live),
            None => GameClassifier::Keyboard(KeyboardClassifier::new(session.catalog())),
        };
        Ok(Self::with_parts(session, classifier))
    }

    fn with_parts(session: Session, classifier: GameClassifier) -> Self {
        Self {
            session,
            classifier,
            miss_flash: 0.0,
            classifier_lost: false,
        }
    }

    /// Advance the session one tick and note whether the classifier went away.
    fn on_tick(&mut self, input: InputEvent, dt: f64) -> TickReport {
        // expression keys only count while a challenge can be falling
        if self.session.phase() != Phase::Active {
            self.classifier.clear_pending();
        }

        let report = self.session.tick(input, dt, &mut self.classifier);
        self.absorb(&report, dt);

        if !self.classifier_lost && self.classifier.is_disconnected() {
            warn!(
                score = self.session.state().score,
                "classifier disconnected, session halted"
            );
            self.classifier_lost = true;
        }
        report
    }

    fn press(&mut self, c: char) {
        if self.session.phase() == Phase::Active && !self.classifier_lost {
            self.classifier.press(c);
        }
    }

    fn absorb(&mut self, report: &TickReport, dt: f64) {
        self.miss_flash = (self.miss_flash - dt).max(0.0);
        for event in &report.events {
            match event {
                SessionEvent::Missed { .. } => self.miss_flash = MISS_FLASH_SECS,
                SessionEvent::SessionStarted => self.miss_flash = 0.0,
                _ => {}
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let logged = if cli.headless {
        logging::init_stderr()
    } else {
        match cli.log_file.clone().or_else(AppDirs::log_path) {
            Some(path) => logging::init_file(&path),
            None => Ok(()),
        }
    };
    if let Err(e) = logged {
        eprintln!("facedrop: logging disabled: {e}");
    }

    let config = match cli.resolve_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };

    if cli.save_config {
        let store = cli.config_store();
        store.save(&config)?;
        info!(path = %store.path().display(), "saved config");
    }

    if cli.headless {
        return run_headless(&cli, config);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty (use --headless otherwise)")
            .exit();
    }

    let mut app = App::new(&cli, config)?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let ticker = FixedTicker::from_hz(app.session.config().tick_rate_hz);
    let mut clock = FrameClock::new(ticker.interval());
    let mut runner = Runner::new(CrosstermEventSource::new(), ticker);
    let mut pending = InputEvent::None;

    terminal.draw(|f| ui::draw(app, f))?;

    loop {
        match runner.step() {
            GameEvent::Tick => {
                let dt = clock.lap();
                if app.classifier_lost {
                    continue;
                }
                let report = app.on_tick(std::mem::take(&mut pending), dt);
                if report.should_quit() {
                    break;
                }
                terminal.draw(|f| ui::draw(app, f))?;
            }
            GameEvent::Resize => {
                terminal.draw(|f| ui::draw(app, f))?;
            }
            GameEvent::Key(key) => match input_for_key(&key) {
                InputEvent::Quit => {
                    app.on_tick(InputEvent::Quit, 0.0);
                    break;
                }
                InputEvent::None => {
                    if let KeyCode::Char(c) = key.code {
                        app.press(c);
                    }
                }
                input => pending = input,
            },
        }
    }

    if app.classifier_lost {
        return Err(ClassifierError::Disconnected.into());
    }
    Ok(())
}

fn run_headless(cli: &Cli, config: GameConfig) -> Result<(), Box<dyn Error>> {
    let mut session = cli.build_session(config)?;

    match cli.spawn_classifier()? {
        Some(mut classifier) => {
            let ticker = FixedTicker::from_hz(session.config().tick_rate_hz);
            let mut runner = Runner::new(IdleEventSource, ticker);
            headless_loop(
                &mut session,
                &mut classifier,
                |c: &LineClassifier| c.is_disconnected(),
                || {
                    runner.step();
                },
            )
        }
        None => {
            let stdin = io::stdin();
            let mut classifier = ReplayClassifier::new(stdin.lock());
            headless_loop(
                &mut session,
                &mut classifier,
                |c: &ReplayClassifier<_>| c.is_exhausted(),
                || {},
            )
        }
    }
}

/// Tick with a fixed step until the session finishes or the reading source dries up,
/// printing every fired event and the final snapshot as JSON lines.
fn headless_loop<C: Classifier>(
    session: &mut Session,
    classifier: &mut C,
    exhausted: impl Fn(&C) -> bool,
    mut pace: impl FnMut(),
) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let dt = session.config().tick_secs();
    let mut input = InputEvent::Start;

    loop {
        pace();
        let report = session.tick(std::mem::take(&mut input), dt, classifier);
        for event in &report.events {
            writeln!(out, "{}", serde_json::to_string(event)?)?;
        }
        if report.should_quit() || session.phase() == Phase::Finished {
            break;
        }
        if exhausted(classifier) {
            warn!("classifier input ended before the session finished");
            break;
        }
    }

    writeln!(out, "{}", session.snapshot().to_json()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use std::io::Cursor;
    use std::time::Duration;

    fn single_challenge_app() -> App {
        let config = GameConfig {
            catalog: vec!["grin".into()],
            ..Default::default()
        };
        let session = Session::with_seed(config, 5).unwrap();
        let classifier = GameClassifier::Keyboard(KeyboardClassifier::new(session.catalog()));
        App::with_parts(session, classifier)
    }

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| ui::draw(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_cli_classifier_args_keep_spaces() {
        let cli = Cli::parse_from([
            "facedrop",
            "--classifier",
            "python3",
            "--classifier-arg",
            "my model.py",
            "--classifier-arg",
            "--camera=1",
        ]);
        assert_eq!(cli.classifier.as_deref(), Some("python3"));
        assert_eq!(cli.classifier_args, vec!["my model.py", "--camera=1"]);
    }

    #[test]
    fn test_cli_classifier_arg_needs_a_program() {
        assert!(Cli::try_parse_from(["facedrop", "--classifier-arg", "x"]).is_err());
    }

    #[test]
    fn test_closed_classifier_halts_the_session() {
        let session = Session::with_seed(GameConfig::default(), 1).unwrap();
        let live = LineClassifier::from_reader(Cursor::new(""));
        let mut app = App::with_parts(session, GameClassifier::Live(live));

        app.on_tick(InputEvent::Start, 0.0);
        let mut ticks = 0;
        while !app.classifier_lost {
            ticks += 1;
            assert!(ticks < 2_000, "closed classifier never noticed");
            std::thread::sleep(Duration::from_millis(1));
            app.on_tick(InputEvent::None, 1.0 / 30.0);
        }

        assert_eq!(app.session.phase(), Phase::Active);
        assert!(screen_text(&app).contains("classifier disconnected"));
    }

    #[test]
    fn test_keyboard_play_never_counts_as_disconnected() {
        let mut app = single_challenge_app();
        app.on_tick(InputEvent::Start, 0.0);
        for _ in 0..10 {
            app.on_tick(InputEvent::None, 1.0 / 30.0);
        }
        assert!(!app.classifier_lost);
    }

    #[test]
    fn test_digit_on_start_screen_is_ignored() {
        let mut app = single_challenge_app();
        app.press('1');
        assert_eq!(app.classifier.classify().unwrap(), None);
    }

    #[test]
    fn test_stale_digit_does_not_score_in_the_next_session() {
        let mut app = single_challenge_app();
        // a press left over from outside a session
        app.classifier.press('1');

        let report = app.on_tick(InputEvent::Start, 0.0);
        assert_eq!(report.events, vec![SessionEvent::SessionStarted]);
        assert_eq!(app.session.state().score, 0);
        assert!(app.session.state().active.is_some());
    }

    #[test]
    fn test_digit_while_active_matches() {
        let mut app = single_challenge_app();
        app.on_tick(InputEvent::Start, 0.0);
        app.press('1');

        let report = app.on_tick(InputEvent::None, 1.0 / 30.0);
        assert_eq!(
            report.events,
            vec![SessionEvent::Matched {
                identifier: "grin".into(),
                score: 1
            }]
        );
    }
}
