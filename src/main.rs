use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, SystemTime},
};
use webbrowser::Browser;

use kwiz::{
    bank::{QuestionBank, DEFAULT_BANK},
    config::{Config, ConfigStore, FileConfigStore},
    quiz::Quiz,
    result::{self, SessionResult},
    runtime::{CrosstermEventSource, QuizEvent, Runner},
    sampler::{self, Quotas},
    ui::{QuizView, ResultView},
    TICK_RATE_MS,
};

/// balanced trivia quiz tui with timed questions and anti-guess scoring
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A trivia quiz TUI that draws a balanced set of questions across areas, difficulties, and question kinds, runs each on a 30-second budget with skip-and-return, and normalizes the outcome into an anti-guess adjusted score out of 1000."
)]
pub struct Cli {
    /// player name shown on the result card
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// number of questions per session
    #[clap(short = 'S', long)]
    session_size: Option<usize>,

    /// per-question time limit in seconds
    #[clap(short = 's', long)]
    seconds_per_question: Option<u64>,

    /// CSV question bank to play instead of the embedded one
    #[clap(short = 'b', long)]
    bank: Option<PathBuf>,
}

impl Cli {
    /// Stored settings with this invocation's overrides applied
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(name) = &self.name {
            config.player_label = name.clone();
        }
        if let Some(size) = self.session_size {
            config.session_size = size.max(1);
        }
        if let Some(secs) = self.seconds_per_question {
            config.time_limit_ms = secs.max(1) * 1000;
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Playing,
    Results,
}

#[derive(Debug)]
pub struct App {
    pub config: Config,
    pub bank: QuestionBank,
    pub quiz: Quiz,
    pub selected: usize,
    pub state: AppState,
    pub last_result: Option<SessionResult>,
}

impl App {
    pub fn new(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let store = FileConfigStore::new();
        let config = cli.apply_to(store.load());
        let _ = store.save(&config);

        let bank = match &cli.bank {
            Some(path) => QuestionBank::from_csv_path(path)?,
            None => QuestionBank::embedded(DEFAULT_BANK)?,
        };
        if bank.is_empty() {
            return Err(format!("question bank `{}` has no valid questions", bank.name).into());
        }
        Ok(Self::from_parts(config, bank))
    }

    pub fn from_parts(config: Config, bank: QuestionBank) -> Self {
        let quiz = deal(&bank, &config);
        Self {
            config,
            bank,
            quiz,
            selected: 0,
            state: AppState::Playing,
            last_result: None,
        }
    }

    /// Draw a fresh balanced set from the same pool and start over
    pub fn new_round(&mut self) {
        self.quiz = deal(&self.bank, &self.config);
        self.selected = 0;
        self.state = AppState::Playing;
        self.last_result = None;
    }

    /// Move to the results screen once the queue is exhausted
    pub fn settle_if_finished(&mut self) {
        if self.state == AppState::Playing && self.quiz.has_finished() {
            self.last_result = self.quiz.finish().ok();
            self.state = AppState::Results;
        }
    }
}

fn deal(bank: &QuestionBank, config: &Config) -> Quiz {
    let quotas = Quotas::balanced(config.session_size);
    let drawn = sampler::draw(&bank.questions, &quotas, config.session_size);
    let mut quiz = Quiz::new(drawn, config.player_label.clone(), config.time_limit_ms);
    quiz.start();
    quiz
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut app = App::new(&cli)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    loop {
        terminal.draw(|f| draw(app, f))?;

        match runner.step() {
            QuizEvent::Tick => {
                if app.state == AppState::Playing {
                    if app.quiz.on_tick().is_some() {
                        app.selected = 0;
                    }
                    app.settle_if_finished();
                }
            }
            QuizEvent::Resize => {}
            QuizEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Apply one key event; returns true when the app should quit
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    {
        return true;
    }

    match app.state {
        AppState::Playing => {
            let option_count = app
                .quiz
                .current()
                .map(|q| q.options.len())
                .unwrap_or_default();
            match key.code {
                KeyCode::Up => {
                    if option_count > 0 {
                        app.selected = (app.selected + option_count - 1) % option_count;
                    }
                }
                KeyCode::Down => {
                    if option_count > 0 {
                        app.selected = (app.selected + 1) % option_count;
                    }
                }
                KeyCode::Char(c @ '1'..='4') => {
                    let idx = (c as usize) - ('1' as usize);
                    if idx < option_count {
                        app.selected = idx;
                    }
                }
                KeyCode::Char('s') => {
                    if app.quiz.skip().is_ok() {
                        app.selected = 0;
                    }
                }
                KeyCode::Enter => {
                    let chosen = app
                        .quiz
                        .current()
                        .and_then(|q| q.options.get(app.selected))
                        .map(|o| o.key.clone());
                    if let Some(chosen) = chosen {
                        if app.quiz.submit_answer(&chosen).is_ok() {
                            app.selected = 0;
                        }
                        app.settle_if_finished();
                    }
                }
                _ => {}
            }
        }
        AppState::Results => match key.code {
            KeyCode::Char('r') => app.new_round(),
            KeyCode::Char('t') => {
                if let Some(result) = &app.last_result {
                    if Browser::is_available() {
                        let text = result::share_text(result).replace(' ', "%20");
                        webbrowser::open(&format!("https://twitter.com/intent/tweet?text={text}"))
                            .unwrap_or_default();
                    }
                }
            }
            _ => {}
        },
    }

    false
}

fn draw(app: &App, f: &mut Frame) {
    match (&app.state, &app.last_result) {
        (AppState::Results, Some(result)) => {
            f.render_widget(
                ResultView {
                    quiz: &app.quiz,
                    result,
                },
                f.area(),
            );
        }
        _ => {
            f.render_widget(
                QuizView {
                    quiz: &app.quiz,
                    selected: app.selected,
                    now: SystemTime::now(),
                },
                f.area(),
            );
        }
    }
}
