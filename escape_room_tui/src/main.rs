use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use escape_room_core::{
    agent::{Agent, RandomAgent, ScriptedAgent},
    entity::Entity,
    render,
    session::{Session, SessionConfig, SessionReport},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AgentKind {
    /// Type commands yourself.
    Human,
    /// Pick uniformly among the available actions.
    Random,
    /// Replay the commands given with --script.
    Scripted,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Level to play
    #[arg(short, long, default_value_t = 1)]
    level: u32,

    /// Who issues the commands
    #[arg(short, long, value_enum, default_value_t = AgentKind::Human)]
    agent: AgentKind,

    /// Seed for the random agent
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Commands for the scripted agent, separated by ';'
    #[arg(long, value_name = "COMMANDS")]
    script: Option<String>,

    /// Turns before the session gives up
    #[arg(long, default_value_t = 30)]
    max_iterations: usize,

    /// Delay between agent turns, in milliseconds
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Run the agent without a terminal UI and print the report
    #[arg(long)]
    headless: bool,

    /// Write logs to this file (the UI owns the terminal)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

struct App {
    /// The level being played.
    session: Session,
    /// Drives the session when not played by hand.
    agent: Option<Box<dyn Agent>>,
    /// Command being typed.
    input: String,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(session: Session, agent: Option<Box<dyn Agent>>) -> Self {
        App {
            session,
            agent,
            input: String::new(),
            should_quit: false,
        }
    }

    /// Lets the agent take one turn.
    fn tick(&mut self) {
        if let Some(agent) = self.agent.as_deref_mut() {
            self.session.step(agent);
        }
    }

    fn submit_input(&mut self) {
        let command = std::mem::take(&mut self.input);
        if command.trim().is_empty() || self.session.is_finished() {
            return;
        }
        self.session.submit(&command);
    }

    fn on_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => self.quit(),
            KeyCode::Char('q') if self.agent.is_some() => self.quit(),
            KeyCode::Char(c) if self.agent.is_none() => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter if self.agent.is_none() => self.submit_input(),
            _ => {}
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_tracing(&args)?;

    let config = SessionConfig {
        max_iterations: args.max_iterations,
    };
    let session = Session::for_level(args.level, config)?;
    let agent = build_agent(&args)?;

    if args.headless {
        let Some(mut agent) = agent else {
            bail!("--headless needs a non-human agent");
        };
        let report = session.run(agent.as_mut());
        print_report(&report);
        return Ok(());
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    let mut app = App::new(session, agent);

    // Run the main application loop, restoring the terminal even on error
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;
    result?;

    let agent_name = app.agent.as_deref().map_or("human", |agent| agent.name());
    print_report(&app.session.report(agent_name));
    Ok(())
}

fn build_agent(args: &Args) -> Result<Option<Box<dyn Agent>>> {
    Ok(match args.agent {
        AgentKind::Human => None,
        AgentKind::Random => Some(Box::new(RandomAgent::new(args.seed))),
        AgentKind::Scripted => {
            let Some(script) = args.script.as_deref() else {
                bail!("--agent scripted needs --script");
            };
            Some(Box::new(ScriptedAgent::from_script(script)))
        }
    })
}

/// Logs go to `--log-file`, or to stderr in headless mode. A TUI run
/// without a log file installs no subscriber.
fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();
    match &args.log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .init(),
        None if args.headless => builder.with_writer(io::stderr).init(),
        None => return Ok(()),
    }
    info!(level = args.level, agent = ?args.agent, "starting");
    Ok(())
}

fn print_report(report: &SessionReport) {
    for (index, turn) in report.transcript.iter().enumerate() {
        println!("[{}] > {}", index + 1, turn.action);
        for line in turn.result.lines() {
            println!("    {line}");
        }
    }
    println!(
        "Level {} ({}): solved={} steps={} iterations={}",
        report.level, report.agent, report.is_solved, report.total_steps, report.num_iterations
    );
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key.code);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45), // Map and objects
            Constraint::Min(5),         // Narrative log
            Constraint::Length(3),      // Input line
            Constraint::Length(2),      // Status/help
        ])
        .split(frame.area());

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(main_layout[0]);

    render_map(frame, top[0], &app.session);
    render_objects(frame, top[1], &app.session);
    render_log(frame, main_layout[1], &app.session);
    render_input(frame, main_layout[2], app);

    let status = if app.session.puzzle().is_solved() {
        "Solved! Press Esc to quit.".to_string()
    } else if app.session.is_finished() {
        "Out of turns. Press Esc to quit.".to_string()
    } else {
        format!(
            "{} | Esc quits | {}",
            app.session.puzzle().get_status(),
            app.session.available_actions().join(", ")
        )
    };
    let help_text = Paragraph::new(status)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[3]);
}

/// Renders the puzzle grid, top row first.
fn render_map(frame: &mut Frame, area: Rect, session: &Session) {
    let symbols = render::symbol_grid(session.puzzle());
    let lines: Vec<Line> = symbols
        .rows_top_down()
        .map(|row| {
            let spans: Vec<Span> = row
                .iter()
                .flat_map(|&symbol| {
                    [
                        Span::styled(symbol.to_string(), symbol_style(symbol)),
                        Span::raw(" "),
                    ]
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let map_paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!("Escape Room - Level {}", session.level()))
                .borders(Borders::ALL),
        )
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

fn symbol_style(symbol: char) -> Style {
    match symbol {
        render::PLAYER => Style::default().fg(Color::Red).bold(),
        'd' => Style::default().fg(Color::DarkGray),
        'D' => Style::default().fg(Color::Green).bold(),
        'b' => Style::default().fg(Color::Yellow),
        'B' => Style::default().fg(Color::Yellow).bold(),
        'R' => Style::default().fg(Color::Blue),
        _ => Style::default(),
    }
}

/// Renders the objects on the grid and the carried item.
fn render_objects(frame: &mut Frame, area: Rect, session: &Session) {
    let puzzle = session.puzzle();
    let mut items: Vec<ListItem> = puzzle
        .objects()
        .map(|(_, entity)| {
            let text = match entity {
                Entity::Door(door) => format!(
                    "Door at {}: {}",
                    door.position,
                    if door.open { "open" } else { "closed" }
                ),
                Entity::Button(button) => format!(
                    "Button at {}: {}/{} {}",
                    button.position,
                    button.current_weight(),
                    button.weight_threshold(),
                    if button.is_pressed() { "pressed" } else { "up" }
                ),
                Entity::Rock(rock) => format!("Rock at {}: {} lb", rock.position, rock.weight),
            };
            ListItem::new(Span::styled(text, symbol_style(render::symbol(entity))))
        })
        .collect();

    let carried = puzzle
        .inventory()
        .map_or("nothing".to_string(), |(_, entity)| entity.kind().to_string());
    items.push(ListItem::new(Line::from(format!("Carrying: {carried}"))));

    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Objects"));
    frame.render_widget(widget, area);
}

/// Renders the most recent turns, newest at the bottom.
fn render_log(frame: &mut Frame, area: Rect, session: &Session) {
    let mut lines: Vec<Line> = Vec::new();
    for turn in session.transcript() {
        lines.push(Line::from(Span::styled(
            format!("> {}", turn.action),
            Style::default().fg(Color::Cyan),
        )));
        lines.extend(turn.result.lines().map(|line| Line::from(line.to_string())));
    }
    let visible = area.height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(visible);
    let lines: Vec<Line> = lines.into_iter().skip(skip).collect();

    let log = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Log"))
        .wrap(Wrap { trim: false });
    frame.render_widget(log, area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let (text, title) = match app.agent.as_deref() {
        Some(agent) => (String::new(), format!("Agent: {} (q quits)", agent.name())),
        None => (format!("{}_", app.input), "Command (Enter to send)".to_string()),
    };
    let input = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(input, area);
}
