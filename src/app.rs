//! App: terminal init, main loop, cascade pacing and key handling.

use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use hungrybat::{
    BoardEvent, Direction, EventKind, GameMode, GameResult, JsonProfileStore, Point, Pos,
    PowerUpKind, ProfileStore, Session, Step, SwapOutcome,
};
use ratatui::DefaultTerminal;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::debug;

/// Frame budget of the render loop (~60 FPS).
const FRAME: Duration = Duration::from_millis(16);
/// How long a status message stays in the sidebar.
const STATUS_TTL: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    Result,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Mode,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_mode: GameMode,
    pub animation_start: Instant,
}

impl MenuState {
    fn new(mode: GameMode) -> Self {
        Self {
            current_tab: MenuTab::Mode,
            selected_mode: mode,
            animation_start: Instant::now(),
        }
    }
}

/// Board cursor. A grabbed fruit swaps with the next move; an armed
/// power-up fires on the next select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub pos: Pos,
    pub grabbed: bool,
    pub armed: Option<PowerUpKind>,
}

impl Cursor {
    fn centered(width: usize, height: usize) -> Self {
        Self {
            pos: Pos::new(width / 2, height / 2),
            grabbed: false,
            armed: None,
        }
    }

    /// Moves one cell, staying on the board.
    fn step(&mut self, dir: Direction, width: usize, height: usize) {
        let Pos { x, y } = self.pos;
        self.pos = match dir {
            Direction::Left => Pos::new(x.saturating_sub(1), y),
            Direction::Right => Pos::new((x + 1).min(width.saturating_sub(1)), y),
            Direction::Up => Pos::new(x, (y + 1).min(height.saturating_sub(1))),
            Direction::Down => Pos::new(x, y.saturating_sub(1)),
        };
    }
}

/// Written by the session's event listeners, read by the UI.
#[derive(Debug, Default)]
pub struct Feedback {
    status: Option<(String, Instant)>,
    cleared: Vec<Pos>,
}

impl Feedback {
    fn say(&mut self, text: impl Into<String>, now: Instant) {
        self.status = Some((text.into(), now));
    }

    pub fn status(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, at)| now.saturating_duration_since(*at) < STATUS_TTL)
            .map(|(text, _)| text.as_str())
    }

    fn take_cleared(&mut self) -> Vec<Pos> {
        std::mem::take(&mut self.cleared)
    }
}

/// Cleared cells and their TachyonFX fade.
#[derive(Default)]
pub struct ClearFade {
    pub cells: Vec<Pos>,
    pub effect: Option<Effect>,
    /// Last time the effect was processed (for delta).
    pub process_time: Option<Instant>,
}

impl ClearFade {
    fn restart(&mut self, cells: Vec<Pos>) {
        self.cells = cells;
        self.effect = None;
        self.process_time = None;
    }

    fn reset(&mut self) {
        self.restart(Vec::new());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    session: Session<JsonProfileStore>,
    mode: GameMode,
    screen: Screen,
    paused: bool,
    cursor: Cursor,
    /// When the running cascade takes its next step.
    next_step_at: Option<Instant>,
    feedback: Rc<RefCell<Feedback>>,
    fade: ClearFade,
    result: Option<GameResult>,
    menu_state: MenuState,
    quit_selected: QuitOption,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme, store: JsonProfileStore) -> Result<Self> {
        let now = Instant::now();
        let mode = args.mode;
        let feedback = Rc::new(RefCell::new(Feedback::default()));
        let session = new_session(&config, mode, store, &feedback, now)?;
        let grid = session.board().grid();
        let cursor = Cursor::centered(grid.width(), grid.height());
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Ok(Self {
            args,
            config,
            theme,
            session,
            mode,
            screen,
            paused: false,
            cursor,
            next_step_at: None,
            feedback,
            fade: ClearFade::default(),
            result: None,
            menu_state: MenuState::new(mode),
            quit_selected: QuitOption::Resume,
        })
    }

    /// Replaces the session with a fresh one at the player's current level.
    /// The store travels over; the old session is abandoned if unfinished.
    fn start_level(&mut self, mode: GameMode) -> Result<()> {
        self.session.end();
        let store = self.session.store().clone();
        let now = Instant::now();
        self.session = new_session(&self.config, mode, store, &self.feedback, now)?;
        *self.feedback.borrow_mut() = Feedback::default();
        let grid = self.session.board().grid();
        self.cursor = Cursor::centered(grid.width(), grid.height());
        self.mode = mode;
        self.screen = Screen::Playing;
        self.paused = false;
        self.next_step_at = None;
        self.fade.reset();
        self.result = None;
        Ok(())
    }

    fn say(&self, text: impl Into<String>, now: Instant) {
        self.feedback.borrow_mut().say(text, now);
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);
        if !self.session.status(Instant::now()).is_over() {
            self.session.end();
        }

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            self.advance(now);

            terminal.draw(|f| {
                let feedback = self.feedback.borrow();
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.session,
                    &self.theme,
                    self.cursor,
                    self.paused,
                    self.result.as_ref(),
                    feedback.status(now),
                    &mut self.fade,
                    &self.menu_state,
                    self.quit_selected,
                    now,
                    self.args.no_animation,
                );
            })?;

            if self.fade.effect.as_ref().is_some_and(|e| e.done()) {
                self.fade.reset();
            }

            let timeout = FRAME.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle(key_to_action(key), Instant::now())? == Flow::Exit {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Steps the cascade when its settle delay is up, collects cleared
    /// cells for the fade and moves to the result screen once the game ends.
    fn advance(&mut self, now: Instant) {
        if self.screen != Screen::Playing || self.paused {
            return;
        }
        if self.session.board().is_shifting() {
            if self.args.no_animation {
                self.session.resolve(now);
                self.next_step_at = None;
            } else if self.next_step_at.is_none_or(|at| now >= at) {
                self.next_step_at = match self.session.step(now) {
                    Step::Pending(delay) => Some(now + delay),
                    Step::Settled(_) | Step::Idle => None,
                };
            }
        }
        let cleared = self.feedback.borrow_mut().take_cleared();
        if !cleared.is_empty() && !self.args.no_animation {
            self.fade.restart(cleared);
        }
        if self.session.status(now).is_over() {
            self.result = self.session.finish(now);
            self.screen = Screen::Result;
            self.cursor.grabbed = false;
            self.cursor.armed = None;
            self.fade.reset();
        }
    }

    fn handle(&mut self, action: Action, now: Instant) -> Result<Flow> {
        match self.screen {
            Screen::Menu => self.handle_menu(action),
            Screen::Playing => {
                self.handle_playing(action, now)?;
                Ok(Flow::Continue)
            }
            Screen::QuitMenu => Ok(self.handle_quit_menu(action)),
            Screen::Result => self.handle_result(action),
        }
    }

    fn handle_menu(&mut self, action: Action) -> Result<Flow> {
        let menu = &mut self.menu_state;
        match action {
            Action::Quit => return Ok(Flow::Exit),
            Action::Move(dir @ (Direction::Left | Direction::Right)) => {
                if menu.current_tab == MenuTab::Mode {
                    menu.selected_mode = cycle_mode(menu.selected_mode, dir == Direction::Right);
                }
            }
            Action::Move(Direction::Up | Direction::Down) => {
                menu.current_tab = match menu.current_tab {
                    MenuTab::Mode => MenuTab::Start,
                    MenuTab::Start => MenuTab::Mode,
                };
            }
            Action::Select => {
                if menu.current_tab == MenuTab::Start {
                    let mode = menu.selected_mode;
                    self.start_level(mode)?;
                } else {
                    menu.current_tab = MenuTab::Start;
                }
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn handle_playing(&mut self, action: Action, now: Instant) -> Result<()> {
        if self.paused {
            match action {
                Action::Pause => self.paused = false,
                Action::Quit => self.open_quit_menu(),
                _ => {}
            }
            return Ok(());
        }
        match action {
            Action::Pause => self.paused = true,
            Action::Quit => self.open_quit_menu(),
            Action::Move(dir) => {
                if self.cursor.grabbed {
                    self.try_swap(dir, now);
                } else {
                    let grid = self.session.board().grid();
                    self.cursor.step(dir, grid.width(), grid.height());
                }
            }
            Action::Select => {
                if let Some(kind) = self.cursor.armed.take() {
                    self.fire(kind, now);
                } else {
                    self.cursor.grabbed = !self.cursor.grabbed;
                }
            }
            Action::PowerUp(kind) => {
                self.cursor.grabbed = false;
                self.cursor.armed = if self.cursor.armed == Some(kind) {
                    None
                } else {
                    self.say(kind.description(), now);
                    Some(kind)
                };
            }
            Action::Cancel => {
                self.cursor.grabbed = false;
                self.cursor.armed = None;
            }
            // Abandons the level; nothing is recorded.
            Action::Restart => self.start_level(self.mode)?,
            Action::None => {}
        }
        Ok(())
    }

    fn try_swap(&mut self, dir: Direction, now: Instant) {
        self.cursor.grabbed = false;
        let from = self.cursor.pos;
        match self.session.swap(from, dir, now) {
            Ok(SwapOutcome::Matched { settle, .. }) => {
                if let Some(to) = self.session.board().grid().neighbor(from, dir) {
                    self.cursor.pos = to;
                }
                self.next_step_at = Some(now + settle);
            }
            Ok(SwapOutcome::Reverted) => {
                let text = if self.session.clock().is_some() {
                    "No match! Less time to match"
                } else {
                    "No match"
                };
                self.say(text, now);
            }
            Err(reason) => self.say(reason.to_string(), now),
        }
    }

    fn fire(&mut self, kind: PowerUpKind, now: Instant) {
        let impact = Point::center_of(self.cursor.pos);
        match self.session.use_power_up(kind, impact, now) {
            Ok(outcome) => self.next_step_at = Some(now + outcome.settle),
            Err(reason) => self.say(reason.to_string(), now),
        }
    }

    fn open_quit_menu(&mut self) {
        self.screen = Screen::QuitMenu;
        self.quit_selected = QuitOption::Resume;
    }

    fn handle_quit_menu(&mut self, action: Action) -> Flow {
        match action {
            Action::Move(Direction::Down | Direction::Right) => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::MainMenu,
                    QuitOption::MainMenu => QuitOption::Exit,
                    QuitOption::Exit => QuitOption::Resume,
                };
            }
            Action::Move(Direction::Up | Direction::Left) => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::Exit,
                    QuitOption::MainMenu => QuitOption::Resume,
                    QuitOption::Exit => QuitOption::MainMenu,
                };
            }
            Action::Select => match self.quit_selected {
                QuitOption::Resume => self.screen = Screen::Playing,
                QuitOption::MainMenu => self.back_to_menu(),
                QuitOption::Exit => return Flow::Exit,
            },
            Action::Pause | Action::Quit | Action::Cancel => self.screen = Screen::Playing,
            _ => {}
        }
        Flow::Continue
    }

    fn handle_result(&mut self, action: Action) -> Result<Flow> {
        match action {
            Action::Quit => return Ok(Flow::Exit),
            Action::Restart | Action::Select => self.start_level(self.mode)?,
            Action::Cancel => self.back_to_menu(),
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn back_to_menu(&mut self) {
        if !self.session.status(Instant::now()).is_over() {
            self.session.end();
        }
        self.screen = Screen::Menu;
        self.menu_state = MenuState::new(self.mode);
    }
}

fn new_session(
    config: &GameConfig,
    mode: GameMode,
    store: JsonProfileStore,
    feedback: &Rc<RefCell<Feedback>>,
    now: Instant,
) -> Result<Session<JsonProfileStore>> {
    let level = store.profile().level;
    let mut session = Session::new(config.setup(mode, level), store, now)?;
    listen(&mut session, feedback);
    Ok(session)
}

/// Wires board events to the fade, the status line and the log.
fn listen<S: ProfileStore>(session: &mut Session<S>, feedback: &Rc<RefCell<Feedback>>) {
    let dispatcher = session.dispatcher_mut();

    let fb = Rc::clone(feedback);
    dispatcher.on(EventKind::Cleared, move |event| {
        if let BoardEvent::Cleared { cells, .. } = event {
            fb.borrow_mut()
                .cleared
                .extend(cells.iter().map(|(pos, _)| *pos));
        }
    });

    let fb = Rc::clone(feedback);
    dispatcher.on(EventKind::PowerUpFired, move |event| {
        if let BoardEvent::PowerUpFired { kind, cells, .. } = event {
            fb.borrow_mut()
                .say(format!("{kind}! {cells} fruits hit"), Instant::now());
        }
    });

    let fb = Rc::clone(feedback);
    dispatcher.on(EventKind::CascadeSettled, move |event| {
        if let BoardEvent::CascadeSettled { summary, .. } = event {
            if summary.passes > 1 {
                fb.borrow_mut().say(
                    format!("Cascade x{}  +{}", summary.passes, summary.score),
                    Instant::now(),
                );
            }
        }
    });

    dispatcher.on(EventKind::SwapRejected, |event| {
        debug!(?event, "swap rejected");
    });
}

fn cycle_mode(mode: GameMode, forward: bool) -> GameMode {
    let all = GameMode::ALL;
    let i = all.iter().position(|m| *m == mode).unwrap_or(0);
    let next = if forward {
        (i + 1) % all.len()
    } else {
        (i + all.len() - 1) % all.len()
    };
    all[next]
}
