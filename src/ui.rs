//! Layout and drawing: menu, board, sidebar, pause, result, quit menu.

use crate::app::{ClearFade, Cursor, MenuState, MenuTab, QuitOption, Screen};
use crate::theme::Theme;
use hungrybat::powerup::{cells_in_radius, lightning_cells};
use hungrybat::{
    GameMode, GameResult, Grid, LossReason, Point, Pos, PowerUpKind, ProfileStore, Session,
    SessionStatus,
};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tachyonfx::{
    CellFilter, Duration as TfxDuration, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each cell is drawn as " ● ".
const CELL_WIDTH: u16 = 3;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 30;
/// Sum of the sidebar sections.
const SIDEBAR_HEIGHT: u16 = 25;
/// Fade of cleared cells; matches the default clear pause.
const CLEAR_FADE_MS: u32 = 320;
/// Distinct shapes so fruits read without colour too.
const FRUIT_GLYPHS: [&str; 6] = ["●", "▲", "◆", "■", "♥", "★"];
const FLASH_GLYPH: &str = "✶";

fn glyph(index: usize) -> &'static str {
    FRUIT_GLYPHS[index % FRUIT_GLYPHS.len()]
}

/// `count` board cells of `unit` terminal cells each, saturating at `u16::MAX`.
fn span(count: usize, unit: u16) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX).saturating_mul(unit)
}

/// Board size in terminal cells (border + grid).
fn board_pixel_size(grid: &Grid) -> (u16, u16) {
    let w = span(grid.width(), CELL_WIDTH);
    let h = span(grid.height(), CELL_HEIGHT);
    (w.saturating_add(2), h.saturating_add(2))
}

/// Whether board and sidebar fit a terminal of `cols`×`rows`.
pub fn board_fits(cols: u16, rows: u16, grid: &Grid) -> bool {
    let (pw, ph) = board_pixel_size(grid);
    pw.saturating_add(SIDEBAR_WIDTH) <= cols && ph.max(SIDEBAR_HEIGHT) <= rows
}

/// Board (with border) and sidebar areas, centred in `area`.
fn game_areas(area: Rect, grid: &Grid) -> (Rect, Rect) {
    let (pw, ph) = board_pixel_size(grid);
    let total_w = pw.saturating_add(SIDEBAR_WIDTH);
    let total_h = ph.max(SIDEBAR_HEIGHT);
    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert_chunks[1]);
    let board = Rect {
        height: ph.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1])
}

/// Inner rect of the board block.
fn board_rect(board_outer: Rect, grid: &Grid) -> Rect {
    Rect {
        x: board_outer.x + 1,
        y: board_outer.y + 1,
        width: span(grid.width(), CELL_WIDTH).min(board_outer.width.saturating_sub(2)),
        height: span(grid.height(), CELL_HEIGHT).min(board_outer.height.saturating_sub(2)),
    }
}

/// Top-left buffer position of a cell. Row 0 is drawn at the bottom.
fn cell_origin(board_rect: Rect, grid: &Grid, pos: Pos) -> (u16, u16) {
    let row = grid.height().saturating_sub(pos.y + 1);
    (
        board_rect.x.saturating_add(span(pos.x, CELL_WIDTH)),
        board_rect.y.saturating_add(span(row, CELL_HEIGHT)),
    )
}

/// Buffer positions covered by the given cells.
fn buffer_positions(board_rect: Rect, grid: &Grid, cells: &[Pos]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &pos in cells {
        let (x0, y0) = cell_origin(board_rect, grid, pos);
        for bx in x0..x0.saturating_add(CELL_WIDTH).min(board_rect.right()) {
            for by in y0..y0.saturating_add(CELL_HEIGHT).min(board_rect.bottom()) {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Create or update the clear fade and process it (TachyonFX: fade cleared cells to bg).
fn apply_clear_effect(
    frame: &mut Frame,
    grid: &Grid,
    theme: &Theme,
    area: Rect,
    fade: &mut ClearFade,
    now: Instant,
) {
    let (board_outer, _) = game_areas(area, grid);
    let board_rect = board_rect(board_outer, grid);
    let delta = fade
        .process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    fade.process_time = Some(now);

    if fade.effect.is_none() {
        let clearing_set = buffer_positions(board_rect, grid, &fade.cells);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing_set.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board_rect);
        fade.effect = Some(effect);
    }

    if let Some(effect) = fade.effect.as_mut() {
        frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
    }
}

/// Draw current screen (menu, game, result), with pause and quit overlays.
/// While cleared cells are fading and animation is on, applies the TachyonFX
/// fade and updates `fade`.
pub fn draw<S: ProfileStore>(
    frame: &mut Frame,
    screen: Screen,
    session: &Session<S>,
    theme: &Theme,
    cursor: Cursor,
    paused: bool,
    result: Option<&GameResult>,
    status: Option<&str>,
    fade: &mut ClearFade,
    menu_state: &MenuState,
    quit_selected: QuitOption,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, session, theme, menu_state, area, now),
        Screen::Playing => {
            draw_game(frame, session, theme, area, cursor, status, fade, now);
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
            if !fade.cells.is_empty() && !no_animation {
                apply_clear_effect(frame, session.board().grid(), theme, area, fade, now);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, session, theme, area, cursor, status, fade, now);
            draw_quit_menu(frame, theme, quit_selected);
        }
        Screen::Result => {
            draw_game(frame, session, theme, area, cursor, status, fade, now);
            if let Some(result) = result {
                draw_result(frame, session, theme, result, area);
            }
        }
    }
}

fn draw_menu<S: ProfileStore>(
    frame: &mut Frame,
    session: &Session<S>,
    theme: &Theme,
    menu_state: &MenuState,
    area: Rect,
    now: Instant,
) {
    let popup_w = 56u16;
    let popup_h = 21u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" Hungry ", Style::default().fg(theme.fruit_color(2)).bold()),
        Span::styled(" Bat ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let profile = session.store().profile();
    let profile_line = Line::from(Span::styled(
        format!(
            " Level {}  ·  Coins {}  ·  Difficulty {} ",
            profile.level + 1,
            profile.coins,
            profile.difficulty.get()
        ),
        Style::default().fg(theme.main_fg),
    ));

    let highlight_style = Style::default()
        .fg(Color::Black)
        .bg(theme.fruit_color(1))
        .bold();
    let selected_style = Style::default().fg(theme.fruit_color(1)).bold();
    let normal_style = Style::default().fg(theme.main_fg);

    let mut mode_spans = Vec::new();
    for (i, mode) in GameMode::ALL.into_iter().enumerate() {
        if i > 0 {
            mode_spans.push(Span::from(" "));
        }
        let style = if mode != menu_state.selected_mode {
            normal_style
        } else if menu_state.current_tab == MenuTab::Mode {
            highlight_style
        } else {
            selected_style
        };
        mode_spans.push(Span::styled(
            format!(" {} ", mode.name().to_uppercase()),
            style,
        ));
    }

    let start_style = if menu_state.current_tab == MenuTab::Start {
        highlight_style
    } else {
        normal_style
    };

    let grid = session.board().grid();
    let fits = board_fits(area.width, area.height, grid);
    let board_line = Line::from(Span::styled(
        format!(
            " Board {}×{} · {} fruits{} ",
            grid.width(),
            grid.height(),
            session.board().config().fruit_kinds,
            if fits { "" } else { " · terminal too small" }
        ),
        Style::default()
            .fg(if fits { Color::Green } else { Color::Red })
            .bold(),
    ));

    let key_style = Style::default().fg(theme.fruit_color(3));
    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        profile_line,
        board_line,
        Line::from(""),
        Line::from(Span::styled(
            " ─ OBJECTIVE ─ ",
            Style::default().fg(theme.div_line),
        )),
        Line::from(mode_spans),
        Line::from(Span::styled(
            menu_state.selected_mode.description(),
            Style::default().fg(theme.inactive_fg).italic(),
        )),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(" [ FEED THE BAT ] ", start_style)),
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", key_style),
            Span::from("NAVIGATE   "),
            Span::styled(" ↔ ", key_style),
            Span::from("CHANGE   "),
            Span::styled(" ENTER ", key_style),
            Span::from("PLAY"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] QUIT ",
            Style::default().fg(Color::Rgb(255, 80, 80)),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );

    // Startup animation: slide in from bottom, ease out cubic.
    let elapsed = now.duration_since(menu_state.animation_start).as_millis() as f32;
    let t = (elapsed / 500.0).min(1.0);
    let offset_t = 1.0 - (1.0 - t).powi(3);
    let mut anim_popup = popup;
    anim_popup.y += ((1.0 - offset_t) * 10.0) as u16;
    anim_popup.height = anim_popup
        .height
        .min(area.bottom().saturating_sub(anim_popup.y));

    p.render(anim_popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_result<S: ProfileStore>(
    frame: &mut Frame,
    session: &Session<S>,
    theme: &Theme,
    result: &GameResult,
    area: Rect,
) {
    let popup_w = 36u16;
    let popup_h = 14u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let (title, title_style) = match result.status {
        SessionStatus::Won { .. } => (
            " Level complete! ",
            Style::default().fg(Color::Black).bg(Color::Green),
        ),
        SessionStatus::Lost(reason) => {
            let text = match reason {
                LossReason::OutOfMoves => " Out of moves ",
                LossReason::OutOfTime => " Too slow! ",
                LossReason::TimeUp => " Time's up! ",
                LossReason::Abandoned => " Abandoned ",
            };
            (text, Style::default().fg(Color::White).bg(Color::Red))
        }
        SessionStatus::Playing => (" Playing ", Style::default().fg(theme.main_fg)),
    };
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(title, title_style)),
        Line::from(""),
        Line::from(Span::styled(
            stars_line(result.stars),
            Style::default().fg(theme.title).bold(),
        )),
        Line::from(Span::styled(format!(" Score: {} ", result.score), fg)),
    ];
    if result.bonus > 0 {
        lines.push(Line::from(Span::styled(
            format!(" Bonus: {} ", result.bonus),
            fg,
        )));
    }
    if result.coins_awarded > 0 {
        lines.push(Line::from(Span::styled(
            format!(" Coins: +{} ", result.coins_awarded),
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    if let Some(level) = result.unlocked_level {
        lines.push(Line::from(Span::styled(
            format!(" Level {} unlocked! ", level + 1),
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(Span::styled(
        format!(" Difficulty: {} ", result.difficulty.get()),
        fg,
    )));
    lines.push(Line::from(""));
    let again = match result.status {
        SessionStatus::Won { .. } if result.unlocked_level.is_some() => "Next level",
        _ => "Play again",
    };
    lines.push(Line::from(Span::styled(
        format!(" R — {again}   Esc — Menu   Q — Quit "),
        fg,
    )));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(
                format!(" Level {} ", session.level() + 1),
                theme.title,
            )),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw game: board + sidebar; use full area and center the board.
fn draw_game<S: ProfileStore>(
    frame: &mut Frame,
    session: &Session<S>,
    theme: &Theme,
    area: Rect,
    cursor: Cursor,
    status: Option<&str>,
    fade: &ClearFade,
    now: Instant,
) {
    let (board_area, sidebar_area) = game_areas(area, session.board().grid());
    draw_board(frame, session, theme, board_area, cursor, fade);
    draw_sidebar(frame, session, theme, sidebar_area, cursor, status, now);
}

/// Cells the armed power-up would hit at the cursor.
fn power_up_preview<S: ProfileStore>(session: &Session<S>, cursor: Cursor) -> HashSet<Pos> {
    let Some(kind) = cursor.armed else {
        return HashSet::new();
    };
    let grid = session.board().grid();
    let config = session.board().config();
    let impact = Point::center_of(cursor.pos);
    match kind {
        PowerUpKind::Bomb => cells_in_radius(grid, impact, config.bomb_radius)
            .into_iter()
            .collect(),
        PowerUpKind::Potion => cells_in_radius(grid, impact, config.potion_radius)
            .into_iter()
            .collect(),
        PowerUpKind::Lightning => lightning_cells(grid, impact, config.lightning_half_width)
            .iter()
            .collect(),
    }
}

fn draw_board<S: ProfileStore>(
    frame: &mut Frame,
    session: &Session<S>,
    theme: &Theme,
    area: Rect,
    cursor: Cursor,
    fade: &ClearFade,
) {
    let grid = session.board().grid();
    let title = format!(" Hungry Bat · {} ", session.mode().name());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    block.render(area, frame.buffer_mut());
    let board_rect = board_rect(area, grid);

    let preview = power_up_preview(session, cursor);
    let fading: HashSet<Pos> = fade.cells.iter().copied().collect();
    let buf = frame.buffer_mut();
    for pos in grid.positions() {
        let (rx, ry) = cell_origin(board_rect, grid, pos);
        if rx.saturating_add(CELL_WIDTH) > board_rect.right() || ry >= board_rect.bottom() {
            continue;
        }
        let bg = if pos == cursor.pos {
            if cursor.grabbed {
                theme.title
            } else {
                theme.selected_bg
            }
        } else if preview.contains(&pos) {
            theme.div_line
        } else {
            theme.bg
        };
        let (symbol, fg) = match grid.get(pos) {
            Some(fruit) => (glyph(fruit.index()), theme.fruit_color(fruit.index())),
            None if fading.contains(&pos) => (FLASH_GLYPH, Color::White),
            None => ("·", theme.div_line),
        };
        let style = Style::default().fg(fg).bg(bg).bold();
        buf.set_string(rx, ry, format!(" {symbol} "), style);
    }
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_sidebar<S: ProfileStore>(
    frame: &mut Frame,
    session: &Session<S>,
    theme: &Theme,
    area: Rect,
    cursor: Cursor,
    status: Option<&str>,
    now: Instant,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    // Free-floating sections with their own borders.
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Objective (border + text + progress + bar)
            Constraint::Length(7), // Stats
            Constraint::Length(4), // Clock / multiplier
            Constraint::Length(6), // Power-ups
            Constraint::Length(3), // Status line
        ])
        .split(area);

    // --- Objective ---
    let objective = session.objective();
    let block = sidebar_block(theme);
    let inner = block.inner(chunks[0]);
    block.render(chunks[0], frame.buffer_mut());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);
    Paragraph::new(Line::from(Span::styled(
        session.mode().description(),
        title_style,
    )))
    .render(rows[0], frame.buffer_mut());
    let label = match session.mode() {
        GameMode::Feeding => "Fruits eaten",
        GameMode::Scoring => "Score",
        GameMode::Time => "Matches",
        GameMode::Collection => "Collected",
    };
    let mut progress = vec![Span::styled(
        format!("{label}: {}/{}", objective.progress.min(objective.goal), objective.goal),
        fg_style,
    )];
    if let Some(target) = objective.target {
        progress.push(Span::styled(
            format!(" {}", glyph(target.index())),
            Style::default().fg(theme.fruit_color(target.index())).bold(),
        ));
    }
    Paragraph::new(Line::from(progress)).render(rows[1], frame.buffer_mut());
    let ratio = objective.progress.min(objective.goal) as f64 / objective.goal.max(1) as f64;
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(theme.fruit_color(0)))
        .render(rows[2], frame.buffer_mut());

    // --- Stats ---
    let block = sidebar_block(theme);
    let inner = block.inner(chunks[1]);
    block.render(chunks[1], frame.buffer_mut());
    let budget = match (session.moves_left(), session.time_left(now)) {
        (Some(moves), _) => ("Moves: ", moves.to_string()),
        (None, Some(left)) => ("Time: ", clock(left)),
        (None, None) => ("Moves: ", "-".to_string()),
    };
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(session.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Stars: ", title_style),
            Span::styled(stars_line(session.stars()), Style::default().fg(theme.title)),
        ]),
        Line::from(vec![
            Span::styled(budget.0, title_style),
            Span::styled(budget.1, fg_style),
        ]),
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled((session.level() + 1).to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Difficulty: ", title_style),
            Span::styled(session.difficulty().get().to_string(), fg_style),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines)).render(inner, frame.buffer_mut());

    // --- Clock (time) / multiplier (scoring) / moves ---
    let block = sidebar_block(theme);
    let inner = block.inner(chunks[2]);
    block.render(chunks[2], frame.buffer_mut());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);
    let (label, ratio) = if let Some(match_clock) = session.clock() {
        let window = match_clock.window();
        let left = match_clock.remaining(now);
        let strikes = match_clock.strikes();
        let label = if strikes > 0 {
            format!("Match in {}s  ({strikes} to restore)", left.as_secs())
        } else {
            format!("Match in {}s", left.as_secs())
        };
        (label, left.as_secs_f64() / window.as_secs_f64().max(f64::EPSILON))
    } else if session.mode() == GameMode::Scoring {
        let multiplier = session.multiplier();
        let label = if multiplier.active {
            format!("Multiplier x{}", multiplier.factor)
        } else {
            format!("Combo streak {}", multiplier.streak)
        };
        (label, if multiplier.active { 1.0 } else { 0.0 })
    } else {
        let total = session.rules().moves.max(1);
        let left = session.moves_left().unwrap_or(0);
        ("Moves left".to_string(), f64::from(left) / f64::from(total))
    };
    Paragraph::new(Line::from(Span::styled(label, title_style)))
        .render(rows[0], frame.buffer_mut());
    let ratio = ratio.clamp(0.0, 1.0);
    let bar_color = if ratio > 0.6 {
        Color::Green
    } else if ratio > 0.3 {
        Color::Yellow
    } else {
        Color::Red
    };
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(bar_color))
        .render(rows[1], frame.buffer_mut());

    // --- Power-ups ---
    let block = sidebar_block(theme);
    let inner = block.inner(chunks[3]);
    block.render(chunks[3], frame.buffer_mut());
    let inventory = session.inventory();
    let player_level = session.store().profile().level;
    let mut lines = vec![Line::from(Span::styled("Power-ups", title_style))];
    for (i, kind) in PowerUpKind::ALL.into_iter().enumerate() {
        let state = if !inventory.is_unlocked(kind, player_level) {
            format!("level {}", kind.unlock_level())
        } else if let Some(left) = inventory.cooldown_remaining(kind, now) {
            format!("{}s", left.as_secs() + 1)
        } else if inventory.is_infinite(kind, now) {
            "∞".to_string()
        } else {
            format!("x{}", inventory.amount(kind))
        };
        let style = if cursor.armed == Some(kind) {
            Style::default().fg(Color::Black).bg(theme.title).bold()
        } else if inventory.is_unlocked(kind, player_level) {
            fg_style
        } else {
            Style::default().fg(theme.inactive_fg)
        };
        lines.push(Line::from(Span::styled(
            format!("{} {:<10}{:>8}", i + 1, kind.name(), state),
            style,
        )));
    }
    Paragraph::new(ratatui::text::Text::from(lines)).render(inner, frame.buffer_mut());

    // --- Status line ---
    let block = sidebar_block(theme);
    let inner = block.inner(chunks[4]);
    block.render(chunks[4], frame.buffer_mut());
    let status_line = match status {
        Some(text) => Span::styled(text.to_string(), Style::default().fg(theme.title).bold()),
        None if cursor.grabbed => Span::styled("Arrow to swap, Esc to drop", fg_style),
        None if cursor.armed.is_some() => Span::styled("Space to fire, Esc to cancel", fg_style),
        None if session.board().is_shifting() => Span::styled("...", fg_style),
        None => Span::styled("Space grabs a fruit", Style::default().fg(theme.inactive_fg)),
    };
    Paragraph::new(Line::from(status_line)).render(inner, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24.min(area.width);
    let qh = 8.min(area.height);
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    // Clear background
    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.y + inner.height {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}

fn stars_line(stars: u8) -> String {
    (0..3u8)
        .map(|i| if i < stars { '★' } else { '☆' })
        .collect()
}

fn clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
