use crate::calendar::{DayCell, MonthGrid, WEEKDAY_HEADERS};
use crate::countdown::{Remaining, Ticker};
use crate::model::day_key;
use crate::notes::note_prompt;
use crate::session::Session;
use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, Local, Months, NaiveDate, NaiveDateTime};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::{debug, error};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::ops::Range;
use std::time::{Duration, Instant};

const IDLE_POLL: Duration = Duration::from_millis(200);
const PRINT_FILE: &str = "notes-print.txt";
const CELL_WIDTH: usize = 5;

pub fn run(session: Session) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(session);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    debug!("session applied {} changes", app.session.log().len());
    result
}

struct App {
    session: Session,
    remaining: Remaining,
    ticker: Ticker,
    calendar: CalendarCache,
    cursor: NaiveDate,
    calendar_top: usize,
    last_save: Option<Instant>,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    Setting(TargetForm),
    Noting { day: NaiveDate, field: FieldValue },
    ConfirmReset,
}

/// Month grids only change when the day or the target changes, so they are
/// rebuilt on those transitions rather than on every tick.
struct CalendarCache {
    key: Option<(NaiveDate, NaiveDateTime)>,
    grids: Vec<MonthGrid>,
}

struct TargetForm {
    date: FieldValue,
    time: FieldValue,
    message: FieldValue,
    field: TargetField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum TargetField {
    Date,
    Time,
    Message,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    fn edit(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.len(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => {}
        }
    }
}

impl TargetForm {
    fn from_session(session: &Session) -> Self {
        let target = session.target();
        TargetForm {
            date: FieldValue::new(&target.date.format("%Y-%m-%d").to_string()),
            time: FieldValue::new(&target.date.format("%H:%M").to_string()),
            message: FieldValue::new(&target.message),
            field: TargetField::Date,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            TargetField::Date => TargetField::Time,
            TargetField::Time => TargetField::Message,
            TargetField::Message => TargetField::Date,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            TargetField::Date => TargetField::Message,
            TargetField::Time => TargetField::Date,
            TargetField::Message => TargetField::Time,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            TargetField::Date => &mut self.date,
            TargetField::Time => &mut self.time,
            TargetField::Message => &mut self.message,
        }
    }
}

impl CalendarCache {
    fn new() -> Self {
        CalendarCache {
            key: None,
            grids: Vec::new(),
        }
    }

    fn refresh(&mut self, session: &Session, now: NaiveDateTime) -> bool {
        let key = (now.date(), session.target().date);
        if self.key == Some(key) {
            return false;
        }
        self.grids = session.calendar(now);
        self.key = Some(key);
        debug!(
            "rebuilt calendar: {} months, {} days",
            self.grids.len(),
            self.grids.iter().map(MonthGrid::day_count).sum::<usize>()
        );
        true
    }

    fn first_day(&self) -> Option<NaiveDate> {
        self.grids
            .first()
            .and_then(|g| NaiveDate::from_ymd_opt(g.year, g.month, 1))
    }

    fn last_day(&self) -> Option<NaiveDate> {
        self.grids
            .last()
            .and_then(|g| g.cells.iter().rev().find_map(DayCell::date))
    }

    /// Grids are consecutive months, so the index follows from month
    /// arithmetic.
    fn month_index(&self, date: NaiveDate) -> Option<usize> {
        let first = self.grids.first()?;
        let offset = (i64::from(date.year()) - i64::from(first.year)) * 12
            + i64::from(date.month())
            - i64::from(first.month);
        let index = usize::try_from(offset).ok()?;
        self.grids
            .get(index)
            .filter(|grid| grid.contains(date))
            .map(|_| index)
    }
}

impl App {
    fn new(session: Session) -> Self {
        let status = startup_status(&session);
        let now = Local::now().naive_local();
        let mut calendar = CalendarCache::new();
        calendar.refresh(&session, now);
        App {
            remaining: session.remaining(now),
            ticker: Ticker::start(Instant::now()),
            calendar,
            cursor: now.date(),
            calendar_top: 0,
            last_save: None,
            status,
            mode: Mode::Normal,
            session,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            if self.ticker.is_due(Instant::now()) {
                self.on_tick();
            }
            terminal.draw(|f| self.draw(f))?;
            let timeout = self
                .ticker
                .time_until_next(Instant::now())
                .unwrap_or(IDLE_POLL);
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        let now = Local::now().naive_local();
        self.remaining = self.session.remaining(now);
        self.ticker.record(Instant::now(), &self.remaining);
        if self.calendar.refresh(&self.session, now) {
            self.clamp_cursor();
        }
        if self.ticker.is_stopped() {
            debug!("target reached, countdown stopped");
        }
    }

    /// Recompute right away after the target changed, re-arming the ticker
    /// if it had stopped on a past target.
    fn retarget(&mut self) {
        if self.ticker.is_stopped() {
            self.ticker.restart(Instant::now());
        }
        self.on_tick();
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Setting(_) => {
                self.handle_setter_key(key);
                false
            }
            Mode::Noting { .. } => {
                self.handle_note_key(key);
                false
            }
            Mode::ConfirmReset => {
                self.handle_confirm_key(key);
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Left | KeyCode::Char('h') => self.shift_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => self.shift_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.shift_cursor(-7),
            KeyCode::Down | KeyCode::Char('j') => self.shift_cursor(7),
            KeyCode::PageUp => self.shift_month(false),
            KeyCode::PageDown => self.shift_month(true),
            KeyCode::Char('t') => {
                self.cursor = Local::now().date_naive();
                self.clamp_cursor();
            }
            KeyCode::Enter => self.open_note_prompt(),
            KeyCode::Char('s') => {
                self.mode = Mode::Setting(TargetForm::from_session(&self.session));
                self.status = "Set target (Tab/Shift-Tab move, Enter save, Esc cancel)".into();
            }
            KeyCode::Char('p') => self.print_notes(),
            KeyCode::Char('r') => {
                if self.session.note_book().is_empty() {
                    self.status = "No notes to delete".into();
                } else {
                    self.mode = Mode::ConfirmReset;
                    self.status = "¿Queres borrar las notas? (y to confirm, n/Esc to cancel)".into();
                }
            }
            _ => {}
        }
        false
    }

    fn handle_setter_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let mut close_form = false;
        if let Mode::Setting(form) = &mut mode {
            match key.code {
                KeyCode::Esc => {
                    close_form = true;
                    self.status = "Canceled".into();
                }
                KeyCode::Tab | KeyCode::Down => form.next_field(),
                KeyCode::BackTab | KeyCode::Up => form.prev_field(),
                KeyCode::Enter => close_form = self.submit_target(form),
                _ => form.active_field_mut().edit(key),
            }
        }
        self.mode = if close_form { Mode::Normal } else { mode };
    }

    fn submit_target(&mut self, form: &TargetForm) -> bool {
        match self
            .session
            .submit_form(&form.date.value, &form.time.value, &form.message.value)
        {
            Ok(cfg) => {
                self.mark_saved(format!(
                    "Target set to {}",
                    cfg.date.format("%Y-%m-%d %H:%M")
                ));
                self.retarget();
                true
            }
            Err(err) => {
                self.status = err.to_string();
                false
            }
        }
    }

    fn open_note_prompt(&mut self) {
        if !self.cursor_in_calendar() {
            self.status = "No calendar day selected".into();
            return;
        }
        let existing = self
            .session
            .notes()
            .get(&day_key(self.cursor))
            .unwrap_or_default()
            .to_string();
        self.mode = Mode::Noting {
            day: self.cursor,
            field: FieldValue::new(&existing),
        };
        self.status = note_prompt(&day_key(self.cursor));
    }

    fn handle_note_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let mut close = false;
        if let Mode::Noting { day, field } = &mut mode {
            match key.code {
                KeyCode::Esc => {
                    close = true;
                    self.status = "Canceled".into();
                }
                KeyCode::Enter => {
                    close = true;
                    self.save_note(*day, &field.value);
                }
                _ => field.edit(key),
            }
        }
        self.mode = if close { Mode::Normal } else { mode };
    }

    fn save_note(&mut self, day: NaiveDate, content: &str) {
        match self.session.add_note(day, content) {
            Ok(true) => self.mark_saved(format!("Saved note for {}", day_key(day))),
            Ok(false) => self.status = "Empty note, nothing changed".into(),
            Err(err) => {
                error!("saving note failed: {}", err);
                self.status = format!("Could not save note: {}", err);
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                match self.session.reset_notes() {
                    Ok(()) => self.mark_saved("Se han borrado las notas."),
                    Err(err) => {
                        error!("reset failed: {}", err);
                        self.status = format!("Reset failed: {}", err);
                    }
                }
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Reset canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn print_notes(&mut self) {
        let path = self.session.location().dir().join(PRINT_FILE);
        match self.session.notes().write_print_view(&path) {
            Ok(()) => {
                self.status = format!(
                    "Printed {} notes to {}",
                    self.session.note_book().len(),
                    path.display()
                )
            }
            Err(err) => self.status = format!("Print failed: {}", err),
        }
    }

    fn mark_saved(&mut self, message: impl Into<String>) {
        if self.session.is_persistent() {
            self.last_save = Some(Instant::now());
        }
        self.status = message.into();
    }

    fn shift_cursor(&mut self, days: i64) {
        if let Some(next) = self.cursor.checked_add_signed(ChronoDuration::days(days)) {
            self.cursor = next;
            self.clamp_cursor();
        }
    }

    fn shift_month(&mut self, forward: bool) {
        let next = if forward {
            self.cursor.checked_add_months(Months::new(1))
        } else {
            self.cursor.checked_sub_months(Months::new(1))
        };
        if let Some(next) = next {
            self.cursor = next;
            self.clamp_cursor();
        }
    }

    fn clamp_cursor(&mut self) {
        if let (Some(first), Some(last)) = (self.calendar.first_day(), self.calendar.last_day()) {
            self.cursor = self.cursor.clamp(first, last);
        }
    }

    fn cursor_in_calendar(&self) -> bool {
        self.calendar.month_index(self.cursor).is_some()
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(layout[1]);
        self.draw_calendar(f, body[0]);
        self.draw_notes(f, body[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Setting(form) => self.draw_setter(f, form),
            Mode::Noting { day, field } => self.draw_note_prompt(f, *day, field),
            Mode::ConfirmReset => self.draw_confirm(f),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let target = self.session.target();
        let mut info = vec![
            Span::styled(
                "countcal ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("target {}", target.date.format("%Y-%m-%d %H:%M")),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ];
        if self.session.target_is_preset() {
            info.push(Span::styled(" (preset)", Style::default().fg(Color::DarkGray)));
        }
        info.extend([
            Span::raw("  •  "),
            Span::styled(
                self.session.location().scope_label(),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.session.location().path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                match self.last_save {
                    Some(at) => format!("saved {}", format_elapsed(at)),
                    None if self.session.is_persistent() => "no changes".to_string(),
                    None => "not persisted".to_string(),
                },
                Style::default().fg(Color::Gray),
            ),
        ]);

        let countdown_style = if self.remaining.arrived {
            Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD)
        };
        let display = self.remaining.display(&target.message);
        let mut texts = display.lines();
        let mut lines = vec![Line::from(info)];
        if let Some(countdown) = texts.next() {
            lines.push(Line::from(Span::styled(countdown.to_string(), countdown_style)));
        }
        lines.extend(texts.map(|message| {
            Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(Color::LightMagenta),
            ))
        }));

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_calendar(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Span::styled(
                format!("Calendar ({})", self.calendar.grids.len()),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        if self.calendar.grids.is_empty() {
            let msg = Paragraph::new("The target date has passed")
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(msg, area);
            return;
        }

        let window = self.calendar_window(usize::from(area.height.saturating_sub(2)));
        let paragraph = Paragraph::new(self.calendar_lines(window)).block(block);
        f.render_widget(paragraph, area);
    }

    /// Months to draw for a viewport of `height` lines. Scrolling is by whole
    /// months, so only the visible ones are ever turned into lines.
    fn calendar_window(&mut self, height: usize) -> Range<usize> {
        let cursor = self.calendar.month_index(self.cursor).unwrap_or(0);
        let window = visible_months(&self.calendar.grids, self.calendar_top, cursor, height);
        self.calendar_top = window.start;
        window
    }

    fn calendar_lines(&self, window: Range<usize>) -> Vec<Line<'static>> {
        let notes = self.session.note_book();
        let today = Local::now().date_naive();
        let mut lines = Vec::new();
        for grid in &self.calendar.grids[window] {
            lines.push(Line::from(Span::styled(
                format!(" {}", grid.label),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
            let headers: Vec<Span<'static>> = WEEKDAY_HEADERS
                .iter()
                .map(|h| {
                    Span::styled(
                        format!("{:^width$}", h, width = CELL_WIDTH),
                        Style::default().fg(Color::Gray),
                    )
                })
                .collect();
            lines.push(Line::from(headers));
            for week in grid.weeks() {
                let spans: Vec<Span<'static>> = week
                    .iter()
                    .map(|cell| match cell {
                        DayCell::Empty => Span::raw(" ".repeat(CELL_WIDTH)),
                        DayCell::Day { date, .. } => {
                            let noted = notes.contains(&day_key(*date));
                            let selected = *date == self.cursor;
                            day_span(*date, cell.is_in_range(), noted, selected, *date == today)
                        }
                    })
                    .collect();
                lines.push(Line::from(spans));
            }
            lines.push(Line::from(""));
        }
        lines
    }

    fn draw_notes(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let cursor_key = day_key(self.cursor);
        let mut selected = None;
        let items: Vec<ListItem<'static>> = self
            .session
            .notes()
            .list_notes()
            .enumerate()
            .map(|(idx, (day, content))| {
                if day == cursor_key {
                    selected = Some(idx);
                }
                note_item(day, content)
            })
            .collect();
        let count = items.len();
        let items = if items.is_empty() {
            vec![ListItem::new("No notes yet (Enter on a day to add one)")]
        } else {
            items
        };
        let mut state = ListState::default();
        state.select(selected);
        let block = Block::default()
            .title(Span::styled(
                format!("Notes ({})", count),
                Style::default()
                    .fg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightMagenta));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let key = day_key(self.cursor);
        let detail_line = match self.session.notes().get(&key) {
            Some(content) => Line::from(vec![
                Span::styled(
                    key.clone(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(content.to_string(), Style::default().fg(Color::Gray)),
            ]),
            None => Line::from(Span::styled(key.clone(), Style::default().fg(Color::Yellow))),
        };
        let detail = Paragraph::new(detail_line)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title("Selected"),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn draw_setter(&self, f: &mut ratatui::Frame<'_>, form: &TargetForm) {
        let area = centered_rect(60, 40, f.size());
        let mut fields = Vec::new();
        fields.push(field_line(
            "Date (YYYY-MM-DD)",
            &form.date,
            form.field == TargetField::Date,
        ));
        fields.push(field_line(
            "Time (HH:MM)",
            &form.time,
            form.field == TargetField::Time,
        ));
        fields.push(field_line(
            "Message",
            &form.message,
            form.field == TargetField::Message,
        ));
        fields.push(Line::from(""));
        fields.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel • Tab/Shift-Tab to move",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(fields)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Set Date/Time",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_note_prompt(&self, f: &mut ratatui::Frame<'_>, day: NaiveDate, field: &FieldValue) {
        let area = centered_rect(60, 30, f.size());
        let body = vec![
            Line::from(Span::styled(
                note_prompt(&day_key(day)),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(field.with_caret(), Style::default().fg(Color::Cyan))),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to save • Esc to cancel • empty text changes nothing",
                Style::default().fg(Color::Gray),
            )),
        ];
        let dialog = Paragraph::new(body)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Note",
                        Style::default()
                            .fg(Color::LightMagenta)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightMagenta)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>) {
        let area = centered_rect(50, 30, f.size());
        let body = vec![
            Line::from(Span::styled(
                "¿Queres borrar las notas?",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(format!(
                "{} notes will be deleted",
                self.session.note_book().len()
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Reset Notes",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn footer_help_line() -> Line<'static> {
    Line::from(vec![
        Span::styled("←↑↓→ / h j k l", Style::default().fg(Color::LightCyan)),
        Span::raw(" day  "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::LightCyan)),
        Span::raw(" month  "),
        Span::styled("t", Style::default().fg(Color::LightCyan)),
        Span::raw(" today  "),
        Span::styled("Enter", Style::default().fg(Color::LightMagenta)),
        Span::raw(" note  "),
        Span::styled("s", Style::default().fg(Color::LightYellow)),
        Span::raw(" set target  "),
        Span::styled("p", Style::default().fg(Color::LightGreen)),
        Span::raw(" print  "),
        Span::styled("r", Style::default().fg(Color::LightRed)),
        Span::raw(" reset  "),
        Span::styled("q", Style::default().fg(Color::LightRed)),
        Span::raw(" quit"),
    ])
}

fn day_span(
    date: NaiveDate,
    in_range: bool,
    noted: bool,
    selected: bool,
    today: bool,
) -> Span<'static> {
    let text = format!(" {:>2}{} ", date.day(), if noted { '*' } else { ' ' });
    let mut style = Style::default().fg(if noted {
        Color::LightMagenta
    } else if in_range {
        Color::LightYellow
    } else {
        Color::DarkGray
    });
    if in_range {
        style = style.add_modifier(Modifier::BOLD);
    }
    if today {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if selected {
        style = style.bg(Color::Cyan).fg(Color::Black);
    }
    Span::styled(text, style)
}

fn note_item(day: &str, content: &str) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled(
            day.to_string(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(": "),
        Span::styled(content.to_string(), Style::default().fg(Color::White)),
    ]))
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])
}

fn startup_status(session: &Session) -> String {
    if session.is_persistent() {
        format!("Loaded store from {}", session.location().path.display())
    } else {
        String::new()
    }
}

/// Label, weekday header, week rows and a blank separator.
fn month_height(grid: &MonthGrid) -> usize {
    grid.weeks().count() + 3
}

/// Range of months starting at or after `top` that keeps month `cursor`
/// fully on screen when it fits, and stops once `height` lines are filled.
fn visible_months(grids: &[MonthGrid], top: usize, cursor: usize, height: usize) -> Range<usize> {
    if grids.is_empty() {
        return 0..0;
    }
    let cursor = cursor.min(grids.len() - 1);
    let mut top = top.min(cursor);
    let mut used: usize = grids[top..=cursor].iter().map(month_height).sum();
    while top < cursor && used > height {
        used -= month_height(&grids[top]);
        top += 1;
    }
    let mut end = cursor + 1;
    while end < grids.len() && used < height {
        used += month_height(&grids[end]);
        end += 1;
    }
    top..end
}

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreLocation;

    #[test]
    fn test_field_value_editing_handles_multibyte() {
        let mut field = FieldValue::new("año");
        field.move_left();
        field.backspace();
        assert_eq!(field.value, "ao");
        field.insert_char('ñ');
        assert_eq!(field.value, "año");
        field.move_right();
        assert_eq!(field.cursor, field.value.len());
        assert_eq!(field.with_caret(), "año▌");
    }

    fn grids_between(start: (i32, u32, u32), end: (i32, u32, u32)) -> Vec<MonthGrid> {
        let at = |(y, m, d): (i32, u32, u32)| {
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        crate::calendar::render(at(start), at(end))
    }

    fn offline_app() -> App {
        App::new(Session::from_store(
            None,
            StoreLocation::explicit("countcal-unused.yml"),
        ))
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_visible_months_follow_the_cursor() {
        let grids = grids_between((2024, 1, 1), (2024, 12, 31));
        // Every month of 2024 spans 5 or 6 weeks: 8 or 9 lines.
        assert_eq!(visible_months(&grids, 0, 0, 20), 0..3);
        let window = visible_months(&grids, 0, 5, 20);
        assert!(window.contains(&5));
        assert!(window.start > 0);
        assert_eq!(visible_months(&grids, 4, 2, 20).start, 2);
        // Taller than the viewport: the cursor month alone stays at the top.
        assert_eq!(visible_months(&grids, 0, 7, 4), 7..8);
        assert_eq!(visible_months(&grids, 0, 11, 100), 0..12);
    }

    #[test]
    fn test_far_target_draws_only_the_visible_months() {
        let mut app = offline_app();
        app.calendar.grids = grids_between((2024, 10, 9), (9999, 12, 31));
        app.cursor = NaiveDate::from_ymd_opt(9999, 12, 15).unwrap();
        let last = app.calendar.grids.len() - 1;
        assert_eq!(app.calendar.month_index(app.cursor), Some(last));

        let window = app.calendar_window(30);
        assert_eq!(window.end, app.calendar.grids.len());
        assert!(window.len() <= 4);
        assert_eq!(app.calendar_top, window.start);

        let lines = app.calendar_lines(window);
        assert!(lines.len() <= 30 + 9);
        assert!(lines
            .iter()
            .any(|line| line_text(line).contains("December 9999")));
    }

    #[test]
    fn test_month_index_outside_calendar() {
        let mut app = offline_app();
        app.calendar.grids = grids_between((2024, 10, 9), (2025, 1, 2));
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(app.calendar.month_index(day(2024, 10, 1)), Some(0));
        assert_eq!(app.calendar.month_index(day(2025, 1, 31)), Some(3));
        assert_eq!(app.calendar.month_index(day(2024, 9, 30)), None);
        assert_eq!(app.calendar.month_index(day(2025, 2, 1)), None);
    }

    #[test]
    fn test_unavailable_store_is_not_announced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.yml");
        std::fs::write(&path, "version: 99\n").unwrap();
        let session = Session::start(StoreLocation::explicit(&path));
        assert!(!session.is_persistent());
        assert_eq!(startup_status(&session), "");
        assert_eq!(offline_app().status, "");

        let ok = Session::start(StoreLocation::explicit(dir.path().join("ok.yml")));
        assert!(startup_status(&ok).starts_with("Loaded store from"));
    }
}
