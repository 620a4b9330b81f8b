use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::collections::{BTreeMap, HashMap};

use crate::actions::Action;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::grouping::{DisplayGroup, SpaceRow};
use crate::staleness::{self, Tier};
use crate::tmux::{group_by_session, group_by_window, Pane, WindowGroup};
use crate::yabai::{clean_browser_title, Window};

/// Theme colors
pub struct Theme {
    pub fg: Color,
    pub accent: Color,
    pub dim: Color,
    pub free: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::Rgb(220, 220, 220),
            accent: Color::Cyan,
            dim: Color::DarkGray,
            free: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }
}

impl Theme {
    /// green (<1m) → yellow (<5m) → orange (<15m) → dark orange (<1h) → red (1h+)
    pub fn tier(&self, tier: Tier) -> Style {
        let color = match tier {
            Tier::Fresh => Color::Green,
            Tier::Warm => Color::Yellow,
            Tier::Cooling => Color::Indexed(208),
            Tier::Cold => Color::Indexed(202),
            Tier::Stale => Color::Red,
        };
        Style::default().fg(color)
    }

    fn dim(&self) -> Style {
        Style::default().fg(self.dim)
    }
}

/// Main application state.
///
/// The cursor is (column, row): column picks the display, row the space
/// within it, mirroring the physical monitor layout.
pub struct App {
    config: Config,
    /// Latest successful fetch, None until the first one lands
    pub dashboard: Option<Dashboard>,
    /// Error from the latest fetch, if it failed
    pub error_message: Option<String>,
    pub cursor_col: usize,
    pub cursor_row: usize,
    pub theme: Theme,
    /// Pending action queue
    pub pending_actions: Vec<Action>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            dashboard: None,
            error_message: None,
            cursor_col: 0,
            cursor_row: 0,
            theme: Theme::default(),
            pending_actions: Vec::new(),
        }
    }

    fn groups(&self) -> &[DisplayGroup] {
        self.dashboard
            .as_ref()
            .map(|d| d.groups.as_slice())
            .unwrap_or_default()
    }

    /// The yabai index of the space under the cursor
    pub fn selected_space_index(&self) -> Option<u32> {
        self.groups()
            .get(self.cursor_col)
            .and_then(|g| g.spaces.get(self.cursor_row))
            .map(|row| row.space.index)
    }

    /// Take pending actions (drains the queue)
    pub fn take_pending_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Handle an action and return whether to quit
    pub fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::KeyPress(key) => Ok(self.handle_key(key)),
            Action::SnapshotUpdated(snapshot) => {
                self.dashboard = Some(Dashboard::build(*snapshot, &self.config));
                self.error_message = None;
                self.clamp_cursor();
                Ok(false)
            }
            Action::FetchFailed(msg) => {
                self.error_message = Some(msg);
                Ok(false)
            }
            Action::FocusSpace(_) => Ok(false),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            _ => {}
        }

        let rows = self.rows_in(self.cursor_col);
        let cols = self.groups().len();
        if cols == 0 {
            return false;
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.cursor_row + 1 < rows {
                    self.cursor_row += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.cursor_row = self.cursor_row.saturating_sub(1);
            }
            KeyCode::Char('l') | KeyCode::Right => {
                if self.cursor_col + 1 < cols {
                    self.cursor_col += 1;
                    self.clamp_cursor();
                }
            }
            KeyCode::Char('h') | KeyCode::Left => {
                if self.cursor_col > 0 {
                    self.cursor_col -= 1;
                    self.clamp_cursor();
                }
            }
            KeyCode::Char('g') => self.cursor_row = 0,
            KeyCode::Char('G') => self.cursor_row = rows.saturating_sub(1),
            KeyCode::Enter => {
                if let Some(index) = self.selected_space_index() {
                    self.pending_actions.push(Action::FocusSpace(index));
                }
            }
            _ => {}
        }
        false
    }

    fn rows_in(&self, col: usize) -> usize {
        self.groups().get(col).map(|g| g.spaces.len()).unwrap_or(0)
    }

    /// Keep the cursor inside the grid after the data or the column changed
    fn clamp_cursor(&mut self) {
        let cols = self.groups().len();
        if cols == 0 {
            self.cursor_col = 0;
            self.cursor_row = 0;
            return;
        }
        self.cursor_col = self.cursor_col.min(cols - 1);
        let rows = self.rows_in(self.cursor_col);
        if rows > 0 && self.cursor_row >= rows {
            self.cursor_row = rows - 1;
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let now = Utc::now();
        let detached = self
            .dashboard
            .as_ref()
            .map(|d| self.detached_lines(&d.partition.unresolved, now))
            .unwrap_or_default();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(if detached.is_empty() {
                    0
                } else {
                    detached.len() as u16 + 2
                }),
                Constraint::Length(3),
            ])
            .split(frame.area());

        self.render_main(frame, chunks[0], now);
        if !detached.is_empty() {
            let block = Block::default()
                .title(" detached ")
                .borders(Borders::ALL)
                .border_style(self.theme.dim());
            frame.render_widget(Paragraph::new(detached).block(block), chunks[1]);
        }
        self.render_footer(frame, chunks[2]);
    }

    fn render_main(&self, frame: &mut Frame, area: Rect, now: DateTime<Utc>) {
        let Some(dashboard) = &self.dashboard else {
            let text = match &self.error_message {
                Some(err) => vec![
                    Line::from(Span::styled(format!("error: {}", err), Style::default().fg(self.theme.error))),
                    Line::from(""),
                    Line::from(Span::styled("is yabai running?", self.theme.dim())),
                ],
                None => vec![Line::from(Span::styled("loading...", self.theme.dim()))],
            };
            frame.render_widget(Paragraph::new(text), area);
            return;
        };

        if dashboard.groups.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("no displays found", self.theme.dim())),
                area,
            );
            return;
        }

        let n = dashboard.groups.len() as u32;
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints((0..n).map(|_| Constraint::Ratio(1, n)))
            .split(area);

        for (i, (group, column)) in dashboard.groups.iter().zip(columns.iter()).enumerate() {
            let cursor_row = (i == self.cursor_col).then_some(self.cursor_row);
            self.render_display(frame, *column, dashboard, group, cursor_row, now);
        }
    }

    fn render_display(
        &self,
        frame: &mut Frame,
        area: Rect,
        dashboard: &Dashboard,
        group: &DisplayGroup,
        cursor_row: Option<usize>,
        now: DateTime<Utc>,
    ) {
        let max_title = (area.width as usize).saturating_sub(22).max(10);
        let panes = dashboard.partition.panes_on(group.index);
        let mut by_session: HashMap<&str, Vec<&Pane>> = HashMap::new();
        for pane in panes {
            by_session.entry(pane.session_name.as_str()).or_default().push(pane);
        }

        let mut lines = Vec::new();
        for (i, row) in group.spaces.iter().enumerate() {
            let selected = cursor_row == Some(i);
            lines.extend(self.space_lines(row, i + 1, selected, max_title, dashboard, &by_session, now));
        }

        lines.push(Line::from(""));
        let free = if group.free_count > 0 {
            Span::styled(format!("{} free", group.free_count), Style::default().fg(self.theme.free))
        } else {
            Span::styled("0 free", Style::default().fg(self.theme.warning))
        };
        lines.push(Line::from(vec![
            free,
            Span::raw("  "),
            Span::styled(format!("{} terminals", group.terminal_count), Style::default().fg(self.theme.fg)),
        ]));

        let title = Line::from(vec![
            Span::styled(
                format!(" display {} ", group.index),
                Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("{} spaces ", group.spaces.len()), self.theme.dim()),
        ]);
        let block = Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(self.theme.dim());
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    #[allow(clippy::too_many_arguments)]
    fn space_lines(
        &self,
        row: &SpaceRow,
        relative: usize,
        selected: bool,
        max_title: usize,
        dashboard: &Dashboard,
        by_session: &HashMap<&str, Vec<&Pane>>,
        now: DateTime<Utc>,
    ) -> Vec<Line<'static>> {
        let cursor = if selected {
            Span::styled("> ", Style::default().fg(self.theme.accent))
        } else {
            Span::raw("  ")
        };

        // * = focused, · = visible on another display
        let indicator = if row.space.has_focus {
            "*"
        } else if row.space.is_visible {
            "\u{b7}"
        } else {
            " "
        };

        let worst = staleness::worst_space_activity(&row.windows, &dashboard.activity, &self.config.terminal_apps);
        let index_style = match worst {
            Some(t) => self.theme.tier(Tier::at(t, now)),
            None => Style::default().fg(self.theme.fg),
        };

        let mut spans = vec![cursor, Span::styled(format!("{:2}", relative), index_style)];
        if relative as u32 != row.space.index {
            spans.push(Span::styled(format!("({})", row.space.index), self.theme.dim()));
        }
        spans.push(Span::raw(format!(" {}  ", indicator)));
        if !row.space.label.is_empty() {
            spans.push(Span::styled(format!("[{}] ", row.space.label), self.theme.dim()));
        }
        spans.extend(self.window_spans(&row.windows, max_title, &dashboard.activity, now));

        let mut lines = vec![Line::from(spans)];

        // tmux windows inline under the terminal showing their session
        for window in row.windows.iter().filter(|w| self.config.terminal_apps.contains(&w.app)) {
            let Some(session_panes) = by_session.get(window.title.as_str()) else {
                continue;
            };
            for tmux_window in group_by_window(session_panes.iter().copied()) {
                let mut spans = vec![Span::raw("        ")];
                spans.extend(self.tmux_window_spans(&tmux_window, now));
                lines.push(Line::from(spans));
            }
        }
        lines
    }

    fn window_spans(
        &self,
        windows: &[Window],
        max_title: usize,
        activity: &HashMap<String, DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Vec<Span<'static>> {
        if windows.is_empty() {
            return vec![Span::styled("--", self.theme.dim())];
        }

        let mut spans = Vec::new();
        let mut others: BTreeMap<&str, usize> = BTreeMap::new();
        let terminals = windows.iter().filter(|w| self.config.terminal_apps.contains(&w.app));
        let browsers = windows.iter().filter(|w| self.config.browser_apps.contains(&w.app));

        for w in terminals {
            let style = match activity.get(w.title.as_str()) {
                Some(t) => self.theme.tier(Tier::at(*t, now)),
                None => Style::default().fg(self.theme.fg),
            };
            spans.push(Span::styled(labelled(&w.app, w.title.trim(), max_title), style));
            spans.push(Span::raw("  "));
        }
        for w in browsers {
            let title = clean_browser_title(w.title.trim());
            spans.push(Span::raw(labelled(&w.app, title, max_title)));
            spans.push(Span::raw("  "));
        }
        for w in windows.iter().filter(|w| {
            !self.config.terminal_apps.contains(&w.app) && !self.config.browser_apps.contains(&w.app)
        }) {
            *others.entry(w.app.as_str()).or_default() += 1;
        }
        for (app, count) in others {
            let text = if count > 1 {
                format!("{} ({})", app, count)
            } else {
                app.to_string()
            };
            spans.push(Span::raw(text));
            spans.push(Span::raw("  "));
        }
        spans.pop();
        spans
    }

    /// `1:editor  ▎ claude 3m  ▎ zsh now`
    fn tmux_window_spans(&self, window: &WindowGroup<'_>, now: DateTime<Utc>) -> Vec<Span<'static>> {
        let productive = &self.config.productive_commands;
        let label = format!("{}:{}", window.index, window.name);
        let label_style = match staleness::window_activity(window.panes.iter().copied(), productive) {
            Some(t) => self.theme.tier(Tier::at(t, now)),
            None => self.theme.dim(),
        };

        let mut spans = vec![Span::styled(label, label_style)];
        for pane in &window.panes {
            let style = if productive.contains(&pane.current_command) {
                self.theme.tier(Tier::at(pane.last_activity, now))
            } else {
                self.theme.dim()
            };
            spans.push(Span::raw("  "));
            spans.push(Span::styled("\u{258e} ", style));
            spans.push(Span::styled(pane.current_command.clone(), style));
            spans.push(Span::styled(
                format!(
                    " {} {}",
                    staleness::format_relative_time(pane.last_activity, now),
                    staleness::format_history_size(pane.history_size)
                ),
                self.theme.dim(),
            ));
        }
        spans
    }

    fn detached_lines(&self, panes: &[Pane], now: DateTime<Utc>) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for session in group_by_session(panes) {
            lines.push(Line::from(Span::styled(
                format!(" {}", session.name),
                Style::default().fg(self.theme.fg),
            )));
            for window in &session.windows {
                let mut spans = vec![Span::raw("   ")];
                spans.extend(self.tmux_window_spans(window, now));
                lines.push(Line::from(spans));
            }
        }
        lines
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let content = match (&self.error_message, &self.dashboard) {
            // stale data is still on screen; say why it is not moving
            (Some(msg), Some(_)) => Line::from(Span::styled(
                format!(" {} ", msg),
                Style::default().fg(self.theme.error),
            )),
            _ => {
                let mut binds = vec![("q", "quit"), ("j/k", "navigate")];
                if self.groups().len() > 1 {
                    binds.push(("h/l", "display"));
                }
                binds.push(("enter", "focus"));
                let mut spans = Vec::new();
                for (key, desc) in binds {
                    spans.push(Span::styled(format!(" {}", key), Style::default().fg(Color::White)));
                    spans.push(Span::styled(format!(" {} ", desc), self.theme.dim()));
                }
                Line::from(spans)
            }
        };

        let footer = Paragraph::new(content).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.theme.dim()),
        );
        frame.render_widget(footer, area);
    }
}

/// `app: title`, or just `app` when the title is empty
fn labelled(app: &str, title: &str, max: usize) -> String {
    let title = truncate(title, max);
    if title.is_empty() {
        app.to_string()
    } else {
        format!("{}: {}", app, title)
    }
}

fn truncate(s: &str, max: usize) -> String {
    let max = max.max(4);
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Snapshot;
    use crate::yabai::fixtures::space;
    use crossterm::event::KeyEventKind;
    use ratatui::{backend::TestBackend, Terminal};

    fn key(code: KeyCode) -> Action {
        Action::KeyPress(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app_with_spaces(spaces: Vec<crate::yabai::Space>) -> App {
        let mut app = App::new(Config::default());
        let snapshot = Snapshot {
            spaces,
            ..Snapshot::default()
        };
        app.handle_action(Action::SnapshotUpdated(Box::new(snapshot)))
            .unwrap();
        app
    }

    #[test]
    fn navigation_is_clamped() {
        // display 1 has three spaces, display 2 has one
        let mut app = app_with_spaces(vec![space(1, 1), space(2, 1), space(3, 1), space(4, 2)]);

        for _ in 0..5 {
            app.handle_action(key(KeyCode::Char('j'))).unwrap();
        }
        assert_eq!((app.cursor_col, app.cursor_row), (0, 2));

        app.handle_action(key(KeyCode::Char('l'))).unwrap();
        assert_eq!((app.cursor_col, app.cursor_row), (1, 0));
        assert_eq!(app.selected_space_index(), Some(4));

        app.handle_action(key(KeyCode::Char('l'))).unwrap();
        assert_eq!(app.cursor_col, 1);

        app.handle_action(key(KeyCode::Char('h'))).unwrap();
        app.handle_action(key(KeyCode::Char('G'))).unwrap();
        assert_eq!(app.selected_space_index(), Some(3));
        app.handle_action(key(KeyCode::Char('g'))).unwrap();
        app.handle_action(key(KeyCode::Char('k'))).unwrap();
        assert_eq!(app.selected_space_index(), Some(1));
    }

    #[test]
    fn enter_queues_focus_for_selected_space() {
        let mut app = app_with_spaces(vec![space(7, 1), space(9, 1)]);
        app.handle_action(key(KeyCode::Down)).unwrap();
        app.handle_action(key(KeyCode::Enter)).unwrap();

        let pending = app.take_pending_actions();
        assert_eq!(pending.len(), 1);
        assert!(matches!(pending[0], Action::FocusSpace(9)));
        assert!(app.take_pending_actions().is_empty());
    }

    #[test]
    fn cursor_clamped_when_spaces_disappear() {
        let mut app = app_with_spaces(vec![space(1, 1), space(2, 1), space(3, 2)]);
        app.handle_action(key(KeyCode::Char('j'))).unwrap();
        app.handle_action(key(KeyCode::Char('l'))).unwrap();
        assert_eq!(app.cursor_col, 1);

        let snapshot = Snapshot {
            spaces: vec![space(1, 1)],
            ..Snapshot::default()
        };
        app.handle_action(Action::SnapshotUpdated(Box::new(snapshot)))
            .unwrap();
        assert_eq!((app.cursor_col, app.cursor_row), (0, 0));
    }

    #[test]
    fn quit_keys() {
        let mut app = App::new(Config::default());
        assert!(app.handle_action(key(KeyCode::Char('q'))).unwrap());
        let ctrl_c = KeyEvent::new_with_kind(KeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press);
        assert!(app.handle_action(Action::KeyPress(ctrl_c)).unwrap());
        assert!(!app.handle_action(key(KeyCode::Char('j'))).unwrap());
    }

    #[test]
    fn fetch_failure_keeps_last_dashboard() {
        let mut app = app_with_spaces(vec![space(1, 1)]);
        app.handle_action(Action::FetchFailed("yabai not found".into()))
            .unwrap();
        assert!(app.dashboard.is_some());
        assert_eq!(app.error_message.as_deref(), Some("yabai not found"));
    }

    #[test]
    fn renders_error_before_first_fetch() {
        let mut app = App::new(Config::default());
        app.handle_action(Action::FetchFailed("yabai not found".into()))
            .unwrap();

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("error: yabai not found"));
        assert!(text.contains("is yabai running?"));
    }

    #[test]
    fn renders_display_columns() {
        let app = app_with_spaces(vec![space(1, 1), space(2, 2)]);
        let mut terminal = Terminal::new(TestBackend::new(100, 16)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("display 1"));
        assert!(text.contains("display 2"));
        assert!(text.contains("1 free"));
    }

    #[test]
    fn truncate_long_titles() {
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(labelled("kitty", "", 10), "kitty");
        assert_eq!(labelled("kitty", "work", 10), "kitty: work");
    }
}
