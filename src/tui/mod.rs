//! Ratatui-based terminal UI.
//!
//! The TUI shows one category tab at a time (traffic or parking) with the
//! day's weather in the header. Remote lookups run on worker threads; their
//! results come back over a channel and are committed on the UI thread, where
//! [`Dashboard::commit`] drops anything a newer resolution has superseded.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};
use serde_json::Value;

use crate::app::pipeline::{Dashboard, DashboardView};
use crate::app::{load_uploads, parse_date, upload_csv};
use crate::data::remote::{RecordSource, RemoteClient};
use crate::data::resolver::Ticket;
use crate::domain::{Category, DEFAULT_DATE, DashboardConfig};
use crate::error::{AppError, FetchError};

mod plotters_chart;

use plotters_chart::{ChartLine, SurveyChart, time_label};

/// A finished lookup reported by a worker thread.
type Completed = (Ticket, Result<Vec<Value>, FetchError>);

const VEHICLES_COLOR: (u8, u8, u8) = (0, 255, 255);
const ENTRY_COLOR: (u8, u8, u8) = (0, 255, 0);
const EXIT_COLOR: (u8, u8, u8) = (255, 0, 0);
const COUNTER_COLORS: [(u8, u8, u8); 3] = [(255, 0, 255), (255, 255, 0), (0, 128, 255)];

/// Start the TUI.
pub fn run(config: DashboardConfig) -> Result<(), AppError> {
    let source: Arc<dyn RecordSource> = Arc::new(RemoteClient::from_config(&config)?);
    // Uploads are read before the terminal switches modes so their errors print normally.
    let mut app = App::new(config, source)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Traffic,
    Parking,
}

impl Tab {
    const ALL: [Tab; 2] = [Tab::Traffic, Tab::Parking];

    fn category(self) -> Category {
        match self {
            Tab::Traffic => Category::Traffic,
            Tab::Parking => Category::Parking,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Tab::Traffic => "Traffic",
            Tab::Parking => "Parking",
        }
    }

    fn next(self) -> Tab {
        match self {
            Tab::Traffic => Tab::Parking,
            Tab::Parking => Tab::Traffic,
        }
    }
}

struct App {
    config: DashboardConfig,
    dashboard: Dashboard,
    source: Arc<dyn RecordSource>,
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
    tab: Tab,
    /// Day to return to when leaving all-dates mode.
    last_day: NaiveDate,
    date_input: String,
    editing_date: bool,
    status: String,
    view: DashboardView,
}

impl App {
    fn new(config: DashboardConfig, source: Arc<dyn RecordSource>) -> Result<Self, AppError> {
        let mut dashboard = Dashboard::new(config.date.clone());
        let uploads = load_uploads(&mut dashboard, &config)?;
        let last_day = parse_date(config.date.as_deref().unwrap_or(DEFAULT_DATE))?;
        let (tx, rx) = mpsc::channel();
        let view = dashboard.view();

        let mut app = Self {
            config,
            dashboard,
            source,
            tx,
            rx,
            tab: Tab::Traffic,
            last_day,
            date_input: String::new(),
            editing_date: false,
            status: if uploads.is_empty() {
                "Loading survey data...".to_string()
            } else {
                uploads.join("; ")
            },
            view,
        };
        app.sync();
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.drain_completed() {
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolve changed categories and start their lookups.
    fn sync(&mut self) {
        let tickets = self.dashboard.resolve();
        self.dispatch(tickets);
        self.view = self.dashboard.view();
    }

    fn dispatch(&self, tickets: Vec<Ticket>) {
        for ticket in tickets {
            log::debug!(
                "{}: fetching (generation {}, date {:?})",
                ticket.category,
                ticket.generation,
                ticket.date
            );
            let source = Arc::clone(&self.source);
            let tx = self.tx.clone();
            thread::spawn(move || {
                let result = source.fetch(ticket.category, ticket.date.as_deref());
                // The receiver is gone once the UI has quit.
                let _ = tx.send((ticket, result));
            });
        }
    }

    /// Commit every finished lookup. Returns whether the view changed.
    fn drain_completed(&mut self) -> bool {
        let mut changed = false;
        while let Ok((ticket, result)) = self.rx.try_recv() {
            changed |= self.dashboard.commit(&ticket, result);
        }
        if changed {
            self.view = self.dashboard.view();
        }
        changed
    }

    /// Handle a key press. Returns `true` to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing_date {
            self.handle_date_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab | KeyCode::BackTab => {
                self.tab = self.tab.next();
                self.status = format!("tab: {}", self.tab.title());
            }
            KeyCode::Left => self.shift_day(-1),
            KeyCode::Right => self.shift_day(1),
            KeyCode::Enter => {
                self.editing_date = true;
                self.date_input = self.dashboard.date().unwrap_or_default().to_string();
                self.status = "Editing date (YYYY-MM-DD, empty for all dates). Enter to apply, Esc to cancel.".to_string();
            }
            KeyCode::Char('a') => self.toggle_all_dates(),
            KeyCode::Char('u') => self.reupload(self.tab.category()),
            KeyCode::Char('x') => self.clear_upload(self.tab.category()),
            KeyCode::Char('w') => self.clear_upload(Category::Weather),
            KeyCode::Char('r') => {
                let tickets = self.dashboard.refresh();
                self.status = format!("Refreshing {} categor(ies)...", tickets.len());
                self.dispatch(tickets);
                self.view = self.dashboard.view();
            }
            _ => {}
        }

        false
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_date = false;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_date = false;
                self.apply_date_input();
            }
            KeyCode::Backspace => {
                self.date_input.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || c == '-' {
                    self.date_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn apply_date_input(&mut self) {
        let trimmed = self.date_input.trim().to_string();
        if trimmed.is_empty() {
            self.select_all_dates();
            return;
        }
        match parse_date(&trimmed) {
            Ok(day) => self.select_day(day),
            Err(e) => self.status = e.to_string(),
        }
    }

    fn shift_day(&mut self, delta: i32) {
        let base = self
            .dashboard
            .date()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or(self.last_day);
        let next = if delta >= 0 { base.succ_opt() } else { base.pred_opt() };
        match next {
            Some(day) => self.select_day(day),
            None => self.status = "No further dates.".to_string(),
        }
    }

    fn toggle_all_dates(&mut self) {
        if self.dashboard.date().is_some() {
            self.select_all_dates();
        } else {
            self.select_day(self.last_day);
        }
    }

    fn select_day(&mut self, day: NaiveDate) {
        self.last_day = day;
        self.dashboard.set_date(Some(day.format("%Y-%m-%d").to_string()));
        self.sync();
        self.status = format!("date: {day}");
    }

    fn select_all_dates(&mut self) {
        self.dashboard.set_date(None);
        self.sync();
        self.status = "date: all dates".to_string();
    }

    fn reupload(&mut self, category: Category) {
        let Some(path) = self.config.csv_path(category).cloned() else {
            self.status = format!("No --{category}-csv file given.");
            return;
        };
        match upload_csv(&mut self.dashboard, category, &path) {
            Ok(line) => {
                self.sync();
                self.status = line;
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn clear_upload(&mut self, category: Category) {
        if !self.dashboard.overrides().is_active(category) {
            self.status = format!("{category}: no upload to clear.");
            return;
        }
        self.dashboard.clear(category);
        self.sync();
        self.status = format!("{category}: upload cleared, using the survey API.");
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("survey", Style::default().fg(Color::Cyan)),
            Span::raw(" - traffic survey dashboard"),
        ]));

        let mut tabs: Vec<Span> = Vec::new();
        for tab in Tab::ALL {
            let style = if tab == self.tab {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            tabs.push(Span::styled(format!(" {} ", tab.title()), style));
            tabs.push(Span::raw(" "));
        }
        let date = if self.editing_date {
            format!("{}_", self.date_input)
        } else {
            self.view.date.clone().unwrap_or_else(|| "all dates".to_string())
        };
        tabs.push(Span::styled(format!("| date: {date}"), Style::default().fg(Color::Gray)));
        lines.push(Line::from(tabs));

        let weather = crate::report::format_weather_line(&self.view.weather.status, self.view.weather.day.as_ref());
        let weather_style = if self.view.weather.status.error.is_some() {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(Span::styled(weather, weather_style)));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(38)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_side_panel(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let status = self.active_status();
        let title = match self.tab {
            Tab::Traffic => "Traffic volume",
            Tab::Parking => "Parking flow",
        };
        let title = if status.loading { format!("{title} (loading)") } else { title.to_string() };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let data = chart_data(&self.view, self.tab);
        if data.labels.is_empty() {
            let (msg, color) = match (&status.notice, status.error.is_some()) {
                (Some(notice), true) => (notice.clone(), Color::Red),
                (Some(notice), false) => (notice.clone(), Color::Yellow),
                (None, _) => ("Waiting for data...".to_string(), Color::Yellow),
            };
            frame.render_widget(Paragraph::new(msg).style(Style::default().fg(color)), inner);
            return;
        }

        let (chart_rect, insets) = chart_layout(inner);
        let widget = SurveyChart {
            lines: &data.lines,
            x_labels: &data.labels,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: "time",
            y_label: data.y_label,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &data);
        }
    }

    fn draw_side_panel(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let status = self.active_status();
        let mut lines: Vec<Line> = Vec::new();

        for line in chart_data(&self.view, self.tab).lines {
            let (r, g, b) = line.color;
            lines.push(Line::from(vec![
                Span::styled("── ", Style::default().fg(Color::Rgb(r, g, b))),
                Span::raw(line.label),
            ]));
        }
        lines.push(Line::from(Span::styled(
            format!("{} record(s) | {:?}", status.records, status.source).to_lowercase(),
            Style::default().fg(Color::Gray),
        )));
        if let Some(error) = &status.error {
            lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
        }
        lines.push(Line::raw(""));

        match self.tab {
            Tab::Traffic => {
                let series = &self.view.traffic.series;
                let total: u64 = series.iter().map(|p| u64::from(p.vehicles)).sum();
                lines.push(Line::raw(format!("total vehicles: {total}")));
                if let Some(peak) = series.iter().max_by_key(|p| p.vehicles) {
                    lines.push(Line::raw(format!("peak: {} ({})", peak.time, peak.vehicles)));
                }
            }
            Tab::Parking => {
                let parking = &self.view.parking;
                if let Some(last) = parking.series.last() {
                    lines.push(Line::raw(format!("occupancy: {:.1}% at {}", last.occupancy, last.time)));
                }
                lines.push(Line::from(Span::styled("Plate regions", Style::default().add_modifier(Modifier::BOLD))));
                for l in crate::report::format_regions(&parking.regions).lines() {
                    lines.push(Line::raw(l.to_string()));
                }
                lines.push(Line::from(Span::styled(
                    "Avg stay by hour (min)",
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                for l in crate::report::format_hourly_stay(&parking.hourly_stay, 16).lines() {
                    lines.push(Line::raw(l.to_string()));
                }
            }
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Details").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab switch  ←/→ day  Enter date  a all dates  u upload  x clear  w clear weather  r refresh  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn active_status(&self) -> &crate::app::pipeline::CategoryStatus {
        match self.tab {
            Tab::Traffic => &self.view.traffic.status,
            Tab::Parking => &self.view.parking.status,
        }
    }
}

/// Lines, labels and bounds for the active tab's chart.
#[derive(Debug, Clone, PartialEq)]
struct ChartData {
    lines: Vec<ChartLine>,
    labels: Vec<String>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    y_label: &'static str,
}

fn chart_data(view: &DashboardView, tab: Tab) -> ChartData {
    let (lines, labels, y_label) = match tab {
        Tab::Traffic => {
            let series = &view.traffic.series;
            let mut lines = vec![ChartLine {
                label: "vehicles".to_string(),
                color: VEHICLES_COLOR,
                points: series
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i as f64, f64::from(p.vehicles)))
                    .collect(),
            }];

            let mut names: Vec<&str> = series
                .iter()
                .flat_map(|p| p.counters.keys().map(String::as_str))
                .collect();
            names.sort_unstable();
            names.dedup();
            for (name, color) in names.into_iter().zip(COUNTER_COLORS) {
                lines.push(ChartLine {
                    label: name.to_string(),
                    color,
                    points: series
                        .iter()
                        .enumerate()
                        .filter_map(|(i, p)| p.counters.get(name).map(|v| (i as f64, *v)))
                        .collect(),
                });
            }

            (lines, series.iter().map(|p| p.time.clone()).collect::<Vec<_>>(), "vehicles")
        }
        Tab::Parking => {
            let series = &view.parking.series;
            let lines = vec![
                ChartLine {
                    label: "entries".to_string(),
                    color: ENTRY_COLOR,
                    points: series
                        .iter()
                        .enumerate()
                        .map(|(i, p)| (i as f64, f64::from(p.entry)))
                        .collect(),
                },
                ChartLine {
                    label: "exits".to_string(),
                    color: EXIT_COLOR,
                    points: series
                        .iter()
                        .enumerate()
                        .map(|(i, p)| (i as f64, f64::from(p.exit)))
                        .collect(),
                },
            ];
            (lines, series.iter().map(|p| p.time.clone()).collect::<Vec<_>>(), "vehicles")
        }
    };

    let x_max = (labels.len().saturating_sub(1) as f64).max(1.0);
    let y_max = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|&(_, y)| y))
        .filter(|y| y.is_finite())
        .fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    ChartData {
        lines,
        labels,
        x_bounds: [0.0, x_max],
        y_bounds: [0.0, y_max],
        y_label,
    }
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 6,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10 || inner.height <= insets.top + insets.bottom + 5 {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(frame: &mut ratatui::Frame<'_>, inner: Rect, chart: Rect, insets: AxisInsets, data: &ChartData) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);
    let [x0, x1] = data.x_bounds;
    let [y0, y1] = data.y_bounds;

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let label = time_label(&data.labels, x0 + u * (x1 - x0));
        if label.is_empty() {
            continue;
        }
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label_len = label.chars().count() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y0 + u * (y1 - y0);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = format!("{y_val:.0}");
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("time of day")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}
