//! Ratatui-based terminal UI.
//!
//! The TUI is the interactive calibration widget: a parameter panel driven by
//! keyboard "sliders", a chart of the latest backend result, and a status
//! line. Edits flow through the `ParameterStore` into the debounced
//! `RecomputePipeline`; the event loop polls the pipeline between key events.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use tracing::debug;

use crate::chart::{ChartSeries, Field, PreviewKind, SeriesKind, axis_bounds, calibration_error, demo_series, preview};
use crate::config::AppConfig;
use crate::data::CalibrationBackend;
use crate::domain::{ComputationType, ModelType, ParamValue, Widget, ZabrModel};
use crate::error::AppError;
use crate::params::ParameterStore;
use crate::recompute::{PipelineState, RecomputePipeline};

mod plotters_chart;

use plotters_chart::{CalibPlottersChart, PlotLine};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Start the TUI.
pub fn run(config: AppConfig, backend: Arc<dyn CalibrationBackend>, model: Option<ModelType>) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let term_backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(term_backend)
        .map_err(|e| AppError::backend(format!("Failed to initialize terminal: {e}")))?;

    let model = model.unwrap_or(ModelType::Asv(ComputationType::DynamicAsv));
    let mut app = App::new(&config, backend, model, Instant::now());
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::backend(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::backend(format!("Failed to enter alternate screen: {e}")));
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

/// What the chart panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartView {
    Result,
    Preview(PreviewKind),
}

/// Everything the chart panel needs, computed outside the render call.
struct ChartData {
    title: String,
    x_label: &'static str,
    y_label: &'static str,
    lines: Vec<PlotLine>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

struct App {
    store: ParameterStore,
    pipeline: RecomputePipeline,
    selected: usize,
    editing: Option<String>,
    view: ChartView,
    status: String,
}

impl App {
    fn new(config: &AppConfig, backend: Arc<dyn CalibrationBackend>, model: ModelType, now: Instant) -> Self {
        let store = ParameterStore::new(model);
        let mut pipeline = RecomputePipeline::new(backend, model, config);
        // Dynamic models show a result straight away.
        pipeline.select_model(model, store.snapshot(), now);
        Self {
            store,
            pipeline,
            selected: 0,
            editing: None,
            view: ChartView::Result,
            status: format!("{} ready.", model.display_name()),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.pipeline.poll(Instant::now()) {
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::backend(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(POLL_INTERVAL).map_err(|e| AppError::backend(format!("Event poll error: {e}")))? {
                // Keep the "calculating" indicator fresh.
                needs_redraw = self.pipeline.state() != PipelineState::Idle;
                continue;
            }

            match event::read().map_err(|e| AppError::backend(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code, Instant::now()) {
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

    fn keys(&self) -> Vec<String> {
        self.store.snapshot().values.keys().cloned().collect()
    }

    fn selected_key(&self) -> Option<String> {
        self.keys().get(self.selected).cloned()
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode, now: Instant) -> bool {
        if self.editing.is_some() {
            self.handle_value_edit(code, now);
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                let n = self.keys().len();
                if self.selected + 1 < n {
                    self.selected += 1;
                }
            }
            KeyCode::Left => self.adjust_selected(-1, now),
            KeyCode::Right => self.adjust_selected(1, now),
            KeyCode::Enter => {
                if let Some(key) = self.selected_key() {
                    let current = self
                        .store
                        .snapshot()
                        .get(&key)
                        .map(ParamValue::to_string)
                        .unwrap_or_default();
                    self.editing = Some(current);
                    self.status = format!("Editing {key}. Enter to apply, Esc to cancel.");
                }
            }
            KeyCode::Char('m') => self.switch_model(self.store.model().next(), now),
            KeyCode::Char('M') => self.switch_model(self.store.model().prev(), now),
            KeyCode::Char('w') => {
                let other = match self.store.model().widget() {
                    Widget::Asv => ModelType::Zabr(ZabrModel::ZabrClassic),
                    Widget::Zabr => ModelType::Asv(ComputationType::DynamicAsv),
                };
                self.switch_model(other, now);
            }
            KeyCode::Char('x') => {
                let model = self.store.model();
                let snap = self.store.reset(model);
                self.pipeline.on_edit(snap, now);
                self.status = format!("Reset {} to preset.", model.display_name());
            }
            KeyCode::Char('c') => {
                self.pipeline.trigger_now(self.store.snapshot());
                self.status = "Calibrating...".to_string();
            }
            KeyCode::Char('p') => {
                self.view = next_view(self.view, self.store.model());
                self.status = match self.view {
                    ChartView::Result => "Showing backend result.".to_string(),
                    ChartView::Preview(kind) => kind.title().to_string(),
                };
            }
            _ => {}
        }
        false
    }

    fn handle_value_edit(&mut self, code: KeyCode, now: Instant) {
        let Some(buffer) = self.editing.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.status = "Edit canceled.".to_string();
            }
            KeyCode::Enter => {
                let raw = buffer.clone();
                self.editing = None;
                if let Some(key) = self.selected_key() {
                    let snap = self.store.set(&key, &raw);
                    let shown = snap.get(&key).map(ParamValue::to_string).unwrap_or_default();
                    self.pipeline.on_edit(snap, now);
                    self.status = format!("{key} = {shown}");
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => {
                buffer.push(c);
            }
            _ => {}
        }
    }

    fn adjust_selected(&mut self, steps: i32, now: Instant) {
        let Some(key) = self.selected_key() else {
            return;
        };
        let snap = match self.store.snapshot().get(&key) {
            Some(ParamValue::Flag(_)) => self.store.toggle(&key),
            _ => self.store.nudge(&key, steps),
        };
        match snap {
            Some(snap) => {
                let shown = snap.get(&key).map(ParamValue::to_string).unwrap_or_default();
                self.pipeline.on_edit(snap, now);
                self.status = format!("{key} = {shown}");
            }
            None => {
                self.status = format!("{key} has no slider; press Enter to type a value.");
            }
        }
    }

    fn switch_model(&mut self, model: ModelType, now: Instant) {
        let snap = self.store.select(model);
        self.pipeline.select_model(model, snap, now);
        self.selected = 0;
        self.editing = None;
        if matches!(self.view, ChartView::Preview(_)) && !has_preview(model) {
            self.view = ChartView::Result;
        }
        debug!(model = %model, "model switched from the TUI");
        self.status = format!("{} selected.", model.display_name());
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
        let model = self.store.model();
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("calib", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" - {} | {} ({})", model.widget().display_name(), model.display_name(), model.as_str())),
        ]));

        let (state_label, state_color) = match self.pipeline.state() {
            PipelineState::Idle => ("idle", Color::Gray),
            PipelineState::Pending => ("pending", Color::Yellow),
            PipelineState::InFlight => ("calculating...", Color::Yellow),
        };
        let mut info = vec![
            Span::styled(state_label, Style::default().fg(state_color)),
            Span::raw(if model.is_dynamic() { " | auto-update" } else { " | manual" }),
        ];
        if let Some(outcome) = self.pipeline.outcome() {
            info.push(Span::styled(
                format!(
                    " | {} ms | cached={}",
                    outcome.response_time_ms,
                    outcome.response.cached()
                ),
                Style::default().fg(Color::Gray),
            ));
            if let Some(err) = calibration_error(&outcome.response.data) {
                info.push(Span::styled(
                    format!(" | calibration error={err:.6}"),
                    Style::default().fg(Color::Gray),
                ));
            }
        }
        lines.push(Line::from(info));

        if let Some(error) = self.pipeline.error() {
            lines.push(Line::from(Span::styled(
                error.to_string(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(34), Constraint::Min(0)])
            .split(area);

        self.draw_parameters(frame, chunks[0]);
        self.draw_chart(frame, chunks[1]);
    }

    fn draw_parameters(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let snap = self.store.snapshot();
        let items: Vec<ListItem> = snap
            .values
            .iter()
            .enumerate()
            .map(|(idx, (key, value))| {
                let shown = match (&self.editing, idx == self.selected) {
                    (Some(buffer), true) => format!("{buffer}_"),
                    _ => value.to_string(),
                };
                ListItem::new(format!("{key:<16} {shown}"))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Parameters").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let data = self.chart_data();
        let block = Block::default().title(data.title.as_str()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let fmt_x = if data.x_bounds[1] - data.x_bounds[0] < 1.0 { fmt_fine } else { fmt_coarse };
        let fmt_y = if data.y_bounds[1] - data.y_bounds[0] < 1.0 { fmt_fine } else { fmt_coarse };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = CalibPlottersChart {
            lines: &data.lines,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: data.x_label,
            y_label: data.y_label,
            fmt_x,
            fmt_y,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            let axes = AxisLabels {
                x_label: data.x_label,
                y_label: data.y_label,
                fmt_x,
                fmt_y,
            };
            draw_axis_ticks(frame, inner, chart_rect, insets, data.x_bounds, data.y_bounds, &axes);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter edit  c calibrate  m/M model  w widget  x reset  p view  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn chart_data(&self) -> ChartData {
        if let ChartView::Preview(kind) = self.view {
            let rows = preview(kind, &self.store.snapshot());
            let lines = vec![
                PlotLine {
                    label: "initial",
                    color: GRAY,
                    dotted: false,
                    points: rows.iter().map(|r| (r.strike, r.initial)).collect(),
                },
                PlotLine {
                    label: "current",
                    color: CYAN,
                    dotted: false,
                    points: rows.iter().map(|r| (r.strike, r.current)).collect(),
                },
            ];
            let y_label = match kind {
                PreviewKind::Smile => "implied vol",
                PreviewKind::Density => "density",
            };
            return finish_chart(kind.title().to_string(), "strike", y_label, lines);
        }

        let demo;
        let series: &ChartSeries = match self.pipeline.series() {
            Some(series) => series,
            None => {
                demo = demo_series();
                &demo
            }
        };
        let lines: Vec<PlotLine> = series
            .lines()
            .into_iter()
            .map(|l| PlotLine {
                label: l.label,
                color: field_color(l.field),
                dotted: l.dotted,
                points: l.points,
            })
            .collect();

        let title = match series.kind {
            SeriesKind::Demo => "Demo smile (no result yet)".to_string(),
            _ => {
                let labels: Vec<&str> = lines.iter().map(|l| l.label).collect();
                format!("Result: {}", labels.join(" · "))
            }
        };
        finish_chart(title, "strike", series.kind.y_label(), lines)
    }
}

fn finish_chart(title: String, x_label: &'static str, y_label: &'static str, lines: Vec<PlotLine>) -> ChartData {
    let (x_bounds, y_bounds) = axis_bounds(lines.iter().map(|l| l.points.as_slice()));
    ChartData {
        title,
        x_label,
        y_label,
        lines,
        x_bounds,
        y_bounds,
    }
}

/// Only the dynamic ASV/SVI widgets have local preview curves.
fn has_preview(model: ModelType) -> bool {
    matches!(
        model,
        ModelType::Asv(ComputationType::DynamicAsv | ComputationType::DynamicSvi)
    )
}

fn next_view(view: ChartView, model: ModelType) -> ChartView {
    if !has_preview(model) {
        return ChartView::Result;
    }
    match view {
        ChartView::Result => ChartView::Preview(PreviewKind::Smile),
        ChartView::Preview(PreviewKind::Smile) => ChartView::Preview(PreviewKind::Density),
        ChartView::Preview(PreviewKind::Density) => ChartView::Result,
    }
}

const CYAN: RGBColor = RGBColor(0, 255, 255);
const GRAY: RGBColor = RGBColor(150, 150, 150);

fn field_color(field: Field) -> RGBColor {
    match field {
        Field::CalibratedVol | Field::DynamicVol => CYAN,
        Field::Density => RGBColor(255, 0, 255),
        Field::InitialVol => RGBColor(255, 255, 0),
        Field::Mid => RGBColor(255, 255, 255),
        Field::Bid => RGBColor(0, 255, 0),
        Field::Ask => RGBColor(255, 0, 0),
        Field::Difference => GRAY,
    }
}

fn fmt_fine(v: f64) -> String {
    format!("{v:.3}")
}

fn fmt_coarse(v: f64) -> String {
    format!("{v:.1}")
}

struct AxisLabels<'a> {
    x_label: &'a str,
    y_label: &'a str,
    fmt_x: fn(f64) -> String,
    fmt_y: fn(f64) -> String,
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
        left: 8,
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

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    axes: &AxisLabels<'_>,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = (axes.fmt_x)(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
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
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = (axes.fmt_y)(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
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

    let x_label = Paragraph::new(axes.x_label)
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

    let y_label = Paragraph::new(axes.y_label).style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CalibrationRequest;
    use crate::domain::{CalibrationData, CalibrationResponse};

    struct Unreachable;

    impl CalibrationBackend for Unreachable {
        fn health(&self) -> Result<serde_json::Value, AppError> {
            Err(AppError::backend("connection refused"))
        }

        fn calibrate(&self, _request: &CalibrationRequest) -> Result<CalibrationResponse, AppError> {
            Ok(CalibrationResponse {
                data: CalibrationData::default(),
                ..CalibrationResponse::default()
            })
        }
    }

    fn app(model: ModelType) -> App {
        App::new(&AppConfig::default(), Arc::new(Unreachable), model, Instant::now())
    }

    fn select_key(app: &mut App, key: &str) {
        app.selected = app.keys().iter().position(|k| k == key).unwrap();
    }

    #[test]
    fn arrow_keys_nudge_and_arm_dynamic_models() {
        let mut app = app(ModelType::Asv(ComputationType::DynamicAsv));
        let now = Instant::now();
        select_key(&mut app, "rho");
        let before = app.store.snapshot().number("rho").unwrap();
        app.handle_key(KeyCode::Right, now);
        let after = app.store.snapshot().number("rho").unwrap();
        assert!(after > before);
        assert_eq!(app.pipeline.state(), PipelineState::Pending);
        assert!(app.status.starts_with("rho = "));
    }

    #[test]
    fn enter_edits_value_with_zero_fallback() {
        let mut app = app(ModelType::Asv(ComputationType::VolatilitySvi));
        let now = Instant::now();
        select_key(&mut app, "beta");
        app.handle_key(KeyCode::Enter, now);
        assert!(app.editing.is_some());
        app.editing = Some(String::new());
        for c in "0.9x".chars() {
            app.handle_key(KeyCode::Char(c), now);
        }
        app.handle_key(KeyCode::Enter, now);
        assert_eq!(app.editing, None);
        assert_eq!(app.store.snapshot().number("beta"), Some(0.0));
        // manual model: edits never arm the timer
        assert_eq!(app.pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn model_keys_cycle_within_widget_and_switch_widget() {
        let mut app = app(ModelType::Asv(ComputationType::DynamicSvi));
        let now = Instant::now();
        app.handle_key(KeyCode::Char('m'), now);
        assert_eq!(app.store.model(), ModelType::Asv(ComputationType::VolatilityAsv));
        app.handle_key(KeyCode::Char('w'), now);
        assert_eq!(app.store.model(), ModelType::Zabr(ZabrModel::ZabrClassic));
        assert_eq!(app.store.snapshot().number("alpha"), Some(0.09));
        assert!(app.handle_key(KeyCode::Char('q'), now));
    }

    #[test]
    fn flags_toggle_with_arrows() {
        let mut app = app(ModelType::Zabr(ZabrModel::ZabrMixture));
        select_key(&mut app, "use_vol_adjustement");
        app.handle_key(KeyCode::Left, Instant::now());
        assert_eq!(app.store.snapshot().flag("use_vol_adjustement"), Some(false));
    }

    #[test]
    fn chart_falls_back_to_demo_and_previews_dynamic_types() {
        let mut app = app(ModelType::Asv(ComputationType::DynamicAsv));
        let data = app.chart_data();
        assert!(data.title.starts_with("Demo smile"));
        assert_eq!(data.lines.len(), 1);

        app.handle_key(KeyCode::Char('p'), Instant::now());
        let data = app.chart_data();
        assert_eq!(data.lines.len(), 2);
        assert_eq!(data.lines[0].points.len(), 100);

        // previews are not offered for ZABR
        app.handle_key(KeyCode::Char('w'), Instant::now());
        assert_eq!(app.view, ChartView::Result);
    }
}
