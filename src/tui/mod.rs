//! Ratatui-based terminal UI.
//!
//! Shows the cumulative, 7-day average and forecast charts for one pipeline
//! run. `Tab` cycles charts, `r` re-runs the pipeline, `q` quits.

use std::io;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
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
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::pipeline::{RunOutput, run_pipeline};
use crate::domain::PipelineConfig;
use crate::error::AppError;
use crate::plot::{ChartSeries, average_series, cumulative_series};

mod plotters_chart;

use plotters_chart::{ChartLine, EpiPlottersChart};

const PALETTE: [(u8, u8, u8); 5] = [(0, 255, 255), (255, 255, 0), (0, 255, 0), (255, 0, 255), (255, 128, 0)];
const FORECAST_COLOR: (u8, u8, u8) = (255, 0, 0);
const BAND_COLOR: (u8, u8, u8) = (128, 128, 128);

/// Start the TUI.
///
/// The first run happens before the terminal is taken over so that load and
/// fit errors print normally.
pub fn run(config: PipelineConfig) -> Result<(), AppError> {
    let first = run_pipeline(&config)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::terminal(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config, first);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::terminal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::terminal(format!("Failed to enter alternate screen: {e}")));
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

/// Which chart fills the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartView {
    Cumulative,
    Average,
    Forecast,
}

impl ChartView {
    fn next(self) -> Self {
        match self {
            ChartView::Cumulative => ChartView::Average,
            ChartView::Average => ChartView::Forecast,
            ChartView::Forecast => ChartView::Cumulative,
        }
    }

    fn title(self) -> &'static str {
        match self {
            ChartView::Cumulative => "Cumulative cases",
            ChartView::Average => "Daily cases (trailing average)",
            ChartView::Forecast => "Daily cases forecast",
        }
    }
}

struct App {
    config: PipelineConfig,
    view: ChartView,
    status: String,
    run: RunOutput,
}

impl App {
    fn new(config: PipelineConfig, run: RunOutput) -> Self {
        Self {
            config,
            view: ChartView::Cumulative,
            status: "Ready.".to_string(),
            run,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::terminal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::terminal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::terminal(format!("Event read error: {e}")))? {
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

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => {
                self.view = self.view.next();
                self.status = format!("view: {}", self.view.title());
            }
            KeyCode::Char('r') => self.rerun(),
            _ => {}
        }
        false
    }

    fn rerun(&mut self) {
        if self.config.offline {
            self.config.sample_seed = self.config.sample_seed.wrapping_add(1);
        }
        match run_pipeline(&self.config) {
            Ok(run) => {
                self.run = run;
                self.status = if self.config.offline {
                    format!("Re-ran with sample seed {}.", self.config.sample_seed)
                } else {
                    "Re-fetched and re-fit.".to_string()
                };
            }
            Err(err) => {
                self.status = format!("Re-run failed: {err}");
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_chart(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let best = &self.run.selection.best;
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("epi", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" - {} | forecast: {}", self.config.regions.join(", "), self.config.forecast_region)),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "model: {} | AICc={:.2} | sigma^2={:.2} | horizon={}d",
                best.order, best.quality.aicc, best.quality.sigma2, self.config.horizon
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title(self.view.title()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let data = chart_data(&self.run, &self.config.regions, self.view, &self.config.levels);
        let Some(data) = data else {
            let msg = Paragraph::new("No data for this chart.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = EpiPlottersChart {
            lines: &data.lines,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            x_label: "date",
            y_label: "cases",
            fmt_x: fmt_axis_date,
            fmt_y: fmt_axis_count,
        };
        frame.render_widget(widget, chart_rect);

        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, data.x_bounds, data.y_bounds);
            draw_legend(frame, inner, &data.legend);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab next chart  r re-run  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Lines, legend and bounds for one chart view.
struct ChartData {
    lines: Vec<ChartLine>,
    legend: Vec<(String, Color)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

fn chart_data(run: &RunOutput, regions: &[String], view: ChartView, levels: &[f64]) -> Option<ChartData> {
    let mut lines = Vec::new();
    let mut legend = Vec::new();

    match view {
        ChartView::Cumulative | ChartView::Average => {
            let series = if view == ChartView::Cumulative {
                cumulative_series(&run.records, regions)
            } else {
                average_series(&run.records, regions)
            };
            for (i, s) in series.iter().enumerate() {
                let (r, g, b) = PALETTE[i % PALETTE.len()];
                lines.push(ChartLine {
                    color: RGBColor(r, g, b),
                    segments: segments(s),
                });
                legend.push((s.label.clone(), Color::Rgb(r, g, b)));
            }
        }
        ChartView::Forecast => {
            let history: Vec<(f64, f64)> = run.history.iter().map(|&(d, v)| (day_number(d), v)).collect();
            let (r, g, b) = PALETTE[0];
            lines.push(ChartLine {
                color: RGBColor(r, g, b),
                segments: vec![history],
            });
            legend.push((run.forecast.region.clone(), Color::Rgb(r, g, b)));

            let level = levels.iter().copied().fold(f64::NAN, f64::max);
            let mut lower = Vec::new();
            let mut upper = Vec::new();
            for step in &run.forecast.steps {
                if let Some(iv) = step.interval(level) {
                    lower.push((day_number(step.date), iv.lower));
                    upper.push((day_number(step.date), iv.upper));
                }
            }
            let (r, g, b) = BAND_COLOR;
            lines.push(ChartLine {
                color: RGBColor(r, g, b),
                segments: vec![lower, upper],
            });
            legend.push((format!("{level:.0}% interval"), Color::Rgb(r, g, b)));

            let point: Vec<(f64, f64)> = run
                .forecast
                .steps
                .iter()
                .map(|s| (day_number(s.date), s.point))
                .collect();
            let (r, g, b) = FORECAST_COLOR;
            lines.push(ChartLine {
                color: RGBColor(r, g, b),
                segments: vec![point],
            });
            legend.push(("forecast".to_string(), Color::Rgb(r, g, b)));
        }
    }

    let (x_bounds, y_bounds) = bounds(&lines)?;
    Some(ChartData {
        lines,
        legend,
        x_bounds,
        y_bounds,
    })
}

/// Split a series at undefined values.
fn segments(series: &ChartSeries) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for &(date, value) in &series.points {
        match value.filter(|v| v.is_finite()) {
            Some(v) => current.push((day_number(date), v)),
            None => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn bounds(lines: &[ChartLine]) -> Option<([f64; 2], [f64; 2])> {
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in lines.iter().flat_map(|l| l.segments.iter().flatten()) {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !(x_min.is_finite() && x_max.is_finite() && y_min.is_finite() && y_max.is_finite()) {
        return None;
    }
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    Some(([x_min, x_max], [y_min - pad, y_max + pad]))
}

fn day_number(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn fmt_axis_date(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn fmt_axis_count(v: f64) -> String {
    let a = v.abs();
    if a >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if a >= 1e3 {
        format!("{:.0}k", v / 1e3)
    } else {
        format!("{v:.0}")
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
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_date(x_val);
        let label_len = label.len() as u16;
        let start = x
            .saturating_sub(label_len / 2)
            .min((inner.x + inner.width).saturating_sub(label_len));
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
        let label = fmt_axis_count(y_val);
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

    let x_label = Paragraph::new("date")
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

    let y_label = Paragraph::new("cases").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}

fn draw_legend(frame: &mut ratatui::Frame<'_>, inner: Rect, legend: &[(String, Color)]) {
    let mut spans = Vec::new();
    for (label, color) in legend {
        spans.push(Span::styled("■ ", Style::default().fg(*color)));
        spans.push(Span::raw(format!("{label}  ")));
    }
    let rect = Rect {
        x: inner.x + inner.width / 3,
        y: inner.y,
        width: inner.width - inner.width / 3,
        height: 1,
    };
    frame.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Right), rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::run_with_tables;
    use crate::data::sample_tables;

    fn offline_run() -> (PipelineConfig, RunOutput) {
        let config = PipelineConfig {
            offline: true,
            ..PipelineConfig::default()
        };
        let (cases, deaths) = sample_tables(&config.regions, 5, 90).unwrap();
        let run = run_with_tables(&config, &cases, &deaths).unwrap();
        (config, run)
    }

    #[test]
    fn tab_cycles_through_all_views() {
        let v = ChartView::Cumulative;
        assert_eq!(v.next(), ChartView::Average);
        assert_eq!(v.next().next(), ChartView::Forecast);
        assert_eq!(v.next().next().next(), ChartView::Cumulative);
    }

    #[test]
    fn average_chart_skips_undefined_prefix() {
        let (config, run) = offline_run();
        let data = chart_data(&run, &config.regions, ChartView::Average, &config.levels).unwrap();
        assert_eq!(data.lines.len(), 2);
        // Window 7 leaves 6 undefined leading days per region.
        assert_eq!(data.lines[0].segments.len(), 1);
        assert_eq!(data.lines[0].segments[0].len(), 90 - 6);
    }

    #[test]
    fn forecast_chart_has_history_band_and_point() {
        let (config, run) = offline_run();
        let data = chart_data(&run, &config.regions, ChartView::Forecast, &config.levels).unwrap();
        assert_eq!(data.lines.len(), 3);
        assert_eq!(data.lines[1].segments.len(), 2);
        assert_eq!(data.lines[2].segments[0].len(), config.horizon);
        assert!(data.x_bounds[1] > data.x_bounds[0]);
        assert!(data.y_bounds[1] > data.y_bounds[0]);
        assert_eq!(data.legend[1].0, "95% interval");
    }

    #[test]
    fn segments_break_at_gaps() {
        let d = |i: u32| NaiveDate::from_ymd_opt(2020, 6, i).unwrap();
        let s = ChartSeries {
            label: "US".to_string(),
            glyph: '*',
            points: vec![(d(1), Some(1.0)), (d(2), None), (d(3), Some(3.0)), (d(4), Some(4.0))],
        };
        let segs = segments(&s);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].len(), 1);
        assert_eq!(segs[1].len(), 2);
    }

    #[test]
    fn axis_labels_format_dates_and_counts() {
        let day = day_number(NaiveDate::from_ymd_opt(2021, 2, 3).unwrap());
        assert_eq!(fmt_axis_date(day), "2021-02-03");
        assert_eq!(fmt_axis_count(2_500_000.0), "2.5M");
        assert_eq!(fmt_axis_count(12_000.0), "12k");
        assert_eq!(fmt_axis_count(42.0), "42");
    }
}
