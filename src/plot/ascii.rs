//! ASCII line charts for terminal output.
//!
//! Fixed-size character grid with deterministic output. Each series is drawn
//! with its own glyph; a `None` value breaks the line. Series drawn earlier
//! win overlapping cells.

use chrono::NaiveDate;

use crate::domain::{ForecastResult, SmoothedRecord};

const GLYPHS: [char; 5] = ['*', '+', 'x', 'o', '#'];

/// One labelled line on a chart.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub label: String,
    pub glyph: char,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

/// Cumulative cases per region.
pub fn cumulative_series(records: &[SmoothedRecord], regions: &[String]) -> Vec<ChartSeries> {
    region_series(records, regions, |r| Some(r.daily.record.cumulative_cases as f64))
}

/// 7-day average of daily cases per region; undefined positions are gaps.
pub fn average_series(records: &[SmoothedRecord], regions: &[String]) -> Vec<ChartSeries> {
    region_series(records, regions, |r| r.daily_cases_avg7)
}

fn region_series<F>(records: &[SmoothedRecord], regions: &[String], value: F) -> Vec<ChartSeries>
where
    F: Fn(&SmoothedRecord) -> Option<f64>,
{
    regions
        .iter()
        .enumerate()
        .map(|(i, region)| ChartSeries {
            label: region.clone(),
            glyph: GLYPHS[i % GLYPHS.len()],
            points: records
                .iter()
                .filter(|r| r.region() == region)
                .map(|r| (r.date(), value(r)))
                .collect(),
        })
        .filter(|s| !s.points.is_empty())
        .collect()
}

/// Render `series` on a shared date axis.
pub fn render_line_chart(title: &str, series: &[ChartSeries], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let all = series.iter().flat_map(|s| s.points.iter().copied());
    let Some(frame) = Frame::from_points(all, width, height) else {
        return format!("{title}: no data\n");
    };

    let mut grid = vec![vec![' '; width]; height];
    for s in series {
        draw_series(&mut grid, &frame, &s.points, s.glyph);
    }

    let legend: Vec<(char, String)> = series.iter().map(|s| (s.glyph, s.label.clone())).collect();
    finish(title, &frame, grid, &legend)
}

/// Render observed history followed by the forecast and its `level` band.
pub fn render_forecast_chart(
    title: &str,
    history: &[(NaiveDate, f64)],
    forecast: &ForecastResult,
    level: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let observed: Vec<(NaiveDate, Option<f64>)> = history.iter().map(|&(d, v)| (d, Some(v))).collect();
    let predicted: Vec<(NaiveDate, Option<f64>)> = forecast.steps.iter().map(|s| (s.date, Some(s.point))).collect();
    let band: Vec<(NaiveDate, f64, f64)> = forecast
        .steps
        .iter()
        .filter_map(|s| s.interval(level).map(|iv| (s.date, iv.lower, iv.upper)))
        .collect();

    let bounds = band
        .iter()
        .flat_map(|&(d, lo, hi)| [(d, Some(lo)), (d, Some(hi))]);
    let all = observed.iter().chain(predicted.iter()).copied().chain(bounds);
    let Some(frame) = Frame::from_points(all, width, height) else {
        return format!("{title}: no data\n");
    };

    let mut grid = vec![vec![' '; width]; height];
    draw_series(&mut grid, &frame, &observed, '*');
    draw_series(&mut grid, &frame, &predicted, 'f');
    for &(date, lo, hi) in &band {
        let x = frame.map_x(date);
        let top = frame.map_y(hi);
        let bottom = frame.map_y(lo);
        for row in grid.iter_mut().take(bottom + 1).skip(top) {
            if row[x] == ' ' {
                row[x] = ':';
            }
        }
    }

    let legend = vec![
        ('*', "observed".to_string()),
        ('f', "forecast".to_string()),
        (':', format!("{level:.0}% interval")),
    ];
    finish(title, &frame, grid, &legend)
}

struct Frame {
    start: NaiveDate,
    end: NaiveDate,
    data_min: f64,
    data_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

impl Frame {
    fn from_points<I>(points: I, width: usize, height: usize) -> Option<Self>
    where
        I: Iterator<Item = (NaiveDate, Option<f64>)>,
    {
        let mut start: Option<NaiveDate> = None;
        let mut end: Option<NaiveDate> = None;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (d, v) in points {
            start = Some(start.map_or(d, |s| s.min(d)));
            end = Some(end.map_or(d, |e| e.max(d)));
            if let Some(v) = v.filter(|v| v.is_finite()) {
                min_y = min_y.min(v);
                max_y = max_y.max(v);
            }
        }
        let (start, end) = (start?, end?);
        if !(min_y.is_finite() && max_y.is_finite()) {
            return None;
        }
        let (lo, hi) = if max_y > min_y { (min_y, max_y) } else { (min_y - 1.0, max_y + 1.0) };
        let (y_min, y_max) = pad_range(lo, hi, 0.05);
        Some(Self {
            start,
            end,
            data_min: min_y,
            data_max: max_y,
            y_min,
            y_max,
            width,
            height,
        })
    }

    fn map_x(&self, date: NaiveDate) -> usize {
        let span = (self.end - self.start).num_days();
        if span <= 0 {
            return 0;
        }
        let u = ((date - self.start).num_days() as f64 / span as f64).clamp(0.0, 1.0);
        (u * (self.width as f64 - 1.0)).round() as usize
    }

    fn map_y(&self, y: f64) -> usize {
        let u = ((y - self.y_min) / (self.y_max - self.y_min)).clamp(0.0, 1.0);
        // y=top is max -> row 0
        (self.height as f64 - 1.0 - (u * (self.height as f64 - 1.0))).round() as usize
    }
}

fn finish(title: &str, frame: &Frame, grid: Vec<Vec<char>>, legend: &[(char, String)]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{title}: {} .. {} | y=[{:.0}, {:.0}]\n",
        frame.start, frame.end, frame.data_min, frame.data_max
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    let entries: Vec<String> = legend.iter().map(|(g, l)| format!("{g} {l}")).collect();
    out.push_str(&entries.join("   "));
    out.push('\n');
    out
}

fn draw_series(grid: &mut [Vec<char>], frame: &Frame, points: &[(NaiveDate, Option<f64>)], glyph: char) {
    let mut prev: Option<(usize, usize)> = None;
    for &(date, value) in points {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            prev = None;
            continue;
        };
        let x = frame.map_x(date);
        let y = frame.map_y(v);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, y, glyph),
            None => {
                if grid[y][x] == ' ' {
                    grid[y][x] = glyph;
                }
            }
        }
        prev = Some((x, y));
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
