use crate::error::AnalysisError::ChartError;
use crate::error::AnalysisResult;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct LinePlot {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarPlot {
    pub label: String,
    /// One slot per category; `None` draws no bar.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Lines(Vec<LinePlot>),
    Bars {
        categories: Vec<String>,
        series: Vec<BarPlot>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub data: ChartData,
}

/// Draws a chart to an image file.
pub trait ChartRenderer {
    fn render(
        &self,
        path: &Path,
        chart: &Chart,
    ) -> AnalysisResult<()>;
}

// matplotlib's default cycle, matching earlier reports
const SERIES_COLORS: [RGBColor; 4] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
];

fn series_color(index: usize) -> RGBColor {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

// Without a font backend plotters panics on any text, so captions, tick labels
// and legends are only drawn when the `fonts` feature is on.
const DRAW_TEXT: bool = cfg!(feature = "fonts");

type PlotContext<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn chart_error(e: impl std::fmt::Display) -> crate::error::AnalysisError {
    ChartError(e.to_string())
}

/// PNG renderer backed by plotters' bitmap backend.
#[derive(Debug, Clone, Copy)]
pub struct PlottersRenderer {
    width: u32,
    height: u32,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        PlottersRenderer {
            width: 1000,
            height: 600,
        }
    }
}

impl PlottersRenderer {
    pub fn new(
        width: u32,
        height: u32,
    ) -> Self {
        PlottersRenderer { width, height }
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(
        &self,
        path: &Path,
        chart: &Chart,
    ) -> AnalysisResult<()> {
        validate(chart)?;
        debug!("Rendering '{}' to {}", chart.title, path.display());
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        match &chart.data {
            ChartData::Lines(series) => draw_lines(&root, chart, series)?,
            ChartData::Bars { categories, series } => draw_bars(&root, chart, categories, series)?,
        }

        root.present().map_err(chart_error)?;
        Ok(())
    }
}

// Checked before the backend exists, so a rejected chart leaves no file behind.
fn validate(chart: &Chart) -> AnalysisResult<()> {
    let empty = match &chart.data {
        ChartData::Lines(series) => series.iter().all(|line| line.points.is_empty()),
        ChartData::Bars { categories, series } => {
            categories.is_empty()
                || series
                    .iter()
                    .all(|bars| bars.values.iter().all(Option::is_none))
        }
    };
    if empty {
        return Err(ChartError(format!("'{}' has no data", chart.title)));
    }
    Ok(())
}

fn padded_range(
    min: f64,
    max: f64,
) -> (f64, f64) {
    if (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad, max + pad)
    }
}

fn y_upper_bound(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(0.0_f64, f64::max);
    if max > 0.0 {
        max * 1.15
    } else {
        1.0
    }
}

fn chart_builder<'a, 'b, 'c>(
    root: &'a DrawingArea<BitMapBackend<'c>, Shift>,
    chart: &Chart,
) -> ChartBuilder<'a, 'b, BitMapBackend<'c>> {
    let mut builder = ChartBuilder::on(root);
    builder.margin(20);
    if DRAW_TEXT {
        builder
            .caption(&chart.title, ("sans-serif", 26))
            .x_label_area_size(50)
            .y_label_area_size(70);
    }
    builder
}

/// Bare x and y axis lines, used when no text can be drawn.
fn draw_axes(
    ctx: &mut PlotContext<'_, '_>,
    x_start: f64,
    x_end: f64,
    y_end: f64,
) -> AnalysisResult<()> {
    ctx.draw_series([
        PathElement::new(vec![(x_start, 0.0), (x_end, 0.0)], BLACK.stroke_width(1)),
        PathElement::new(vec![(x_start, 0.0), (x_start, y_end)], BLACK.stroke_width(1)),
    ])
    .map_err(chart_error)?;
    Ok(())
}

fn draw_legend<'a, 'b: 'a>(ctx: &mut PlotContext<'a, 'b>) -> AnalysisResult<()> {
    if DRAW_TEXT {
        ctx.configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(chart_error)?;
    }
    Ok(())
}

fn draw_lines(
    root: &DrawingArea<BitMapBackend, Shift>,
    chart: &Chart,
    series: &[LinePlot],
) -> AnalysisResult<()> {
    let points = || series.iter().flat_map(|s| s.points.iter().copied());
    let x_min = points().map(|(x, _)| x).fold(f64::INFINITY, f64::min);
    let x_max = points().map(|(x, _)| x).fold(f64::NEG_INFINITY, f64::max);
    let (x_start, x_end) = padded_range(x_min, x_max);
    let y_end = y_upper_bound(points().map(|(_, y)| y));

    let mut ctx = chart_builder(root, chart)
        .build_cartesian_2d(x_start..x_end, 0f64..y_end)
        .map_err(chart_error)?;

    if DRAW_TEXT {
        ctx.configure_mesh()
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .draw()
            .map_err(chart_error)?;
    } else {
        draw_axes(&mut ctx, x_start, x_end, y_end)?;
    }

    for (index, line) in series.iter().enumerate() {
        let color = series_color(index);
        ctx.draw_series(LineSeries::new(line.points.iter().copied(), color.stroke_width(2)))
            .map_err(chart_error)?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        ctx.draw_series(
            line.points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 5, color.filled())),
        )
        .map_err(chart_error)?;
    }

    draw_legend(&mut ctx)
}

fn draw_bars(
    root: &DrawingArea<BitMapBackend, Shift>,
    chart: &Chart,
    categories: &[String],
    series: &[BarPlot],
) -> AnalysisResult<()> {
    let y_end = y_upper_bound(series.iter().flat_map(|s| s.values.iter().flatten().copied()));
    let slots = categories.len() as f64;

    let label_for = |x: &f64| -> String {
        let index = x.round();
        if (x - index).abs() < 1e-6 && index >= 0.0 && (index as usize) < categories.len() {
            categories[index as usize].clone()
        } else {
            String::new()
        }
    };

    let mut ctx = chart_builder(root, chart)
        .build_cartesian_2d(-0.5f64..(slots - 0.5), 0f64..y_end)
        .map_err(chart_error)?;

    if DRAW_TEXT {
        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(categories.len())
            .x_label_formatter(&label_for)
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .draw()
            .map_err(chart_error)?;
    } else {
        draw_axes(&mut ctx, -0.5, slots - 0.5, y_end)?;
    }

    // bars of one category share 70% of the slot
    let width = 0.7 / series.len() as f64;
    for (index, bars) in series.iter().enumerate() {
        let color = series_color(index);
        let offset = width * (index as f64 - series.len() as f64 / 2.0);
        let rects = bars
            .values
            .iter()
            .enumerate()
            .filter_map(|(slot, value)| value.map(|v| (slot as f64, v)))
            .map(move |(x, v)| {
                Rectangle::new([(x + offset, 0.0), (x + offset + width, v)], color.mix(0.8).filled())
            });
        ctx.draw_series(rects)
            .map_err(chart_error)?
            .label(bars.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    draw_legend(&mut ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plotters_renderer_writes_line_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.png");
        let chart = Chart {
            title: "CPU".to_string(),
            x_label: "Viewers".to_string(),
            y_label: "CPU (%)".to_string(),
            data: ChartData::Lines(vec![
                LinePlot {
                    label: "P2P Architecture".to_string(),
                    points: vec![(1.0, 15.0), (5.0, 47.0)],
                },
                LinePlot {
                    label: "SFU Architecture".to_string(),
                    points: vec![(1.0, 27.0), (5.0, 35.0)],
                },
            ]),
        };

        PlottersRenderer::new(320, 200).render(&path, &chart).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_plotters_renderer_writes_bar_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.png");
        let chart = Chart {
            title: "TLS".to_string(),
            x_label: "Bandwidth".to_string(),
            y_label: "TLS".to_string(),
            data: ChartData::Bars {
                categories: vec!["1 Mbps".to_string(), "5 Mbps".to_string()],
                series: vec![BarPlot {
                    label: "P2P Architecture".to_string(),
                    values: vec![Some(0.3), None],
                }],
            },
        };

        PlottersRenderer::new(320, 200).render(&path, &chart).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_empty_lines_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let chart = Chart {
            title: "empty".to_string(),
            x_label: String::new(),
            y_label: String::new(),
            data: ChartData::Lines(vec![]),
        };
        let path = dir.path().join("empty.png");
        let err = PlottersRenderer::default().render(&path, &chart).unwrap_err();
        assert!(matches!(err, crate::error::AnalysisError::ChartError(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_default_build_renders_titled_charts() {
        let dir = tempfile::tempdir().unwrap();
        let lines = Chart {
            title: "Glass-to-Glass Latency vs. Packet Loss Rate (N=5 viewers)".to_string(),
            x_label: "Packet Loss Rate (%)".to_string(),
            y_label: "Glass-to-Glass Latency (ms)".to_string(),
            data: ChartData::Lines(vec![LinePlot {
                label: "SFU Architecture".to_string(),
                points: vec![(0.0, 80.0)],
            }]),
        };
        let bars = Chart {
            title: "Text Legibility Score vs. Presenter Bandwidth".to_string(),
            x_label: "Presenter Bandwidth".to_string(),
            y_label: "Text Legibility Score".to_string(),
            data: ChartData::Bars {
                categories: vec!["1 Mbps".to_string(), "2 Mbps".to_string(), "5 Mbps".to_string()],
                series: vec![
                    BarPlot {
                        label: "P2P Architecture".to_string(),
                        values: vec![Some(0.27), None, Some(0.07)],
                    },
                    BarPlot {
                        label: "SFU Architecture".to_string(),
                        values: vec![Some(0.26), Some(0.13), None],
                    },
                ],
            },
        };

        let renderer = PlottersRenderer::default();
        for (name, chart) in [("lines.png", &lines), ("bars.png", &bars)] {
            let path = dir.path().join(name);
            renderer.render(&path, chart).unwrap();
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }
}
