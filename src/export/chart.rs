//! SVG charts of a run, drawn with `plotters`.
//!
//! - `<name>.svg`: "Evaluation Time" line chart of one configuration,
//!   written as soon as that configuration completes,
//! - `overview.svg` with every configuration's execution series,
//! - `histogram.svg` comparing min/max/avg/mdn across configurations.

use std::fs;
use std::path::PathBuf;

use plotters::coord::{CoordTranslate, Shift};
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use super::{ExportError, OutputSink};
use crate::harness::RunContainer;
use crate::suite::sanitize_name;

pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;

pub const OVERVIEW_FILE: &str = "overview.svg";
pub const HISTOGRAM_FILE: &str = "histogram.svg";

type DrawResult<DB> = Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Axis titles and series shared by both chart kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl ChartSpec {
    fn y_max(&self) -> f64 {
        let peak = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        if peak > 0.0 { peak * 1.05 } else { 1.0 }
    }
}

fn draw_legend<'a, DB, CT>(chart: &mut ChartContext<'a, DB, CT>, spec: &ChartSpec) -> DrawResult<DB>
where
    DB: DrawingBackend + 'a,
    CT: CoordTranslate,
{
    if spec.series.is_empty() {
        return Ok(());
    }
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
}

fn draw_line_chart<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let longest = spec.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let x_max = longest.saturating_sub(1).max(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..x_max, 0.0..spec.y_max())?;
    chart
        .configure_mesh()
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()?;

    for (i, s) in spec.series.iter().enumerate() {
        let style = Palette99::pick(i).stroke_width(2);
        chart
            .draw_series(LineSeries::new(
                s.values.iter().enumerate().map(|(n, v)| (n as f64, *v)),
                style,
            ))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
    }
    draw_legend(&mut chart, spec)
}

fn draw_category_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    categories: &[String],
) -> DrawResult<DB> {
    root.fill(&WHITE)?;
    let groups = categories.len().max(1);

    // Group `c` is centered on x = c.
    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..(groups as f64 - 0.5), 0.0..spec.y_max())?;

    let category_label = |x: &f64| {
        let i = x.round();
        if (x - i).abs() < 1e-6 && i >= 0.0 {
            categories.get(i as usize).cloned().unwrap_or_default()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(groups)
        .x_label_formatter(&category_label)
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()?;

    let bar = 0.8 / spec.series.len().max(1) as f64;
    for (i, s) in spec.series.iter().enumerate() {
        let style = Palette99::pick(i).filled();
        let offset = -0.4 + bar * i as f64;
        chart
            .draw_series(s.values.iter().take(categories.len()).enumerate().map(|(c, v)| {
                let left = c as f64 + offset;
                Rectangle::new([(left, 0.0), (left + bar, *v)], style)
            }))?
            .label(s.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], style));
    }
    draw_legend(&mut chart, spec)
}

fn render_svg<F>(width: u32, height: u32, draw: F) -> Result<String, String>
where
    F: FnOnce(&DrawingArea<SVGBackend, Shift>) -> Result<(), DrawingAreaErrorKind<std::io::Error>>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        draw(&root).map_err(|e| e.to_string())?;
        root.present().map_err(|e| e.to_string())?;
    }
    Ok(svg)
}

/// Line chart: x is the sample position, one line per series.
pub fn render_line_chart(spec: &ChartSpec, width: u32, height: u32) -> Result<String, String> {
    render_svg(width, height, |root| draw_line_chart(root, spec))
}

/// Grouped bar chart: one group per category, one bar per series.
pub fn render_category_chart(
    spec: &ChartSpec,
    categories: &[String],
    width: u32,
    height: u32,
) -> Result<String, String> {
    render_svg(width, height, |root| draw_category_chart(root, spec, categories))
}

/// Renders the charts of a run into its directory.
///
/// Per-configuration charts are written from
/// [`OutputSink::configuration_completed`], the overview and histogram
/// charts from [`OutputSink::publish`].
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    dir: PathBuf,
    width: u32,
    height: u32,
}

impl ChartRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn write(&self, file: &str, rendered: Result<String, String>) -> Result<(), ExportError> {
        let path = self.dir.join(file);
        match rendered {
            Ok(svg) => fs::write(&path, svg).map_err(|e| ExportError::io(path, e)),
            Err(reason) => Err(ExportError::Chart { path, reason }),
        }
    }
}

fn evaluation_time(series: Vec<Series>) -> ChartSpec {
    ChartSpec {
        title: "Evaluation Time".to_string(),
        x_label: "Run".to_string(),
        y_label: "ms".to_string(),
        series,
    }
}

impl OutputSink for ChartRenderer {
    fn name(&self) -> &str {
        "chart"
    }

    fn configuration_completed(
        &mut self,
        run: &RunContainer,
        configuration: &str,
    ) -> Result<(), ExportError> {
        let spec = evaluation_time(vec![Series::new(
            configuration,
            run.execution_series(configuration),
        )]);
        let file = format!("{}.svg", sanitize_name(configuration));
        self.write(&file, render_line_chart(&spec, self.width, self.height))
    }

    fn publish(&mut self, run: &RunContainer) -> Result<(), ExportError> {
        let overview = evaluation_time(
            run.identifiers()
                .iter()
                .map(|name| Series::new(name.clone(), run.execution_series(name)))
                .collect(),
        );
        self.write(OVERVIEW_FILE, render_line_chart(&overview, self.width, self.height))?;

        let aggregates = ChartSpec {
            title: "Aggregates".to_string(),
            x_label: "Run".to_string(),
            y_label: "ms".to_string(),
            series: vec![
                Series::new("min", run.min_values().to_vec()),
                Series::new("max", run.max_values().to_vec()),
                Series::new("avg", run.avg_values().to_vec()),
                Series::new("mdn", run.mdn_values().to_vec()),
            ],
        };
        let histogram =
            render_category_chart(&aggregates, run.identifiers(), self.width, self.height);
        self.write(HISTOGRAM_FILE, histogram)
    }
}
