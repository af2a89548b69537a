//! Chart rendering.
//!
//! The geometry of the chart (series, reference lines, axis ranges) is
//! computed once by [`ChartData::build`]; the backends only draw it.
//! Bitmap and SVG output go through plotters, TeX and PDF through pgfplots.

use crate::config::{OutputFormat, PlotConfig, Scale};
use crate::error::{PlotError, Result};
use crate::measurements::MeasurementTable;
use crate::thresholds::{ThresholdMarker, Thresholds};
use itertools::Itertools;
use pgfplots::axis::plot::coordinate::Coordinate2D;
use pgfplots::axis::plot::{Plot2D, PlotKey};
use pgfplots::axis::{Axis, AxisKey};
use pgfplots::{Engine, Picture};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::PathBuf;

const SERIES_COLORS: [(u8, u8, u8); 2] = [(31, 119, 180), (255, 127, 14)];
const SERIES_TEX_COLORS: [&str; 2] = ["blue", "orange"];

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub output: PathBuf,
    pub format: OutputFormat,
    pub x_scale: Scale,
    pub y_scale: Scale,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl RenderOptions {
    pub fn from_config(config: &PlotConfig) -> Result<RenderOptions> {
        let output = config.output_path();
        let format = OutputFormat::from_path(&output)?;
        Ok(RenderOptions {
            output,
            format,
            x_scale: config.x_scale,
            y_scale: config.y_scale,
            title: config.title.clone(),
            width: config.width,
            height: config.height,
        })
    }

    pub fn x_label(&self) -> String {
        format!("Bytes allocated ({} scale)", self.x_scale.name())
    }

    pub fn y_label(&self) -> String {
        format!("Latency (ns {} scale)", self.y_scale.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: &'static str,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    /// Random access first, then sequential access.
    pub series: Vec<Series>,
    pub markers: Vec<ThresholdMarker>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    /// Points left out because the axis scale cannot represent them.
    pub dropped: usize,
}

fn representable(scale: Scale, v: f64) -> bool {
    match scale {
        Scale::Log => v > 0.0,
        Scale::Linear => true,
    }
}

fn padded(range: (f64, f64), scale: Scale) -> (f64, f64) {
    let (min, max) = range;
    match scale {
        Scale::Log => (min / 1.5, max * 1.5),
        Scale::Linear => {
            let span = if max > min { max - min } else { min.abs().max(1.0) };
            (min - 0.05 * span, max + 0.05 * span)
        }
    }
}

fn extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.minmax_by(|a, b| a.total_cmp(b)).into_option()
}

fn all_points(series: &[Series]) -> impl Iterator<Item = &(f64, f64)> {
    series.iter().flat_map(|s| s.points.iter())
}

impl ChartData {
    pub fn build(
        table: &MeasurementTable,
        thresholds: &Thresholds,
        x_scale: Scale,
        y_scale: Scale,
    ) -> Result<ChartData> {
        if table.is_empty() {
            return Err(PlotError::EmptyTable);
        }

        let mut dropped = 0;
        let mut keep = |points: Vec<(f64, f64)>| -> Vec<(f64, f64)> {
            let total = points.len();
            let kept: Vec<_> = points
                .into_iter()
                .filter(|&(x, y)| representable(x_scale, x) && representable(y_scale, y))
                .collect();
            dropped += total - kept.len();
            kept
        };
        let series = vec![
            Series {
                label: "Random access",
                points: keep(table.random_series().collect()),
            },
            Series {
                label: "Sequential access",
                points: keep(table.sequential_series().collect()),
            },
        ];
        if dropped > 0 {
            log::warn!(
                "Dropped {} points that cannot be shown on a {} x / {} y chart",
                dropped,
                x_scale.name(),
                y_scale.name()
            );
        }

        let (y_min, y_max) =
            extent(all_points(&series).map(|p| p.1)).ok_or(PlotError::NoPlottablePoints)?;

        let markers: Vec<ThresholdMarker> = thresholds
            .markers()
            .into_iter()
            .filter(|m| representable(x_scale, m.x))
            .collect();
        let (x_min, x_max) =
            extent(all_points(&series).map(|p| p.0).chain(markers.iter().map(|m| m.x)))
                .ok_or(PlotError::NoPlottablePoints)?;

        Ok(ChartData {
            x_range: padded((x_min, x_max), x_scale),
            y_range: padded((y_min, y_max), y_scale),
            series,
            markers,
            dropped,
        })
    }
}

/// Build the chart and write it to `options.output`.
pub fn render(
    table: &MeasurementTable,
    thresholds: &Thresholds,
    options: &RenderOptions,
) -> Result<()> {
    let data = ChartData::build(table, thresholds, options.x_scale, options.y_scale)?;
    match options.format {
        OutputFormat::Png => {
            let root = BitMapBackend::new(&options.output, (options.width, options.height))
                .into_drawing_area();
            draw(root, &data, options)
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(&options.output, (options.width, options.height))
                .into_drawing_area();
            draw(root, &data, options)
        }
        OutputFormat::Tex => {
            let tex = picture(&data, options).standalone_string();
            std::fs::write(&options.output, tex).map_err(|source| PlotError::FileAccess {
                path: options.output.clone(),
                source,
            })
        }
        OutputFormat::Pdf => {
            let folder = match options.output.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let jobname = options
                .output
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| PlotError::Config("output file name is not valid UTF-8".into()))?;
            picture(&data, options)
                .to_pdf(&folder, jobname, Engine::PdfLatex)
                .map_err(|e| PlotError::Render(format!("Failed to create PDF: {:?}", e)))?;
            Ok(())
        }
    }?;
    log::info!("Wrote {}", options.output.display());
    Ok(())
}

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}

// One expansion per axis scale combination: log and linear axes are distinct coordinate types.
macro_rules! draw_chart {
    ($root:expr, $data:expr, $options:expr, $x_spec:expr, $y_spec:expr) => {{
        let mut chart = ChartBuilder::on($root)
            .caption(&$options.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d($x_spec, $y_spec)
            .map_err(PlotError::render)?;

        chart
            .configure_mesh()
            .x_desc($options.x_label())
            .y_desc($options.y_label())
            .draw()
            .map_err(PlotError::render)?;

        for (series, color) in $data.series.iter().zip(SERIES_COLORS) {
            let style = rgb(color).stroke_width(2);
            chart
                .draw_series(LineSeries::new(series.points.iter().copied(), style))
                .map_err(PlotError::render)?
                .label(series.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }

        let (y_low, y_high) = $data.y_range;
        for marker in &$data.markers {
            let style = rgb(marker.color.rgb()).stroke_width(1);
            chart
                .draw_series(LineSeries::new(
                    vec![(marker.x, y_low), (marker.x, y_high)],
                    style,
                ))
                .map_err(PlotError::render)?
                .label(marker.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(PlotError::render)?;
    }};
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    data: &ChartData,
    options: &RenderOptions,
) -> Result<()> {
    root.fill(&WHITE).map_err(PlotError::render)?;
    let (x0, x1) = data.x_range;
    let (y0, y1) = data.y_range;
    match (options.x_scale, options.y_scale) {
        (Scale::Log, Scale::Log) => {
            draw_chart!(&root, data, options, (x0..x1).log_scale(), (y0..y1).log_scale())
        }
        (Scale::Log, Scale::Linear) => {
            draw_chart!(&root, data, options, (x0..x1).log_scale(), y0..y1)
        }
        (Scale::Linear, Scale::Log) => {
            draw_chart!(&root, data, options, x0..x1, (y0..y1).log_scale())
        }
        (Scale::Linear, Scale::Linear) => draw_chart!(&root, data, options, x0..x1, y0..y1),
    }
    root.present().map_err(PlotError::render)?;
    Ok(())
}

/// Escape the characters LaTeX treats specially in text.
fn tex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '\\' => out.push_str(r"\textbackslash{}"),
            _ => out.push(c),
        }
    }
    out
}

fn tex_mode(scale: Scale) -> &'static str {
    match scale {
        Scale::Log => "log",
        Scale::Linear => "normal",
    }
}

fn line_plot(points: impl Iterator<Item = (f64, f64)>, style: String) -> Plot2D {
    let mut plot = Plot2D::new();
    plot.coordinates = points.map(Coordinate2D::from).collect();
    plot.add_key(PlotKey::Custom(style));
    plot
}

fn picture(data: &ChartData, options: &RenderOptions) -> Picture {
    let mut axis = Axis::new();
    axis.set_title(tex_escape(&options.title).as_str());
    axis.set_x_label(options.x_label().as_str());
    axis.set_y_label(options.y_label().as_str());

    let (x_min, x_max) = data.x_range;
    let (y_min, y_max) = data.y_range;
    axis.add_key(AxisKey::Custom(format!(
        "height=10cm, width=16cm, xmode={}, ymode={}, xmin={}, xmax={}, ymin={}, ymax={}, tick align=outside, tick pos=left, legend pos=outer north east,",
        tex_mode(options.x_scale),
        tex_mode(options.y_scale),
        x_min,
        x_max,
        y_min,
        y_max
    )));

    let legend = data
        .series
        .iter()
        .map(|s| s.label.to_string())
        .chain(data.markers.iter().map(|m| tex_escape(&m.label)))
        .map(|entry| format!("{{{}}}", entry))
        .join(",");
    axis.add_key(AxisKey::Custom(format!("legend entries={{{}}}", legend)));

    for (series, color) in data.series.iter().zip(SERIES_TEX_COLORS) {
        axis.plots.push(line_plot(
            series.points.iter().copied(),
            format!("draw={}, no marks, thick", color),
        ));
    }
    for marker in &data.markers {
        axis.plots.push(line_plot(
            [(marker.x, y_min), (marker.x, y_max)].into_iter(),
            format!("draw={}, no marks", marker.color.tex()),
        ));
    }

    let mut picture = Picture::new();
    picture.axes.push(axis);
    picture
}
