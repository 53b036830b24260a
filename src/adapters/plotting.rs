//! plotters-backed drawing surface for [`Figure`] values.

use crate::core::{FigureBackend, ImageFormat};
use crate::domain::figure::{Color as FigureColor, Figure, Panel, PlotPanel, Series};
use crate::utils::error::{Result, VizError};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::io::Cursor;

const PADDING: f64 = 0.03;

fn plot_err<E: std::fmt::Display>(e: E) -> VizError {
    VizError::PlotError {
        message: e.to_string(),
    }
}

fn rgb(color: FigureColor) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

fn padded(range: (f64, f64)) -> std::ops::Range<f64> {
    let (lo, hi) = range;
    if hi > lo {
        let pad = (hi - lo) * PADDING;
        (lo - pad)..(hi + pad)
    } else {
        (lo - 0.5)..(hi + 0.5)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlottersBackend;

impl PlottersBackend {
    pub fn new() -> Self {
        Self
    }

    fn encode_svg(&self, figure: &Figure) -> Result<Vec<u8>> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (figure.width, figure.height))
                .into_drawing_area();
            draw_figure(&root, figure)?;
            root.present().map_err(plot_err)?;
        }
        Ok(svg.into_bytes())
    }

    fn encode_png(&self, figure: &Figure) -> Result<Vec<u8>> {
        let (width, height) = (figure.width, figure.height);
        let mut pixels = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
            draw_figure(&root, figure)?;
            root.present().map_err(plot_err)?;
        }

        let image = image::RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            VizError::PlotError {
                message: "Pixel buffer does not match figure size".to_string(),
            }
        })?;
        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(plot_err)?;
        Ok(png.into_inner())
    }
}

impl FigureBackend for PlottersBackend {
    fn encode(&self, figure: &Figure, format: ImageFormat) -> Result<Vec<u8>> {
        match format {
            ImageFormat::Svg => self.encode_svg(figure),
            ImageFormat::Png => self.encode_png(figure),
        }
    }
}

fn draw_figure<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, figure: &Figure) -> Result<()> {
    root.fill(&WHITE).map_err(plot_err)?;

    let cells = root.split_evenly((figure.layout.rows, figure.layout.cols));
    for (cell, panel) in cells.iter().zip(&figure.panels) {
        match panel {
            Panel::Plot(plot) => draw_panel(cell, plot)?,
            Panel::Empty => draw_empty(cell)?,
            Panel::Hidden => {}
        }
    }
    Ok(())
}

fn draw_empty<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .margin(8)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)
        .map_err(plot_err)?;
    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(0.0, 0.0), (1.0, 1.0)],
            BLACK.stroke_width(1),
        )))
        .map_err(plot_err)?;
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, panel: &PlotPanel) -> Result<()> {
    let Some((x_range, y_range)) = panel.series.bounds() else {
        tracing::warn!("Nothing to plot in panel {:?}", panel.title.as_ref().map(|t| &t.text));
        return draw_empty(area);
    };
    let (x_range, y_range) = (padded(x_range), padded(y_range));

    let mut builder = ChartBuilder::on(area);
    builder.margin(8);
    if let Some(title) = &panel.title {
        builder.caption(
            &title.text,
            FontDesc::new(
                FontFamily::SansSerif,
                f64::from(title.font_size),
                FontStyle::Normal,
            )
            .color(&rgb(title.color)),
        );
    }
    if panel.show_ticks {
        builder.x_label_area_size(40).y_label_area_size(60);
    }
    let mut chart = builder
        .build_cartesian_2d(x_range.clone(), y_range.clone())
        .map_err(plot_err)?;

    if panel.show_ticks {
        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh();
        if let Some(label) = &panel.x_label {
            mesh.x_desc(label.as_str());
        }
        if let Some(label) = &panel.y_label {
            mesh.y_desc(label.as_str());
        }
        mesh.draw().map_err(plot_err)?;
    } else {
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(x_range.start, y_range.start), (x_range.end, y_range.end)],
                BLACK.stroke_width(1),
            )))
            .map_err(plot_err)?;
    }

    match &panel.series {
        Series::Scatter {
            x,
            y,
            color,
            marker_size,
        } => {
            let style = rgb(*color).filled();
            chart
                .draw_series(
                    finite_points(x, y).map(|p| Circle::new(p, *marker_size, style)),
                )
                .map_err(plot_err)?;
        }
        Series::ErrorBars {
            x,
            y,
            err,
            marker_color,
            bar_color,
        } => {
            let bar_style = rgb(*bar_color).stroke_width(1);
            chart
                .draw_series(
                    x.iter()
                        .zip(y)
                        .zip(err)
                        .filter(|((t, f), e)| t.is_finite() && f.is_finite() && e.is_finite())
                        .map(|((t, f), e)| {
                            ErrorBar::new_vertical(*t, f - e, *f, f + e, bar_style, 3)
                        }),
                )
                .map_err(plot_err)?;
            let marker = rgb(*marker_color).filled();
            chart
                .draw_series(finite_points(x, y).map(|p| Circle::new(p, 2, marker)))
                .map_err(plot_err)?;
        }
        Series::Line { x, y, color } => {
            chart
                .draw_series(LineSeries::new(finite_points(x, y), &rgb(*color)))
                .map_err(plot_err)?;
        }
    }

    Ok(())
}

fn finite_points<'a>(x: &'a [f64], y: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    x.iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
}
