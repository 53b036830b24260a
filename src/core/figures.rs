use crate::core::periodogram::Periodogram;
use crate::domain::figure::{
    Color, Figure, GridLayout, Panel, PanelTitle, PlotPanel, Series, TitleStyle,
};
use crate::domain::model::TimeSeries;
use crate::utils::error::{Result, VizError};

const GRID_WIDTH: u32 = 2000;
const GRID_ROW_HEIGHT: u32 = 200;
const DETAIL_SIZE: (u32, u32) = (1000, 600);
const CELL_TITLE_SIZE: u32 = 16;
const PERIOD_TITLE_SIZE: u32 = 12;

pub const TIME_LABEL: &str = "Time (in days)";
pub const FLUX_LABEL: &str = "Normalized Flux";
pub const FREQUENCY_LABEL: &str = "Frequency [1/d]";
pub const AMPLITUDE_LABEL: &str = "Amplitude";

fn cell_title(text: String) -> Option<PanelTitle> {
    Some(PanelTitle {
        text,
        color: Color::BLACK,
        font_size: CELL_TITLE_SIZE,
    })
}

/// Flux-vs-time scatter for one overview cell, ticks suppressed.
pub fn flux_cell(ordinal: usize, series: &TimeSeries, style: TitleStyle) -> PlotPanel {
    PlotPanel {
        title: cell_title(style.format(ordinal)),
        x_label: None,
        y_label: None,
        show_ticks: false,
        series: Series::Scatter {
            x: series.time().to_vec(),
            y: series.flux().to_vec(),
            color: Color::MUTED,
            marker_size: 1,
        },
    }
}

pub fn periodogram_cell(ordinal: usize, periodogram: &Periodogram) -> PlotPanel {
    PlotPanel {
        title: cell_title(TitleStyle::Set.format(ordinal)),
        x_label: Some(FREQUENCY_LABEL.to_string()),
        y_label: Some(AMPLITUDE_LABEL.to_string()),
        show_ticks: true,
        series: Series::Line {
            x: periodogram.frequency().to_vec(),
            y: periodogram.power().to_vec(),
            color: Color::MUTED,
        },
    }
}

/// Grid figure with one cell per dataset. `None` marks a skipped dataset.
pub fn grid(cells: Vec<Option<PlotPanel>>) -> Figure {
    let layout = GridLayout::for_datasets(cells.len());
    let mut panels: Vec<Panel> = cells
        .into_iter()
        .map(|cell| cell.map_or(Panel::Empty, Panel::Plot))
        .collect();
    panels.resize(layout.cell_count(), Panel::Hidden);

    Figure {
        width: GRID_WIDTH,
        height: GRID_ROW_HEIGHT * layout.rows as u32,
        layout,
        panels,
    }
}

fn detail(panel: PlotPanel) -> Figure {
    Figure {
        width: DETAIL_SIZE.0,
        height: DETAIL_SIZE.1,
        layout: GridLayout::single(),
        panels: vec![Panel::Plot(panel)],
    }
}

/// Error-bar plot of a whole light curve.
pub fn flux_detail(series: &TimeSeries) -> Figure {
    detail(PlotPanel {
        title: None,
        x_label: Some(TIME_LABEL.to_string()),
        y_label: Some(FLUX_LABEL.to_string()),
        show_ticks: true,
        series: Series::ErrorBars {
            x: series.time().to_vec(),
            y: series.flux().to_vec(),
            err: series.flux_err().to_vec(),
            marker_color: Color::BLACK,
            bar_color: Color::GRAY,
        },
    })
}

pub fn period_title(period: f64) -> String {
    format!("Period: {:.4} days", period)
}

/// Periodogram titled with its dominant period.
pub fn periodogram_detail(periodogram: &Periodogram) -> Result<Figure> {
    let period = periodogram
        .period_at_max_power()
        .ok_or_else(|| VizError::ProcessingError {
            message: "Periodogram has no finite power values".to_string(),
        })?;

    Ok(detail(PlotPanel {
        title: Some(PanelTitle {
            text: period_title(period),
            color: Color::MUTED,
            font_size: PERIOD_TITLE_SIZE,
        }),
        x_label: Some(FREQUENCY_LABEL.to_string()),
        y_label: Some(AMPLITUDE_LABEL.to_string()),
        show_ticks: true,
        series: Series::Line {
            x: periodogram.frequency().to_vec(),
            y: periodogram.power().to_vec(),
            color: Color::BLACK,
        },
    }))
}
