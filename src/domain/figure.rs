//! Declarative description of a rendered figure.
//!
//! Renderers build a [`Figure`] value; a [`FigureBackend`](super::ports::FigureBackend)
//! turns it into image bytes. Keeping the two apart lets the layout and panel
//! contents be checked without touching a drawing surface.

use serde::{Deserialize, Serialize};

/// Number of columns in every grid overview.
pub const GRID_COLUMNS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const BLACK: Color = Color(0, 0, 0);
    pub const GRAY: Color = Color(128, 128, 128);
    /// Muted dark gray used for overview cells and the period title.
    pub const MUTED: Color = Color(0x36, 0x36, 0x36);
}

/// Rows x columns arrangement sized to a dataset count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    occupied: usize,
}

impl GridLayout {
    pub fn for_datasets(count: usize) -> Self {
        Self {
            rows: count.div_ceil(GRID_COLUMNS),
            cols: GRID_COLUMNS,
            occupied: count,
        }
    }

    /// Single-cell layout used by detail figures.
    pub fn single() -> Self {
        Self {
            rows: 1,
            cols: 1,
            occupied: 1,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn visible_cells(&self) -> usize {
        self.occupied
    }

    pub fn hidden_cells(&self) -> usize {
        self.cell_count() - self.occupied
    }

    pub fn is_hidden(&self, index: usize) -> bool {
        index >= self.occupied
    }

    /// Row-major (row, col) of a zero-based cell index.
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }
}

/// How overview cells are titled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum TitleStyle {
    /// `Set # 3`
    #[default]
    Set,
    /// `3`
    Ordinal,
}

impl TitleStyle {
    pub fn format(&self, ordinal: usize) -> String {
        match self {
            TitleStyle::Set => format!("Set # {}", ordinal),
            TitleStyle::Ordinal => ordinal.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelTitle {
    pub text: String,
    pub color: Color,
    pub font_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    Scatter {
        x: Vec<f64>,
        y: Vec<f64>,
        color: Color,
        marker_size: u32,
    },
    ErrorBars {
        x: Vec<f64>,
        y: Vec<f64>,
        err: Vec<f64>,
        marker_color: Color,
        bar_color: Color,
    },
    Line {
        x: Vec<f64>,
        y: Vec<f64>,
        color: Color,
    },
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Scatter { x, .. } | Series::ErrorBars { x, .. } | Series::Line { x, .. } => {
                x.len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finite data extent as ((x_min, x_max), (y_min, y_max)), error bars included.
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let (x, y_lo, y_hi): (&[f64], Vec<f64>, Vec<f64>) = match self {
            Series::Scatter { x, y, .. } | Series::Line { x, y, .. } => (x, y.clone(), y.clone()),
            Series::ErrorBars { x, y, err, .. } => {
                let spread = |sign: f64| {
                    y.iter()
                        .zip(err)
                        .map(|(v, e)| if e.is_finite() { v + sign * e } else { *v })
                        .collect::<Vec<_>>()
                };
                (x, spread(-1.0), spread(1.0))
            }
        };
        let x_range = finite_extent(x.iter().copied())?;
        let y_min = finite_extent(y_lo.into_iter())?.0;
        let y_max = finite_extent(y_hi.into_iter())?.1;
        Some((x_range, (y_min, y_max)))
    }
}

fn finite_extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotPanel {
    pub title: Option<PanelTitle>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub show_ticks: bool,
    pub series: Series,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Plot(PlotPanel),
    /// Cell belongs to a dataset that was skipped; the frame stays, nothing is drawn in it.
    Empty,
    /// Cell beyond the dataset count; not drawn at all.
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub width: u32,
    pub height: u32,
    pub layout: GridLayout,
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn plotted_panels(&self) -> impl Iterator<Item = &PlotPanel> {
        self.panels.iter().filter_map(|p| match p {
            Panel::Plot(plot) => Some(plot),
            _ => None,
        })
    }

    pub fn hidden_panels(&self) -> usize {
        self.panels
            .iter()
            .filter(|p| matches!(p, Panel::Hidden))
            .count()
    }
}
