use std::path::PathBuf;

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

mod autorange;
pub use autorange::AutoRange;

mod simple;
pub use simple::Simple;

#[cfg(feature = "window")]
mod window;
#[cfg(feature = "window")]
pub use window::Window;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("drawing failed: {0}")]
    Draw(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A single x/y line with its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub points: Vec<(f64, f64)>,
}

/// Somewhere to put a chart.
///
/// Interactive implementations may block until the chart is dismissed;
/// [`NoPlot`] is for headless runs.
pub trait Plotter {
    fn plot(&mut self, chart: &Chart) -> Result<(), PlotError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlot;

impl Plotter for NoPlot {
    fn plot(&mut self, chart: &Chart) -> Result<(), PlotError> {
        tracing::debug!(title = %chart.title, "plotting disabled");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SvgFile {
    path: PathBuf,
    size: (u32, u32),
}

impl SvgFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        SvgFile {
            path: path.into(),
            size: (640, 480),
        }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }
}

impl Plotter for SvgFile {
    fn plot(&mut self, chart: &Chart) -> Result<(), PlotError> {
        let root = SVGBackend::new(&self.path, self.size).into_drawing_area();
        draw_chart(&root, chart)?;
        tracing::info!(path = %self.path.display(), "wrote plot");
        Ok(())
    }
}

// renders into memory, the last chart wins
#[derive(Debug, Clone, Default)]
pub struct SvgString {
    pub svg: String,
}

impl Plotter for SvgString {
    fn plot(&mut self, chart: &Chart) -> Result<(), PlotError> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (640, 480))
                .into_drawing_area();
            draw_chart(&root, chart)?;
        }
        self.svg = svg;
        Ok(())
    }
}

pub(crate) fn draw_err<E: std::fmt::Display>(err: E) -> PlotError {
    PlotError::Draw(err.to_string())
}

pub fn draw_chart<DB>(root: &DrawingArea<DB, Shift>, chart: &Chart)
                      -> Result<(), PlotError>
where
    DB: DrawingBackend,
{
    root.fill(&WHITE).map_err(draw_err)?;
    Simple::on(root)
        .title(&chart.title)
        .xlabel(&chart.xlabel)
        .ylabel(&chart.ylabel)
        .add_line(chart.points.iter().cloned(), None)
        .draw()
        .map_err(draw_err)?;
    root.present().map_err(draw_err)?;
    Ok(())
}
