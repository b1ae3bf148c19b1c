use super::{draw_chart, draw_err, Chart, PlotError, Plotter};

use piston_window::{EventLoop, PistonWindow, WindowSettings};
use plotters::prelude::*;
use plotters_piston::draw_piston_window;

// an on-screen window; plot() returns once the window is closed
#[derive(Debug, Clone)]
pub struct Window {
    size: (u32, u32),
}

impl Default for Window {
    fn default() -> Self {
        Window { size: (640, 480) }
    }
}

impl Window {
    pub fn new(width: u32, height: u32) -> Self {
        Window { size: (width, height) }
    }
}

impl Plotter for Window {
    fn plot(&mut self, chart: &Chart) -> Result<(), PlotError> {
        let mut window: PistonWindow = WindowSettings::new(
            chart.title.as_str(), [self.size.0, self.size.1]
        ).samples(4).build().map_err(draw_err)?;
        window.set_max_fps(1);
        while draw_piston_window(&mut window, |b| {
            let root = b.into_drawing_area();
            draw_chart(&root, chart)?;
            Ok(())
        }).is_some() {}
        Ok(())
    }
}
