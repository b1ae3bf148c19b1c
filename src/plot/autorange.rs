use std::ops::Range;

// grows an x/y bounding box to fit every point it sees, starting from the
// origin so magnitude plots keep their zero line
#[derive(Debug, Clone, PartialEq)]
pub struct AutoRange {
    xrange: Range<f64>,
    yrange: Range<f64>,
}

impl Default for AutoRange {
    fn default() -> Self {
        AutoRange {
            xrange: 0.0..0.0,
            yrange: 0.0..0.0,
        }
    }
}

impl AutoRange {
    pub fn new() -> Self {
        Self::default()
    }

    fn extend(range: &mut Range<f64>, value: f64) {
        if !value.is_finite() {
            return;
        }
        if value < range.start {
            range.start = value;
        }
        if value > range.end {
            range.end = value;
        }
    }

    pub fn add(&mut self, point: (f64, f64)) {
        Self::extend(&mut self.xrange, point.0);
        Self::extend(&mut self.yrange, point.1);
    }

    fn widen(range: &Range<f64>) -> Range<f64> {
        if range.end > range.start {
            range.clone()
        } else {
            range.start - 1.0..range.end + 1.0
        }
    }

    // degenerate ranges are widened so the chart still has an axis
    pub fn ranges(&self) -> (Range<f64>, Range<f64>) {
        (Self::widen(&self.xrange), Self::widen(&self.yrange))
    }
}
