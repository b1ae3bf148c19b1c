use super::autorange::AutoRange;

use plotters::coord::Shift;
use plotters::prelude::*;

pub struct Simple<'a, DB: DrawingBackend> {
    root: &'a DrawingArea<DB, Shift>,
    auto: AutoRange,
    series: Vec<(Vec<(f64, f64)>, ShapeStyle, Option<String>)>,
    color_idx: usize,
    stroke_width: u32,
    title: Option<String>,
    xlabel: Option<String>,
    ylabel: Option<String>,
}

impl<'a, DB> Simple<'a, DB>
where
    DB: DrawingBackend,
{
    pub fn on(root: &'a DrawingArea<DB, Shift>) -> Self {
        Simple {
            root,
            auto: AutoRange::new(),
            series: vec![],
            color_idx: 0,
            stroke_width: 2,
            title: None,
            xlabel: None,
            ylabel: None,
        }
    }

    pub fn title(&mut self, title: &str) -> &mut Self {
        self.title = Some(title.to_owned());
        self
    }

    pub fn xlabel(&mut self, xlabel: &str) -> &mut Self {
        self.xlabel = Some(xlabel.to_owned());
        self
    }

    pub fn ylabel(&mut self, ylabel: &str) -> &mut Self {
        self.ylabel = Some(ylabel.to_owned());
        self
    }

    pub fn generate_style(&mut self) -> ShapeStyle {
        let style = Palette99::pick(self.color_idx)
            .stroke_width(self.stroke_width);
        self.color_idx += 1;
        style
    }

    pub fn add_line<I>(&mut self, data: I, label: Option<&str>) -> &mut Self
    where
        I: IntoIterator<Item=(f64, f64)>,
    {
        let style = self.generate_style();
        let data: Vec<_> = data.into_iter().collect();
        for p in data.iter() {
            self.auto.add(*p);
        }
        self.series.push((data, style, label.map(|l| l.to_owned())));
        self
    }

    pub fn draw(&mut self)
                -> Result<&mut Self, DrawingAreaErrorKind<DB::ErrorType>>
    {
        let (xrange, yrange) = self.auto.ranges();
        let mut builder = ChartBuilder::on(self.root);
        builder.margin(5)
            .x_label_area_size(30)
            .y_label_area_size(60);
        if let Some(title) = &self.title {
            builder.caption(title, ("sans-serif", 30).into_font());
        }
        let mut chart = builder.build_cartesian_2d(xrange, yrange)?;
        chart.configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_desc(self.xlabel.clone().unwrap_or_default())
            .y_desc(self.ylabel.clone().unwrap_or_default())
            .draw()?;

        let mut draw_legend = false;
        for (data, style, label) in self.series.drain(..) {
            let anno = chart.draw_series(LineSeries::new(data, style.clone()))?;
            if let Some(name) = label {
                anno.label(name).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], style.clone())
                });
                draw_legend = true;
            }
        }

        if draw_legend {
            chart.configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .draw()?;
        }

        Ok(self)
    }
}
