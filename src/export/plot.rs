use super::{Error, Exporter};
use std::path::{Path, PathBuf};

pub const SIZE: (u32, u32) = (1000, 700);

#[derive(Debug, Default, Clone, PartialEq)]
struct Chart {
    title: String,
    x_label: String,
    y_label: String,
    labels: Vec<String>,
    titles: Vec<String>,
    series: Vec<Vec<f64>>,
}

/// Draws all series as lines over the size labels into an SVG file.
///
/// Nothing is written before [`Exporter::finalize`].
#[derive(Debug)]
pub struct SvgPlot {
    path: PathBuf,
    chart: Option<Chart>,
}

impl SvgPlot {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chart: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn chart(&mut self) -> Result<&mut Chart, Error> {
        self.chart.as_mut().ok_or(Error::NotCreated)
    }
}

fn plot_error(err: impl std::fmt::Display) -> Error {
    Error::Plot(err.to_string())
}

impl Chart {
    fn draw(&self, path: &Path) -> Result<(), Error> {
        use plotters::prelude::*;

        let backend = SVGBackend::new(path, SIZE);
        let root_area = backend.into_drawing_area();
        root_area.fill(&WHITE).map_err(plot_error)?;

        let num_labels = self.labels.len().max(1);
        let y_max = self
            .series
            .iter()
            .flatten()
            .copied()
            .filter(|value| value.is_finite())
            .fold(0.0f64, f64::max);
        let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

        let font_size = 20;
        let mut chart_ctx = ChartBuilder::on(&root_area)
            .caption(&self.title, ("sans-serif", font_size))
            .margin(20)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 60)
            .build_cartesian_2d(0..num_labels, 0.0..y_max)
            .map_err(plot_error)?;

        let labels = &self.labels;
        chart_ctx
            .configure_mesh()
            .x_desc(&self.x_label)
            .y_desc(&self.y_label)
            .x_labels(num_labels)
            .x_label_formatter(&|idx| labels.get(*idx).cloned().unwrap_or_default())
            .draw()
            .map_err(plot_error)?;

        for (idx, (title, values)) in self.titles.iter().zip(&self.series).enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            let points: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
            chart_ctx
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
                .map_err(plot_error)?
                .label(title)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            chart_ctx
                .draw_series(
                    points
                        .iter()
                        .map(|point| Circle::new(*point, 3, color.filled())),
                )
                .map_err(plot_error)?;
        }

        chart_ctx
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()
            .map_err(plot_error)?;
        root_area.present().map_err(plot_error)?;
        Ok(())
    }
}

impl Exporter for SvgPlot {
    fn create(&mut self, title: &str, x_label: &str, y_label: &str) -> Result<(), Error> {
        self.chart = Some(Chart {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            ..Chart::default()
        });
        Ok(())
    }

    fn set_labels(&mut self, labels: &[String], series_titles: &[String]) -> Result<(), Error> {
        let chart = self.chart()?;
        chart.labels = labels.to_vec();
        chart.titles = series_titles.to_vec();
        Ok(())
    }

    fn write_series(&mut self, values: &[f64]) -> Result<(), Error> {
        self.chart()?.series.push(values.to_vec());
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), Error> {
        let chart = self.chart.take().ok_or(Error::NotCreated)?;
        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            utils::fs::create_dirs(parent)?;
        }
        chart.draw(&self.path)?;
        log::info!("wrote {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SvgPlot;
    use crate::export::{Axes, Error, Exporter};
    use crate::record::ResultMatrix;
    use color_eyre::eyre;

    #[test]
    fn test_draw_svg() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bandwidth.svg");

        let mut results = ResultMatrix::new(["Write", "Read"]);
        for (index, label) in ["256B", "512B", "768B"].into_iter().enumerate() {
            results.set("Write", index, 100.0 * (index + 1) as f64, label.to_string());
            results.set("Read", index, 50.0 * (index + 1) as f64, label.to_string());
        }

        let mut plot = SvgPlot::new(&path);
        crate::export::export(&results, &mut plot, "host 4Thread Bandwidth", Axes::BANDWIDTH)?;

        let svg = std::fs::read_to_string(&path)?;
        assert!(svg.contains("<svg"));
        assert!(svg.contains("host 4Thread Bandwidth"));
        assert!(svg.contains("Rate (MB/s)"));
        assert!(svg.contains("512B"));
        Ok(())
    }

    #[test]
    fn test_nothing_written_before_finalize() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("matrix.svg");
        let mut plot = SvgPlot::new(&path);
        assert!(matches!(plot.write_series(&[1.0]), Err(Error::NotCreated)));

        plot.create("title", "Matrix Size", "Time (s)")?;
        plot.write_series(&[1.0])?;
        assert!(!plot.path().exists());
        Ok(())
    }
}
