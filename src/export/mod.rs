//! Export of sweep results to files.
//!
//! An [`Exporter`] receives the results of one suite positionally: first the
//! output title and axis labels, then the size labels together with the
//! series titles, then one call per series with its values in label order.

pub mod csv;
pub mod plot;

pub use self::csv::Csv;
pub use plot::SvgPlot;

use crate::record::ResultMatrix;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fs(#[from] utils::fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] ::csv::Error),

    #[error("failed to draw plot: {0}")]
    Plot(String),

    #[error("exporter was not created")]
    NotCreated,

    #[error("series {series:?} has {values} values for {labels} labels")]
    Misaligned {
        series: String,
        values: usize,
        labels: usize,
    },
}

pub trait Exporter {
    fn create(&mut self, title: &str, x_label: &str, y_label: &str) -> Result<(), Error>;

    fn set_labels(&mut self, labels: &[String], series_titles: &[String]) -> Result<(), Error>;

    /// Values of the next series, in the order of the series titles.
    fn write_series(&mut self, values: &[f64]) -> Result<(), Error>;

    fn finalize(&mut self) -> Result<(), Error>;
}

impl<E> Exporter for &mut E
where
    E: Exporter + ?Sized,
{
    fn create(&mut self, title: &str, x_label: &str, y_label: &str) -> Result<(), Error> {
        (**self).create(title, x_label, y_label)
    }

    fn set_labels(&mut self, labels: &[String], series_titles: &[String]) -> Result<(), Error> {
        (**self).set_labels(labels, series_titles)
    }

    fn write_series(&mut self, values: &[f64]) -> Result<(), Error> {
        (**self).write_series(values)
    }

    fn finalize(&mut self) -> Result<(), Error> {
        (**self).finalize()
    }
}

/// Axis labels of an exported chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axes<'a> {
    pub x_label: &'a str,
    pub y_label: &'a str,
}

impl Axes<'static> {
    pub const BANDWIDTH: Self = Self {
        x_label: "Block Size",
        y_label: "Rate (MB/s)",
    };
    pub const MATRIX: Self = Self {
        x_label: "Matrix Size",
        y_label: "Time (s)",
    };
}

/// Hand all series of `results` to `exporter`.
///
/// # Errors
/// If a series does not have exactly one value per label, or the exporter
/// fails.
pub fn export<K, E>(
    results: &ResultMatrix<K>,
    mut exporter: E,
    title: &str,
    axes: Axes<'_>,
) -> Result<(), Error>
where
    K: std::fmt::Display,
    E: Exporter,
{
    if results.is_empty() {
        log::warn!("{title}: sweep has no data points, nothing to export");
        return Ok(());
    }
    let labels = results.labels();
    for (key, values) in results.iter() {
        if values.len() != labels.len() {
            return Err(Error::Misaligned {
                series: key.to_string(),
                values: values.len(),
                labels: labels.len(),
            });
        }
    }
    let titles: Vec<String> = results.keys().map(ToString::to_string).collect();

    exporter.create(title, axes.x_label, axes.y_label)?;
    exporter.set_labels(labels, &titles)?;
    for (_, values) in results.iter() {
        exporter.write_series(values)?;
    }
    exporter.finalize()?;
    Ok(())
}
