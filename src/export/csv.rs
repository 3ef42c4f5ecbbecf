use super::{Error, Exporter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Writes results as plain comma separated lines.
///
/// ```text
/// title,x label,y label
/// series titles...
/// size labels...
/// values of the first series...
/// ```
#[derive(Debug)]
pub struct Csv {
    path: PathBuf,
    writer: Option<::csv::Writer<BufWriter<File>>>,
}

impl Csv {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut ::csv::Writer<BufWriter<File>>, Error> {
        self.writer.as_mut().ok_or(Error::NotCreated)
    }
}

impl Exporter for Csv {
    fn create(&mut self, title: &str, x_label: &str, y_label: &str) -> Result<(), Error> {
        let file = utils::fs::open_writable(&self.path)?;
        let mut writer = ::csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);
        writer.write_record([title, x_label, y_label])?;
        self.writer = Some(writer);
        Ok(())
    }

    fn set_labels(&mut self, labels: &[String], series_titles: &[String]) -> Result<(), Error> {
        let writer = self.writer()?;
        writer.write_record(series_titles)?;
        writer.write_record(labels)?;
        Ok(())
    }

    fn write_series(&mut self, values: &[f64]) -> Result<(), Error> {
        self.writer()?
            .write_record(values.iter().map(|value| format!("{value:.6}")))?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), Error> {
        let mut writer = self.writer.take().ok_or(Error::NotCreated)?;
        writer.flush()?;
        log::info!("wrote {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Csv;
    use crate::export::{Axes, Error, Exporter};
    use crate::record::ResultMatrix;
    use color_eyre::eyre;

    #[test]
    fn test_write_csv() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("results/memcpy.csv");

        let mut results = ResultMatrix::new(["memcpy"]);
        results.set("memcpy", 0, 1234.5, "256B".to_string());
        results.set("memcpy", 1, 0.25, "1.50MB".to_string());

        let mut csv = Csv::new(&path);
        crate::export::export(&results, &mut csv, "host 1Thread Memcpy", Axes::BANDWIDTH)?;

        let have = std::fs::read_to_string(&path)?;
        similar_asserts::assert_eq!(
            have: have,
            want: "host 1Thread Memcpy,Block Size,Rate (MB/s)\n\
                   memcpy\n\
                   256B,1.50MB\n\
                   1234.500000,0.250000\n",
        );
        Ok(())
    }

    #[test]
    fn test_empty_sweep_writes_no_file() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("memcpy.csv");

        // no block size fits when max_size < 256 * threads
        let results = ResultMatrix::new(["memcpy"]);
        let mut csv = Csv::new(&path);
        crate::export::export(&results, &mut csv, "t", Axes::BANDWIDTH)?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_write_before_create() {
        let mut csv = Csv::new("unused.csv");
        assert!(matches!(
            csv.write_series(&[1.0]),
            Err(Error::NotCreated)
        ));
        assert!(matches!(csv.finalize(), Err(Error::NotCreated)));
        assert!(!csv.path().exists());
    }
}
