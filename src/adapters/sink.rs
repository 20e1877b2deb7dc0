use crate::domain::model::SpectrumResult;
use crate::domain::ports::ResultSink;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes `<capture-stem>_spectrum.csv` under `dir`.
pub struct CsvResultSink {
    dir: PathBuf,
}

impl CsvResultSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn output_path(&self, origin: &Path) -> PathBuf {
        let stem = origin
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("capture");
        self.dir.join(format!("{}_spectrum.csv", stem))
    }
}

impl ResultSink for CsvResultSink {
    fn write(&self, origin: &Path, spectrum: &SpectrumResult) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.output_path(origin);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["wavelength_nm", "intensity"])?;
        for (wavelength, intensity) in spectrum.wavelengths.iter().zip(&spectrum.intensities) {
            writer.serialize((wavelength, intensity))?;
        }
        writer.flush()?;

        tracing::debug!("Wrote {} rows to {}", spectrum.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_named_csv() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvResultSink::new(dir.path().join("result"));
        let spectrum = SpectrumResult {
            wavelengths: vec![400.0, 700.0, 1000.0],
            intensities: vec![0.5, 1.25, -0.0625],
        };

        let path = sink
            .write(Path::new("capture/20250101_120000.png"), &spectrum)
            .unwrap();
        assert_eq!(
            path,
            dir.path().join("result").join("20250101_120000_spectrum.csv")
        );

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["wavelength_nm", "intensity"]
        );
        let rows: Vec<(f64, f64)> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![(400.0, 0.5), (700.0, 1.25), (1000.0, -0.0625)]);
    }
}
