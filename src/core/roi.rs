use crate::domain::model::Region;
use crate::utils::error::{ReconError, Result};
use std::path::Path;

/// Substitute for a background reference of exactly zero.
pub const BACKGROUND_EPSILON: f64 = 1e-6;

/// Foreground ROIs in feature order plus the background reference.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiCatalog {
    foreground: Vec<Region>,
    background: Region,
    background_value: f64,
}

impl RoiCatalog {
    pub fn new(foreground: Vec<Region>, background: Region, background_value: f64) -> Self {
        let background_value = if background_value == 0.0 {
            tracing::warn!("Background reference is 0, substituting {}", BACKGROUND_EPSILON);
            BACKGROUND_EPSILON
        } else {
            background_value
        };
        Self {
            foreground,
            background,
            background_value,
        }
    }

    /// 從檔案載入前景與背景 ROI
    pub fn load(
        foreground_path: &Path,
        background_path: &Path,
        required_count: usize,
    ) -> Result<Self> {
        let foreground_text = read_roi_file(foreground_path, "foreground")?;
        let background_text = read_roi_file(background_path, "background")?;
        let catalog = Self::parse(&foreground_text, &background_text, required_count)?;
        tracing::debug!(
            "Loaded {} foreground ROIs from {} (background value {})",
            catalog.len(),
            foreground_path.display(),
            catalog.background_value
        );
        Ok(catalog)
    }

    pub fn parse(
        foreground_text: &str,
        background_text: &str,
        required_count: usize,
    ) -> Result<Self> {
        if required_count == 0 {
            return Err(ReconError::config("required ROI count must be at least 1"));
        }
        let (background, background_value) = parse_background(background_text)?;

        let mut foreground = Vec::with_capacity(required_count);
        for line in foreground_text.lines() {
            if let Some(region) = parse_region_line(line) {
                foreground.push(region);
                if foreground.len() >= required_count {
                    break;
                }
            }
        }
        if foreground.len() < required_count {
            return Err(ReconError::config(format!(
                "ROIs insufficient: need {}, got {}",
                required_count,
                foreground.len()
            )));
        }

        Ok(Self::new(foreground, background, background_value))
    }

    pub fn foreground(&self) -> &[Region] {
        &self.foreground
    }

    pub fn background(&self) -> Region {
        self.background
    }

    pub fn background_value(&self) -> f64 {
        self.background_value
    }

    pub fn len(&self) -> usize {
        self.foreground.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foreground.is_empty()
    }
}

fn read_roi_file(path: &Path, label: &str) -> Result<String> {
    if !path.exists() {
        return Err(ReconError::config(format!(
            "{} ROI file not found: {}",
            label,
            path.display()
        )));
    }
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Split on any mix of commas, tabs and spaces.
pub(crate) fn split_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

/// `x, y, w, h[, ...]`; anything unparseable yields `None`.
fn parse_region_line(line: &str) -> Option<Region> {
    let mut values = [0i64; 4];
    let mut tokens = split_tokens(line);
    for slot in values.iter_mut() {
        *slot = tokens.next()?.parse().ok()?;
    }
    Region::new(values[0], values[1], values[2], values[3])
}

fn parse_background(text: &str) -> Result<(Region, f64)> {
    let line = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ReconError::config("background ROI file is empty"))?;

    let tokens: Vec<&str> = split_tokens(line).collect();
    if tokens.len() < 5 {
        return Err(ReconError::config(format!(
            "background ROI line must contain at least 5 values (x,y,w,h,value), got {}",
            tokens.len()
        )));
    }

    let region = parse_region_line(line).ok_or_else(|| {
        ReconError::config(format!("invalid background rectangle: '{}'", line.trim()))
    })?;
    let value: f64 = tokens[4].parse().map_err(|e| {
        ReconError::config(format!("invalid background value '{}': {}", tokens[4], e))
    })?;

    Ok((region, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    const BACKGROUND: &str = "0,0,10,10,50\n";

    #[test]
    fn test_mixed_separators_and_extra_tokens() {
        let foreground = "1,2,3,4\n5\t6 7,8\n  9 , 10,\t11 12 99 extra\n";
        let catalog = RoiCatalog::parse(foreground, BACKGROUND, 3).unwrap();
        assert_eq!(
            catalog.foreground(),
            &[
                Region::new(1, 2, 3, 4).unwrap(),
                Region::new(5, 6, 7, 8).unwrap(),
                Region::new(9, 10, 11, 12).unwrap(),
            ]
        );
        assert_eq!(catalog.background_value(), 50.0);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let foreground = "# header\n1,2,3\n\n1.5,2,3,4\n0,0,0,4\na,b,c,d\n1,1,2,2\n";
        let catalog = RoiCatalog::parse(foreground, BACKGROUND, 1).unwrap();
        assert_eq!(catalog.foreground(), &[Region::new(1, 1, 2, 2).unwrap()]);
    }

    #[test]
    fn test_stops_at_required_count() {
        let foreground = "0,0,1,1\n1,1,1,1\n2,2,1,1\nnot,a,region\n";
        let catalog = RoiCatalog::parse(foreground, BACKGROUND, 2).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_insufficient_regions() {
        let err = RoiCatalog::parse("0,0,1,1\n", BACKGROUND, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("need 2, got 1"));
    }

    #[test]
    fn test_background_needs_five_tokens() {
        let err = RoiCatalog::parse("0,0,1,1\n", "0,0,10,10\n", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_background_uses_first_non_empty_line() {
        let catalog =
            RoiCatalog::parse("0,0,1,1\n", "\n  \n4 4 2 2 12.5\n0,0,1,1,99\n", 1).unwrap();
        assert_eq!(catalog.background(), Region::new(4, 4, 2, 2).unwrap());
        assert_eq!(catalog.background_value(), 12.5);
    }

    #[test]
    fn test_zero_background_value_uses_epsilon() {
        let catalog = RoiCatalog::parse("0,0,1,1\n", "0,0,1,1,0\n", 1).unwrap();
        assert_eq!(catalog.background_value(), BACKGROUND_EPSILON);
    }

    #[test]
    fn test_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let fg = dir.path().join("rois.txt");
        let bg = dir.path().join("bgrois.txt");

        let err = RoiCatalog::load(&fg, &bg, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        std::fs::write(&fg, "0,0,1,1\n").unwrap();
        let err = RoiCatalog::load(&fg, &bg, 1).unwrap_err();
        assert!(err.to_string().contains("background"));

        std::fs::write(&bg, "0,0,1,1,7\n").unwrap();
        assert!(RoiCatalog::load(&fg, &bg, 1).is_ok());
    }
}
