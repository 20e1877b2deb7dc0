use image::{GrayImage, Luma};
use spectra_recon::core::features;
use spectra_recon::core::roi::{RoiCatalog, BACKGROUND_EPSILON};
use spectra_recon::ErrorKind;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn foreground_lines(count: usize) -> String {
    (0..count)
        .map(|i| format!("{}, {}\t4 4\n", (i % 8) * 4, (i / 8) * 4))
        .collect()
}

fn write_catalog(dir: &TempDir, foreground: &str, background: &str) -> (PathBuf, PathBuf) {
    let fg = dir.path().join("rois.txt");
    let bg = dir.path().join("bgrois.txt");
    fs::write(&fg, foreground).unwrap();
    fs::write(&bg, background).unwrap();
    (fg, bg)
}

#[test]
fn test_exactly_required_regions_load() {
    let dir = TempDir::new().unwrap();
    let (fg, bg) = write_catalog(&dir, &foreground_lines(32), "0,0,32,16,80\n");

    let catalog = RoiCatalog::load(&fg, &bg, 32).unwrap();
    assert_eq!(catalog.len(), 32);
    assert_eq!(catalog.background_value(), 80.0);
}

#[test]
fn test_one_region_short_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let (fg, bg) = write_catalog(&dir, &foreground_lines(31), "0,0,32,16,80\n");

    let err = RoiCatalog::load(&fg, &bg, 32).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("need 32, got 31"));
}

#[test]
fn test_invalid_lines_do_not_count() {
    let dir = TempDir::new().unwrap();
    let mut foreground = foreground_lines(31);
    foreground.push_str("\n# comment\n1,2,x,4\n5,5,0,3\n");
    let (fg, bg) = write_catalog(&dir, &foreground, "0 0 32 16 80");

    let err = RoiCatalog::load(&fg, &bg, 32).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_zero_background_uses_epsilon() {
    let dir = TempDir::new().unwrap();
    let (fg, bg) = write_catalog(&dir, "0,0,2,2\n", "0,0,2,2,0\n");

    let catalog = RoiCatalog::load(&fg, &bg, 1).unwrap();
    assert_eq!(catalog.background_value(), BACKGROUND_EPSILON);

    let image = GrayImage::from_pixel(2, 2, Luma([1u8]));
    let features = features::extract(&image, &catalog).unwrap();
    assert!(features.as_slice()[0].is_finite());
    assert!(features.as_slice()[0] > 0.0);
}
