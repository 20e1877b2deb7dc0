use crate::core::roi::RoiCatalog;
use crate::domain::model::{FeatureVector, Region};
use crate::utils::error::{ReconError, Result};
use image::GrayImage;

/// Mean gray level of each foreground ROI divided by the background reference,
/// in catalog order.
pub fn extract(image: &GrayImage, catalog: &RoiCatalog) -> Result<FeatureVector> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ReconError::input(format!(
            "image is empty ({}x{})",
            width, height
        )));
    }

    let background = catalog.background_value();
    let values = catalog
        .foreground()
        .iter()
        .map(|region| (region_mean(image, region) / background) as f32)
        .collect();

    Ok(FeatureVector::new(values))
}

/// Arithmetic mean over the part of `region` inside the image, `0.0` when none is.
pub fn region_mean(image: &GrayImage, region: &Region) -> f64 {
    let Some((x0, y0, x1, y1)) = region.clip(image.width(), image.height()) else {
        return 0.0;
    };

    let mut sum: u64 = 0;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += u64::from(image.get_pixel(x, y).0[0]);
        }
    }
    let count = u64::from(x1 - x0) * u64::from(y1 - y0);
    sum as f64 / count as f64
}
