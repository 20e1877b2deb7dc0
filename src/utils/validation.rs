use crate::utils::error::{ReconError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ReconError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ReconError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(ReconError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(ReconError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be one of: {}", allowed.join(", ")),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReconError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ReconError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// `lower < upper`, both finite.
pub fn validate_ordered_pair(field_name: &str, lower: f64, upper: f64) -> Result<()> {
    if !lower.is_finite() || !upper.is_finite() || lower >= upper {
        return Err(ReconError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}..{}", lower, upper),
            reason: "Lower bound must be finite and smaller than the upper bound".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("assets.model_dir", "src/models").is_ok());
        assert!(validate_path("assets.model_dir", "").is_err());
        assert!(validate_path("assets.model_dir", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("extract.required_regions", 32, 1).is_ok());
        assert!(validate_positive_number("extract.required_regions", 0, 1).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("workspace.capture_timeout_seconds", 5.0, 0.0, 600.0).is_ok());
        assert!(validate_range("workspace.capture_timeout_seconds", -1.0, 0.0, 600.0).is_err());
    }

    #[test]
    fn test_validate_ordered_pair() {
        assert!(validate_ordered_pair("spectrum", 400.0, 1000.0).is_ok());
        assert!(validate_ordered_pair("spectrum", 1000.0, 400.0).is_err());
        assert!(validate_ordered_pair("spectrum", f64::NAN, 400.0).is_err());
    }

    #[test]
    fn test_validate_one_of() {
        let levels = ["info", "debug"];
        assert!(validate_one_of("monitoring.log_level", "debug", &levels).is_ok());
        assert!(validate_one_of("monitoring.log_level", "loud", &levels).is_err());
    }
}
