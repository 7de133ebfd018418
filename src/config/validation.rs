use super::schema::Config;

/// Validate application configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.data.as_os_str().is_empty() {
        errors.push("data: must name a dataset file".to_string());
    }

    if let Some(ref id_field) = config.id_field {
        if id_field.trim().is_empty() {
            errors.push("id_field: must not be blank".to_string());
        }
    }

    if let Some(max) = config.max_weight {
        if !max.is_finite() || max <= 0.0 {
            errors.push(format!("max_weight: must be a positive number, got {}", max));
        }
    }

    if let Some(weight) = config.default_weight {
        if !weight.is_finite() || weight < 0.0 {
            errors.push(format!(
                "default_weight: must be a non-negative number, got {}",
                weight
            ));
        } else if weight > config.max_weight() {
            errors.push(format!(
                "default_weight: {} exceeds max_weight {}",
                weight,
                config.max_weight()
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_config() {
        let mut config = Config::new("lawyer_data.csv");
        config.max_weight = Some(5.0);
        config.default_weight = Some(1.0);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_defaults_valid() {
        assert!(validate_config(&Config::new("lawyer_data.csv")).is_ok());
    }

    #[test]
    fn test_empty_data_path() {
        let config = Config::new(PathBuf::new());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].starts_with("data"));
    }

    #[test]
    fn test_non_positive_max_weight() {
        let mut config = Config::new("a.csv");
        config.max_weight = Some(0.0);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].contains("max_weight"));
    }

    #[test]
    fn test_default_weight_above_max() {
        let mut config = Config::new("a.csv");
        config.max_weight = Some(2.0);
        config.default_weight = Some(3.0);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].contains("exceeds max_weight"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::new("a.csv");
        config.id_field = Some(" ".to_string()); // Error 1
        config.max_weight = Some(-1.0); // Error 2
        config.default_weight = Some(-1.0); // Error 3
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
