//! Configuration validation.
//!
//! Validates every `[simulation]` and `[report]` field before a run starts.
//! Absent keys fall back to their defaults and are always valid.

use crate::domain::error::DcasimError;
use crate::ports::config_port::ConfigPort;

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    validate_initial_amount(config)?;
    validate_monthly_contribution(config)?;
    validate_risk_free_rate(config)?;
    Ok(())
}

pub fn validate_report_config(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    validate_rolling_window(config)?;
    validate_output_dir(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> DcasimError {
    DcasimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Reads a numeric key, rejecting text that is present but not a number.
fn parse_number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, DcasimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("{key} must be a number, got '{raw}'"))),
    }
}

fn validate_initial_amount(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    if let Some(value) = parse_number(config, "simulation", "initial_amount")? {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(
                "simulation",
                "initial_amount",
                "initial_amount must be a finite non-negative amount",
            ));
        }
    }
    Ok(())
}

fn validate_monthly_contribution(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    if let Some(value) = parse_number(config, "simulation", "monthly_contribution")? {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(
                "simulation",
                "monthly_contribution",
                "monthly_contribution must be a finite non-negative amount",
            ));
        }
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    if let Some(value) = parse_number(config, "simulation", "annual_risk_free_rate")? {
        if !(value > -1.0 && value < 1.0) {
            return Err(invalid(
                "simulation",
                "annual_risk_free_rate",
                "annual_risk_free_rate must be between -1 and 1",
            ));
        }
    }
    Ok(())
}

fn validate_rolling_window(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    let Some(raw) = config.get_string("report", "rolling_window") else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(window) if window >= 2 => Ok(()),
        Ok(_) => Err(invalid(
            "report",
            "rolling_window",
            "rolling_window must be at least 2",
        )),
        Err(_) => Err(invalid(
            "report",
            "rolling_window",
            format!("rolling_window must be an integer, got '{raw}'"),
        )),
    }
}

fn validate_output_dir(config: &dyn ConfigPort) -> Result<(), DcasimError> {
    match config.get_string("report", "output_dir") {
        Some(dir) if dir.trim().is_empty() => Err(invalid(
            "report",
            "output_dir",
            "output_dir must not be empty",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(
            r#"
[simulation]
initial_amount = 30000
monthly_contribution = 1000
annual_risk_free_rate = 0.02

[report]
output_dir = reports
rolling_window = 252
"#,
        );
        assert!(validate_simulation_config(&config).is_ok());
        assert!(validate_report_config(&config).is_ok());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = make_config("");
        assert!(validate_simulation_config(&config).is_ok());
        assert!(validate_report_config(&config).is_ok());
    }

    #[test]
    fn zero_amounts_are_allowed() {
        let config = make_config("[simulation]\ninitial_amount = 0\nmonthly_contribution = 0\n");
        assert!(validate_simulation_config(&config).is_ok());
    }

    #[test]
    fn negative_initial_amount_fails() {
        let config = make_config("[simulation]\ninitial_amount = -100\n");
        let err = validate_simulation_config(&config).unwrap_err();
        assert!(matches!(err, DcasimError::ConfigInvalid { key, .. } if key == "initial_amount"));
    }

    #[test]
    fn non_numeric_initial_amount_fails() {
        let config = make_config("[simulation]\ninitial_amount = lots\n");
        let err = validate_simulation_config(&config).unwrap_err();
        assert!(matches!(err, DcasimError::ConfigInvalid { key, .. } if key == "initial_amount"));
    }

    #[test]
    fn infinite_initial_amount_fails() {
        let config = make_config("[simulation]\ninitial_amount = inf\n");
        let err = validate_simulation_config(&config).unwrap_err();
        assert!(matches!(err, DcasimError::ConfigInvalid { key, .. } if key == "initial_amount"));
    }

    #[test]
    fn negative_contribution_fails() {
        let config = make_config("[simulation]\nmonthly_contribution = -1\n");
        let err = validate_simulation_config(&config).unwrap_err();
        assert!(
            matches!(err, DcasimError::ConfigInvalid { key, .. } if key == "monthly_contribution")
        );
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        for rate in ["1.5", "1", "-1", "nan"] {
            let config = make_config(&format!("[simulation]\nannual_risk_free_rate = {rate}\n"));
            let err = validate_simulation_config(&config).unwrap_err();
            assert!(
                matches!(err, DcasimError::ConfigInvalid { ref key, .. } if key == "annual_risk_free_rate"),
                "rate {rate} should be rejected"
            );
        }
    }

    #[test]
    fn negative_risk_free_rate_is_allowed() {
        let config = make_config("[simulation]\nannual_risk_free_rate = -0.005\n");
        assert!(validate_simulation_config(&config).is_ok());
    }

    #[test]
    fn rolling_window_too_small_fails() {
        let config = make_config("[report]\nrolling_window = 1\n");
        let err = validate_report_config(&config).unwrap_err();
        assert!(matches!(err, DcasimError::ConfigInvalid { key, .. } if key == "rolling_window"));
    }

    #[test]
    fn rolling_window_not_integer_fails() {
        let config = make_config("[report]\nrolling_window = 20.5\n");
        let err = validate_report_config(&config).unwrap_err();
        assert!(matches!(err, DcasimError::ConfigInvalid { key, .. } if key == "rolling_window"));
    }

    #[test]
    fn blank_output_dir_fails() {
        let config = make_config("[report]\noutput_dir =\n");
        let err = validate_report_config(&config).unwrap_err();
        assert!(matches!(err, DcasimError::ConfigInvalid { key, .. } if key == "output_dir"));
    }
}
