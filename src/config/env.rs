//! Environment variable substitution for configuration values.

use regex::Regex;

use crate::error::ConfigError;

/// Resolves `${VAR_NAME}` patterns in a string.
///
/// Endpoint URLs and the access key may carry placeholders so credentials
/// stay out of the configuration file. Every placeholder must resolve;
/// undefined variables are collected and reported together.
///
/// # Errors
/// Returns [`ConfigError::ValidationError`] naming every undefined variable.
pub fn resolve_env_vars(value: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid regex");

    let mut result = value.to_string();
    let mut errors = Vec::new();

    let matches: Vec<_> = re.captures_iter(value).collect();

    for cap in matches {
        let full_match = cap.get(0).unwrap().as_str();
        let var_name = &cap[1];

        match std::env::var(var_name) {
            Ok(var_value) => {
                result = result.replace(full_match, &var_value);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(ConfigError::ValidationError(format!(
            "undefined environment variable{}: {}",
            if errors.len() > 1 { "s" } else { "" },
            errors.join(", ")
        )))
    }
}
