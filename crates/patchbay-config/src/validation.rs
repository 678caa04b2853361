// SPDX-FileCopyrightText: 2026 Patchbay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as known log levels, known send policies, and non-empty
//! directory paths.

use crate::diagnostic::ConfigError;
use crate::model::PatchbayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const SEND_POLICIES: &[&str] = &["first", "cascade"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PatchbayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate log_level is a known level
    let level = config.runtime.log_level.trim();
    if !LOG_LEVELS.contains(&level) {
        errors.push(ConfigError::Validation {
            message: format!(
                "runtime.log_level `{level}` is not one of {}",
                LOG_LEVELS.join(", ")
            ),
        });
    }

    // Validate send_policy is a known policy
    let policy = config.bus.send_policy.trim();
    if !SEND_POLICIES.contains(&policy) {
        errors.push(ConfigError::Validation {
            message: format!(
                "bus.send_policy `{policy}` is not one of {}",
                SEND_POLICIES.join(", ")
            ),
        });
    }

    // Validate socket_dir is not empty when the unix transport is enabled
    if config.bus.unix_enabled && config.bus.socket_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "bus.socket_dir must not be empty when bus.unix_enabled is true".to_string(),
        });
    }

    // Validate module_dir is not empty if set
    if let Some(dir) = &config.runtime.module_dir
        && dir.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "runtime.module_dir must not be empty when set".to_string(),
        });
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

    #[test]
    fn default_config_validates() {
        let config = PatchbayConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = PatchbayConfig::default();
        config.runtime.log_level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("log_level"))));
    }

    #[test]
    fn unknown_send_policy_fails_validation() {
        let mut config = PatchbayConfig::default();
        config.bus.send_policy = "broadcast".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("send_policy"))));
    }

    #[test]
    fn empty_socket_dir_fails_when_unix_enabled() {
        let mut config = PatchbayConfig::default();
        config.bus.socket_dir = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("socket_dir"))));
    }

    #[test]
    fn empty_socket_dir_passes_when_unix_disabled() {
        let mut config = PatchbayConfig::default();
        config.bus.unix_enabled = false;
        config.bus.socket_dir = "".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_module_dir_fails_validation() {
        let mut config = PatchbayConfig::default();
        config.runtime.module_dir = Some("".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("module_dir"))));
    }

    #[test]
    fn all_errors_collected_in_one_pass() {
        let mut config = PatchbayConfig::default();
        config.runtime.log_level = "loud".to_string();
        config.bus.send_policy = "maybe".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = PatchbayConfig::default();
        config.runtime.log_level = "debug".to_string();
        config.bus.send_policy = "cascade".to_string();
        config.bus.socket_dir = "/run/patchbay".to_string();
        config.runtime.module_dir = Some("/usr/lib/patchbay/modules".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
