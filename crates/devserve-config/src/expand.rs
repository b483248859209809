//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// `field` names the configuration key and is only used in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains('$') {
        return Ok(value.to_owned());
    }

    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_passes_through() {
        assert_eq!(expand_env("127.0.0.1", "server.host").unwrap(), "127.0.0.1");
    }

    #[test]
    fn test_expands_set_variable() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("DEVSERVE_EXPAND_TEST_SET", "site");
        }

        assert_eq!(
            expand_env("${DEVSERVE_EXPAND_TEST_SET}/dist", "root.dir").unwrap(),
            "site/dist"
        );

        unsafe {
            std::env::remove_var("DEVSERVE_EXPAND_TEST_SET");
        }
    }

    #[test]
    fn test_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("DEVSERVE_EXPAND_TEST_DEFAULT");
        }

        assert_eq!(
            expand_env("${DEVSERVE_EXPAND_TEST_DEFAULT:-0.0.0.0}", "server.host").unwrap(),
            "0.0.0.0"
        );
    }

    #[test]
    fn test_missing_variable_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("DEVSERVE_EXPAND_TEST_MISSING");
        }

        let err = expand_env("${DEVSERVE_EXPAND_TEST_MISSING}", "server.host").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("server.host"), "got: {msg}");
        assert!(msg.contains("DEVSERVE_EXPAND_TEST_MISSING"), "got: {msg}");
    }
}
