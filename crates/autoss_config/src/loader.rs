//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::AutossConfig;
use std::path::Path;

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<AutossConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<AutossConfig, ConfigError> {
    let config: AutossConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks that the prefix yields legal Verilog identifiers and that at least
/// one reset alias is configured.
pub fn validate_config(config: &AutossConfig) -> Result<(), ConfigError> {
    if !is_identifier(&config.prefix) {
        return Err(ConfigError::ValidationError(format!(
            "prefix `{}` is not a valid Verilog identifier",
            config.prefix
        )));
    }
    if config.reset_signals.is_empty() {
        return Err(ConfigError::ValidationError(
            "reset_signals must not be empty".to_string(),
        ));
    }
    if let Some(bad) = config.reset_signals.iter().find(|s| !is_identifier(s)) {
        return Err(ConfigError::ValidationError(format!(
            "reset signal `{bad}` is not a valid Verilog identifier"
        )));
    }
    Ok(())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_is_default() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, AutossConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
prefix = "ss"
reset_signals = ["rst", "arst_n"]

[tools]
syntax = "/opt/verible/bin/verible-verilog-syntax"
formatter = "vfmt"
format_args = []
defines = ["USE_AUTO_SS=1", "SIM"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.prefix, "ss");
        assert_eq!(config.reset_signals, vec!["rst", "arst_n"]);
        assert_eq!(config.tools.syntax, "/opt/verible/bin/verible-verilog-syntax");
        assert_eq!(config.tools.preprocessor, "verible-verilog-preprocessor");
        assert_eq!(config.tools.formatter, "vfmt");
        assert!(config.tools.format_args.is_empty());
        assert_eq!(config.tools.defines.len(), 2);
    }

    #[test]
    fn invalid_prefix_errors() {
        let err = load_config_from_str("prefix = \"9bad\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        let err = load_config_from_str("prefix = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn empty_reset_list_errors() {
        let err = load_config_from_str("reset_signals = []").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn unknown_key_errors() {
        let err = load_config_from_str("prefx = \"ss\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prefix = \"snap\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.out_port(), "snap_out");
    }

    #[test]
    fn io_error_from_missing_file() {
        let err = load_config(Path::new("/nonexistent/autoss.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
