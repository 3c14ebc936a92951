//! Value parsers for CLI arguments
//!
//! These run inside clap so bad input is reported with the usual usage text.

use std::fs;
use std::path::PathBuf;

/// Validate port number is within valid range (1-65535)
pub fn validate_port(port_str: &str) -> Result<u16, String> {
    let port: u16 = port_str.parse().map_err(|_| {
        format!(
            "Port must be a valid number between 1 and 65535, got: '{}'",
            port_str
        )
    })?;

    if port == 0 {
        return Err("Port must be between 1 and 65535. Port 0 is not allowed.".to_string());
    }

    Ok(port)
}

/// Validate that a configuration file exists and can be opened
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    fs::File::open(&path)
        .map(|_| path)
        .map_err(|e| format!("Cannot read configuration file '{}': {}", path_str, e))
}

/// Validate host address format (basic validation)
pub fn validate_host_address(host_str: &str) -> Result<String, String> {
    let host = host_str.trim();

    if host.is_empty() {
        return Err("Host address cannot be empty".to_string());
    }

    if host.contains(' ') {
        return Err("Host address cannot contain spaces".to_string());
    }

    if host == "localhost" || host == "0.0.0.0" || host.starts_with("127.") {
        return Ok(host.to_string());
    }

    if host.chars().all(|c| c.is_ascii_digit() || c == '.') {
        let parts: Vec<&str> = host.split('.').collect();
        if parts.len() == 4 {
            if parts.iter().any(|part| part.parse::<u8>().is_err()) {
                return Err(format!("Invalid IPv4 address format: '{}'", host_str));
            }
            return Ok(host.to_string());
        }
    }

    if host.len() > 253 {
        return Err("Host address is too long (maximum 253 characters)".to_string());
    }

    Ok(host.to_string())
}

/// Validate a TMDB language tag such as `en` or `pt-BR`
pub fn validate_language(language_str: &str) -> Result<String, String> {
    let language = language_str.trim();
    let mut parts = language.split('-');

    let primary = parts.next().unwrap_or_default();
    let region = parts.next();

    let primary_ok = primary.len() == 2 && primary.chars().all(|c| c.is_ascii_lowercase());
    let region_ok = region
        .map(|r| r.len() == 2 && r.chars().all(|c| c.is_ascii_uppercase()))
        .unwrap_or(true);

    if !primary_ok || !region_ok || parts.next().is_some() {
        return Err(format!(
            "Language must look like 'en' or 'en-US', got: '{}'",
            language_str
        ));
    }

    Ok(language.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validation_valid_ports() {
        for port_str in ["1", "80", "1337", "8080", "65535"] {
            assert!(validate_port(port_str).is_ok(), "Port {} should be valid", port_str);
        }
    }

    #[test]
    fn test_port_validation_invalid_ports() {
        for port_str in ["0", "65536", "abc", "-1", ""] {
            assert!(validate_port(port_str).is_err(), "Port {} should be invalid", port_str);
        }
    }

    #[test]
    fn test_host_validation_valid_hosts() {
        let valid_hosts = [
            "localhost",
            "127.0.0.1",
            "0.0.0.0",
            "192.168.1.1",
            "addon.example.com",
        ];

        for host in valid_hosts {
            assert!(validate_host_address(host).is_ok(), "Host {} should be valid", host);
        }
    }

    #[test]
    fn test_host_validation_invalid_hosts() {
        let long = "x".repeat(300);
        let invalid_hosts = ["", "   ", "host with spaces", "999.999.999.999", long.as_str()];

        for host in invalid_hosts {
            assert!(validate_host_address(host).is_err(), "Host '{}' should be invalid", host);
        }
    }

    #[test]
    fn test_config_file_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(validate_config_file_path(missing.to_str().unwrap()).is_err());

        // a directory is not a file
        assert!(validate_config_file_path(dir.path().to_str().unwrap()).is_err());

        let file = dir.path().join("addon.toml");
        fs::write(&file, "").unwrap();
        assert_eq!(validate_config_file_path(file.to_str().unwrap()).unwrap(), file);
    }

    #[test]
    fn test_language_validation() {
        for language in ["en", "en-US", "pt-BR"] {
            assert!(validate_language(language).is_ok(), "{} should be valid", language);
        }
        for language in ["", "english", "EN-us", "en-US-x", "e"] {
            assert!(validate_language(language).is_err(), "{} should be invalid", language);
        }
    }
}
