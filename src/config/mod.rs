mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./clipforge.toml",
        "~/.config/clipforge/config.toml",
        "/etc/clipforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.transcode.size_limit_bytes == Some(0) {
        anyhow::bail!("transcode.size_limit_bytes must be greater than 0");
    }

    if config.tools.timeout_secs == 0 {
        anyhow::bail!("tools.timeout_secs must be greater than 0");
    }

    if let Some(ref dir) = config.transcode.output_dir {
        if dir.exists() && !dir.is_dir() {
            anyhow::bail!("Output directory is not a directory: {:?}", dir);
        }
    }

    for (name, path) in [
        ("ffmpeg", &config.tools.ffmpeg_path),
        ("ffprobe", &config.tools.ffprobe_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    Ok(())
}

/// Parse a byte count such as `2000000`, `2MB`, `500 KB` or `25MiB`.
pub fn parse_byte_size(s: &str) -> Result<u64> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let value: u64 = digits
        .parse()
        .with_context(|| format!("Invalid size: {:?}", s))?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        other => anyhow::bail!("Unknown size unit: {:?}", other),
    };

    value
        .checked_mul(multiplier)
        .with_context(|| format!("Size out of range: {:?}", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_av::QualityTier;

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(parse_byte_size("2000000").unwrap(), 2_000_000);
        assert_eq!(parse_byte_size("2MB").unwrap(), 2_000_000);
        assert_eq!(parse_byte_size("500 kb").unwrap(), 500_000);
        assert_eq!(parse_byte_size("25MiB").unwrap(), 26_214_400);
        assert!(parse_byte_size("MB").is_err());
        assert!(parse_byte_size("12 parsecs").is_err());
        assert!(parse_byte_size("99999999999999GB").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transcode.default_tier, QualityTier::Highest);
        assert!(config.transcode.delete_source);
        assert_eq!(config.transcode.size_limit_bytes, None);
        assert_eq!(config.tools.timeout_secs, 1800);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [transcode]
            default_tier = "1080p"
            size_limit_bytes = 26214400
            "#,
        )
        .unwrap();
        assert_eq!(config.transcode.default_tier, QualityTier::Capped1080p);
        assert_eq!(config.transcode.size_limit_bytes, Some(26_214_400));
        assert!(config.transcode.delete_source);
        assert_eq!(config.tools.timeout_secs, 1800);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let mut config = Config::default();
        config.transcode.size_limit_bytes = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.tools.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}
