use std::path::Path;

use anyhow::Context;
use chipdoc_pack::SaveOptions;
use chipdoc_tree::TextOptions;
use serde::Deserialize;

/// Contents of the `--config` TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub save: SaveOptions,
    pub text: TextOptions,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipdoc_crypto::CompressionLevel;
    use chipdoc_types::EncryptionLevel;

    #[test]
    fn missing_path_gives_defaults() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.save, SaveOptions::default());
        assert!(config.text.pretty);
    }

    #[test]
    fn parses_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chipdoc.toml");
        std::fs::write(
            &path,
            r#"
[save]
compression = "smallest"
encryption = "level1"
scramble_seed = 7

[text]
raw_array_threshold = 4
pretty = false
"#,
        )
        .unwrap();
        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.save.compression, CompressionLevel::Smallest);
        assert_eq!(config.save.encryption, EncryptionLevel::Level1);
        assert_eq!(config.save.scramble_seed, Some(7));
        assert_eq!(config.text.raw_array_threshold, 4);
        assert!(!config.text.pretty);
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[network]\nport = 1\n").unwrap();
        assert!(CliConfig::load(Some(&path)).is_err());
    }
}
