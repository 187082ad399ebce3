use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "radar";
const ENV_PREFIX: &str = "RADAR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub artifacts: ArtifactSettings,
    pub filter: FilterSettings,
    pub repository: RepositorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    pub url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            url: "http://www.bom.gov.au/radar/IDR024.gif".to_string(),
            // The BOM endpoint refuses requests without a browser-like agent.
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36"
                .to_string(),
            request_timeout_secs: 10,
            connect_timeout_secs: 10,
        }
    }
}

impl FetchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSettings {
    pub radar_image: PathBuf,
    pub filtered_image: PathBuf,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            radar_image: PathBuf::from("bom_radar.gif"),
            filtered_image: PathBuf::from("bom_radar_filtered.gif"),
        }
    }
}

/// Where the radar legend sits in the source image and what each swatch becomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    pub key_row: u32,
    pub key_columns: Vec<u32>,
    pub key_colors: Vec<[u8; 3]>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        const BLACK: [u8; 3] = [0, 0, 0];
        const DARK_GRAY: [u8; 3] = [40, 40, 40];
        const MID_GRAY: [u8; 3] = [100, 100, 100];
        const LIGHT_GRAY: [u8; 3] = [180, 180, 180];
        const WHITE: [u8; 3] = [255, 255, 255];

        Self {
            key_row: 428,
            key_columns: vec![
                104, 125, 143, 163, 184, 203, 224, 243, 264, 283, 303, 322, 343, 362, 383,
            ],
            // Inverted ramp: heaviest rainfall (right end of the legend) becomes white.
            key_colors: vec![
                BLACK, BLACK, BLACK, BLACK, BLACK, DARK_GRAY, DARK_GRAY, MID_GRAY, MID_GRAY,
                LIGHT_GRAY, LIGHT_GRAY, WHITE, WHITE, WHITE, WHITE,
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySettings {
    pub path: PathBuf,
    pub commit_message: String,
    pub author_name: String,
    pub author_email: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            commit_message: "Update radar images".to_string(),
            author_name: "github-actions[bot]".to_string(),
            author_email: "41898282+github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

impl Settings {
    /// Layers defaults, an optional config file and `RADAR_*` environment variables.
    ///
    /// Without an explicit path, `radar.toml` (or any format the `config` crate
    /// recognises under that stem) is picked up from the working directory if present.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match config_file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("filter.key_columns")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "fetch.url",
                reason: "must not be empty".to_string(),
            });
        }

        if self.fetch.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch.request_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.artifacts.radar_image == self.artifacts.filtered_image {
            return Err(ConfigError::Invalid {
                field: "artifacts.filtered_image",
                reason: "must differ from artifacts.radar_image".to_string(),
            });
        }

        if self.repository.commit_message.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "repository.commit_message",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.filter.key_columns.len(), settings.filter.key_colors.len());
        assert_eq!(settings.fetch.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[fetch]\nurl = \"http://localhost/radar.gif\"\n\n[filter]\nkey_row = 3\nkey_columns = [1, 2]"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.fetch.url, "http://localhost/radar.gif");
        assert_eq!(settings.filter.key_row, 3);
        assert_eq!(settings.filter.key_columns, vec![1, 2]);
        // Untouched sections keep their defaults.
        assert_eq!(settings.artifacts.radar_image, PathBuf::from("bom_radar.gif"));
    }

    #[test]
    fn rejects_identical_artifact_paths() {
        let mut settings = Settings::default();
        settings.artifacts.filtered_image = settings.artifacts.radar_image.clone();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { field: "artifacts.filtered_image", .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/definitely/not/here/radar.toml")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
