use std::path::PathBuf;

use thiserror::Error;

use crate::config::env::{self, EnvKey};
use crate::modules::encoder::profile::EncodeProfile;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("output prefix {0:?} would overlap the intake prefix")]
    PrefixCollision(String),

    #[error("{0}")]
    OutOfRange(String),
}

#[derive(Clone, Debug)]
pub enum StorageConfig {
    S3 {
        endpoint: String,
        region: String,
        access_key: String,
        secret_key: String,
    },
    Local {
        root: PathBuf,
    },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub intake_prefix: String,
    pub output_prefix: String,
    pub profile: EncodeProfile,
    pub job_timeout_secs: u64,
    pub max_memory_bytes: u64,
    pub ffmpeg_path: PathBuf,
    pub scratch_dir: PathBuf,
    pub storage: StorageConfig,
    pub database_url: Option<String>,
    pub rabbitmq_url: Option<String>,
    pub trigger_queue: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let defaults = EncodeProfile::default();
        let profile = EncodeProfile {
            video_codec: env::get_or(EnvKey::VideoCodec, &defaults.video_codec),
            preset: env::get_or(EnvKey::Preset, &defaults.preset),
            crf: env::get_parsed(EnvKey::Crf, defaults.crf)?,
            target_height: env::get_parsed(EnvKey::TargetHeight, defaults.target_height)?,
            audio_codec: env::get_or(EnvKey::AudioCodec, &defaults.audio_codec),
            audio_bitrate: env::get_or(EnvKey::AudioBitrate, &defaults.audio_bitrate),
        };

        let max_memory = env::get_or(EnvKey::MaxMemory, "2GiB");
        let max_memory_bytes = parse_byte_size(&max_memory).ok_or(ConfigError::Invalid {
            key: EnvKey::MaxMemory.as_str(),
            value: max_memory,
        })?;

        let storage = match env::get_or(EnvKey::StorageBackend, "s3").as_str() {
            "s3" => StorageConfig::S3 {
                endpoint: env::require(EnvKey::MinioUrl)?,
                region: env::get_or(EnvKey::S3Region, "us-east-1"),
                access_key: env::require(EnvKey::MinioAccessKey)?,
                secret_key: env::require(EnvKey::MinioSecretKey)?,
            },
            "local" => StorageConfig::Local {
                root: PathBuf::from(env::get_or(EnvKey::LocalStorageRoot, "./data")),
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: EnvKey::StorageBackend.as_str(),
                    value: other.to_string(),
                });
            }
        };

        let config = Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000)?,
            intake_prefix: normalize_prefix(&env::get_or(EnvKey::IntakePrefix, "videos/uploads/")),
            output_prefix: normalize_prefix(&env::get_or(EnvKey::OutputPrefix, "videos/encoded/")),
            profile,
            job_timeout_secs: env::get_parsed(EnvKey::JobTimeoutSeconds, 540)?,
            max_memory_bytes,
            ffmpeg_path: PathBuf::from(env::get_or(EnvKey::FfmpegPath, "ffmpeg")),
            scratch_dir: env::get_opt(EnvKey::ScratchDir)
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            storage,
            database_url: env::get_opt(EnvKey::DatabaseUrl),
            rabbitmq_url: env::get_opt(EnvKey::RabbitMqUrl),
            trigger_queue: env::get_or(EnvKey::TriggerQueue, "storage_events"),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // An empty output prefix covers the whole bucket, and an intake
        // folder nested under the output would re-trigger on every encode.
        if self.output_prefix.is_empty() || self.intake_prefix.starts_with(&self.output_prefix) {
            return Err(ConfigError::PrefixCollision(self.output_prefix.clone()));
        }
        if self.profile.crf > 51 {
            return Err(ConfigError::OutOfRange(format!(
                "CRF must be between 0 and 51, got {}",
                self.profile.crf
            )));
        }
        if self.profile.target_height == 0 || self.profile.target_height % 2 != 0 {
            return Err(ConfigError::OutOfRange(format!(
                "TARGET_HEIGHT must be a positive even number, got {}",
                self.profile.target_height
            )));
        }
        if self.job_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "JOB_TIMEOUT_SECONDS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Appends a trailing `/` so `videos/uploads` does not also match
/// `videos/uploads-old/...`. An empty prefix matches everything.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// Parses sizes such as `2GiB`, `512MiB`, `1G`, `64k` or a plain byte count.
pub fn parse_byte_size(value: &str) -> Option<u64> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let number: u64 = digits.parse().ok()?;

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "kib" | "ki" => 1 << 10,
        "m" | "mb" => 1_000_000,
        "mib" | "mi" => 1 << 20,
        "g" | "gb" => 1_000_000_000,
        "gib" | "gi" => 1 << 30,
        _ => return None,
    };

    number.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            server_port: 3000,
            intake_prefix: "videos/uploads/".to_string(),
            output_prefix: "videos/encoded/".to_string(),
            profile: EncodeProfile::default(),
            job_timeout_secs: 540,
            max_memory_bytes: 2 << 30,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            scratch_dir: std::env::temp_dir(),
            storage: StorageConfig::Local {
                root: PathBuf::from("./data"),
            },
            database_url: None,
            rabbitmq_url: None,
            trigger_queue: "storage_events".to_string(),
        }
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("videos/uploads"), "videos/uploads/");
        assert_eq!(normalize_prefix("/videos/uploads/"), "videos/uploads/");
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("  raw "), "raw/");
    }

    #[test]
    fn test_parse_byte_size() {
        assert_eq!(parse_byte_size("2GiB"), Some(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_byte_size("512MiB"), Some(512 * 1024 * 1024));
        assert_eq!(parse_byte_size("1G"), Some(1_000_000_000));
        assert_eq!(parse_byte_size("1048576"), Some(1_048_576));
        assert_eq!(parse_byte_size("64 kib"), Some(64 * 1024));
        assert_eq!(parse_byte_size("lots"), None);
        assert_eq!(parse_byte_size("2TiB"), None);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_same_prefixes() {
        let mut config = sample();
        config.output_prefix = config.intake_prefix.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PrefixCollision(_))
        ));
    }

    #[test]
    fn test_validate_rejects_overlapping_prefixes() {
        let mut config = sample();
        config.output_prefix = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PrefixCollision(_))
        ));

        let mut config = sample();
        config.intake_prefix = "videos/encoded/raw/".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PrefixCollision(_))
        ));

        // Output nested under intake is still fine: the recursion guard skips it.
        let mut config = sample();
        config.output_prefix = "videos/uploads/encoded/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_encode_settings() {
        let mut config = sample();
        config.profile.crf = 60;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange(_))));

        let mut config = sample();
        config.profile.target_height = 721;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange(_))));

        let mut config = sample();
        config.job_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange(_))));
    }
}
