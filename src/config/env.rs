use std::env;
use std::str::FromStr;

use crate::config::settings::ConfigError;

#[derive(Clone, Copy, Debug)]
pub enum EnvKey {
    ServerPort,
    IntakePrefix,
    OutputPrefix,
    TargetHeight,
    VideoCodec,
    Crf,
    Preset,
    AudioCodec,
    AudioBitrate,
    JobTimeoutSeconds,
    MaxMemory,
    FfmpegPath,
    ScratchDir,
    StorageBackend,
    LocalStorageRoot,
    MinioUrl,
    S3Region,
    MinioAccessKey,
    MinioSecretKey,
    DatabaseUrl,
    RabbitMqUrl,
    TriggerQueue,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::IntakePrefix => "INTAKE_PREFIX",
            EnvKey::OutputPrefix => "OUTPUT_PREFIX",
            EnvKey::TargetHeight => "TARGET_HEIGHT",
            EnvKey::VideoCodec => "VIDEO_CODEC",
            EnvKey::Crf => "CRF",
            EnvKey::Preset => "PRESET",
            EnvKey::AudioCodec => "AUDIO_CODEC",
            EnvKey::AudioBitrate => "AUDIO_BITRATE",
            EnvKey::JobTimeoutSeconds => "JOB_TIMEOUT_SECONDS",
            EnvKey::MaxMemory => "MAX_MEMORY",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::ScratchDir => "SCRATCH_DIR",
            EnvKey::StorageBackend => "STORAGE_BACKEND",
            EnvKey::LocalStorageRoot => "LOCAL_STORAGE_ROOT",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::S3Region => "S3_REGION",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::RabbitMqUrl => "RABBITMQ_URL",
            EnvKey::TriggerQueue => "TRIGGER_QUEUE",
        }
    }
}

/// An unset or blank variable is treated as absent.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    get_opt(key).unwrap_or_else(|| default.to_string())
}

/// Parses the variable when present. A value that is set but unparsable is
/// reported instead of silently replaced by the default.
pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> Result<T, ConfigError> {
    match get_opt(key) {
        Some(val) => val.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            key: key.as_str(),
            value: val,
        }),
        None => Ok(default),
    }
}

pub fn require(key: EnvKey) -> Result<String, ConfigError> {
    get_opt(key).ok_or(ConfigError::Missing(key.as_str()))
}

