use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default cap on an uploaded image (16 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub detection: DetectionConfig,
    pub models: ModelConfig,
    pub google: GoogleConfig,
    pub uploads: UploadConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Path to the YOLOv8 ONNX weights.
    pub model_path: String,
    /// Square input edge the model was exported with.
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model used for recipe text (e.g., gemini-2.0-flash)
    pub text_model: String,
    pub request_timeout_secs: u64,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    /// Absent key disables recipe generation instead of failing startup.
    pub api_key: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: String,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

impl RecipeConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Builds the service config from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = lookup("ENVIRONMENT").as_deref() == Some("prod");
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let config = RecipeConfig {
            common,
            detection: DetectionConfig {
                model_path: get("YOLO_MODEL_PATH", Some("yolov8n.onnx"))?,
                input_size: parse("YOLO_INPUT_SIZE", get("YOLO_INPUT_SIZE", Some("640"))?)?,
                confidence_threshold: parse(
                    "DETECTION_CONFIDENCE_THRESHOLD",
                    get("DETECTION_CONFIDENCE_THRESHOLD", Some("0.25"))?,
                )?,
                iou_threshold: parse(
                    "DETECTION_IOU_THRESHOLD",
                    get("DETECTION_IOU_THRESHOLD", Some("0.45"))?,
                )?,
            },
            models: ModelConfig {
                text_model: get("GENAI_TEXT_MODEL", Some("gemini-2.0-flash"))?,
                request_timeout_secs: parse(
                    "GENAI_REQUEST_TIMEOUT_SECS",
                    get("GENAI_REQUEST_TIMEOUT_SECS", Some("120"))?,
                )?,
                temperature: optional(&lookup, "GENAI_TEMPERATURE")?,
                max_output_tokens: optional(&lookup, "GENAI_MAX_OUTPUT_TOKENS")?,
            },
            google: GoogleConfig {
                api_key: lookup("GOOGLE_API_KEY").filter(|key| !key.trim().is_empty()),
                api_base: get("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE))?,
            },
            uploads: UploadConfig {
                dir: get("UPLOAD_DIR", Some("uploads"))?,
                max_bytes: parse(
                    "MAX_UPLOAD_BYTES",
                    get("MAX_UPLOAD_BYTES", Some(&DEFAULT_MAX_UPLOAD_BYTES.to_string()))?,
                )?,
            },
            observability: ObservabilityConfig {
                log_level: get("LOG_LEVEL", Some("info"))?,
                otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|e| !e.is_empty()),
            },
        };

        config.detection.validate()?;
        Ok(config)
    }
}

impl DetectionConfig {
    /// Rejects values the detector cannot run with.
    fn validate(&self) -> Result<(), AppError> {
        if self.input_size == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "YOLO_INPUT_SIZE must be greater than 0"
            )));
        }
        for (key, value) in [
            ("DETECTION_CONFIDENCE_THRESHOLD", self.confidence_threshold),
            ("DETECTION_IOU_THRESHOLD", self.iou_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} must be in (0, 1], got {}",
                    key,
                    value
                )));
            }
        }
        Ok(())
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse<T>(key: &str, raw: String) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value {:?}: {}", key, raw, e))
    })
}

fn optional<F, T>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map(|raw| parse(key, raw)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    fn common() -> core_config::Config {
        core_config::Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
        }
    }

    fn load(vars: &[(&str, &str)]) -> Result<RecipeConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RecipeConfig::from_lookup(common(), |key| vars.get(key).cloned())
    }

    #[test]
    fn dev_defaults_apply() {
        let config = load(&[]).unwrap();

        assert_eq!(config.detection.model_path, "yolov8n.onnx");
        assert_eq!(config.detection.input_size, 640);
        assert_eq!(config.detection.confidence_threshold, 0.25);
        assert_eq!(config.models.text_model, "gemini-2.0-flash");
        assert_eq!(config.uploads.dir, "uploads");
        assert_eq!(config.uploads.max_bytes, 16 * 1024 * 1024);
        assert!(config.google.api_key.is_none());
        assert!(config.models.temperature.is_none());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = load(&[("GOOGLE_API_KEY", "  ")]).unwrap();
        assert!(config.google.api_key.is_none());
    }

    #[test]
    fn optional_numbers_are_parsed() {
        let config = load(&[("GENAI_TEMPERATURE", "0.4"), ("GENAI_MAX_OUTPUT_TOKENS", "512")])
            .unwrap();

        assert_eq!(config.models.temperature, Some(0.4));
        assert_eq!(config.models.max_output_tokens, Some(512));
    }

    #[test]
    fn invalid_number_is_a_config_error() {
        let err = load(&[("DETECTION_IOU_THRESHOLD", "high")]).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("DETECTION_IOU_THRESHOLD"));
    }

    #[test]
    fn zero_input_size_is_rejected() {
        let err = load(&[("YOLO_INPUT_SIZE", "0")]).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("YOLO_INPUT_SIZE"));
    }

    #[test]
    fn thresholds_outside_unit_interval_are_rejected() {
        for (key, value) in [
            ("DETECTION_CONFIDENCE_THRESHOLD", "0"),
            ("DETECTION_CONFIDENCE_THRESHOLD", "1.5"),
            ("DETECTION_IOU_THRESHOLD", "-0.1"),
            ("DETECTION_IOU_THRESHOLD", "NaN"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)), "{key}={value}");
            assert!(err.to_string().contains(key), "{key}={value}");
        }

        let config = load(&[("DETECTION_CONFIDENCE_THRESHOLD", "1.0")]).unwrap();
        assert_eq!(config.detection.confidence_threshold, 1.0);
    }

    #[test]
    fn prod_requires_explicit_values_but_not_api_key() {
        let err = load(&[("ENVIRONMENT", "prod")]).unwrap_err();
        assert!(err.to_string().contains("required in production"));

        let config = load(&[
            ("ENVIRONMENT", "prod"),
            ("YOLO_MODEL_PATH", "/models/yolov8n.onnx"),
            ("YOLO_INPUT_SIZE", "640"),
            ("DETECTION_CONFIDENCE_THRESHOLD", "0.3"),
            ("DETECTION_IOU_THRESHOLD", "0.5"),
            ("GENAI_TEXT_MODEL", "gemini-2.0-flash"),
            ("GENAI_REQUEST_TIMEOUT_SECS", "60"),
            ("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            ("UPLOAD_DIR", "/tmp/uploads"),
            ("MAX_UPLOAD_BYTES", "1048576"),
            ("LOG_LEVEL", "warn"),
        ])
        .unwrap();
        assert!(config.google.api_key.is_none());
        assert_eq!(config.uploads.dir, "/tmp/uploads");
    }
}
