use anyhow::Context;
use safeguard_alert::{AlertConfig, Channel, Language};
use safeguard_core::{
    DetectorBackend, ScoringStrategy, SelectionPolicy, LBPH_THRESHOLD, PIXEL_ERROR_THRESHOLD,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Application configuration: an optional TOML file (`SAFEGUARD_CONFIG`)
/// overlaid with `SAFEGUARD_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for the database, uploads, and models unless overridden.
    pub data_dir: PathBuf,
    pub db_path: Option<PathBuf>,
    pub upload_dir: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub detector: DetectorBackend,
    /// Explicit detector model file; defaults to the backend's file in `model_dir`.
    pub detector_model: Option<PathBuf>,
    pub selection_policy: SelectionPolicy,
    pub scoring: ScoringStrategy,
    pub lbph_threshold: f64,
    pub pixel_error_threshold: f64,
    pub voice_language: Language,
    pub alert: Option<AlertConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_path: None,
            upload_dir: None,
            model_dir: None,
            detector: DetectorBackend::default(),
            detector_model: None,
            selection_policy: SelectionPolicy::default(),
            scoring: ScoringStrategy::default(),
            lbph_threshold: LBPH_THRESHOLD,
            pixel_error_threshold: PIXEL_ERROR_THRESHOLD,
            voice_language: Language::default(),
            alert: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("safeguard")
}

impl Config {
    /// Load from the process environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = match lookup("SAFEGUARD_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(&lookup);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SAFEGUARD_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SAFEGUARD_DB_PATH") {
            self.db_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SAFEGUARD_UPLOAD_DIR") {
            self.upload_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SAFEGUARD_MODEL_DIR") {
            self.model_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("SAFEGUARD_DETECTOR_MODEL") {
            self.detector_model = Some(PathBuf::from(v));
        }
        env_parse(lookup, "SAFEGUARD_DETECTOR", &mut self.detector);
        env_parse(lookup, "SAFEGUARD_SELECTION_POLICY", &mut self.selection_policy);
        env_parse(lookup, "SAFEGUARD_SCORING", &mut self.scoring);
        env_parse(lookup, "SAFEGUARD_LBPH_THRESHOLD", &mut self.lbph_threshold);
        env_parse(lookup, "SAFEGUARD_PIXEL_ERROR_THRESHOLD", &mut self.pixel_error_threshold);
        env_parse(lookup, "SAFEGUARD_VOICE_LANGUAGE", &mut self.voice_language);
        self.apply_alert_env(lookup);
    }

    fn apply_alert_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        const KEYS: [&str; 7] = [
            "SAFEGUARD_TWILIO_ACCOUNT_SID",
            "SAFEGUARD_TWILIO_AUTH_TOKEN",
            "SAFEGUARD_TWILIO_FROM",
            "SAFEGUARD_TWILIO_API_BASE",
            "SAFEGUARD_WHATSAPP_FROM",
            "SAFEGUARD_ALERT_RECIPIENTS",
            "SAFEGUARD_ALERT_CHANNELS",
        ];
        if self.alert.is_none() && KEYS.iter().all(|k| lookup(k).is_none()) {
            return;
        }

        let alert = self
            .alert
            .get_or_insert_with(|| AlertConfig::new("", "", "", Vec::new()));
        if let Some(v) = lookup("SAFEGUARD_TWILIO_ACCOUNT_SID") {
            alert.account_sid = v;
        }
        if let Some(v) = lookup("SAFEGUARD_TWILIO_AUTH_TOKEN") {
            alert.auth_token = v;
        }
        if let Some(v) = lookup("SAFEGUARD_TWILIO_FROM") {
            alert.from_number = v;
        }
        if let Some(v) = lookup("SAFEGUARD_WHATSAPP_FROM") {
            alert.whatsapp_from = Some(v);
        }
        if let Some(v) = lookup("SAFEGUARD_TWILIO_API_BASE") {
            alert.api_base = v;
        }
        if let Some(v) = lookup("SAFEGUARD_ALERT_RECIPIENTS") {
            alert.recipients = split_list(&v);
        }
        if let Some(v) = lookup("SAFEGUARD_ALERT_CHANNELS") {
            let channels: Result<Vec<Channel>, _> =
                split_list(&v).iter().map(|c| c.parse()).collect();
            match channels {
                Ok(channels) => alert.channels = channels,
                Err(e) => tracing::warn!(error = %e, "ignoring SAFEGUARD_ALERT_CHANNELS"),
            }
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("child_safety.db"))
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("uploads"))
    }

    pub fn model_dir(&self) -> PathBuf {
        self.model_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("models"))
    }

    pub fn detector_model_path(&self) -> PathBuf {
        self.detector_model
            .clone()
            .unwrap_or_else(|| self.model_dir().join(self.detector.default_model_file()))
    }

    pub fn threshold_for(&self, strategy: ScoringStrategy) -> f64 {
        match strategy {
            ScoringStrategy::Lbph => self.lbph_threshold,
            ScoringStrategy::PixelError => self.pixel_error_threshold,
        }
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(e) => tracing::warn!(key, value = %raw, error = %e, "ignoring invalid setting"),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
