use crate::AlertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Delivery channel for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Voice,
    Sms,
    WhatsApp,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Voice => f.write_str("voice"),
            Self::Sms => f.write_str("sms"),
            Self::WhatsApp => f.write_str("whatsapp"),
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "voice" | "call" => Ok(Self::Voice),
            "sms" | "text" => Ok(Self::Sms),
            "whatsapp" => Ok(Self::WhatsApp),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// Language of the synthesized voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    /// BCP 47 tag passed to the speech synthesizer.
    pub fn tag(self) -> &'static str {
        match self {
            Self::English => "en-US",
            Self::Hindi => "hi-IN",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "hindi" | "hi" => Ok(Self::Hindi),
            other => Err(format!("unknown language: {other}")),
        }
    }
}

/// Messaging account, sender, and recipient roster.
#[derive(Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number for calls and SMS, E.164.
    pub from_number: String,
    /// Sender for WhatsApp; falls back to `from_number`.
    #[serde(default)]
    pub whatsapp_from: Option<String>,
    pub recipients: Vec<String>,
    #[serde(default = "default_channels")]
    pub channels: Vec<Channel>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_channels() -> Vec<Channel> {
    vec![Channel::Sms, Channel::Voice]
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl AlertConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            whatsapp_from: None,
            recipients,
            channels: default_channels(),
            api_base: default_api_base(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn validate(&self) -> Result<(), AlertError> {
        if self.account_sid.trim().is_empty() || self.auth_token.trim().is_empty() {
            return Err(AlertError::Config("messaging credentials are not set".into()));
        }
        if self.from_number.trim().is_empty() {
            return Err(AlertError::Config("sender number is not set".into()));
        }
        if self.recipients.iter().all(|r| r.trim().is_empty()) {
            return Err(AlertError::Config("recipient roster is empty".into()));
        }
        if self.channels.is_empty() {
            return Err(AlertError::Config("no delivery channels enabled".into()));
        }
        Ok(())
    }

    pub fn whatsapp_sender(&self) -> &str {
        self.whatsapp_from.as_deref().unwrap_or(&self.from_number)
    }
}

// Hand-written so the auth token never reaches logs.
impl fmt::Debug for AlertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("whatsapp_from", &self.whatsapp_from)
            .field("recipients", &self.recipients)
            .field("channels", &self.channels)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
