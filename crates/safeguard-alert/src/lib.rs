//! safeguard-alert — Emergency notification dispatch.
//!
//! Renders an SOS alert for a subject at a GPS fix and fans it out to a
//! fixed recipient roster over voice, SMS, and WhatsApp. Account details
//! come from an explicit [`AlertConfig`]; nothing is global.

pub mod config;
pub mod dispatch;
pub mod message;
pub mod transport;

pub use config::{AlertConfig, Channel, Language};
pub use dispatch::{Delivery, DispatchReport, Dispatcher};
pub use message::{Alert, AlertDetails, GeoPoint};
pub use transport::{Transport, TwilioTransport};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("alert configuration: {0}")]
    Config(String),
    #[error("location unavailable or invalid: ({latitude}, {longitude})")]
    InvalidLocation { latitude: f64, longitude: f64 },
    #[error("messaging API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected API response: {0}")]
    Decode(#[from] serde_json::Error),
}
