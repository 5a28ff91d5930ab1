//! Alert text and voice script templates.

use crate::config::Language;
use crate::AlertError;
use chrono::{DateTime, TimeZone};
use quick_xml::escape::escape;
use std::fmt::Display;

/// A GPS fix reported by the device that raised the SOS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AlertError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(AlertError::InvalidLocation {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn maps_link(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Subject attributes quoted in the alert. Opaque strings.
#[derive(Debug, Clone)]
pub struct AlertDetails {
    pub name: String,
    pub age: u32,
    pub clothing: String,
    pub last_location: String,
}

/// A fully rendered alert, ready for every channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Body for SMS and WhatsApp.
    pub text: String,
    /// Voice script (TwiML) for calls.
    pub twiml: String,
}

impl Alert {
    pub fn compose<Tz>(
        details: &AlertDetails,
        location: GeoPoint,
        language: Language,
        at: &DateTime<Tz>,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let speech = speech_text(&details.name, language);
        Self {
            text: alert_text(details, location, at),
            twiml: twiml(&speech, language),
        }
    }
}

pub fn alert_text<Tz>(details: &AlertDetails, location: GeoPoint, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "🚨 CHILD SAFETY ALERT 🚨\n\
         Name: {}\nAge: {}\nClothes: {}\n\
         Last Location: {}\nGPS: {}\nTime: {}",
        details.name,
        details.age,
        details.clothing,
        details.last_location,
        location.maps_link(),
        at.format("%d-%m-%Y | %I:%M %p"),
    )
}

pub fn speech_text(name: &str, language: Language) -> String {
    match language {
        Language::English => format!("Emergency alert. {name} has triggered SOS. Location sent."),
        Language::Hindi => format!("आपातकालीन अलर्ट। {name} ने एसओएस दबाया है।"),
    }
}

pub fn twiml(speech: &str, language: Language) -> String {
    format!(
        "<Response><Say language=\"{}\">{}</Say></Response>",
        language.tag(),
        escape(speech)
    )
}
