//! Outbound messaging transport.

use crate::config::AlertConfig;
use crate::AlertError;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// Sends one message or places one call. Returns the provider's resource id.
pub trait Transport: Send + Sync {
    fn send_message(&self, from: &str, to: &str, body: &str) -> Result<String, AlertError>;
    fn place_call(&self, from: &str, to: &str, twiml: &str) -> Result<String, AlertError>;
}

#[derive(Deserialize)]
struct Resource {
    sid: String,
}

#[derive(Deserialize)]
struct ApiFailure {
    message: String,
}

/// Twilio REST API over HTTPS with basic auth.
pub struct TwilioTransport {
    client: Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioTransport {
    pub fn new(config: &AlertConfig) -> Result<Self, AlertError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/{}.json",
            self.api_base, self.account_sid, resource
        )
    }

    fn post(&self, resource: &str, form: &[(&str, &str)]) -> Result<String, AlertError> {
        let response = self
            .client
            .post(self.endpoint(resource))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiFailure>(&body)
                .map(|f| f.message)
                .unwrap_or(body);
            return Err(AlertError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let resource: Resource = serde_json::from_str(&body)?;
        Ok(resource.sid)
    }
}

impl Transport for TwilioTransport {
    fn send_message(&self, from: &str, to: &str, body: &str) -> Result<String, AlertError> {
        self.post("Messages", &[("From", from), ("To", to), ("Body", body)])
    }

    fn place_call(&self, from: &str, to: &str, twiml: &str) -> Result<String, AlertError> {
        self.post("Calls", &[("From", from), ("To", to), ("Twiml", twiml)])
    }
}
