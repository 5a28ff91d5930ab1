//! Fan-out of one alert to every (recipient, channel) pair.

use crate::config::{AlertConfig, Channel};
use crate::message::Alert;
use crate::transport::Transport;
use crate::AlertError;
use serde::Serialize;

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub recipient: String,
    pub channel: Channel,
    /// Provider resource id on success.
    pub sid: Option<String>,
    pub error: Option<String>,
}

impl Delivery {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        !self.deliveries.is_empty() && self.deliveries.iter().all(Delivery::succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(|d| !d.succeeded())
    }
}

pub struct Dispatcher<T> {
    config: AlertConfig,
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(config: AlertConfig, transport: T) -> Result<Self, AlertError> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    /// Send `alert` on every configured channel to every recipient.
    ///
    /// Each delivery runs on its own thread and all are joined before
    /// returning. Failures are logged and reported, never raised.
    pub fn dispatch(&self, alert: &Alert) -> DispatchReport {
        let jobs: Vec<(&str, Channel)> = self
            .config
            .recipients
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .flat_map(|r| self.config.channels.iter().map(move |&c| (r, c)))
            .collect();

        let deliveries = std::thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .iter()
                .map(|&(recipient, channel)| {
                    let handle = scope.spawn(move || self.deliver(alert, recipient, channel));
                    (recipient, channel, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(recipient, channel, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|_| Err(AlertError::Delivery("delivery thread panicked".into())));
                    match result {
                        Ok(sid) => {
                            tracing::info!(recipient, %channel, sid = %sid, "alert delivered");
                            Delivery {
                                recipient: recipient.to_string(),
                                channel,
                                sid: Some(sid),
                                error: None,
                            }
                        }
                        Err(err) => {
                            tracing::warn!(recipient, %channel, error = %err, "alert delivery failed");
                            Delivery {
                                recipient: recipient.to_string(),
                                channel,
                                sid: None,
                                error: Some(err.to_string()),
                            }
                        }
                    }
                })
                .collect()
        });

        DispatchReport { deliveries }
    }

    fn deliver(&self, alert: &Alert, recipient: &str, channel: Channel) -> Result<String, AlertError> {
        match channel {
            Channel::Sms => self
                .transport
                .send_message(&self.config.from_number, recipient, &alert.text),
            Channel::WhatsApp => self.transport.send_message(
                &format!("whatsapp:{}", self.config.whatsapp_sender()),
                &format!("whatsapp:{recipient}"),
                &alert.text,
            ),
            Channel::Voice => self
                .transport
                .place_call(&self.config.from_number, recipient, &alert.twiml),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String, String)>>,
        fail_for: Option<String>,
    }

    impl Recorder {
        fn record(&self, kind: &str, from: &str, to: &str) -> Result<String, AlertError> {
            if self.fail_for.as_deref().is_some_and(|f| to.ends_with(f)) {
                return Err(AlertError::Api {
                    status: 400,
                    message: format!("unreachable {to}"),
                });
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push((kind.to_string(), from.to_string(), to.to_string()));
            Ok(format!("SID{}", sent.len()))
        }
    }

    impl Transport for Recorder {
        fn send_message(&self, from: &str, to: &str, _body: &str) -> Result<String, AlertError> {
            self.record("message", from, to)
        }

        fn place_call(&self, from: &str, to: &str, _twiml: &str) -> Result<String, AlertError> {
            self.record("call", from, to)
        }
    }

    fn alert() -> Alert {
        Alert {
            text: "alert body".into(),
            twiml: "<Response/>".into(),
        }
    }

    fn config(channels: Vec<Channel>) -> AlertConfig {
        let mut c = AlertConfig::new(
            "AC1",
            "tok",
            "+15550000000",
            vec!["+15551111111".into(), "+15552222222".into()],
        );
        c.channels = channels;
        c
    }

    #[test]
    fn test_every_pair_is_attempted() {
        let dispatcher = Dispatcher::new(
            config(vec![Channel::Sms, Channel::Voice, Channel::WhatsApp]),
            Recorder::default(),
        )
        .unwrap();
        let report = dispatcher.dispatch(&alert());

        assert_eq!(report.deliveries.len(), 6);
        assert!(report.all_succeeded());
        let mut sent = dispatcher.transport.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(sent.iter().filter(|(k, _, _)| k == "call").count(), 2);
        assert!(sent.contains(&(
            "message".into(),
            "whatsapp:+15550000000".into(),
            "whatsapp:+15552222222".into()
        )));
    }

    #[test]
    fn test_failure_is_isolated() {
        let transport = Recorder {
            fail_for: Some("2222222".into()),
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(config(vec![Channel::Sms, Channel::Voice]), transport).unwrap();
        let report = dispatcher.dispatch(&alert());

        assert_eq!(report.deliveries.len(), 4);
        assert!(!report.all_succeeded());
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|d| d.recipient == "+15552222222"));
        assert!(failed[0].error.as_deref().unwrap().contains("unreachable"));
        assert_eq!(dispatcher.transport.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut c = config(vec![Channel::Sms]);
        c.recipients.clear();
        assert!(matches!(
            Dispatcher::new(c, Recorder::default()),
            Err(AlertError::Config(_))
        ));
    }

    #[test]
    fn test_blank_recipients_skipped() {
        let mut c = config(vec![Channel::Sms]);
        c.recipients.push("   ".into());
        let dispatcher = Dispatcher::new(c, Recorder::default()).unwrap();
        assert_eq!(dispatcher.dispatch(&alert()).deliveries.len(), 2);
    }
}
