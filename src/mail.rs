//! Outbound mail via a regioned HTTP mail provider.
//!
//! The provider routes by sending domain (taken from the sender address) and
//! hosts separate US and EU API endpoints; authentication is an API key over
//! Basic Auth. One POST per report, no retries.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::MailParams;
use crate::error::WatchError;

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

pub trait MailClient: Send + Sync {
    fn send(&self, message: &OutboundMessage) -> Result<(), WatchError>;
}

pub struct MailHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MailHttpClient {
    pub fn new(params: &MailParams) -> Result<Self, WatchError> {
        let base_url = region_base_url(&params.region)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| WatchError::MailHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: params.api_key.clone(),
        })
    }
}

impl MailClient for MailHttpClient {
    fn send(&self, message: &OutboundMessage) -> Result<(), WatchError> {
        let domain = sender_domain(&message.sender)?;
        let url = format!("{}/v3/{}/messages", self.base_url, domain);

        let mut form: Vec<(&str, &str)> = vec![
            ("from", &message.sender),
            ("subject", &message.subject),
            ("html", &message.html_body),
        ];
        for recipient in &message.recipients {
            form.push(("to", recipient));
        }

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .map_err(|err| WatchError::MailHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "mail request failed".to_string());
            return Err(WatchError::MailStatus { status, message });
        }

        tracing::info!(recipients = message.recipients.len(), "report email sent");
        Ok(())
    }
}

fn region_base_url(region: &str) -> Result<&'static str, WatchError> {
    match region.to_ascii_lowercase().as_str() {
        "us" => Ok("https://api.mailgun.net"),
        "eu" => Ok("https://api.eu.mailgun.net"),
        other => Err(WatchError::InvalidRegion(other.to_string())),
    }
}

/// Sending domain from a sender address, which may carry a display name
/// (`Reports <reports@example.com>`).
fn sender_domain(sender: &str) -> Result<&str, WatchError> {
    let domain = sender
        .rsplit_once('@')
        .map(|(_, rest)| rest.trim_end_matches('>').trim())
        .filter(|domain| !domain.is_empty())
        .ok_or_else(|| WatchError::InvalidSender(sender.to_string()))?;
    Ok(domain)
}
