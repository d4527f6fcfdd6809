//! Mailing-list side channel used at registration time.
//!
//! Failures here are reported to the caller, which logs and ignores them.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::info;
use md5::{Digest, Md5};
use serde_json::json;

use crate::settings::MailingListSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub email: String,
    pub first_name: String,
    pub role: String,
    pub tag: Option<String>,
}

#[async_trait]
pub trait MailingList: Send + Sync {
    async fn upsert(&self, contact: &Contact) -> Result<()>;
}

/// Stand-in when no credentials are configured; every upsert fails.
pub struct UnconfiguredMailingList;

#[async_trait]
impl MailingList for UnconfiguredMailingList {
    async fn upsert(&self, _contact: &Contact) -> Result<()> {
        Err(anyhow!("mailing list credentials missing or invalid"))
    }
}

pub struct MailchimpClient {
    http: reqwest::Client,
    api_key: String,
    audience_id: String,
    base_url: String,
}

impl MailchimpClient {
    pub fn new(api_key: &str, audience_id: &str) -> Result<Self> {
        let dc = data_center(api_key).ok_or_else(|| anyhow!("API key has no data center suffix"))?;
        if audience_id.trim().is_empty() {
            bail!("audience id is empty");
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            audience_id: audience_id.to_string(),
            base_url: format!("https://{dc}.api.mailchimp.com/3.0"),
        })
    }

    pub fn from_settings(settings: &MailingListSettings) -> Result<Self> {
        match (&settings.api_key, &settings.audience_id) {
            (Some(key), Some(audience)) => Self::new(key, audience),
            _ => bail!("MAILCHIMP_API_KEY and MAILCHIMP_AUDIENCE_ID are required"),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn member_url(&self, email: &str) -> String {
        format!(
            "{}/lists/{}/members/{}",
            self.base_url.trim_end_matches('/'),
            self.audience_id,
            subscriber_hash(email)
        )
    }
}

#[async_trait]
impl MailingList for MailchimpClient {
    async fn upsert(&self, contact: &Contact) -> Result<()> {
        let email = normalize_email(&contact.email);
        let member_url = self.member_url(&email);

        self.http
            .put(&member_url)
            .basic_auth("any", Some(&self.api_key))
            .json(&json!({
                "email_address": email,
                "status_if_new": "subscribed",
                "status": "subscribed",
                "merge_fields": {
                    "FNAME": contact.first_name,
                    "ROLE": contact.role,
                },
            }))
            .send()
            .await
            .context("member upsert request failed")?
            .error_for_status()
            .context("member upsert rejected")?;

        if let Some(tag) = contact.tag.as_deref().filter(|tag| !tag.is_empty()) {
            self.http
                .post(format!("{member_url}/tags"))
                .basic_auth("any", Some(&self.api_key))
                .json(&json!({ "tags": [{ "name": tag, "status": "active" }] }))
                .send()
                .await
                .context("member tag request failed")?
                .error_for_status()
                .context("member tag rejected")?;
        }

        info!("Mailing list contact upserted");
        Ok(())
    }
}

/// Data center suffix of a `key-dc` API key.
pub fn data_center(api_key: &str) -> Option<&str> {
    let mut parts = api_key.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(dc), None) if !key.is_empty() && !dc.is_empty() => Some(dc),
        _ => None,
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lowercase hex MD5 of the normalized address, as the member id.
pub fn subscriber_hash(email: &str) -> String {
    hex::encode(Md5::digest(normalize_email(email).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_center_suffix() {
        assert_eq!(data_center("abc123-us21"), Some("us21"));
        assert_eq!(data_center("abc123"), None);
        assert_eq!(data_center("a-b-c"), None);
        assert_eq!(data_center("abc-"), None);
        assert_eq!(data_center(""), None);
    }

    #[test]
    fn subscriber_hash_ignores_case_and_whitespace() {
        let hash = subscriber_hash(" Ada@Example.COM ");
        assert_eq!(hash, subscriber_hash("ada@example.com"));
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn member_url_uses_audience_and_hash() {
        let client = MailchimpClient::new("key-us5", "aud1").unwrap();
        let url = client.member_url("ada@example.com");
        assert!(url.starts_with("https://us5.api.mailchimp.com/3.0/lists/aud1/members/"));
        assert!(url.ends_with(&subscriber_hash("ada@example.com")));
    }

    #[test]
    fn settings_without_credentials_are_rejected() {
        let settings = MailingListSettings::default();
        assert!(MailchimpClient::from_settings(&settings).is_err());
        assert!(MailchimpClient::new("nodc", "aud").is_err());
        assert!(MailchimpClient::new("key-us1", " ").is_err());
    }

    #[tokio::test]
    async fn unconfigured_list_always_fails() {
        let contact = Contact {
            email: "a@b.c".into(),
            first_name: "A".into(),
            role: String::new(),
            tag: None,
        };
        assert!(UnconfiguredMailingList.upsert(&contact).await.is_err());
    }
}
