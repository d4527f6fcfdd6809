//! Page-level routes shared by the server and the client.
//!
//! Pages are linked by a `sessionId` query parameter carried across every
//! navigation.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Session id used when a page is opened without one.
pub const FALLBACK_SESSION_ID: &str = "test";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Page {
    Register,
    Record,
    Results,
}

impl Page {
    pub fn path(&self) -> &'static str {
        match self {
            Page::Register => "/",
            Page::Record => "/record.html",
            Page::Results => "/results.html",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub page: Page,
    pub session_id: Option<String>,
}

impl Navigation {
    pub fn register() -> Self {
        Self {
            page: Page::Register,
            session_id: None,
        }
    }

    pub fn record(session_id: impl Into<String>) -> Self {
        Self {
            page: Page::Record,
            session_id: Some(session_id.into()),
        }
    }

    pub fn results(session_id: impl Into<String>) -> Self {
        Self {
            page: Page::Results,
            session_id: Some(session_id.into()),
        }
    }

    pub fn href(&self) -> String {
        match &self.session_id {
            Some(session_id) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("sessionId", session_id)
                    .finish();
                format!("{}?{query}", self.page.path())
            }
            None => self.page.path().to_string(),
        }
    }
}

/// Reads `sessionId` from a query string, falling back to `test`.
pub fn session_id_from_query(query: &str) -> String {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, value)| key == "sessionId" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| FALLBACK_SESSION_ID.to_string())
}
