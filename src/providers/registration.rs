use std::sync::Arc;

use log::{error, info};
use uuid::Uuid;

use crate::models::{RegistrationRequest, RegistrationResponse};

use super::mailing_list::{Contact, MailingList};

/// Mints session ids and forwards the contact to the mailing list.
///
/// Mailing-list failures are logged and never affect the returned id.
pub struct RegistrationService {
    mailing_list: Arc<dyn MailingList>,
    tag: Option<String>,
}

impl RegistrationService {
    pub fn new(mailing_list: Arc<dyn MailingList>, tag: Option<String>) -> Self {
        Self { mailing_list, tag }
    }

    pub async fn register(&self, request: &RegistrationRequest) -> RegistrationResponse {
        let session_id = Uuid::new_v4().to_string();

        let contact = Contact {
            email: request.email.trim().to_lowercase(),
            first_name: request.first_name().to_string(),
            role: request.role.clone(),
            tag: self.tag.clone(),
        };

        if let Err(err) = self.mailing_list.upsert(&contact).await {
            error!("Mailing list error for session {session_id}: {err:#}");
        }

        info!("Registered session {session_id}");
        RegistrationResponse { session_id }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;
    use async_trait::async_trait;

    use super::*;
    use crate::providers::UnconfiguredMailingList;

    #[derive(Default)]
    struct CapturingList {
        contacts: Mutex<Vec<Contact>>,
    }

    #[async_trait]
    impl MailingList for CapturingList {
        async fn upsert(&self, contact: &Contact) -> anyhow::Result<()> {
            self.contacts.lock().unwrap().push(contact.clone());
            Err(anyhow!("list is down"))
        }
    }

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            name: "Ada Lovelace".into(),
            email: " Ada@Example.com".into(),
            role: "Founder".into(),
        }
    }

    #[tokio::test]
    async fn mailing_list_failure_still_returns_session() {
        let list = Arc::new(CapturingList::default());
        let service = RegistrationService::new(list.clone(), Some("GTK_Rehearsal".into()));

        let response = service.register(&request()).await;
        assert!(Uuid::parse_str(&response.session_id).is_ok());

        let contacts = list.contacts.lock().unwrap();
        assert_eq!(
            contacts.as_slice(),
            &[Contact {
                email: "ada@example.com".into(),
                first_name: "Ada".into(),
                role: "Founder".into(),
                tag: Some("GTK_Rehearsal".into()),
            }]
        );
    }

    #[tokio::test]
    async fn session_ids_are_unique() {
        let service = RegistrationService::new(Arc::new(UnconfiguredMailingList), None);
        let a = service.register(&request()).await;
        let b = service.register(&request()).await;
        assert_ne!(a.session_id, b.session_id);
    }
}
