use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub role: String,
}

impl RegistrationRequest {
    /// First word of the name, used as the mailing-list first name.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_name_is_first_word() {
        let req = RegistrationRequest {
            name: "  Ada   Lovelace ".into(),
            ..Default::default()
        };
        assert_eq!(req.first_name(), "Ada");
        assert_eq!(RegistrationRequest::default().first_name(), "");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let req: RegistrationRequest = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        assert_eq!(req.email, "a@b.c");
        assert!(req.name.is_empty());
        assert!(req.role.is_empty());
    }
}
