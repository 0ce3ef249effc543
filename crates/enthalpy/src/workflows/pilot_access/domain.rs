use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw form payload after shape validation: every field is present as a
/// string, nothing has been trimmed or checked yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotSubmission {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    /// Hidden `website` input that only automated submitters fill in.
    #[serde(default, rename = "website", deserialize_with = "lenient_string")]
    pub honeypot: String,
}

/// Body could not be read as a form payload.
#[derive(Debug, thiserror::Error)]
pub enum MalformedSubmission {
    #[error("request body is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("request body must be a JSON object")]
    NotAnObject,
}

/// Business-rule rejections, reported in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Company is required")]
    CompanyRequired,
    #[error("Email is required")]
    EmailRequired,
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Message is required")]
    MessageRequired,
}

/// Result of screening a submission before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screening {
    /// Honeypot was filled in; the submission is dropped without feedback.
    Spam,
    Accepted(PilotRequest),
}

/// Validated pilot-access request. Exists for a single request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PilotRequest {
    pub name: Option<String>,
    pub company: String,
    pub email: EmailAddress,
    pub message: String,
}

/// Address with the `local@domain.tld` shape the form requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmailRequired);
        }
        if !email_shape().is_match(trimmed) {
            return Err(ValidationError::InvalidEmail);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn email_shape() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"))
}

impl PilotSubmission {
    /// Parse a raw request body. `null` is read as an empty form so the
    /// caller gets the usual field-level rejection.
    pub fn from_json(raw: &[u8]) -> Result<Self, MalformedSubmission> {
        let value: Value = serde_json::from_slice(raw).map_err(MalformedSubmission::Json)?;
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => {
                serde_json::from_value(value).map_err(MalformedSubmission::Json)
            }
            _ => Err(MalformedSubmission::NotAnObject),
        }
    }

    pub fn is_spam(&self) -> bool {
        !self.honeypot.trim().is_empty()
    }

    /// Apply the honeypot check, then the field rules in fixed order:
    /// company, email presence, email shape, message.
    pub fn screen(&self) -> Result<Screening, ValidationError> {
        if self.is_spam() {
            return Ok(Screening::Spam);
        }

        let company = self.company.trim();
        if company.is_empty() {
            return Err(ValidationError::CompanyRequired);
        }

        let email = EmailAddress::parse(&self.email)?;

        let message = self.message.trim();
        if message.is_empty() {
            return Err(ValidationError::MessageRequired);
        }

        let name = Some(self.name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        Ok(Screening::Accepted(PilotRequest {
            name,
            company: company.to_string(),
            email,
            message: message.to_string(),
        }))
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(value) => Ok(value),
        Value::Bool(value) => Ok(value.to_string()),
        Value::Number(value) => Ok(value.to_string()),
        Value::Array(_) | Value::Object(_) => Err(de::Error::custom(
            "form fields must be strings, numbers, or booleans",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_matches_form_rule() {
        for valid in ["jane@acme.com", "a@b.c", "first.last+tag@sub.example.org"] {
            assert!(EmailAddress::parse(valid).is_ok(), "{valid} should pass");
        }
        assert_eq!(
            EmailAddress::parse("no-at-sign"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(EmailAddress::parse("a@b"), Err(ValidationError::InvalidEmail));
        assert_eq!(
            EmailAddress::parse("jane doe@acme.com"),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(EmailAddress::parse(""), Err(ValidationError::EmailRequired));
        assert_eq!(EmailAddress::parse("  \t"), Err(ValidationError::EmailRequired));
    }

    #[test]
    fn scalar_fields_are_coerced_to_strings() {
        let submission =
            PilotSubmission::from_json(br#"{"company": 42, "email": null, "message": true}"#)
                .expect("scalars coerce");
        assert_eq!(submission.company, "42");
        assert_eq!(submission.email, "");
        assert_eq!(submission.message, "true");
    }

    #[test]
    fn nested_values_and_non_objects_are_malformed() {
        assert!(matches!(
            PilotSubmission::from_json(br#"{"company": ["Acme"]}"#),
            Err(MalformedSubmission::Json(_))
        ));
        assert!(matches!(
            PilotSubmission::from_json(br#"["Acme"]"#),
            Err(MalformedSubmission::NotAnObject)
        ));
        assert!(matches!(
            PilotSubmission::from_json(b"company=Acme"),
            Err(MalformedSubmission::Json(_))
        ));
    }

    #[test]
    fn null_body_reads_as_empty_form() {
        let submission = PilotSubmission::from_json(b"null").expect("null is accepted");
        assert_eq!(submission.screen(), Err(ValidationError::CompanyRequired));
    }

    #[test]
    fn blank_name_becomes_none() {
        let submission = PilotSubmission {
            name: "   ".to_string(),
            company: "Acme".to_string(),
            email: "jane@acme.com".to_string(),
            message: "test".to_string(),
            honeypot: String::new(),
        };
        match submission.screen() {
            Ok(Screening::Accepted(request)) => assert!(request.name.is_none()),
            other => panic!("expected accepted request, got {other:?}"),
        }
    }
}
