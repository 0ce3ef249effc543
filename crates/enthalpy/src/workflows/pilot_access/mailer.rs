use async_trait::async_trait;
use serde::Serialize;

/// One transactional message ready for the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Provider acknowledgment for an accepted message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Outbound email transport so the intake pipeline can run against fakes.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt, MailerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailerError {
    #[error("email provider timed out")]
    Timeout,
    #[error("email provider rejected the message with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("email provider unreachable: {0}")]
    Transport(String),
}

impl MailerError {
    /// Failures worth another attempt: timeouts, connection problems,
    /// throttling and provider-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            MailerError::Timeout | MailerError::Transport(_) => true,
            MailerError::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }

    /// Provider-facing detail suitable for diagnostics.
    pub fn detail(&self) -> String {
        match self {
            MailerError::Rejected { detail, .. } if !detail.trim().is_empty() => detail.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(MailerError::Timeout.is_transient());
        assert!(MailerError::Transport("reset".into()).is_transient());
        assert!(MailerError::Rejected {
            status: 429,
            detail: String::new()
        }
        .is_transient());
        assert!(MailerError::Rejected {
            status: 503,
            detail: String::new()
        }
        .is_transient());
        assert!(!MailerError::Rejected {
            status: 422,
            detail: "invalid from".into()
        }
        .is_transient());
    }

    #[test]
    fn detail_prefers_provider_text() {
        let rejected = MailerError::Rejected {
            status: 403,
            detail: r#"{"message":"domain not verified"}"#.into(),
        };
        assert_eq!(rejected.detail(), r#"{"message":"domain not verified"}"#);

        let empty = MailerError::Rejected {
            status: 500,
            detail: " ".into(),
        };
        assert!(empty.detail().contains("status 500"));
        assert_eq!(MailerError::Timeout.detail(), "email provider timed out");
    }
}
