use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::workflows::pilot_access::mailer::{DeliveryReceipt, Mailer, MailerError, OutboundEmail};
use crate::workflows::pilot_access::service::{DeliveryPolicy, PilotAccessService, RetryPolicy};
use crate::workflows::pilot_access::templates::MailRouting;
use crate::workflows::pilot_access::PilotSubmission;

pub(super) const OPERATOR: &str = "ops@enthalpy.site";
pub(super) const SENDER: &str = "Enthalpy <no-reply@enthalpy.site>";

/// Records every message and replays scripted results in order; once the
/// script runs out every send succeeds.
#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    script: Mutex<VecDeque<Result<DeliveryReceipt, MailerError>>>,
}

impl RecordingMailer {
    pub(super) fn scripted(
        results: impl IntoIterator<Item = Result<DeliveryReceipt, MailerError>>,
    ) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            script: Mutex::new(results.into_iter().collect()),
        }
    }

    pub(super) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt, MailerError> {
        self.sent
            .lock()
            .expect("sent mutex poisoned")
            .push(email.clone());
        let scripted = self.script.lock().expect("script mutex poisoned").pop_front();
        scripted.unwrap_or_else(|| {
            Ok(DeliveryReceipt {
                message_id: Some("msg-default".to_string()),
            })
        })
    }
}

pub(super) fn receipt(id: &str) -> Result<DeliveryReceipt, MailerError> {
    Ok(DeliveryReceipt {
        message_id: Some(id.to_string()),
    })
}

pub(super) fn routing() -> MailRouting {
    MailRouting {
        sender: SENDER.to_string(),
        operator: OPERATOR.to_string(),
    }
}

pub(super) fn fast_retry(max_attempts: usize) -> DeliveryPolicy {
    DeliveryPolicy {
        send_confirmation: true,
        notification_retry: RetryPolicy {
            max_attempts,
            base_backoff_ms: 1,
        },
    }
}

pub(super) fn service_with(
    mailer: Arc<RecordingMailer>,
    policy: DeliveryPolicy,
) -> PilotAccessService<RecordingMailer> {
    PilotAccessService::new(mailer, routing(), policy)
}

pub(super) fn valid_submission() -> PilotSubmission {
    PilotSubmission {
        name: "Jane".to_string(),
        company: "Acme".to_string(),
        email: "jane@acme.com".to_string(),
        message: "test".to_string(),
        honeypot: String::new(),
    }
}
