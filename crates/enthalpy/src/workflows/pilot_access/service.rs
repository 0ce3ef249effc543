use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{
    MalformedSubmission, PilotRequest, PilotSubmission, Screening, ValidationError,
};
use super::mailer::{DeliveryReceipt, Mailer, MailerError, OutboundEmail};
use super::templates::{confirmation_email, notification_email, MailRouting};
use crate::config::MailConfig;

/// Longest provider detail passed back to callers.
pub const MAX_ERROR_DETAIL_CHARS: usize = 500;

/// Bounded retry for the operator notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub send_confirmation: bool,
    pub notification_retry: RetryPolicy,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            send_confirmation: true,
            notification_retry: RetryPolicy::default(),
        }
    }
}

impl DeliveryPolicy {
    pub fn from_config(config: &MailConfig) -> Self {
        Self {
            send_confirmation: config.send_confirmation,
            notification_retry: RetryPolicy {
                max_attempts: config.notify_max_attempts.max(1),
                base_backoff_ms: config.notify_backoff_ms,
            },
        }
    }
}

/// What happened to the requester acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Sent(DeliveryReceipt),
    Skipped,
    Failed(MailerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub notification: DeliveryReceipt,
    pub notification_attempts: usize,
    pub confirmation: ConfirmationOutcome,
}

impl DeliveryReport {
    /// Notification result decides the request; the confirmation result is
    /// only carried along.
    fn merge(
        notification: Result<DeliveryReceipt, MailerError>,
        notification_attempts: usize,
        confirmation: impl FnOnce() -> ConfirmationOutcome,
    ) -> Result<Self, DeliveryFailure> {
        match notification {
            Ok(receipt) => Ok(Self {
                notification: receipt,
                notification_attempts,
                confirmation: confirmation(),
            }),
            Err(source) => Err(DeliveryFailure::new(source, notification_attempts)),
        }
    }
}

/// Both spam and accepted submissions look identical to the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PilotOutcome {
    Discarded,
    Accepted(DeliveryReport),
}

/// Operator notification could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification email failed after {attempts} attempt(s): {source}")]
pub struct DeliveryFailure {
    #[source]
    pub source: MailerError,
    pub attempts: usize,
}

impl DeliveryFailure {
    fn new(source: MailerError, attempts: usize) -> Self {
        Self { source, attempts }
    }

    /// Provider detail cut to [`MAX_ERROR_DETAIL_CHARS`] characters.
    pub fn public_detail(&self) -> String {
        truncate_chars(&self.source.detail(), MAX_ERROR_DETAIL_CHARS)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PilotAccessError {
    #[error("Bad request")]
    Malformed(#[from] MalformedSubmission),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Server not configured")]
    NotConfigured,
    #[error("Email sending failed")]
    Delivery(#[from] DeliveryFailure),
}

struct MailDelivery<M> {
    mailer: Arc<M>,
    routing: MailRouting,
}

/// Pilot-access intake: screening, validation, and the two-step email
/// dispatch. Built once per process and shared across requests.
pub struct PilotAccessService<M> {
    delivery: Option<MailDelivery<M>>,
    policy: DeliveryPolicy,
}

impl<M> PilotAccessService<M>
where
    M: Mailer + 'static,
{
    pub fn new(mailer: Arc<M>, routing: MailRouting, policy: DeliveryPolicy) -> Self {
        Self {
            delivery: Some(MailDelivery { mailer, routing }),
            policy,
        }
    }

    /// A service that accepts and validates submissions but reports every
    /// deliverable one as a configuration fault.
    pub fn unconfigured(policy: DeliveryPolicy) -> Self {
        Self {
            delivery: None,
            policy,
        }
    }

    /// Wire the service from loaded configuration. Falls back to
    /// [`Self::unconfigured`] when the mailer or either address is missing.
    pub fn from_config(mailer: Option<Arc<M>>, config: &MailConfig) -> Self {
        let policy = DeliveryPolicy::from_config(config);
        let routing = match (&config.sender_address, &config.operator_address) {
            (Some(sender), Some(operator)) => Some(MailRouting {
                sender: sender.clone(),
                operator: operator.clone(),
            }),
            _ => None,
        };

        match (mailer, routing) {
            (Some(mailer), Some(routing)) => Self::new(mailer, routing, policy),
            _ => Self::unconfigured(policy),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.delivery.is_some()
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Handle a raw request body end to end.
    pub async fn submit_json(&self, raw: &[u8]) -> Result<PilotOutcome, PilotAccessError> {
        let submission = PilotSubmission::from_json(raw)?;
        self.submit(submission).await
    }

    pub async fn submit(
        &self,
        submission: PilotSubmission,
    ) -> Result<PilotOutcome, PilotAccessError> {
        let request = match submission.screen()? {
            Screening::Spam => {
                info!("discarded pilot access submission with filled honeypot");
                return Ok(PilotOutcome::Discarded);
            }
            Screening::Accepted(request) => request,
        };

        let Some(delivery) = self.delivery.as_ref() else {
            warn!("pilot access request rejected: mail delivery is not configured");
            return Err(PilotAccessError::NotConfigured);
        };

        let report = self.deliver(delivery, &request).await?;
        info!(
            company = %request.company,
            notification_id = report.notification.message_id.as_deref().unwrap_or("-"),
            attempts = report.notification_attempts,
            "pilot access request delivered"
        );
        Ok(PilotOutcome::Accepted(report))
    }

    async fn deliver(
        &self,
        delivery: &MailDelivery<M>,
        request: &PilotRequest,
    ) -> Result<DeliveryReport, DeliveryFailure> {
        let notification = notification_email(request, &delivery.routing, Utc::now());
        let (result, attempts) = self.notify(delivery.mailer.as_ref(), &notification).await;

        if let Err(err) = &result {
            error!(
                company = %request.company,
                attempts,
                error = %err,
                "pilot access notification failed"
            );
        }

        let confirmation = if self.policy.send_confirmation && result.is_ok() {
            let email = confirmation_email(request, &delivery.routing);
            match delivery.mailer.send(&email).await {
                Ok(receipt) => ConfirmationOutcome::Sent(receipt),
                Err(err) => {
                    warn!(
                        company = %request.company,
                        error = %err,
                        "pilot access confirmation failed; request still accepted"
                    );
                    ConfirmationOutcome::Failed(err)
                }
            }
        } else {
            ConfirmationOutcome::Skipped
        };

        DeliveryReport::merge(result, attempts, || confirmation)
    }

    async fn notify(
        &self,
        mailer: &M,
        email: &OutboundEmail,
    ) -> (Result<DeliveryReceipt, MailerError>, usize) {
        let retry = self.policy.notification_retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match mailer.send(email).await {
                Ok(receipt) => return (Ok(receipt), attempt),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    warn!(attempt, error = %err, "retrying pilot access notification");
                    let backoff = retry.base_backoff_ms.saturating_mul(attempt as u64);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
                Err(err) => return (Err(err), attempt),
            }
        }
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => value[..cut].to_string(),
        None => value.to_string(),
    }
}
