//! Pilot-access intake for the marketing site's contact form.
//!
//! A submission is parsed into a [`PilotSubmission`], screened against the
//! honeypot and field rules, and then relayed as two transactional emails:
//! a required notification to the operator and a best-effort confirmation
//! to the requester.

pub mod domain;
pub mod mailer;
pub mod resend;
pub mod router;
pub mod service;
pub mod templates;

#[cfg(test)]
mod tests;

pub use domain::{
    EmailAddress, MalformedSubmission, PilotRequest, PilotSubmission, Screening, ValidationError,
};
pub use mailer::{DeliveryReceipt, Mailer, MailerError, OutboundEmail};
pub use resend::{ResendMailer, ResendSettings};
pub use router::{pilot_access_router, PILOT_ACCESS_PATH};
pub use service::{
    ConfirmationOutcome, DeliveryFailure, DeliveryPolicy, DeliveryReport, PilotAccessError,
    PilotAccessService, PilotOutcome, RetryPolicy, MAX_ERROR_DETAIL_CHARS,
};
pub use templates::{confirmation_email, notification_email, MailRouting};
