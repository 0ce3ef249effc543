use chrono::Utc;
use clap::Args;
use enthalpy::error::AppError;
use enthalpy::workflows::pilot_access::{
    confirmation_email, notification_email, MailRouting, OutboundEmail, PilotSubmission,
    Screening,
};

const PREVIEW_SENDER: &str = "Enthalpy <no-reply@enthalpy.site>";
const PREVIEW_OPERATOR: &str = "contact@enthalpy.site";

#[derive(Args, Debug)]
pub(crate) struct PreviewArgs {
    /// Requester display name
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// Company requesting pilot access
    #[arg(long)]
    pub(crate) company: String,
    /// Requester email address
    #[arg(long)]
    pub(crate) email: String,
    /// Free-text message
    #[arg(long)]
    pub(crate) message: String,
    /// Sender address to show (defaults to PILOT_FROM_EMAIL, then a placeholder)
    #[arg(long, env = "PILOT_FROM_EMAIL")]
    pub(crate) from: Option<String>,
    /// Operator address to show (defaults to PILOT_TO_EMAIL, then a placeholder)
    #[arg(long, env = "PILOT_TO_EMAIL")]
    pub(crate) to: Option<String>,
}

/// Print the notification and confirmation for a sample request. Nothing is
/// sent; validation failures are printed the way the endpoint reports them.
pub(crate) fn run_preview(args: PreviewArgs) -> Result<(), AppError> {
    let routing = MailRouting {
        sender: args.from.clone().unwrap_or_else(|| PREVIEW_SENDER.to_string()),
        operator: args.to.clone().unwrap_or_else(|| PREVIEW_OPERATOR.to_string()),
    };
    let submission = PilotSubmission {
        name: args.name.unwrap_or_default(),
        company: args.company,
        email: args.email,
        message: args.message,
        honeypot: String::new(),
    };

    match render_preview(&submission, &routing) {
        Ok(emails) => {
            for (label, email) in emails {
                println!("{}", format_email(label, &email));
            }
        }
        Err(reason) => println!("Request rejected: {reason}"),
    }
    Ok(())
}

fn render_preview(
    submission: &PilotSubmission,
    routing: &MailRouting,
) -> Result<Vec<(&'static str, OutboundEmail)>, String> {
    match submission.screen() {
        Ok(Screening::Accepted(request)) => Ok(vec![
            (
                "Notification",
                notification_email(&request, routing, Utc::now()),
            ),
            ("Confirmation", confirmation_email(&request, routing)),
        ]),
        Ok(Screening::Spam) => Err("honeypot filled".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

fn format_email(label: &str, email: &OutboundEmail) -> String {
    let mut out = format!("== {label} ==\n");
    out.push_str(&format!("From: {}\n", email.from));
    out.push_str(&format!("To: {}\n", email.to.join(", ")));
    if let Some(reply_to) = &email.reply_to {
        out.push_str(&format!("Reply-To: {reply_to}\n"));
    }
    out.push_str(&format!("Subject: {}\n\n{}", email.subject, email.text));
    out
}
