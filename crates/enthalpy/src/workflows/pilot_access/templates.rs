use chrono::{DateTime, Utc};

use super::domain::PilotRequest;
use super::mailer::OutboundEmail;

pub const BRAND_NAME: &str = "Enthalpy";
const NAME_PLACEHOLDER: &str = "(not provided)";

/// Sender and operator addresses used for every pilot-access message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailRouting {
    pub sender: String,
    pub operator: String,
}

/// Message for the site operator. Replies go straight to the requester.
pub fn notification_email(
    request: &PilotRequest,
    routing: &MailRouting,
    received_at: DateTime<Utc>,
) -> OutboundEmail {
    let name = request.name.as_deref();
    let received = received_at.format("%Y-%m-%d %H:%M UTC").to_string();

    let text = format!(
        "New pilot access request\n\n\
         Name: {name}\n\
         Company: {company}\n\
         Email: {email}\n\
         Received: {received}\n\n\
         Message:\n{message}\n",
        name = name.unwrap_or(NAME_PLACEHOLDER),
        company = request.company,
        email = request.email,
        message = request.message,
    );

    let html = format!(
        "<div style=\"font-family:Arial,sans-serif;line-height:1.5\">\
         <h2>New pilot access request</h2>\
         <p><b>Name:</b> {name}</p>\
         <p><b>Company:</b> {company}</p>\
         <p><b>Email:</b> {email}</p>\
         <p><b>Message:</b><br/>{message}</p>\
         <hr/><p style=\"color:#64748b;font-size:12px\">Received {received}</p></div>",
        name = escape_html(name.unwrap_or("-")),
        company = escape_html(&request.company),
        email = escape_html(request.email.as_str()),
        message = escape_html(&request.message).replace('\n', "<br/>"),
    );

    OutboundEmail {
        from: routing.sender.clone(),
        to: vec![routing.operator.clone()],
        reply_to: Some(request.email.to_string()),
        subject: format!("Pilot access request — {}", request.company),
        text,
        html,
    }
}

/// Short acknowledgment for the requester.
pub fn confirmation_email(request: &PilotRequest, routing: &MailRouting) -> OutboundEmail {
    let greeting = match request.name.as_deref() {
        Some(name) => format!("Hello {name},"),
        None => "Hello,".to_string(),
    };

    let text = format!(
        "{greeting}\n\n\
         Thanks, we received your pilot access request for {company}.\n\
         We'll get back to you shortly.\n\n\
         {BRAND_NAME} — Cold & Critical Monitoring\n",
        company = request.company,
    );

    let html = format!(
        "<div style=\"font-family:Arial,sans-serif;line-height:1.5\">\
         <p>{greeting}</p>\
         <p>Thanks, we received your pilot access request for <b>{company}</b>.</p>\
         <p>We'll get back to you shortly.</p>\
         <p style=\"color:#64748b;font-size:12px;margin-top:14px\">{BRAND_NAME} — Cold &amp; Critical Monitoring</p>\
         </div>",
        greeting = escape_html(&greeting),
        company = escape_html(&request.company),
    );

    OutboundEmail {
        from: routing.sender.clone(),
        to: vec![request.email.to_string()],
        reply_to: None,
        subject: format!("{BRAND_NAME} — Request received"),
        text,
        html,
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::pilot_access::domain::EmailAddress;
    use chrono::TimeZone;

    fn routing() -> MailRouting {
        MailRouting {
            sender: "Enthalpy <no-reply@enthalpy.site>".to_string(),
            operator: "contact@enthalpy.site".to_string(),
        }
    }

    fn request(name: Option<&str>, message: &str) -> PilotRequest {
        PilotRequest {
            name: name.map(str::to_string),
            company: "Acme <Cold> & Co".to_string(),
            email: EmailAddress::parse("jane@acme.com").expect("valid email"),
            message: message.to_string(),
        }
    }

    #[test]
    fn notification_targets_operator_with_reply_to_requester() {
        let received = Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap();
        let email = notification_email(&request(Some("Jane"), "hi"), &routing(), received);

        assert_eq!(email.to, vec!["contact@enthalpy.site"]);
        assert_eq!(email.reply_to.as_deref(), Some("jane@acme.com"));
        assert_eq!(email.subject, "Pilot access request — Acme <Cold> & Co");
        assert!(email.text.contains("Name: Jane"));
        assert!(email.text.contains("Received: 2025-03-04 09:30 UTC"));
    }

    #[test]
    fn notification_text_lists_fields_then_message() {
        let received = Utc.with_ymd_and_hms(2025, 3, 4, 9, 30, 0).unwrap();
        let email = notification_email(&request(Some("Jane"), "Two cold rooms"), &routing(), received);

        assert_eq!(
            email.text,
            "New pilot access request\n\n\
             Name: Jane\n\
             Company: Acme <Cold> & Co\n\
             Email: jane@acme.com\n\
             Received: 2025-03-04 09:30 UTC\n\n\
             Message:\nTwo cold rooms\n"
        );
        assert!(email
            .html
            .starts_with("<div style=\"font-family:Arial,sans-serif;line-height:1.5\"><h2>"));
        assert!(email
            .html
            .ends_with("Received 2025-03-04 09:30 UTC</p></div>"));
    }

    #[test]
    fn notification_uses_placeholder_for_missing_name() {
        let email = notification_email(&request(None, "hi"), &routing(), Utc::now());
        assert!(email.text.contains("Name: (not provided)"));
        assert!(email.html.contains("<b>Name:</b> -"));
    }

    #[test]
    fn html_bodies_escape_user_input() {
        let email = notification_email(
            &request(Some("<script>"), "line one\nline 'two'"),
            &routing(),
            Utc::now(),
        );
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(email.html.contains("Acme &lt;Cold&gt; &amp; Co"));
        assert!(email.html.contains("line one<br/>line &#039;two&#039;"));
        assert!(!email.html.contains("<script>"));

        let confirmation = confirmation_email(&request(Some("\"Jane\""), "hi"), &routing());
        assert!(confirmation.html.contains("Hello &quot;Jane&quot;,"));
    }

    #[test]
    fn confirmation_targets_requester() {
        let email = confirmation_email(&request(None, "hi"), &routing());
        assert_eq!(email.to, vec!["jane@acme.com"]);
        assert_eq!(email.from, "Enthalpy <no-reply@enthalpy.site>");
        assert!(email.reply_to.is_none());
        assert_eq!(email.subject, "Enthalpy — Request received");
        assert!(email.text.starts_with("Hello,\n"));
        assert!(email.text.contains("Acme <Cold> & Co"));
    }
}
