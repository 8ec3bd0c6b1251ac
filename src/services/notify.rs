// src/services/notify.rs

//! Email notification service.
//!
//! Delivers the "new availability" alert and the daily summary over SMTP
//! with implicit TLS, as a multipart message: a short plain-text body plus
//! an optional HTML table of the current listings.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpCredentials;
use crate::error::Result;
use crate::models::{EmailConfig, ResidenceRecord};

/// Delivers formatted messages to the configured recipients.
///
/// A delivery failure propagates as a fatal run failure; state is only
/// persisted after the dependent notification went out.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, body: &str, html_body: Option<&str>) -> Result<()>;
}

/// SMTP-backed notifier.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpNotifier {
    /// Build a notifier from the email configuration and credentials.
    ///
    /// Addresses are parsed here so a bad recipient fails at startup, not
    /// at send time.
    pub fn new(config: &EmailConfig, credentials: &SmtpCredentials) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                credentials.username.clone(),
                credentials.password.clone(),
            ))
            .build();

        let from = Mailbox::new(
            Some(config.sender_name.clone()),
            config.sender.trim().parse()?,
        );

        let recipients = config
            .unique_recipients()
            .into_iter()
            .map(|r| r.trim().parse::<Mailbox>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            transport,
            from,
            recipients,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str, html_body: Option<&str>) -> Result<()> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        let message = match html_body {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                body.to_string(),
                html.to_string(),
            ))?,
            None => builder.body(body.to_string())?,
        };

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Render the current batch as an HTML table.
///
/// Columns are the union of field names across all records, in first-seen
/// order; cells for absent fields are left empty.
pub fn render_html_table(records: &[ResidenceRecord]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for (name, _) in record.iter() {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
    }

    let mut html = String::from("<table border=\"1\">\n<tr>");
    for column in &columns {
        html.push_str(&format!("<th>{}</th>", escape_html(column)));
    }
    html.push_str("</tr>\n");

    for record in records {
        html.push_str("<tr>");
        for column in &columns {
            let value = record
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, value)| value)
                .unwrap_or("");
            html.push_str(&format!("<td>{}</td>", escape_html(value)));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</table>");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_union_of_columns() {
        let records = vec![
            ResidenceRecord::from_pairs([("titre", "Étoile"), ("ville", "Paris")]),
            ResidenceRecord::from_pairs([("titre", "Vercors"), ("prix", "540 €")]),
        ];

        let html = render_html_table(&records);

        assert!(html.contains("<th>titre</th><th>ville</th><th>prix</th>"));
        assert!(html.contains("<td>Étoile</td><td>Paris</td><td></td>"));
        assert!(html.contains("<td>Vercors</td><td></td><td>540 €</td>"));
    }

    #[test]
    fn test_render_table_escapes_html() {
        let records = vec![ResidenceRecord::from_pairs([("titre", "<b>&\"x\"</b>")])];
        let html = render_html_table(&records);
        assert!(html.contains("&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;"));
    }

    #[test]
    fn test_render_empty_batch() {
        let html = render_html_table(&[]);
        assert!(html.starts_with("<table"));
        assert!(html.ends_with("</table>"));
    }

    #[test]
    fn test_notifier_rejects_bad_sender() {
        let mut config = EmailConfig::default();
        config.sender = "not an address".into();
        config.recipients = vec!["someone@example.com".into()];

        let credentials = SmtpCredentials {
            username: "bot@example.com".into(),
            password: "secret".into(),
        };

        assert!(SmtpNotifier::new(&config, &credentials).is_err());
    }
}
