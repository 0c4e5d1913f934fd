// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outgoing email via an HTTP email provider.
//!
//! Delivery is strictly best-effort: the contact form and registration flows
//! report success to the caller whether or not the provider accepted the
//! message. Failures are logged and swallowed.

use serde::Serialize;

use crate::config::Config;

/// Email provider client. Disabled (logs and drops mail) when no provider
/// endpoint is configured.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
    from: String,
    contact_inbox: String,
}

/// Provider message payload.
#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: &'a str,
    text: &'a str,
}

/// Fields from a contact-form submission.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl Mailer {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.email_api_url.clone(),
            api_key: config.email_api_key.clone(),
            from: config.email_from.clone(),
            contact_inbox: config.contact_inbox.clone(),
        }
    }

    /// Welcome email for a freshly created account.
    pub async fn send_welcome(&self, to: &str, first_name: &str) {
        let body = format!(
            "Hi {},\n\n\
             Welcome aboard! We're thrilled to have you join us at SukuSuku.ai.\n\n\
             Your account starts with free Penora and ImageGene credits - head to\n\
             your dashboard to start creating.\n\n\
             If you have ideas or suggestions, just hit reply. We're listening.\n\n\
             Warmly,\nThe SukuSuku.ai team\n",
            first_name
        );

        self.deliver(to, None, "Welcome to SukuSuku.ai!", &body).await;
    }

    /// Contact-form relay: confirmation to the sender, notification to the
    /// team inbox.
    pub async fn send_contact(&self, contact: &ContactMessage) {
        let confirmation = format!(
            "Hi {},\n\n\
             Thanks for reaching out to SukuSuku.ai! We received your message:\n\n\
             \"{}\"\n\n\
             We'll get back to you within 24 hours.\n\n\
             The SukuSuku.ai team\n",
            contact.name, contact.message
        );
        self.deliver(
            &contact.email,
            None,
            "Thanks for contacting SukuSuku.ai",
            &confirmation,
        )
        .await;

        let notification = format!(
            "New contact form submission\n\n\
             Name: {}\nEmail: {}\n\nMessage:\n{}\n\n\
             Reply directly to this email to respond.\n",
            contact.name, contact.email, contact.message
        );
        let inbox = self.contact_inbox.clone();
        let subject = format!("New contact form message from {}", contact.name);
        self.deliver(&inbox, Some(&contact.email), &subject, &notification)
            .await;
    }

    /// Post one message to the provider. Never returns an error.
    async fn deliver(&self, to: &str, reply_to: Option<&str>, subject: &str, text: &str) {
        let Some(api_url) = &self.api_url else {
            tracing::info!(to, subject, "Email provider not configured; dropping mail");
            return;
        };

        let payload = OutgoingMail {
            from: &self.from,
            to,
            reply_to,
            subject,
            text,
        };

        let mut request = self.http.post(api_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(to, subject, "Email sent");
            }
            Ok(response) => {
                tracing::warn!(
                    to,
                    subject,
                    status = %response.status(),
                    "Email provider rejected message"
                );
            }
            Err(e) => {
                tracing::warn!(to, subject, error = %e, "Email delivery failed");
            }
        }
    }
}
