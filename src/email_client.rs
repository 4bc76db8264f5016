use crate::configuration::EmailClientSettings;
use crate::error::EmailError;
use crate::validators::is_valid_email;
use serde::Serialize;

#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: SenderEmail,
}

#[derive(Clone, Debug)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(s: String) -> Result<Self, EmailError> {
        let email = is_valid_email(&s).map_err(|e| EmailError::InvalidRecipient(e.to_string()))?;
        Ok(Self(email))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}

impl EmailClient {
    pub fn new(base_url: String, sender: SenderEmail, timeout: std::time::Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            base_url,
            sender,
        }
    }

    pub fn from_settings(settings: &EmailClientSettings) -> Result<Self, EmailError> {
        let sender = SenderEmail::parse(settings.sender_email.clone())?;
        Ok(Self::new(settings.base_url.clone(), sender, settings.timeout()))
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), EmailError> {
        let url = format!("{}/email", self.base_url.trim_end_matches('/'));
        let request = SendEmailRequest {
            from: self.sender.inner(),
            to: recipient,
            subject,
            html_body: html_content,
            text_body: text_content,
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {}", e);
                EmailError::SendFailed(e.to_string())
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Email service returned error: {}", e);
                EmailError::SendFailed(e.to_string())
            })?;

        Ok(())
    }

    /// Mail the account activation link to a freshly registered user
    pub async fn send_verification_email(
        &self,
        recipient: &str,
        username: &str,
        activation_link: &str,
    ) -> Result<(), EmailError> {
        let html = format!(
            "<p>Hello {username},</p>\
             <p>Follow <a href=\"{link}\">this link</a> to activate your account.</p>",
            username = username,
            link = activation_link
        );
        let text = format!(
            "Hello {},\nVisit {} to activate your account.",
            username, activation_link
        );

        self.send_email(recipient, "Activate your account", &html, &text)
            .await
    }
}
