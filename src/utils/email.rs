use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, instrument};

use crate::config::email::EmailConfig;
use crate::utils::errors::AppError;

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Notify a user that they have been invited into a school with a role.
    ///
    /// Membership invitations are best-effort: callers log failures and
    /// never fail the originating request over them.
    #[instrument(skip(self))]
    pub async fn send_membership_invitation(
        &self,
        to_email: &str,
        to_name: &str,
        school_name: &str,
        role_name: &str,
    ) -> Result<(), AppError> {
        let accept_link = format!("{}/invitations", self.config.frontend_url);

        let text_body = format!(
            "Hi {},\n\n\
             You have been invited to join {} as {}.\n\n\
             Sign in and accept the invitation to activate your access:\n\
             {}\n\n\
             If you weren't expecting this invitation, you can ignore this email.\n\n\
             {} Team",
            to_name, school_name, role_name, accept_link, self.config.from_name
        );
        let html_body = format!(
            "<p>Hi {},</p>\
             <p>You have been invited to join <strong>{}</strong> as <strong>{}</strong>.</p>\
             <p><a href=\"{}\">Sign in and accept the invitation</a> to activate your access.</p>\
             <p>If you weren't expecting this invitation, you can ignore this email.</p>\
             <p>{} Team</p>",
            to_name, school_name, role_name, accept_link, self.config.from_name
        );

        self.send_email(
            to_email,
            &format!("Invitation to join {}", school_name),
            &text_body,
            &html_body,
        )
        .await
    }

    #[instrument(skip(self, text_body, html_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        if !self.config.enabled {
            info!(to = %to_email, subject = %subject, "Email sending disabled, skipping");
            return Ok(());
        }

        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let message = Message::builder()
            .from(from.parse().map_err(|e| {
                AppError::internal(anyhow::anyhow!("Invalid from address: {}", e))
            })?)
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal(anyhow::anyhow!("Invalid to address: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| AppError::internal(anyhow::anyhow!("SMTP relay error: {}", e)))?
                .port(self.config.smtp_port)
                .credentials(Credentials::new(
                    self.config.smtp_username.clone(),
                    self.config.smtp_password.clone(),
                ))
                .build()
        };

        mailer
            .send(&message)
            .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to send email: {}", e)))?;

        info!(to = %to_email, subject = %subject, "Email sent");
        Ok(())
    }
}
