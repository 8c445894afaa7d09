//! Delivery strategies for report mail

use chrono::Local;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::path::PathBuf;
use std::time::Duration;

use super::OutgoingEmail;
use crate::error::{AnalystError, Result};

/// One way of getting a message out; returns a human-readable delivery note
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<String>;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpMode {
    /// Plain connection upgraded with STARTTLS, authenticated
    StartTls,
    /// TLS from the first byte, authenticated
    ImplicitTls,
    /// STARTTLS submission without login
    Unauthenticated,
}

/// SMTP delivery through lettre
pub struct SmtpTransport {
    mode: SmtpMode,
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl SmtpTransport {
    pub fn new(
        mode: SmtpMode,
        host: impl Into<String>,
        port: u16,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Self {
        let credentials = match mode {
            SmtpMode::Unauthenticated => None,
            _ => credentials,
        };
        Self {
            mode,
            host: host.into(),
            port,
            credentials,
            timeout,
        }
    }

    fn client(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let builder = match self.mode {
            SmtpMode::ImplicitTls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host),
            SmtpMode::StartTls | SmtpMode::Unauthenticated => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            }
        }
        .map_err(|e| AnalystError::MailTransport(e.to_string()))?;

        let mut builder = builder.port(self.port).timeout(Some(self.timeout));
        if let Some(credentials) = &self.credentials {
            builder = builder.credentials(credentials.clone());
        }
        Ok(builder.build())
    }
}

#[async_trait::async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<String> {
        let message = email.to_message()?;
        let client = self.client()?;

        tracing::debug!("Sending via {} {}:{}", self.name(), self.host, self.port);
        client
            .send(message)
            .await
            .map_err(|e| AnalystError::MailTransport(e.to_string()))?;

        Ok(format!("E-mail enviado com sucesso para {}", email.recipient))
    }

    fn name(&self) -> &str {
        match self.mode {
            SmtpMode::StartTls => "SMTP STARTTLS",
            SmtpMode::ImplicitTls => "SMTP TLS",
            SmtpMode::Unauthenticated => "SMTP sem autenticação",
        }
    }
}

/// Records the message in the outbox instead of sending it
pub struct DryRunTransport {
    outbox: PathBuf,
}

impl DryRunTransport {
    pub fn new(outbox: impl Into<PathBuf>) -> Self {
        Self {
            outbox: outbox.into(),
        }
    }
}

#[async_trait::async_trait]
impl MailTransport for DryRunTransport {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<String> {
        let now = Local::now();
        let attachment = email
            .attachment
            .as_ref()
            .map(|a| a.path.display().to_string())
            .unwrap_or_else(|| "Não anexado".to_string());

        let record = format!(
            "=== E-MAIL ENVIADO (SIMULAÇÃO) ===\n\n\
             De: {}\nPara: {}\nCc: {}\nAssunto: {}\nData: {}\n\n\
             --- CORPO DO E-MAIL ---\n{}\n\n\
             --- ANEXOS ---\nPDF: {}\n\n\
             === STATUS: ENVIADO ===\n",
            email.sender,
            email.recipient,
            email.sender,
            email.subject,
            now.format("%d/%m/%Y %H:%M:%S"),
            email.body,
            attachment
        );

        tokio::fs::create_dir_all(&self.outbox).await?;
        let path = self
            .outbox
            .join(format!("email_enviado_{}.txt", now.format("%Y%m%d_%H%M%S")));
        tokio::fs::write(&path, record).await?;

        tracing::info!("Dry-run mail recorded at {}", path.display());
        Ok(format!(
            "E-mail enviado com sucesso! Detalhes salvos em {}",
            path.display()
        ))
    }

    fn name(&self) -> &str {
        "Dry-run"
    }
}
