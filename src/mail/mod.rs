//! Report mail dispatch
//!
//! Builds the report message and walks an ordered list of [`MailTransport`]
//! strategies until one delivers. When none does, the message is written to
//! the outbox as a backup and the caller gets `sent: false`.

mod transport;

pub use transport::*;

use chrono::{DateTime, Local};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::Message;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{resolve_secret, Config, MailConfig};
use crate::error::{AnalystError, Result};

/// Characters of the summary quoted in the message body
const SUMMARY_EXCERPT_CHARS: usize = 500;

const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP submission endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmtpServer {
    pub host: &'static str,
    pub port: u16,
}

pub const DEFAULT_SMTP_SERVER: SmtpServer = SmtpServer {
    host: "smtp.office365.com",
    port: 587,
};

const SMTP_SERVERS: &[(&str, SmtpServer)] = &[
    ("gmail.com", SmtpServer { host: "smtp.gmail.com", port: 587 }),
    ("outlook.com", SmtpServer { host: "smtp-mail.outlook.com", port: 587 }),
    ("hotmail.com", SmtpServer { host: "smtp-mail.outlook.com", port: 587 }),
    ("live.com", SmtpServer { host: "smtp-mail.outlook.com", port: 587 }),
    ("yahoo.com", SmtpServer { host: "smtp.mail.yahoo.com", port: 587 }),
    ("compass.uol", SmtpServer { host: "smtp.office365.com", port: 587 }),
    ("uol.com.br", SmtpServer { host: "smtps.uol.com.br", port: 587 }),
];

/// SMTP server for a sender domain
pub fn smtp_server_for(domain: &str) -> SmtpServer {
    let domain = domain.trim().to_lowercase();
    SMTP_SERVERS
        .iter()
        .find(|(known, _)| *known == domain)
        .map(|(_, server)| *server)
        .unwrap_or(DEFAULT_SMTP_SERVER)
}

fn domain_of(address: &str) -> &str {
    address.rsplit_once('@').map(|(_, d)| d).unwrap_or("")
}

/// Result of a delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailOutcome {
    pub sent: bool,
    pub message: String,
}

impl MailOutcome {
    fn sent(message: String) -> Self {
        Self { sent: true, message }
    }

    fn failed(message: String) -> Self {
        Self { sent: false, message }
    }
}

/// PDF attached to a report message
#[derive(Debug, Clone)]
pub struct PdfAttachment {
    pub path: PathBuf,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A fully composed report message
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<PdfAttachment>,
}

impl OutgoingEmail {
    /// Compose the report message; a missing PDF file is simply not attached
    pub fn report(
        sender: &str,
        recipient: &str,
        summary: &str,
        pdf_path: Option<&Path>,
        now: DateTime<Local>,
    ) -> Result<Self> {
        parse_mailbox(sender)?;
        parse_mailbox(recipient)?;

        let excerpt: String = summary.chars().take(SUMMARY_EXCERPT_CHARS).collect();
        let body = format!(
            "Prezado(a),\n\n\
             Segue em anexo o relatório de análise de reclamações gerado automaticamente pelo sistema.\n\n\
             RESUMO EXECUTIVO:\n{}...\n\n\
             O relatório completo está disponível no arquivo PDF em anexo.\n\n\
             Atenciosamente,\n\
             Sistema de Análise de Reclamações\n",
            excerpt
        );

        let attachment = match pdf_path {
            Some(path) if path.exists() => Some(PdfAttachment {
                path: path.to_path_buf(),
                filename: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "relatorio.pdf".to_string()),
                bytes: std::fs::read(path)?,
            }),
            Some(path) => {
                tracing::warn!("Report {} not found, sending without attachment", path.display());
                None
            }
            None => None,
        };

        Ok(Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            subject: format!("Relatório de Reclamações - {}", now.format("%d/%m/%Y")),
            body,
            attachment,
        })
    }

    /// MIME message: From sender, To recipient, Cc sender
    pub fn to_message(&self) -> Result<Message> {
        let builder = Message::builder()
            .from(parse_mailbox(&self.sender)?)
            .to(parse_mailbox(&self.recipient)?)
            .cc(parse_mailbox(&self.sender)?)
            .subject(self.subject.clone());

        let text = SinglePart::plain(self.body.clone());
        let message = match &self.attachment {
            Some(pdf) => {
                let content_type = ContentType::parse("application/pdf")
                    .map_err(|e| AnalystError::MailTransport(e.to_string()))?;
                let attachment =
                    Attachment::new(pdf.filename.clone()).body(pdf.bytes.clone(), content_type);
                builder.multipart(MultiPart::mixed().singlepart(text).singlepart(attachment))
            }
            None => builder.singlepart(text),
        };

        message.map_err(|e| AnalystError::MailTransport(e.to_string()))
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| AnalystError::MailTransport(format!("Endereço inválido '{}': {}", address, e)))
}

#[derive(Clone)]
struct DeliveryPlan {
    sender: String,
    transports: Vec<Arc<dyn MailTransport>>,
}

/// Sends reports by mail
pub struct MailDispatcher {
    config: MailConfig,
    fixed_plan: Option<DeliveryPlan>,
}

impl MailDispatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.mail.clone(),
            fixed_plan: None,
        }
    }

    /// Dispatcher with explicit transports, tried in order
    pub fn with_transports(
        sender: impl Into<String>,
        transports: Vec<Arc<dyn MailTransport>>,
        outbox: impl Into<PathBuf>,
    ) -> Self {
        let mut config = Config::default().mail;
        config.outbox_directory = outbox.into();
        Self {
            config,
            fixed_plan: Some(DeliveryPlan {
                sender: sender.into(),
                transports,
            }),
        }
    }

    /// Resolve credentials and pick the transports for this sender
    fn plan(&self) -> Result<DeliveryPlan> {
        if let Some(plan) = &self.fixed_plan {
            return Ok(plan.clone());
        }

        let sender = resolve_secret(&self.config.sender).ok_or_else(|| {
            AnalystError::ConfigurationMissing("remetente de e-mail (EMAIL_SENDER)".to_string())
        })?;
        let domain = domain_of(&sender).to_lowercase();

        let dry_run = self.config.dry_run
            || self
                .config
                .dry_run_domains
                .iter()
                .any(|d| d.eq_ignore_ascii_case(&domain));
        if dry_run {
            return Ok(DeliveryPlan {
                sender,
                transports: vec![Arc::new(DryRunTransport::new(&self.config.outbox_directory))],
            });
        }

        let password = resolve_secret(&self.config.password).ok_or_else(|| {
            AnalystError::ConfigurationMissing("senha de e-mail (EMAIL_PASSWORD)".to_string())
        })?;

        let (host, port) = match &self.config.smtp_host {
            Some(host) => (host.clone(), self.config.smtp_port),
            None => {
                let server = smtp_server_for(&domain);
                (server.host.to_string(), server.port)
            }
        };
        let credentials = Credentials::new(sender.clone(), password);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        Ok(DeliveryPlan {
            sender,
            transports: vec![
                Arc::new(SmtpTransport::new(
                    SmtpMode::StartTls,
                    host.clone(),
                    port,
                    Some(credentials.clone()),
                    timeout,
                )),
                Arc::new(SmtpTransport::new(
                    SmtpMode::ImplicitTls,
                    host.clone(),
                    IMPLICIT_TLS_PORT,
                    Some(credentials),
                    timeout,
                )),
                Arc::new(SmtpTransport::new(SmtpMode::Unauthenticated, host, port, None, timeout)),
            ],
        })
    }

    /// Send the report summary, with the PDF attached when it exists
    pub async fn send_report(
        &self,
        pdf_path: Option<&Path>,
        summary: &str,
        recipient: &str,
    ) -> MailOutcome {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Mail not sent: {}", e);
                return MailOutcome::failed(format!(
                    "Credenciais de e-mail não configuradas: {}",
                    e
                ));
            }
        };

        let email = match OutgoingEmail::report(
            &plan.sender,
            recipient,
            summary,
            pdf_path,
            Local::now(),
        ) {
            Ok(email) => email,
            Err(e) => return MailOutcome::failed(format!("Erro ao preparar o e-mail: {}", e)),
        };

        let mut last_error = String::new();
        for transport in &plan.transports {
            match transport.deliver(&email).await {
                Ok(note) => {
                    tracing::info!("Report mailed to {} via {}", recipient, transport.name());
                    return MailOutcome::sent(note);
                }
                Err(e) => {
                    tracing::warn!("{} failed: {}", transport.name(), e);
                    last_error = e.to_string();
                }
            }
        }

        match self.write_backup(&email).await {
            Ok(path) => MailOutcome::failed(format!(
                "Erro no envio: {}. E-mail salvo em {}",
                last_error,
                path.display()
            )),
            Err(e) => MailOutcome::failed(format!(
                "Erro ao enviar e-mail: {} (backup falhou: {})",
                last_error, e
            )),
        }
    }

    async fn write_backup(&self, email: &OutgoingEmail) -> Result<PathBuf> {
        let outbox = &self.config.outbox_directory;
        tokio::fs::create_dir_all(outbox).await?;

        let path = outbox.join(format!(
            "email_backup_{}.txt",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let attachment = email
            .attachment
            .as_ref()
            .map(|a| a.path.display().to_string())
            .unwrap_or_else(|| "nenhum".to_string());
        let content = format!(
            "Para: {}\nAssunto: {}\n\n{}\n\nPDF anexo: {}\n",
            email.recipient, email.subject, email.body, attachment
        );
        tokio::fs::write(&path, content).await?;

        tracing::info!("Mail backup written to {}", path.display());
        Ok(path)
    }
}
