//! complaint-lens - complaint analytics assistant
//!
//! Analyze a complaint corpus, generate PDF reports, answer questions about
//! the data and mail reports, from the terminal or over HTTP.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use complaint_lens::agent::{Agent, ChatResponse, InvokeRequest};
use complaint_lens::analysis::{format_percentage, resolution_rate, ResolutionHealth};
use complaint_lens::config::Config;
use complaint_lens::server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Complaint data file (overrides the configured path)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, default_value_t = false, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full analysis and print the results
    Analyze {
        /// Mail the report to this address
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Send one request and print the JSON response
    Ask {
        /// Question or command, e.g. "qual a categoria com mais reclamações?"
        prompt: String,

        /// Recipient for generated reports
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Interactive chat on the terminal
    Chat,

    /// Run the HTTP chat server
    Serve {
        /// Listen address (overrides the configured one)
        #[arg(short, long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(data) = args.data {
        config.data.path = data;
    }
    let serve_addr = config.server.addr.clone();
    let agent = Agent::new(config);

    match args.command {
        Command::Analyze { email } => run_analyze(&agent, email).await,
        Command::Ask { prompt, email } => {
            let request = InvokeRequest {
                prompt: Some(prompt),
                email,
            };
            let response = agent.invoke(request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Chat => run_chat(&agent).await,
        Command::Serve { addr } => {
            let addr = addr.unwrap_or(serve_addr);
            server::serve(Arc::new(agent), &addr).await?;
            Ok(())
        }
    }
}

async fn run_analyze(agent: &Agent, email: Option<String>) -> Result<()> {
    println!("Analisando reclamações...\n");

    match agent.analyze(email).await {
        ChatResponse::Success {
            categoria_analysis,
            status_analysis,
            trends,
            pdf_filename,
            email_sent,
            email_message,
            ..
        } => {
            println!("Categorias:");
            for stat in &categoria_analysis {
                println!(
                    "  {}: {} ({}%)",
                    stat.label,
                    stat.count,
                    format_percentage(stat.percentage)
                );
            }

            println!("\nStatus:");
            for stat in &status_analysis {
                println!(
                    "  {}: {} ({}%)",
                    stat.label,
                    stat.count,
                    format_percentage(stat.percentage)
                );
            }

            if let Some(filename) = pdf_filename {
                println!(
                    "\nRelatório: {}",
                    agent.results_dir().join(filename).display()
                );
            }
            println!(
                "Período: {} a {}",
                trends.date_range.start.format("%d/%m/%Y"),
                trends.date_range.end.format("%d/%m/%Y")
            );

            let total: usize = status_analysis.iter().map(|s| s.count).sum();
            let rate = resolution_rate(&status_analysis, total);
            println!(
                "Taxa de resolução: {:.1}% ({})",
                rate,
                ResolutionHealth::from_rate(rate).label()
            );

            if let (Some(sent), Some(message)) = (email_sent, email_message) {
                let mark = if sent { "Enviado" } else { "Não enviado" };
                println!("E-mail: {} - {}", mark, message);
            }
            Ok(())
        }
        ChatResponse::Error { result } => Err(anyhow::anyhow!(result)),
        ChatResponse::Conversational { response, .. } => {
            println!("{}", response);
            Ok(())
        }
    }
}

async fn run_chat(agent: &Agent) -> Result<()> {
    println!("Agente de análise de reclamações. Digite 'sair' para encerrar.\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Você: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message.to_lowercase().as_str(), "sair" | "exit" | "quit") {
            println!("Até logo!");
            break;
        }

        match agent.invoke(InvokeRequest::new(message)).await {
            ChatResponse::Conversational { response, .. } => println!("\n{}\n", response),
            ChatResponse::Success {
                pdf_filename,
                ai_insights,
                email_message,
                ..
            } => {
                println!("\n{}", ai_insights);
                if let Some(filename) = pdf_filename {
                    println!("Relatório gerado: {}", agent.results_dir().join(filename).display());
                }
                if let Some(message) = email_message {
                    println!("{}", message);
                }
                println!();
            }
            ChatResponse::Error { result } => println!("\n{}\n", result),
        }
    }

    Ok(())
}
