//! complaint-lens library: corpus loading, analysis, reporting, chat routing
//! and mail delivery behind one [`agent::Agent`]

pub mod agent;
pub mod analysis;
pub mod config;
pub mod corpus;
pub mod error;
pub mod llm;
pub mod mail;
pub mod report;
pub mod router;
pub mod server;

pub use agent::{Agent, ChatResponse, InvokeRequest};
pub use error::{AnalystError, Result};
