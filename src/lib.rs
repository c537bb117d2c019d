//! Pagewarden drives a headless Chrome instance to run automated web-page
//! inspection tasks (performance audit, accessibility audit, JavaScript
//! error capture, broken-link validation, page snapshot, scripted
//! multi-step interaction) and returns one structured result envelope per
//! request.
//!
//! Each inbound request gets its own one-shot browser session: acquired
//! before the task strategy runs, torn down on every exit path, never
//! shared and never pooled.

pub mod audit;
pub mod config;
pub mod dom;
pub mod error;
pub mod links;
pub mod orchestrator;
pub mod server;
pub mod session;
pub mod steps;
pub mod storage;
pub mod tasks;
pub mod types;

pub use config::Config;
pub use error::TaskError;
pub use orchestrator::Orchestrator;
pub use server::AppState;
pub use session::{BrowserSession, SessionManager};
pub use types::{ActionStep, LinkCheckResult, TaskKind, TaskRequest};
