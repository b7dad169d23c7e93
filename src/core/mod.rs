// src/core/mod.rs — Session lifecycle: fetch, delete, orchestrate

pub mod deleter;
pub mod fetcher;
pub mod orchestrator;
pub mod runner;
pub mod service;
pub mod session;
pub mod watchdog;

pub use deleter::{BulkDeleter, DeleteOutcome, DeletionSummary};
pub use fetcher::TweetFetcher;
pub use orchestrator::SessionOrchestrator;
pub use runner::TaskRunner;
pub use service::PurgeService;
pub use session::{AccountIdentity, Progress, Session, SessionPatch, SessionStatus, StatusView};
