mod config;
mod coordinator;
mod dedup;
mod locks;
mod poller;
mod stages;

pub use config::PipelineConfig;
pub use coordinator::{BatchReport, FileOutcome, PipelineCoordinator};
pub use dedup::{classify, similarity_label, DedupEngine, DedupOutcome};
pub use locks::CustomerLocks;
pub use poller::Poller;
pub use stages::{EmbedStage, OcrStage};
