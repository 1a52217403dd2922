mod handlers;
mod worker;

pub use handlers::{handle_job, JobOutcome};
pub use worker::{process_next_job, ProcessResult, ProcessedJob};
