//! Classifier seam between the batch matcher and a concrete vision service.

use std::future::Future;

use thiserror::Error;

use crate::types::ImageRecord;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned {status}: {message}")]
    Service { status: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// One yes/no question about a pair of images, answered in free text.
///
/// `classify` sends the reference image, one candidate, and the instruction
/// in a single request and returns the service's textual answer verbatim.
/// `preflight` is a cheap reachability probe run once before a batch so an
/// unreachable or misconfigured service fails the whole batch instead of
/// silently zeroing every candidate.
pub trait Classifier: Send + Sync {
    fn classify(
        &self,
        reference: &ImageRecord,
        candidate: &ImageRecord,
        instruction: &str,
    ) -> impl Future<Output = Result<String, ClassifyError>> + Send;

    fn preflight(&self) -> impl Future<Output = Result<(), ClassifyError>> + Send;
}
