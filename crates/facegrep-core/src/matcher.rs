//! Fan-out/fan-in person matching across a gallery.

use futures::future;

use crate::classifier::{Classifier, ClassifyError};
use crate::types::ImageRecord;

/// Question posed for every reference/candidate pair.
pub const MATCH_INSTRUCTION: &str =
    "Does the person in the first image appear in the second image? Answer with only 'yes' or 'no'.";

const AFFIRMATIVE_TOKEN: &str = "yes";

/// An answer counts as a match when it contains the affirmative token
/// anywhere, case-insensitively. "Yes, she does." matches; "no" does not.
pub(crate) fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_lowercase().contains(AFFIRMATIVE_TOKEN)
}

/// Runs one classify query per candidate and keeps the affirmatives.
pub struct BatchMatcher<C> {
    classifier: C,
}

impl<C: Classifier> BatchMatcher<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// Return the candidates the reference person appears in, in gallery
    /// order.
    ///
    /// The classifier is preflighted once per batch; if that probe fails the
    /// whole batch errors without issuing a single query. After a good
    /// preflight, each candidate is queried concurrently and any individual
    /// failure is logged and scored as a non-match, so one bad image or
    /// dropped request cannot sink the rest of the batch.
    pub async fn find_matches(
        &self,
        reference: &ImageRecord,
        candidates: &[ImageRecord],
    ) -> Result<Vec<ImageRecord>, ClassifyError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        self.classifier.preflight().await?;
        tracing::info!(candidates = candidates.len(), "matching batch started");

        let queries = candidates.iter().map(|candidate| async move {
            match self
                .classifier
                .classify(reference, candidate, MATCH_INSTRUCTION)
                .await
            {
                Ok(answer) if is_affirmative(&answer) => Some(candidate.clone()),
                Ok(answer) => {
                    tracing::debug!(
                        candidate = %candidate.path().display(),
                        answer = %answer,
                        "no match"
                    );
                    None
                }
                Err(error) => {
                    tracing::warn!(
                        candidate = %candidate.path().display(),
                        error = %error,
                        "match query failed; scoring as non-match"
                    );
                    None
                }
            }
        });

        let matches: Vec<ImageRecord> = future::join_all(queries)
            .await
            .into_iter()
            .flatten()
            .collect();

        tracing::info!(
            matches = matches.len(),
            candidates = candidates.len(),
            "matching batch settled"
        );
        Ok(matches)
    }
}
