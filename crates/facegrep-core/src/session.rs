//! Search session state: selected images, the running search, its outcome.
//!
//! The session owns what the user has picked and what the last search
//! produced. Changing either selection invalidates previous results and
//! bumps a generation counter; a search settling against an older
//! generation is disregarded so stale answers never describe the current
//! selection.

use thiserror::Error;
use uuid::Uuid;

use crate::classifier::ClassifyError;
use crate::types::ImageRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("select a reference image and at least one gallery image before searching")]
    MissingInput,
    #[error("a search is already in progress")]
    SearchInProgress,
    #[error("the image analysis service could not be reached; try again later")]
    BatchFailed,
}

/// Where the session currently stands, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Inputs incomplete; nothing to search yet.
    Idle,
    /// Reference and gallery both selected, no search running.
    Ready,
    Searching,
    SettledWithResults,
    SettledEmpty,
    SettledError,
}

/// Snapshot handed out by [`SearchSession::begin_search`] and handed back
/// to [`SearchSession::settle`]. Holds the inputs as they were when the
/// search started, so later selection changes cannot shift them under a
/// running search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchToken {
    search_id: Uuid,
    generation: u64,
    reference: ImageRecord,
    candidates: Vec<ImageRecord>,
}

impl SearchToken {
    pub fn search_id(&self) -> Uuid {
        self.search_id
    }

    pub fn reference(&self) -> &ImageRecord {
        &self.reference
    }

    pub fn candidates(&self) -> &[ImageRecord] {
        &self.candidates
    }
}

#[derive(Debug, Default)]
pub struct SearchSession {
    reference: Option<ImageRecord>,
    candidates: Vec<ImageRecord>,
    results: Vec<ImageRecord>,
    in_progress: bool,
    last_error: Option<SessionError>,
    searched: bool,
    generation: u64,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the reference image. Invalidates any previous outcome.
    pub fn set_reference(&mut self, reference: Option<ImageRecord>) {
        self.reference = reference;
        self.invalidate();
    }

    /// Replace the gallery selection. Invalidates any previous outcome.
    pub fn set_candidates(&mut self, candidates: Vec<ImageRecord>) {
        self.candidates = candidates;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.results.clear();
        self.last_error = None;
        self.searched = false;
        self.generation += 1;
    }

    /// Start a search over the current selection.
    ///
    /// Refused while another search is running. With no reference or an
    /// empty gallery the error is recorded on the session and the session
    /// does not count as searched.
    pub fn begin_search(&mut self) -> Result<SearchToken, SessionError> {
        if self.in_progress {
            return Err(SessionError::SearchInProgress);
        }
        let Some(reference) = self.reference.clone() else {
            self.last_error = Some(SessionError::MissingInput);
            return Err(SessionError::MissingInput);
        };
        if self.candidates.is_empty() {
            self.last_error = Some(SessionError::MissingInput);
            return Err(SessionError::MissingInput);
        }

        self.results.clear();
        self.last_error = None;
        self.searched = true;
        self.in_progress = true;

        let token = SearchToken {
            search_id: Uuid::new_v4(),
            generation: self.generation,
            reference,
            candidates: self.candidates.clone(),
        };
        tracing::info!(
            search_id = %token.search_id,
            candidates = token.candidates.len(),
            "search started"
        );
        Ok(token)
    }

    /// Record the outcome of the search identified by `token`.
    ///
    /// Always ends the in-progress state. If the selection changed since
    /// the token was minted the outcome is dropped; otherwise a success
    /// stores the matches and a failure records a batch error while the
    /// session still counts as searched.
    pub fn settle(&mut self, token: SearchToken, outcome: Result<Vec<ImageRecord>, ClassifyError>) {
        self.in_progress = false;

        if token.generation != self.generation {
            tracing::debug!(
                search_id = %token.search_id,
                "selection changed mid-search; dropping stale outcome"
            );
            return;
        }

        match outcome {
            Ok(matches) => {
                tracing::info!(
                    search_id = %token.search_id,
                    matches = matches.len(),
                    "search settled"
                );
                self.results = matches;
            }
            Err(error) => {
                tracing::error!(search_id = %token.search_id, error = %error, "search failed");
                self.last_error = Some(SessionError::BatchFailed);
            }
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.in_progress {
            return SessionPhase::Searching;
        }
        // Covers both a failed batch and a refused validation; a validation
        // error settles the session visibly without counting as a search.
        if self.last_error.is_some() {
            return SessionPhase::SettledError;
        }
        if self.searched {
            if self.results.is_empty() {
                return SessionPhase::SettledEmpty;
            }
            return SessionPhase::SettledWithResults;
        }
        if self.reference.is_some() && !self.candidates.is_empty() {
            SessionPhase::Ready
        } else {
            SessionPhase::Idle
        }
    }

    pub fn reference(&self) -> Option<&ImageRecord> {
        self.reference.as_ref()
    }

    pub fn candidates(&self) -> &[ImageRecord] {
        &self.candidates
    }

    pub fn results(&self) -> &[ImageRecord] {
        &self.results
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Whether a search over the current selection has run to settlement.
    pub fn searched(&self) -> bool {
        self.searched
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }
}
