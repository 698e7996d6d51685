//! facegrep-core — Person matching across an image gallery.
//!
//! Loads a reference photo and a set of gallery images, asks a Gemini
//! vision model whether the reference person appears in each one, and
//! tracks the search lifecycle from selection through settled results.

pub mod classifier;
pub mod gemini;
pub mod intake;
pub mod matcher;
pub mod preview;
pub mod session;
pub mod types;

pub use classifier::{Classifier, ClassifyError};
pub use gemini::{GeminiClassifier, GeminiConfig};
pub use intake::{Intake, IntakeError, SelectionMode, RASTER_EXTENSIONS};
pub use matcher::{BatchMatcher, MATCH_INSTRUCTION};
pub use preview::{PreviewHandle, PreviewStore};
pub use session::{SearchSession, SearchToken, SessionError, SessionPhase};
pub use types::ImageRecord;
