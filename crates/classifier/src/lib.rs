//! # Feedback Classifier
//!
//! Classification result model, the structured-generation provider
//! seam and the individual degradation tiers:
//!
//! - **Primary**: external structured-generation service, response
//!   validated post-hoc against the declared schema
//! - **Textual**: word-overlap matching against taxonomy labels and
//!   aliases
//! - **Heuristic**: fixed sentiment/domain vocabularies
//! - **Emergency**: guaranteed manual-review record
//!
//! Tier orchestration lives in `feedback-pipeline`; every tier here
//! converts its own provider-level failure into a typed
//! [`ClassifyError`] consumed solely by the coordinator.

mod emergency;
mod error;
mod heuristic;
mod primary;
mod provider;
mod result;
mod schema;
mod textual;

pub use emergency::emergency_result;
pub use error::{ClassifyError, Result};
pub use heuristic::HeuristicClassifier;
pub use primary::PrimaryClassifier;
pub use provider::ClassificationProvider;
pub use result::{
    clamp_confidence, coerce_sentiment, is_empty_label, truncate_chars, ClassificationIssue,
    ClassificationResult, MatchStrategy, SuggestionType, Tier,
};
pub use schema::{CandidateRef, CandidateSet, ClassificationRequest, RawClassification, RawIssue};
pub use textual::TextualMatcher;
