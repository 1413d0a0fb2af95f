//! Swipe Shield Library
//!
//! Model-backed payment fraud scoring: artifact provisioning, a prediction
//! service over anonymized or transaction records, threshold policy,
//! advisory heuristic flags, CSV batch scoring and an HTTP front end.

pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod heuristics;
pub mod metrics;
pub mod models;
pub mod provision;
pub mod threshold;
pub mod types;

pub use config::AppConfig;
pub use error::{ShieldError, ShieldResult};
pub use feature_extractor::{FeatureEncoder, InputSchema};
pub use models::{Classifier, ModelLoader, PredictionService};
pub use provision::ArtifactProvisioner;
pub use threshold::Threshold;
pub use types::{FeatureRecord, FraudLabel, Probabilities, Record, Transaction, Verdict};
