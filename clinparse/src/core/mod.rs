//! Engine facade

pub mod engine;
pub mod util;

pub use engine::ConceptEngine;
pub use util::{enabled_features, is_feature_enabled};
