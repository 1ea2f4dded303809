//! Utility functions for the core module

/// Returns a list of enabled features at compile time
///
/// Lets clients see which ontology backends are available in the current build.
pub fn enabled_features() -> Vec<&'static str> {
    let mut features = vec!["memory"];

    #[cfg(feature = "surrealdb-embedded")]
    features.push("surrealdb");

    features
}

/// Checks if a specific feature is enabled at compile time
pub fn is_feature_enabled(feature: &str) -> bool {
    match feature {
        "memory" => true,
        "surrealdb" => cfg!(feature = "surrealdb-embedded"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_features() {
        let features = enabled_features();
        assert!(features.contains(&"memory"));
        for feature in &features {
            assert!(is_feature_enabled(feature));
        }
        assert!(!is_feature_enabled("tokio-console"));
    }
}
