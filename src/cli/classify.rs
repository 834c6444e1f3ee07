//! Classify command implementation

use crate::classifier::classify;
use crate::cli::output::{format_classification_json, format_classification_table};
use crate::cli::ClassifyArgs;

/// Handle `gatekeeper classify` command
pub fn handle_classify(args: &ClassifyArgs) -> String {
    let classification = classify(&args.text);
    if args.json {
        format_classification_json(&classification)
    } else {
        format_classification_table(&classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_json_output() {
        let args = ClassifyArgs {
            text: "Prove step by step that the algorithm terminates".to_string(),
            json: true,
        };
        let parsed: serde_json::Value = serde_json::from_str(&handle_classify(&args)).unwrap();
        assert!(parsed["classification"]["confidence"].as_f64().unwrap() > 0.5);
    }
}
