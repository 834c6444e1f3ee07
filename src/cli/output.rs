//! Output formatting helpers for CLI commands

use crate::breaker::CircuitState;
use crate::classifier::TaskClassification;
use crate::routing::RoutingDecision;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Format a classification as a table
pub fn format_classification_table(classification: &TaskClassification) -> String {
    let mut t = table(vec!["Tier", "Code", "Task Type", "Confidence"]);
    t.add_row(vec![
        Cell::new(classification.tier),
        Cell::new(if classification.is_code { "yes" } else { "no" }),
        Cell::new(format!("{:?}", classification.task_type()).to_lowercase()),
        Cell::new(format!("{:.2}", classification.confidence)),
    ]);
    t.to_string()
}

/// Format a classification as JSON
pub fn format_classification_json(classification: &TaskClassification) -> String {
    json!({
        "classification": classification,
        "task_type": classification.task_type(),
    })
    .to_string()
}

/// Format a routing decision as a table, primary first
pub fn format_decision_table(decision: &RoutingDecision) -> String {
    let mut t = table(vec!["Rank", "Backend", "Score"]);
    for (rank, candidate) in decision.candidates.iter().enumerate() {
        let id = if rank == 0 {
            candidate.id.bold().to_string()
        } else {
            candidate.id.clone()
        };
        t.add_row(vec![Cell::new(rank + 1), Cell::new(id), Cell::new(candidate.score)]);
    }

    format!(
        "Strategy: {} (requested {}), weights speed={} quality={} cost={}\n{}",
        decision.applied_strategy,
        decision.requested_strategy,
        decision.weights.speed,
        decision.weights.quality,
        decision.weights.cost,
        t
    )
}

/// Format a routing decision as JSON
pub fn format_decision_json(decision: &RoutingDecision) -> String {
    json!({ "decision": decision }).to_string()
}

/// Coloured circuit state label
pub fn circuit_state_label(state: CircuitState) -> String {
    match state {
        CircuitState::Closed => "closed".green().to_string(),
        CircuitState::HalfOpen => "half_open".yellow().to_string(),
        CircuitState::Open => "open".red().to_string(),
    }
}
