use colored::Colorize;
use config_tree_core::ConfigTree;

use crate::commit::Outcome;

/// Render the generated statements with one color per kind of line.
pub fn render_statements(text: &str) -> String {
    let mut out = Vec::new();

    for line in text.lines() {
        let colored = if line.starts_with("unset(") {
            line.red().to_string()
        } else if line.contains("[] = ") || line.starts_with("if (empty(") {
            line.green().to_string()
        } else if line.starts_with("$config") {
            line.yellow().to_string()
        } else {
            line.magenta().to_string()
        };
        out.push(colored);
    }

    out.join("\n")
}

/// One-line summary of an outcome.
pub fn render_summary(operation: &str, outcome: &Outcome) -> String {
    let lines = outcome.generated_statements.lines().count();
    let verdict = match (outcome.changed, outcome.dry_run) {
        (false, _) => "unchanged",
        (true, true) => "would change",
        (true, false) => "changed",
    };
    format!("{operation}: {verdict} ({lines} statements)")
        .cyan()
        .to_string()
}

/// Render an outcome for the terminal: statements, summary, then the
/// post-state of each reported section.
pub fn render_outcome(operation: &str, outcome: &Outcome) -> String {
    let mut out = Vec::new();
    if !outcome.generated_statements.is_empty() {
        out.push(render_statements(&outcome.generated_statements));
        out.push(String::new());
    }
    out.push(render_summary(operation, outcome));
    for (name, tree) in &outcome.sections {
        out.push(String::new());
        out.push(name.bold().to_string());
        out.push(render_tree(tree));
    }
    out.join("\n")
}

/// Pretty JSON rendering of a tree.
pub fn render_tree(tree: &ConfigTree) -> String {
    serde_json::to_string_pretty(tree).unwrap_or_else(|_| tree.to_string())
}
