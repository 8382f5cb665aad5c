//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! plans and stack outputs in various formats.

use colored::Colorize;
use serde_json::Value as JsonValue;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::graph::{ExecutionPlan, REDACTED, StackOutputs};

use super::commands::OutputFormat;

/// Longest cell shown in text tables.
const MAX_CELL_LEN: usize = 60;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan step row for table display.
#[derive(Tabled)]
struct PlanStepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Depends on")]
    dependencies: String,
}

/// Declared property row for detailed plan display.
#[derive(Tabled)]
struct PropertyRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Property")]
    property: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Stack output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Output")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats an execution plan for display.
    ///
    /// Secret property values are always shown as placeholders.
    #[must_use]
    pub fn format_plan(&self, plan: &ExecutionPlan, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(plan).unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(plan, detailed),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &ExecutionPlan, detailed: bool) -> String {
        if plan.is_empty() {
            return format!("{} Nothing to plan - no resources declared.\n", "✓".green());
        }

        let mut output = String::new();
        let _ = writeln!(output, "\n{}", "Execution Plan".bold());
        let _ = writeln!(output, "   Provider: {}", plan.provider);
        let _ = writeln!(output, "   Fingerprint: {}\n", plan.short_fingerprint());

        let rows: Vec<PlanStepRow> = plan
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| PlanStepRow {
                index: i + 1,
                resource: step.name.clone(),
                resource_type: step.resource_type.clone(),
                dependencies: if step.dependencies.is_empty() {
                    String::from("-")
                } else {
                    step.dependencies.join(", ")
                },
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if detailed {
            let rows: Vec<PropertyRow> = plan
                .steps
                .iter()
                .flat_map(|step| {
                    step.properties.iter().map(|(key, value)| PropertyRow {
                        resource: step.name.clone(),
                        property: key.clone(),
                        value: truncate(&value.describe().to_string(), MAX_CELL_LEN),
                    })
                })
                .collect();
            if !rows.is_empty() {
                output.push('\n');
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
            }
        }

        if !plan.outputs.is_empty() {
            let _ = writeln!(output, "\nOutputs:");
            for out in &plan.outputs {
                let marker = if out.secret {
                    " (secret)".yellow().to_string()
                } else {
                    String::new()
                };
                let _ = writeln!(output, "   - {}{marker}", out.name);
            }
        }

        let _ = write!(
            output,
            "\nPlan: {} resources to materialize\n",
            plan.len().to_string().green()
        );

        output
    }

    /// Formats resolved stack outputs.
    ///
    /// Secrets are redacted unless `show_secrets` is set.
    #[must_use]
    pub fn format_outputs(&self, outputs: &StackOutputs, show_secrets: bool) -> String {
        let values = if show_secrets {
            outputs.revealed()
        } else {
            outputs.redacted()
        };

        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&values).unwrap_or_default(),
            OutputFormat::Text => {
                if values.is_empty() {
                    return String::from("No outputs.\n");
                }

                let rows: Vec<OutputRow> = values
                    .iter()
                    .map(|(name, value)| OutputRow {
                        name: name.clone(),
                        value: Self::format_output_value(value),
                    })
                    .collect();

                let mut output = format!("\n{}\n\n", "Outputs".bold());
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats a successful validation.
    #[must_use]
    pub fn format_validation(&self, plan: &ExecutionPlan, settings: usize) -> String {
        match self.format {
            OutputFormat::Json => {
                let summary = serde_json::json!({
                    "valid": true,
                    "provider": plan.provider,
                    "resources": plan.len(),
                    "outputs": plan.outputs.len(),
                    "settings": settings,
                    "fingerprint": plan.fingerprint,
                });
                serde_json::to_string_pretty(&summary).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!("{} Stack is valid!\n\n", "✓".green());
                let _ = writeln!(output, "Summary:");
                let _ = writeln!(output, "  Provider: {}", plan.provider);
                let _ = writeln!(output, "  Settings: {settings}");
                let _ = writeln!(output, "  Resources: {}", plan.len());
                let _ = writeln!(output, "  Outputs: {}", plan.outputs.len());
                let _ = writeln!(output, "  Fingerprint: {}", plan.short_fingerprint());
                output
            }
        }
    }

    /// Formats one output value, dimming redacted secrets.
    fn format_output_value(value: &JsonValue) -> String {
        match value {
            JsonValue::String(s) if s == REDACTED => s.dimmed().to_string(),
            JsonValue::String(s) => s.clone(),
            other => truncate(&other.to_string(), MAX_CELL_LEN),
        }
    }
}

/// Truncates a string to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackSettings;
    use crate::provider::SimulatedExecutor;
    use crate::stacks::AzureWebStack;

    fn settings() -> StackSettings {
        StackSettings::new()
            .with("sqlServerName", "contoso-sql")
            .with_secret("adminPassword", "vm-pass")
            .with_secret("sqlAdminPassword", "sql-pass")
    }

    fn disable_colors() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_plan_text_lists_resources() {
        disable_colors();
        let (graph, _) = AzureWebStack::build(&settings()).expect("declare");
        let plan = graph.build_plan().expect("plan");
        let text = OutputFormatter::new(OutputFormat::Text).format_plan(&plan, true);

        assert!(text.contains(plan.short_fingerprint()));
        assert!(text.contains("mySqlDatabase"));
        assert!(text.contains("sql_connection_string (secret)"));
        assert!(!text.contains("sql-pass"));
    }

    #[test]
    fn test_plan_json_is_redacted() {
        let (graph, _) = AzureWebStack::build(&settings()).expect("declare");
        let plan = graph.build_plan().expect("plan");
        let json = OutputFormatter::new(OutputFormat::Json).format_plan(&plan, false);

        let parsed: JsonValue = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed["steps"].as_array().map(Vec::len), Some(10));
        assert!(!json.contains("vm-pass"));
    }

    #[tokio::test]
    async fn test_outputs_redacted_unless_requested() {
        let (graph, _) = AzureWebStack::build(&settings()).expect("declare");
        let plan = graph.build_plan().expect("plan");
        let outputs = graph
            .resolve(&plan, &SimulatedExecutor::new())
            .await
            .expect("resolve");
        let formatter = OutputFormatter::new(OutputFormat::Json);

        let hidden = formatter.format_outputs(&outputs, false);
        assert!(!hidden.contains("sql-pass"));
        assert!(hidden.contains(REDACTED));

        let shown = formatter.format_outputs(&outputs, true);
        assert!(shown.contains("Password=sql-pass;"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
