use crate::config::OutputFormat;
use crate::graph::CausalGraphicalModel;
use crate::inference::AdjustmentCriterion;
use crate::types::{AdjustmentSets, IndependenceRelation};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;

/// Result of one CLI query, ready to be rendered
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum QueryReport {
    Description {
        model: String,
        observed: BTreeSet<String>,
        set_nodes: BTreeSet<String>,
        edges: Vec<(String, String)>,
        latent_edges: Vec<(String, (String, String))>,
        distribution: String,
    },
    DSeparation {
        x: String,
        y: String,
        given: BTreeSet<String>,
        separated: bool,
    },
    AdjustmentCheck {
        criterion: AdjustmentCriterion,
        x: String,
        y: String,
        adjustment: BTreeSet<String>,
        valid: bool,
    },
    AdjustmentSearch {
        criterion: AdjustmentCriterion,
        x: String,
        y: String,
        sets: AdjustmentSets,
    },
    Independencies {
        relations: Vec<IndependenceRelation>,
    },
}

impl QueryReport {
    pub fn describe(model: &CausalGraphicalModel) -> Self {
        QueryReport::Description {
            model: model.to_string(),
            observed: model.observed_variables().clone(),
            set_nodes: model.set_nodes().clone(),
            edges: model.edges().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
            latent_edges: model
                .latent_edges()
                .map(|(latent, (a, b))| (latent.to_string(), (a.to_string(), b.to_string())))
                .collect(),
            distribution: model.factorized_distribution(),
        }
    }
}

/// Trait for report formatters
pub trait ReportFormatter {
    fn format(&self, report: &QueryReport) -> Result<String>;
}

pub fn formatter_for(format: OutputFormat) -> Box<dyn ReportFormatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

fn braces(names: &BTreeSet<String>) -> String {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    format!("{{{}}}", names.join(", "))
}

fn list_sets(sets: &AdjustmentSets) -> Vec<String> {
    sets.iter().map(braces).collect()
}

/// JSON formatter
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &QueryReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

/// Plain text formatter
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &QueryReport) -> Result<String> {
        let text = match report {
            QueryReport::Description {
                model,
                set_nodes,
                edges,
                latent_edges,
                distribution,
                ..
            } => {
                let mut lines = vec![model.clone()];
                for (a, b) in edges {
                    lines.push(format!("  {} -> {}", a, b));
                }
                for (latent, (a, b)) in latent_edges {
                    lines.push(format!("  {} <-> {} (via {})", a, b, latent));
                }
                if !set_nodes.is_empty() {
                    lines.push(format!("Set nodes: {}", braces(set_nodes)));
                }
                lines.push(format!("Distribution: {}", distribution));
                lines.join("\n")
            }
            QueryReport::DSeparation { x, y, given, separated } => format!(
                "{} and {} are {} given {}",
                x,
                y,
                if *separated { "d-separated" } else { "d-connected" },
                braces(given)
            ),
            QueryReport::AdjustmentCheck {
                criterion,
                x,
                y,
                adjustment,
                valid,
            } => format!(
                "{} is {} {} adjustment set for {} -> {}",
                braces(adjustment),
                if *valid { "a valid" } else { "not a valid" },
                criterion,
                x,
                y
            ),
            QueryReport::AdjustmentSearch { criterion, x, y, sets } => {
                if sets.is_empty() {
                    format!("No valid {} adjustment set exists for {} -> {}", criterion, x, y)
                } else {
                    format!(
                        "Valid {} adjustment sets for {} -> {}:\n{}",
                        criterion,
                        x,
                        y,
                        list_sets(sets)
                            .iter()
                            .map(|set| format!("  {}", set))
                            .collect::<Vec<_>>()
                            .join("\n")
                    )
                }
            }
            QueryReport::Independencies { relations } => {
                if relations.is_empty() {
                    "No conditional independencies".to_string()
                } else {
                    relations.iter().map(|r| r.to_string()).collect::<Vec<_>>().join("\n")
                }
            }
        };
        Ok(text)
    }
}

/// Markdown formatter
pub struct MarkdownFormatter;

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &QueryReport) -> Result<String> {
        let markdown = match report {
            QueryReport::Description {
                model,
                observed,
                set_nodes,
                edges,
                latent_edges,
                distribution,
            } => {
                let mut out = format!("# {}\n\n", model);
                out.push_str(&format!("**Observed**: {}\n", braces(observed)));
                out.push_str(&format!("**Set nodes**: {}\n\n", braces(set_nodes)));
                out.push_str("## Edges\n");
                for (a, b) in edges {
                    out.push_str(&format!("- `{}` → `{}`\n", a, b));
                }
                for (latent, (a, b)) in latent_edges {
                    out.push_str(&format!("- `{}` ↔ `{}` (latent `{}`)\n", a, b, latent));
                }
                out.push_str(&format!("\n## Distribution\n`{}`\n", distribution));
                out
            }
            QueryReport::DSeparation { x, y, given, separated } => format!(
                "## d-separation\n\n| x | y | given | d-separated |\n|---|---|---|---|\n| {} | {} | {} | {} |\n",
                x,
                y,
                braces(given),
                separated
            ),
            QueryReport::AdjustmentCheck {
                criterion,
                x,
                y,
                adjustment,
                valid,
            } => format!(
                "## {} adjustment: {} → {}\n\n- **Set**: {}\n- **Valid**: {}\n",
                criterion,
                x,
                y,
                braces(adjustment),
                valid
            ),
            QueryReport::AdjustmentSearch { criterion, x, y, sets } => {
                let mut out = format!("## {} adjustment sets: {} → {}\n\n", criterion, x, y);
                if sets.is_empty() {
                    out.push_str("None\n");
                }
                for set in list_sets(sets) {
                    out.push_str(&format!("- {}\n", set));
                }
                out
            }
            QueryReport::Independencies { relations } => {
                let mut out = String::from("## Conditional independencies\n\n");
                if relations.is_empty() {
                    out.push_str("None\n");
                }
                for relation in relations {
                    out.push_str(&format!("- {}\n", relation));
                }
                out
            }
        };
        Ok(markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_text_adjustment_search_distinguishes_empty_results() {
        let needed_none: AdjustmentSets = [BTreeSet::new()].into_iter().collect();
        let report = QueryReport::AdjustmentSearch {
            criterion: AdjustmentCriterion::Backdoor,
            x: "x1".to_string(),
            y: "x3".to_string(),
            sets: needed_none,
        };
        let text = TextFormatter.format(&report).unwrap();
        assert!(text.contains("{}"));

        let report = QueryReport::AdjustmentSearch {
            criterion: AdjustmentCriterion::Backdoor,
            x: "x".to_string(),
            y: "y".to_string(),
            sets: AdjustmentSets::new(),
        };
        let text = TextFormatter.format(&report).unwrap();
        assert!(text.starts_with("No valid backdoor adjustment set"));
    }

    #[test]
    fn test_json_description() {
        let report = QueryReport::describe(&catalog::latent_confounded());
        let json: serde_json::Value = serde_json::from_str(&JsonFormatter.format(&report).unwrap()).unwrap();

        assert_eq!(json["query"], "description");
        assert_eq!(json["edges"][0][0], "x");
        assert_eq!(json["latent_edges"][0][0], "Unobserved_0");
    }

    #[test]
    fn test_markdown_independencies() {
        let relations = catalog::chain().all_independence_relationships().unwrap();
        let report = QueryReport::Independencies { relations };
        let markdown = MarkdownFormatter.format(&report).unwrap();

        assert!(markdown.contains("- x1 ⊥ x3 | x2"));
    }
}
