//! Console output formatter for deliberation results

use colored::Colorize;
use council_domain::{
    DeliberationResult, HallucinationReport, ModelFailure, OutputFormat, SignalSeverity,
};

/// Formats deliberation results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Render in the requested format
    pub fn render(result: &DeliberationResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => Self::format(result),
            OutputFormat::Synthesis => Self::format_synthesis_only(result),
            OutputFormat::Json => Self::format_json(result),
        }
    }

    /// Format the complete result, stage by stage
    pub fn format(result: &DeliberationResult) -> String {
        let mut output = String::new();

        let title = result.title.as_deref().unwrap_or("LLM Council Results");
        output.push_str(&Self::header(title));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Question:".cyan().bold(),
            result.question
        ));

        // Stage 1: Answers
        output.push_str(&Self::section_header("Stage 1: Individual Answers"));
        for response in &result.responses {
            let label = result
                .label_map
                .label_for(&response.model)
                .map(|l| format!(" [{}]", l.display_name()))
                .unwrap_or_default();
            let confidence = response
                .confidence
                .map(|c| format!(" (confidence {}/10)", c))
                .unwrap_or_default();
            output.push_str(&format!(
                "\n{}{}\n{}\n",
                format!("── {}{} ──", response.model, label).yellow().bold(),
                confidence.dimmed(),
                response.text
            ));
        }
        output.push_str(&Self::failures(&result.stage1_failures));
        if let Some(leader) = &result.confidence_leader {
            output.push_str(&format!(
                "\n{} {} at {}/10 (others average {:.1})\n",
                "Confidence leader:".cyan().bold(),
                leader.model,
                leader.confidence,
                leader.others_average
            ));
        }

        // Stage 2: Peer rankings
        output.push_str(&Self::section_header("Stage 2: Peer Rankings"));
        for evaluation in &result.evaluations {
            let ranking = if evaluation.is_malformed() {
                "(no parsable ranking)".red().to_string()
            } else {
                evaluation
                    .parsed_ranking
                    .iter()
                    .map(|label| label.as_str())
                    .collect::<Vec<_>>()
                    .join(" > ")
            };
            output.push_str(&format!(
                "  {} {}\n",
                format!("{}:", evaluation.reviewer).yellow(),
                ranking
            ));
        }
        output.push_str(&Self::failures(&result.stage2_failures));

        if !result.aggregate.is_empty() {
            output.push_str(&format!("\n{}\n", "Aggregate Ranking:".cyan().bold()));
            for (position, entry) in result.aggregate.iter().enumerate() {
                let standing = match (entry.score, entry.average_rank) {
                    (Some(score), _) => format!("score {:.2}", score),
                    (None, Some(avg)) => format!("avg rank {:.2}", avg),
                    (None, None) => "no votes".to_string(),
                };
                output.push_str(&format!(
                    "  {}. {} ({}) - {}, {} vote(s)\n",
                    position + 1,
                    entry.model.to_string().bold(),
                    entry.label.display_name(),
                    standing,
                    entry.vote_count
                ));
            }
        }

        if let Some(consensus) = &result.consensus {
            let verdict = if consensus.unanimous {
                "unanimous".green().bold().to_string()
            } else {
                format!("{:.0}% agreement", consensus.agreement * 100.0)
            };
            output.push_str(&format!(
                "\n{} {} ranked first by {}/{} ({})\n",
                "Consensus:".green().bold(),
                consensus.top_model,
                consensus.top_votes,
                consensus.total_voters,
                verdict
            ));
        }

        if let Some(report) = &result.hallucination {
            output.push_str(&Self::hallucination(report));
        }

        // Stage 3: Synthesis
        output.push_str(&Self::section_header("Stage 3: Final Answer"));
        output.push_str(&format!(
            "\n{}\n\n{}\n",
            format!("Chairman: {}", result.synthesis.model).yellow().bold(),
            result.synthesis.text
        ));

        output.push_str(&Self::footer());

        output
    }

    /// Format as JSON
    pub fn format_json(result: &DeliberationResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format synthesis only (concise output)
    pub fn format_synthesis_only(result: &DeliberationResult) -> String {
        let mut output = String::new();

        let heading = match &result.title {
            Some(title) => format!("=== {} ===", title),
            None => "=== LLM Council Conclusion ===".to_string(),
        };
        output.push_str(&format!("{}\n\n", heading.cyan().bold()));

        output.push_str(&format!("{} {}\n\n", "Q:".bold(), result.question));

        let consulted: Vec<String> =
            result.responses.iter().map(|r| r.model.to_string()).collect();
        output.push_str(&format!(
            "{} {}\n",
            "Models consulted:".dimmed(),
            consulted.join(", ")
        ));
        output.push_str(&format!(
            "{} {}\n\n",
            "Chairman:".dimmed(),
            result.synthesis.model
        ));

        output.push_str(&result.synthesis.text);
        output.push('\n');

        output
    }

    fn hallucination(report: &HallucinationReport) -> String {
        let verdict = if report.has_concerns {
            "concerns raised".red().bold().to_string()
        } else {
            "no concerns".green().to_string()
        };
        let mut output = format!(
            "\n{} {} (overall {:.2})\n",
            "Reliability:".cyan().bold(),
            verdict,
            report.overall_confidence
        );
        for signal in &report.signals {
            let severity = match signal.severity {
                SignalSeverity::High => signal.severity.as_str().red().bold(),
                SignalSeverity::Medium => signal.severity.as_str().yellow(),
                SignalSeverity::Low => signal.severity.as_str().dimmed(),
            };
            output.push_str(&format!(
                "  [{}] {} {}: {}\n",
                severity,
                signal.model,
                signal.kind.name(),
                signal.description
            ));
        }
        if report.has_concerns {
            for recommendation in &report.recommendations {
                output.push_str(&format!("  - {}\n", recommendation));
            }
        }
        output
    }

    fn failures(failures: &[ModelFailure]) -> String {
        failures
            .iter()
            .map(|f| {
                format!(
                    "  {} {} ({}): {}\n",
                    "x".red(),
                    f.model,
                    f.kind,
                    f.message
                )
            })
            .collect()
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}
