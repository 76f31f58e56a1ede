//! Progress reporting for deliberation runs
//!
//! Each reporter is an [`EventSink`]: the binary forwards the event stream to
//! it and it draws on stderr, leaving stdout to the final result.

use colored::Colorize;
use council_application::EventSink;
use council_domain::DeliberationEvent;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

fn stage_display_name(stage: u8) -> &'static str {
    match stage {
        1 => "Stage 1: Answers",
        2 => "Stage 2: Peer Ranking",
        _ => "Stage 3: Synthesis",
    }
}

/// Reports progress with one progress bar per stage
pub struct ProgressReporter {
    multi: MultiProgress,
    stage_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            stage_bar: Mutex::new(None),
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn start_bar(&self, stage: u8, total: usize) {
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(Self::stage_style());
        pb.set_prefix(stage_display_name(stage));
        pb.set_message("Starting...");
        self.replace_bar(pb);
    }

    fn start_spinner(&self, stage: u8, message: String) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_prefix(stage_display_name(stage));
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.replace_bar(pb);
    }

    fn replace_bar(&self, pb: ProgressBar) {
        if let Ok(mut slot) = self.stage_bar.lock()
            && let Some(previous) = slot.replace(pb)
        {
            previous.finish_and_clear();
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(slot) = self.stage_bar.lock()
            && let Some(pb) = slot.as_ref()
        {
            f(pb);
        }
    }

    fn finish_bar(&self, message: String) {
        if let Ok(mut slot) = self.stage_bar.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_with_message(message);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ProgressReporter {
    fn emit(&self, event: DeliberationEvent) {
        match event {
            DeliberationEvent::Stage1Start { models } => self.start_bar(1, models.len()),
            DeliberationEvent::Stage2Start { reviewers } => self.start_bar(2, reviewers.len()),
            DeliberationEvent::ModelSettled {
                stage: 1 | 2,
                model,
                success,
                ..
            } => self.with_bar(|pb| {
                let status = if success {
                    format!("{} {}", "v".green(), model)
                } else {
                    format!("{} {}", "x".red(), model)
                };
                pb.set_message(status);
                pb.inc(1);
            }),
            DeliberationEvent::ModelSettled { .. } => {}
            DeliberationEvent::Stage1Complete {
                responses,
                failures,
                ..
            } => self.finish_bar(format!(
                "{} {} answered, {} failed",
                "done:".green(),
                responses.len(),
                failures.len()
            )),
            DeliberationEvent::Stage2Complete {
                consensus,
                hallucination,
                ..
            } => {
                let mut summary = match consensus {
                    Some(c) if c.unanimous => format!("unanimous for {}", c.top_model),
                    Some(c) => {
                        format!("{}/{} put {} first", c.top_votes, c.total_voters, c.top_model)
                    }
                    None => "no usable rankings".to_string(),
                };
                if hallucination.is_some_and(|r| r.has_concerns) {
                    summary.push_str(&format!(", {}", "reliability concerns".yellow()));
                }
                self.finish_bar(format!("{} {}", "done:".green(), summary));
            }
            DeliberationEvent::Stage3Start { chairman } => {
                self.start_spinner(3, format!("{} is writing the final answer", chairman));
            }
            DeliberationEvent::Stage3Complete(_) => {
                self.finish_bar(format!("{}", "done".green()));
            }
            DeliberationEvent::TitleComplete { title } => {
                let _ = self.multi.println(format!("{} {}", "Title:".dimmed(), title.bold()));
            }
            DeliberationEvent::Complete => {}
            DeliberationEvent::Error { message, .. } => {
                if let Ok(mut slot) = self.stage_bar.lock()
                    && let Some(pb) = slot.take()
                {
                    pb.abandon_with_message(format!("{}", "failed".red()));
                }
                let _ = self.multi.println(format!("{} {}", "Error:".red().bold(), message));
            }
        }
    }
}

/// Simple line-based progress (no bars), for logs and dumb terminals
pub struct SimpleProgress;

impl EventSink for SimpleProgress {
    fn emit(&self, event: DeliberationEvent) {
        if let Some(line) = Self::describe(&event) {
            eprintln!("{}", line);
        }
    }
}

impl SimpleProgress {
    /// One human-readable line per event worth showing
    pub fn describe(event: &DeliberationEvent) -> Option<String> {
        let line = match event {
            DeliberationEvent::Stage1Start { models } => format!(
                "{} {} ({} models)",
                "->".cyan(),
                stage_display_name(1).bold(),
                models.len()
            ),
            DeliberationEvent::Stage2Start { reviewers } => format!(
                "{} {} ({} reviewers)",
                "->".cyan(),
                stage_display_name(2).bold(),
                reviewers.len()
            ),
            DeliberationEvent::Stage3Start { chairman } => format!(
                "{} {} (chairman {})",
                "->".cyan(),
                stage_display_name(3).bold(),
                chairman
            ),
            DeliberationEvent::ModelSettled {
                model,
                success,
                elapsed_ms,
                ..
            } => {
                if *success {
                    format!("  {} {} ({} ms)", "v".green(), model, elapsed_ms)
                } else {
                    format!("  {} {} (failed after {} ms)", "x".red(), model, elapsed_ms)
                }
            }
            DeliberationEvent::Stage2Complete {
                hallucination: Some(report),
                ..
            } if report.has_concerns => format!(
                "  {} {} reliability signal(s), overall {:.2}",
                "!".yellow(),
                report.signals.len(),
                report.overall_confidence
            ),
            DeliberationEvent::TitleComplete { title } => format!("  title: {}", title),
            DeliberationEvent::Error { message, kind } => {
                format!("{} {} ({})", "Error:".red().bold(), message, kind)
            }
            _ => return None,
        };
        Some(line)
    }
}

/// Swallows every event (`--quiet`)
pub struct SilentProgress;

impl EventSink for SilentProgress {
    fn emit(&self, _event: DeliberationEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::{
        ErrorKind, HallucinationReport, LabelMap, ModelId, ModelResponse, Stage, SynthesisResult,
    };

    #[test]
    fn test_simple_progress_lines() {
        colored::control::set_override(false);

        let settled = DeliberationEvent::ModelSettled {
            stage: 1,
            model: ModelId::new("openai/o1"),
            success: false,
            elapsed_ms: 1500,
        };
        assert_eq!(
            SimpleProgress::describe(&settled).as_deref(),
            Some("  x openai/o1 (failed after 1500 ms)")
        );

        let start = DeliberationEvent::Stage3Start {
            chairman: ModelId::new("openai/o1"),
        };
        assert_eq!(
            SimpleProgress::describe(&start).as_deref(),
            Some("-> Stage 3: Synthesis (chairman openai/o1)")
        );

        let error = DeliberationEvent::stage_fatal(Stage::Stage1, "all council models failed");
        let line = SimpleProgress::describe(&error).unwrap();
        assert!(line.contains("all council models failed"));
        assert!(line.contains(&ErrorKind::StageFatal { stage: 1 }.to_string()));

        assert_eq!(SimpleProgress::describe(&DeliberationEvent::Complete), None);
    }

    fn stage2_complete(has_concerns: bool) -> DeliberationEvent {
        DeliberationEvent::Stage2Complete {
            evaluations: vec![],
            aggregate: vec![],
            label_map: LabelMap::default(),
            consensus: None,
            hallucination: Some(HallucinationReport {
                has_concerns,
                overall_confidence: 0.7,
                signals: vec![],
                reliability: vec![],
                recommendations: vec![],
            }),
            failures: vec![],
        }
    }

    #[test]
    fn test_simple_progress_reports_reliability_concerns() {
        colored::control::set_override(false);
        assert_eq!(
            SimpleProgress::describe(&stage2_complete(true)).as_deref(),
            Some("  ! 0 reliability signal(s), overall 0.70")
        );
        assert_eq!(SimpleProgress::describe(&stage2_complete(false)), None);
    }

    #[test]
    fn test_reporter_handles_a_full_stream() {
        let reporter = ProgressReporter::new();
        let model = ModelId::new("openai/o1");
        let events = vec![
            DeliberationEvent::Stage1Start {
                models: vec![model.clone()],
            },
            DeliberationEvent::ModelSettled {
                stage: 1,
                model: model.clone(),
                success: true,
                elapsed_ms: 10,
            },
            DeliberationEvent::Stage1Complete {
                responses: vec![ModelResponse::new(
                    model.clone(),
                    "hi",
                    Duration::from_millis(10),
                )],
                failures: vec![],
                confidence_leader: None,
            },
            DeliberationEvent::Stage3Start {
                chairman: model.clone(),
            },
            DeliberationEvent::Stage3Complete(SynthesisResult::new(model, "final")),
            DeliberationEvent::Complete,
        ];
        for event in events {
            reporter.emit(event);
        }
        assert!(reporter.stage_bar.lock().unwrap().is_none());
    }
}
