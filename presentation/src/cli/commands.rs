//! CLI command definitions

use clap::{Parser, ValueEnum};
use council_domain::{OutputFormat, VotingMethod};
use std::path::PathBuf;

/// Output format for deliberation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    /// Every stage: answers, peer rankings, aggregate and synthesis
    Full,
    /// Only the chairman's answer
    Synthesis,
    /// The whole result as JSON
    Json,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Full => OutputFormat::Full,
            OutputArg::Synthesis => OutputFormat::Synthesis,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

/// How peer rankings are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VotingArg {
    /// Mean position across reviewers (lower is better)
    AverageRank,
    /// N+1-position points per reviewer
    Borda,
    /// Mean of 1/position per reviewer
    ReciprocalRank,
    /// Borda points weighted by each reviewer's own answer confidence
    ConfidenceWeighted,
}

impl From<VotingArg> for VotingMethod {
    fn from(arg: VotingArg) -> Self {
        match arg {
            VotingArg::AverageRank => VotingMethod::AverageRank,
            VotingArg::Borda => VotingMethod::Borda,
            VotingArg::ReciprocalRank => VotingMethod::ReciprocalRank,
            VotingArg::ConfidenceWeighted => VotingMethod::ConfidenceWeighted,
        }
    }
}

/// CLI arguments for llm-council
#[derive(Parser, Debug)]
#[command(name = "llm-council")]
#[command(
    author,
    version,
    about = "LLM Council - several models answer, rank each other, and a chairman decides"
)]
#[command(long_about = r#"
LLM Council asks a council of models the same question and turns their
answers into one.

The process has three stages:
1. Answers: every council model answers your question in parallel
2. Peer ranking: each model ranks the anonymized answers ("Response A", ...)
3. Synthesis: a chairman model writes the final answer from everything

Configuration is merged from (highest priority first):
1. Command-line flags
2. LLM_COUNCIL_* environment variables (e.g. LLM_COUNCIL_COUNCIL__CHAIRMAN)
3. --config <path>     Explicit config file
4. ./council.toml      Project-level config
5. ~/.config/llm-council/config.toml   Global config

The OpenRouter API key is read from OPENROUTER_API_KEY.

Example:
  llm-council "What's the best way to handle errors in Rust?"
  llm-council -m openai/gpt-4o -m anthropic/claude-sonnet-4 --voting borda "Compare async runtimes"
  llm-council -o full --title "Is P = NP?"
"#)]
pub struct Cli {
    /// The question to ask the council
    #[arg(required_unless_present = "show_config")]
    pub question: Option<String>,

    /// Models to include in the council (can be specified multiple times)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Vec<String>,

    /// Model that synthesizes the final answer
    #[arg(long, value_name = "MODEL")]
    pub chairman: Option<String>,

    /// How peer rankings are aggregated
    #[arg(long, value_enum, value_name = "METHOD")]
    pub voting: Option<VotingArg>,

    /// Generate a short conversation title
    #[arg(long)]
    pub title: bool,

    /// Output format [default: synthesis, or [output] format from config]
    #[arg(short, long, value_enum)]
    pub output: Option<OutputArg>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and the effective configuration, then exit
    #[arg(long)]
    pub show_config: bool,

    /// Write every deliberation event to a JSONL transcript
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,

    /// Also write diagnostic logs to daily-rotated files in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Output format: flag first, then config, then the default
    pub fn output_format(&self, configured: Option<OutputFormat>) -> OutputFormat {
        self.output
            .map(OutputFormat::from)
            .or(configured)
            .unwrap_or_default()
    }
}
