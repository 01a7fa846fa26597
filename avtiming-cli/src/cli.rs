use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "avtiming",
    about = "avtiming - timestamp, duration and A/V sync diagnostics for FLV files and ffprobe packet dumps",
    version,
    author,
    args_conflicts_with_subcommands = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input: FLV file, ffprobe JSON packet dump, or an http(s) URL to either
    #[arg(short, long)]
    pub input: Option<String>,

    /// Do not print the per-stream timing dump
    #[arg(long)]
    pub disable_dump: bool,

    /// Strict validation: exit with a non-zero status if any stream's
    /// declared duration does not match its estimate
    #[arg(long)]
    pub validate: bool,

    /// Output format (defaults to the configured format)
    #[arg(short = 'f', long)]
    pub format: Option<OutputFormat>,

    /// Save output to file
    #[arg(short = 'O', long)]
    pub output_file: Option<PathBuf>,

    /// Input format, detected from the content when omitted
    #[arg(long, default_value = "auto")]
    pub input_format: InputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds for remote inputs (defaults to the
    /// configured timeout)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty-printed human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonCompact => write!(f, "json-compact"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// Detect from the first bytes
    #[default]
    Auto,
    /// FLV container
    Flv,
    /// `ffprobe -show_streams -show_packets -of json` output
    Ffprobe,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_analysis_flags() {
        let args = Args::try_parse_from([
            "avtiming",
            "-i",
            "input.flv",
            "--validate",
            "--disable-dump",
            "-f",
            "json-compact",
        ])
        .unwrap();
        assert_eq!(args.input.as_deref(), Some("input.flv"));
        assert!(args.validate);
        assert!(args.disable_dump);
        assert_eq!(args.format, Some(OutputFormat::JsonCompact));
        assert_eq!(args.input_format, InputFormat::Auto);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_subcommand() {
        let args = Args::try_parse_from(["avtiming", "config", "--show"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::Config {
                show: true,
                reset: false
            })
        ));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["avtiming", "-i", "a.flv", "-v", "-q"]).is_err());
    }
}
