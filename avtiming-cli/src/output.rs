use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use stream_timing::{ContainerReport, Verdict};
use tracing::info;

#[derive(Serialize)]
struct VerdictEntry<'a> {
    stream: usize,
    kind: String,
    #[serde(flatten)]
    verdict: &'a Verdict,
}

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Renders the report. Without `dump` only the validation summary is
    /// produced.
    pub fn format_report(
        &self,
        report: &ContainerReport,
        format: OutputFormat,
        dump: bool,
    ) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_pretty(report, dump)),
            OutputFormat::Json => self.format_json(report, dump, true),
            OutputFormat::JsonCompact => self.format_json(report, dump, false),
        }
    }

    fn format_pretty(&self, report: &ContainerReport, dump: bool) -> String {
        let mut output = String::new();

        if dump {
            output.push_str(&report.to_string());
            output.push('\n');
        }

        output.push_str(&self.colorize("Duration validation:", &Color::Green, true));
        output.push('\n');
        if report.streams.is_empty() {
            output.push_str("  no streams\n");
        }
        for stream in &report.streams {
            let color = match stream.verdict {
                Verdict::Valid { .. } => Color::Green,
                Verdict::Invalid { .. } => Color::Red,
                Verdict::Skipped { .. } => Color::Yellow,
            };
            output.push_str(&format!(
                "  {}: {}\n",
                self.colorize(
                    &format!("stream[{}] {}", stream.metadata.index, stream.metadata.kind),
                    &Color::Cyan,
                    false
                ),
                self.colorize(&stream.verdict.to_string(), &color, false)
            ));
        }

        output
    }

    fn format_json(&self, report: &ContainerReport, dump: bool, pretty: bool) -> Result<String> {
        let value = if dump {
            serde_json::to_value(report)?
        } else {
            let verdicts: Vec<VerdictEntry<'_>> = report
                .streams
                .iter()
                .map(|s| VerdictEntry {
                    stream: s.metadata.index,
                    kind: s.metadata.kind.to_string(),
                    verdict: &s.verdict,
                })
                .collect();
            serde_json::json!({ "verdicts": verdicts })
        };

        let json = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(json)
    }

    /// Writes to `output_file` when given, stdout otherwise.
    pub fn write_output(&self, content: &str, output_file: Option<&Path>) -> Result<()> {
        match output_file {
            Some(path) => {
                std::fs::write(path, content)?;
                info!(path = %path.display(), "Output written");
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                if !content.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
            }
        }
        Ok(())
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Red => text.red(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold, self.colored);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Red,
    Cyan,
}
