//! Human-readable record of the commands a sync operation ran.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Result of one sync operation. Failures are reported here, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTranscript {
    pub success: bool,
    pub output: String,
}

impl SyncTranscript {
    /// A transcript for an operation that stopped before running anything.
    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            output: format!("✗ {}", reason.into()),
        }
    }
}

/// Outcome of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    /// `None` when the process could not be started or was killed.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        self.code == Some(0)
    }
}

/// Accumulates command sections, then closes with a verdict line.
#[derive(Debug, Default)]
pub(crate) struct TranscriptBuilder {
    output: String,
}

impl TranscriptBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn command(&mut self, outcome: &CommandOutcome) -> &mut Self {
        let code = outcome
            .code
            .map_or_else(|| "none".to_string(), |code| code.to_string());
        let _ = writeln!(self.output, "=== {} ===", outcome.command);
        let _ = writeln!(self.output, "exit code: {}", code);
        if !outcome.stdout.trim().is_empty() {
            let _ = writeln!(self.output, "stdout:\n{}", outcome.stdout.trim_end());
        }
        if !outcome.stderr.trim().is_empty() {
            let _ = writeln!(self.output, "stderr:\n{}", outcome.stderr.trim_end());
        }
        self.output.push('\n');
        self
    }

    pub(crate) fn note(&mut self, line: impl AsRef<str>) -> &mut Self {
        let _ = writeln!(self.output, "{}", line.as_ref());
        self
    }

    pub(crate) fn finish(&mut self, success: bool, verdict: &str) -> SyncTranscript {
        let mark = if success { "✓" } else { "✗" };
        let _ = write!(self.output, "{} {}", mark, verdict);
        SyncTranscript {
            success,
            output: std::mem::take(&mut self.output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_lists_commands_then_verdict() {
        let outcome = CommandOutcome {
            command: "git pull origin main".to_string(),
            code: Some(1),
            stdout: String::new(),
            stderr: "fatal: no remote\n".to_string(),
        };
        let transcript = TranscriptBuilder::new()
            .command(&outcome)
            .finish(false, "pull failed");
        assert!(!transcript.success);
        assert!(transcript.output.starts_with("=== git pull origin main ===\nexit code: 1\n"));
        assert!(transcript.output.contains("stderr:\nfatal: no remote\n"));
        assert!(!transcript.output.contains("stdout:"));
        assert!(transcript.output.ends_with("✗ pull failed"));
    }
}
