//! Invocation of the Verible preprocessor, syntax exporter and formatter.

use crate::error::CliError;
use autoss_config::ToolsConfig;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// The external tools named in the configuration.
pub struct Toolchain<'a> {
    tools: &'a ToolsConfig,
}

impl<'a> Toolchain<'a> {
    /// Wraps the tool commands of a configuration.
    pub fn new(tools: &'a ToolsConfig) -> Self {
        Self { tools }
    }

    /// Expands macros and conditional directives of `path` with every
    /// configured define set.
    pub fn preprocess(&self, path: &Path) -> Result<String, CliError> {
        let mut command = Command::new(&self.tools.preprocessor);
        command.arg("preprocess");
        for define in &self.tools.defines {
            command.arg(format!("+define+{define}"));
        }
        command.arg(path);
        tracing::debug!(tool = %self.tools.preprocessor, path = %path.display(), "preprocessing");
        run(&self.tools.preprocessor, command, None)
    }

    /// Exports the concrete syntax tree of `text` as JSON.
    pub fn export_tree(&self, text: &str) -> Result<String, CliError> {
        let mut command = Command::new(&self.tools.syntax);
        command.args(["--export_json", "--printtree", "-"]);
        run(&self.tools.syntax, command, Some(text))
    }

    /// Pretty-prints `text`. A formatter failure is logged and the text is
    /// returned unchanged.
    pub fn format(&self, text: &str) -> String {
        let mut command = Command::new(&self.tools.formatter);
        command.arg("-").args(&self.tools.format_args);
        match run(&self.tools.formatter, command, Some(text)) {
            Ok(formatted) => formatted,
            Err(e) => {
                tracing::warn!("formatting failed, writing unformatted output: {e}");
                text.to_string()
            }
        }
    }
}

/// Runs `command`, feeding `stdin` if given, and returns its stdout.
fn run(tool: &str, mut command: Command, stdin: Option<&str>) -> Result<String, CliError> {
    let failed = |message: String| CliError::ExternalTool {
        tool: tool.to_string(),
        message,
    };
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|e| failed(e.to_string()))?;

    // Written from another thread so a tool that fills its stdout pipe
    // before draining stdin cannot deadlock.
    let writer = match (stdin, child.stdin.take()) {
        (Some(text), Some(mut pipe)) => {
            let text = text.to_string();
            Some(std::thread::spawn(move || pipe.write_all(text.as_bytes())))
        }
        _ => None,
    };
    let output: Output = child.wait_with_output().map_err(|e| failed(e.to_string()))?;
    if let Some(writer) = writer {
        match writer.join() {
            Ok(result) => result.map_err(|e| failed(e.to_string()))?,
            Err(_) => return Err(failed("stdin writer panicked".to_string())),
        }
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        return Err(failed(if stderr.is_empty() {
            output.status.to_string()
        } else {
            format!("{}: {stderr}", output.status)
        }));
    }
    String::from_utf8(output.stdout).map_err(|e| failed(format!("non-UTF-8 output: {e}")))
}
