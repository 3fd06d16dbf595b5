//! One formatting request: run `meson format` over a document and reconcile
//! the result into edits.

use std::path::{Path, PathBuf};

use crate::capability::Tool;
use crate::edits::{TextEdit, reconcile};
use crate::exec::{CommandSpec, ProcessRunner};
use crate::output::OutputSink;

/// Inputs of a single formatting call.
#[derive(Debug, Clone, Copy)]
pub struct FormatRequest<'a> {
    pub tool: &'a Tool,
    pub working_dir: &'a Path,
    pub original_text: &'a str,
}

/// `<tool> format [-c <config>] <stdin-arg>`
pub fn format_command(tool: &Tool, config_path: Option<&Path>, working_dir: &Path) -> CommandSpec {
    let mut command = CommandSpec::new(tool.path.clone()).arg("format");
    if let Some(config) = config_path {
        command = command.arg("-c").arg(config.display().to_string());
    }
    command.arg(tool.stdin.as_arg()).current_dir(PathBuf::from(working_dir))
}

/// Format the request's text, yielding one whole-document edit or none.
pub async fn format_document(
    runner: &dyn ProcessRunner,
    request: FormatRequest<'_>,
    config_path: Option<&Path>,
    sink: &dyn OutputSink,
) -> Vec<TextEdit> {
    let command = format_command(request.tool, config_path, request.working_dir);
    let result = runner.run(&command, request.original_text).await;
    reconcile(&result, request.original_text, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::StdinConvention;
    use crate::exec::{ExecError, ExecResult};
    use crate::output::MemorySink;
    use crate::version::Version;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn tool(stdin: StdinConvention) -> Tool {
        Tool {
            path: PathBuf::from("/usr/bin/meson"),
            version: Version::new(1, 7, 0),
            stdin,
        }
    }

    #[test]
    fn test_command_with_marker() {
        let command = format_command(&tool(StdinConvention::Marker), None, Path::new("/src"));
        assert_eq!(command.program, PathBuf::from("/usr/bin/meson"));
        assert_eq!(command.args, vec!["format", "-"]);
        assert_eq!(command.working_dir, Some(PathBuf::from("/src")));
    }

    #[test]
    fn test_command_with_config_and_special_path() {
        let t = tool(StdinConvention::SpecialPath("/proc/self/fd/0".to_string()));
        let command = format_command(&t, Some(Path::new("/src/meson.format")), Path::new("/src"));
        assert_eq!(command.args, vec!["format", "-c", "/src/meson.format", "/proc/self/fd/0"]);
    }

    struct RecordingRunner {
        result: ExecResult,
        seen: Mutex<Vec<(CommandSpec, String)>>,
    }

    #[async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, command: &CommandSpec, input: &str) -> ExecResult {
            self.seen.lock().unwrap().push((command.clone(), input.to_string()));
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn test_document_text_is_fed_on_stdin() {
        let runner = RecordingRunner {
            result: ExecResult {
                stdout: "project('x')\n".to_string(),
                ..Default::default()
            },
            seen: Mutex::new(Vec::new()),
        };
        let sink = MemorySink::new();
        let t = tool(StdinConvention::Marker);
        let request = FormatRequest {
            tool: &t,
            working_dir: Path::new("/src"),
            original_text: "project( 'x' )\n",
        };

        let edits = format_document(&runner, request, None, &sink).await;

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].new_text, "project('x')\n");
        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "project( 'x' )\n");
    }

    #[tokio::test]
    async fn test_failed_run_yields_no_edits() {
        let runner = RecordingRunner {
            result: ExecResult {
                stdout: String::new(),
                stderr: "syntax error at line 3".to_string(),
                error: Some(ExecError::Exit { code: 1 }),
            },
            seen: Mutex::new(Vec::new()),
        };
        let sink = MemorySink::new();
        let t = tool(StdinConvention::Marker);
        let request = FormatRequest {
            tool: &t,
            working_dir: Path::new("/src"),
            original_text: "project(\n",
        };

        assert!(format_document(&runner, request, None, &sink).await.is_empty());
        assert!(sink.lines().iter().any(|l| l.ends_with("syntax error at line 3")));
    }
}
