// src/external.rs

use crate::error::{BridgeError, BridgeResult};
use git2::Repository;
use std::fs::File;
use std::path::{Component, Path};
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;
use tracing::{info, warn};

pub const INPUT_PLACEHOLDER: &str = "{input}";
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// A formatter command line with optional `{input}`/`{output}` slots.
/// Without `{input}` the file is fed on stdin; without `{output}` stdout is
/// captured.
#[derive(Debug, Clone)]
pub struct FormatterCommand {
    argv: Vec<String>,
    input: Option<usize>,
    output: Option<usize>,
}

fn placeholder(argv: &[String], name: &str) -> BridgeResult<Option<usize>> {
    let mut found = argv.iter().enumerate().filter(|(_, arg)| arg.as_str() == name);
    let first = found.next().map(|(i, _)| i);
    if found.next().is_some() {
        return Err(BridgeError::InvalidFormatter(format!(
            "can only specify {name} once"
        )));
    }
    Ok(first)
}

impl FormatterCommand {
    pub fn new(argv: Vec<String>) -> BridgeResult<Self> {
        if argv.is_empty() {
            return Err(BridgeError::InvalidFormatter("no command given".to_string()));
        }
        let input = placeholder(&argv, INPUT_PLACEHOLDER)?;
        let output = placeholder(&argv, OUTPUT_PLACEHOLDER)?;
        Ok(FormatterCommand {
            argv,
            input,
            output,
        })
    }

    pub fn reads_stdin(&self) -> bool {
        self.input.is_none()
    }

    /// Checks the command can serve `files` files; stdin only fits one.
    pub fn validate_for(&self, files: &[impl AsRef<Path>]) -> BridgeResult<()> {
        if !self.reads_stdin() {
            return Ok(());
        }
        match files {
            [only] => {
                warn!("reading from stdin instead of {}", only.as_ref().display());
                Ok(())
            }
            _ => Err(BridgeError::InvalidFormatter(format!(
                "must specify {INPUT_PLACEHOLDER} in formatter command for multiple files"
            ))),
        }
    }

    fn command_line(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut argv = self.argv.clone();
        if let Some(i) = self.input {
            argv[i] = input.to_string_lossy().into_owned();
        }
        if let Some(i) = self.output {
            argv[i] = output.to_string_lossy().into_owned();
        }
        argv
    }

    /// Formats `file` into a temporary file, removed once it is dropped.
    pub fn run(&self, file: &Path) -> BridgeResult<NamedTempFile> {
        let prefix = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let formatted = tempfile::Builder::new().prefix(&prefix).tempfile()?;

        let argv = self.command_line(file, formatted.path());
        info!("running formatter: [{}]", argv.join(", "));

        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        match self.input {
            None => command.stdin(Stdio::from(File::open(file)?)),
            Some(_) => command.stdin(Stdio::null()),
        };
        match self.output {
            None => command.stdout(Stdio::from(formatted.as_file().try_clone()?)),
            Some(_) => command.stdout(Stdio::inherit()),
        };

        let status = command
            .status()
            .map_err(|e| BridgeError::Formatter(format!("{}: {e}", argv[0])))?;
        if !status.success() {
            return Err(BridgeError::Formatter(format!("{} exited with {status}", argv[0])));
        }
        Ok(formatted)
    }
}

/// Tool output as text. Bytes that are not UTF-8 fail the file rather than
/// being replaced, since patches must reproduce the file exactly.
fn tool_text(program: &str, file: &Path, stdout: Vec<u8>) -> BridgeResult<String> {
    String::from_utf8(stdout).map_err(|e| BridgeError::ExternalTool {
        program: program.to_string(),
        detail: format!("output for {} is not UTF-8: {e}", file.display()),
    })
}

fn tool_failure(program: &str, output: &std::process::Output) -> BridgeError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    BridgeError::ExternalTool {
        program: program.to_string(),
        detail: format!("{} {}", output.status, stderr.trim()),
    }
}

/// `diff -u -d original formatted`. Identical files give an empty diff.
pub fn unified_diff(original: &Path, formatted: &Path) -> BridgeResult<String> {
    let output = Command::new("diff")
        .args(["-u", "-d"])
        .arg(original)
        .arg(formatted)
        .output()?;
    // Exit status 1 only means the files differ.
    match output.status.code() {
        Some(0) | Some(1) => tool_text("diff", original, output.stdout),
        _ => Err(tool_failure("diff", &output)),
    }
}

/// Porcelain blame for the committed and working-tree state of `file`.
pub fn blame(file: &Path) -> BridgeResult<String> {
    let dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = file.file_name().unwrap_or(file.as_os_str());
    let output = Command::new("git")
        .args(["blame", "-p", "--"])
        .arg(name)
        .current_dir(dir)
        .output()?;
    if !output.status.success() {
        return Err(tool_failure("git blame", &output));
    }
    tool_text("git blame", file, output.stdout)
}

/// Path of `file` relative to the root of the work tree containing it,
/// with `/` separators, as used in patch file headers.
pub fn repo_relative_path(file: &Path) -> BridgeResult<String> {
    let absolute = file.canonicalize()?;
    let repo = Repository::discover(absolute.parent().unwrap_or(&absolute))?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| git2::Error::from_str("repository has no work tree"))?
        .canonicalize()?;
    let relative = absolute.strip_prefix(&workdir).map_err(|_| {
        git2::Error::from_str(&format!(
            "{} is outside the work tree {}",
            absolute.display(),
            workdir.display()
        ))
    })?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|part| match part {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}
