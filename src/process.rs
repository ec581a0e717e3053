//! Run external commands.
//!
//! Commands are argument vectors; nothing is passed through a shell unless
//! the vector itself starts with one. A non-zero exit status is an error
//! and is never retried.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Result, VariantError};

fn quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|chr| chr.is_ascii_alphanumeric() || "-_./=:,+@%".contains(chr));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Render a command for display, quoting arguments as a shell would need.
pub fn command_line<S: AsRef<str>>(argv: &[S]) -> String {
    argv.iter()
        .map(|arg| quote(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Is `program` available in the search path?
pub fn command_exists(program: &str) -> bool {
    which::which(program).is_ok()
}

fn build(argv: &[String]) -> Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| VariantError::file("Cannot run an empty command"))?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    Ok(cmd)
}

/// Run a command with the standard streams inherited.
pub fn run(argv: &[String]) -> Result<()> {
    let mut cmd = build(argv)?;
    let command = command_line(argv);
    debug!("Running `{command}`");
    let status = cmd.status().map_err(|source| VariantError::Spawn {
        command: command.clone(),
        source,
    })?;
    if !status.success() {
        return Err(VariantError::Command { command, status });
    }
    Ok(())
}

/// Run a command and return its standard output.
///
/// The standard error stream is inherited so diagnostics reach the user.
pub fn output(argv: &[String]) -> Result<String> {
    let mut cmd = build(argv)?;
    let command = command_line(argv);
    debug!("Running `{command}` and capturing its output");
    let output = cmd
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|source| VariantError::Spawn {
            command: command.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(VariantError::Command {
            command,
            status: output.status,
        });
    }
    String::from_utf8(output.stdout).map_err(|err| {
        VariantError::file(format!("Could not decode the output of `{command}`: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_command_line_quoting() {
        assert_eq!(
            command_line(&["apt-get", "-q", "-y", "install", "--", "ca-certificates"]),
            "apt-get -q -y install -- ca-certificates"
        );
        assert_eq!(
            command_line(&["sh", "-c", "echo 'hi' there", ""]),
            r"sh -c 'echo '\''hi'\'' there' ''"
        );
        assert_eq!(
            command_line(&["yum", "--disablerepo=storpool-*"]),
            "yum '--disablerepo=storpool-*'"
        );
    }

    #[test]
    fn test_output_captures_stdout() {
        let out = output(&strs(&["sh", "-c", "printf 'a\\tb\\n'"])).unwrap();
        assert_eq!(out, "a\tb\n");
    }

    #[test]
    fn test_failure_status_is_reported() {
        let err = run(&strs(&["sh", "-c", "exit 3"])).unwrap_err();
        match err {
            VariantError::Command { command, status } => {
                assert_eq!(command, "sh -c 'exit 3'");
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            output(&strs(&["false"])),
            Err(VariantError::Command { .. })
        ));
    }

    #[test]
    fn test_missing_program_cannot_be_spawned() {
        let err = run(&strs(&["/nonexistent/sp-variant-test-program"])).unwrap_err();
        assert!(matches!(err, VariantError::Spawn { .. }));
    }

    #[test]
    fn test_empty_command() {
        assert!(matches!(run(&[]), Err(VariantError::File { .. })));
    }

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("sp-variant-no-such-program"));
    }
}
