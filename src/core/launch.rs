//! Executable resolution and process replacement.

use std::convert::Infallible;
use std::ffi::OsStr;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::core::env::Environment;
use crate::core::observe::{Event, Observer};
use crate::error::{LaunchError, Result};

/// Pipeline stages, in order. Any stage may fail instead of advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SecretsResolving,
    LimitsPlanning,
    EnvironmentAssembling,
    ExecutableResolving,
    LimitsApplying,
    Replacing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SecretsResolving => "resolving secrets",
            Self::LimitsPlanning => "planning limits",
            Self::EnvironmentAssembling => "assembling environment",
            Self::ExecutableResolving => "resolving executable",
            Self::LimitsApplying => "applying limits",
            Self::Replacing => "replacing process",
        })
    }
}

/// Find the file to execute for `program`.
///
/// - an existing path is used as is
/// - a missing name without a path separator is looked up in each directory
///   of `search_path` in order, first hit wins
/// - anything else is `LaunchError::NotFound`
///
/// A bare name found in the current directory is returned as `./name` so the
/// replacement call does not search `PATH` again.
pub fn resolve_executable(program: &str, search_path: Option<&OsStr>) -> Result<PathBuf> {
    let candidate = Path::new(program);

    match std::fs::metadata(candidate) {
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        _ => return Ok(anchor(candidate)),
    }

    if program.contains(MAIN_SEPARATOR) {
        return Err(LaunchError::NotFound(program.to_string()).into());
    }

    search_path
        .into_iter()
        .flat_map(|paths| std::env::split_paths(paths))
        .map(|dir| dir.join(program))
        .find(|path| path.exists())
        .map(|path| anchor(&path))
        .ok_or_else(|| LaunchError::NotFound(program.to_string()).into())
}

/// Prefix a bare relative name with `./`.
fn anchor(path: &Path) -> PathBuf {
    if path.is_relative() && path.parent().map_or(true, |p| p.as_os_str().is_empty()) {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

/// Replace the current process image with `target`.
///
/// `argv[0]` is passed through unchanged; the child sees exactly `env`.
/// Only returns on failure.
pub fn replace(
    target: &Path,
    argv: &[String],
    env: &Environment,
    observer: &dyn Observer,
) -> Result<Infallible> {
    observer.observe(Event::Launching {
        target: target.to_path_buf(),
        argv: argv.to_vec(),
    });
    exec(target, argv, env)
}

#[cfg(unix)]
fn exec(target: &Path, argv: &[String], env: &Environment) -> Result<Infallible> {
    use std::os::unix::process::CommandExt;

    let mut cmd = std::process::Command::new(target);
    if let Some((arg0, args)) = argv.split_first() {
        cmd.arg0(arg0).args(args);
    }
    cmd.env_clear().envs(env.iter());

    // exec() only returns on error
    let source = cmd.exec();
    Err(LaunchError::Exec {
        target: target.to_path_buf(),
        source,
    }
    .into())
}

#[cfg(not(unix))]
fn exec(_target: &Path, _argv: &[String], _env: &Environment) -> Result<Infallible> {
    Err(LaunchError::Unsupported.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::ffi::OsString;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\n").unwrap();
        path
    }

    fn path_of(dirs: &[&Path]) -> OsString {
        std::env::join_paths(dirs).unwrap()
    }

    #[test]
    fn test_existing_path_used_as_is() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "tool");
        let resolved = resolve_executable(file.to_str().unwrap(), None).unwrap();
        assert_eq!(resolved, file);
    }

    #[test]
    fn test_bare_name_found_on_search_path() {
        let bin = TempDir::new().unwrap();
        let file = touch(bin.path(), "launcher-test-tool-a");
        let path = path_of(&[bin.path()]);

        let resolved = resolve_executable("launcher-test-tool-a", Some(path.as_os_str())).unwrap();
        assert_eq!(resolved, file);
    }

    #[test]
    fn test_first_search_path_entry_wins() {
        let empty = TempDir::new().unwrap();
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let expected = touch(first.path(), "launcher-test-tool-b");
        touch(second.path(), "launcher-test-tool-b");
        let path = path_of(&[empty.path(), first.path(), second.path()]);

        let resolved = resolve_executable("launcher-test-tool-b", Some(path.as_os_str())).unwrap();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_missing_path_with_separator_skips_search() {
        let bin = TempDir::new().unwrap();
        touch(bin.path(), "tool");
        let path = path_of(&[bin.path()]);

        let err = resolve_executable("no/such/tool", Some(path.as_os_str())).unwrap_err();
        assert!(matches!(err, Error::Launch(LaunchError::NotFound(ref p)) if p == "no/such/tool"));
    }

    #[test]
    fn test_bare_name_not_on_path() {
        let bin = TempDir::new().unwrap();
        let path = path_of(&[bin.path()]);
        let err = resolve_executable("launcher-test-no-such-tool", Some(path.as_os_str())).unwrap_err();
        assert!(matches!(err, Error::Launch(LaunchError::NotFound(_))));

        let err = resolve_executable("launcher-test-no-such-tool", None).unwrap_err();
        assert!(matches!(err, Error::Launch(LaunchError::NotFound(_))));
    }

    #[test]
    fn test_anchor_bare_relative_name() {
        assert_eq!(anchor(Path::new("tool")), PathBuf::from("./tool"));
        assert_eq!(anchor(Path::new("bin/tool")), PathBuf::from("bin/tool"));
        assert_eq!(anchor(Path::new("/usr/bin/env")), PathBuf::from("/usr/bin/env"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_failure_returns_error() {
        let dir = TempDir::new().unwrap();
        // exists but is not executable
        let file = dir.path().join("data.txt");
        fs::write(&file, "plain text").unwrap();

        let recorder = crate::core::observe::Recorder::new();
        let err = replace(
            &file,
            &["data.txt".to_string()],
            &Environment::default(),
            &recorder,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Launch(LaunchError::Exec { .. })));
        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::SecretsResolving.to_string(), "resolving secrets");
        assert_eq!(Stage::Replacing.to_string(), "replacing process");
    }
}
