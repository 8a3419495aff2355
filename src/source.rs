//! Connection source: runs the OS connection-listing command
//!
//! Failures here never stop the pipeline. [`ConnectionSource::fetch_lines`]
//! turns a missing binary, an I/O error or a timeout into an empty line set
//! and logs the reason.

use crate::config::SourceConfig;
use crate::error::{NetStatError, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const REAP_POLL: Duration = Duration::from_millis(10);

/// Anything that can produce raw connection-table lines
pub trait ConnectionSource {
    /// Raw output lines; empty on failure
    fn fetch_lines(&self) -> Vec<String>;
}

/// Runs `netstat -an` (or the configured equivalent) with a hard time bound
#[derive(Debug, Clone)]
pub struct NetstatSource {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for NetstatSource {
    fn default() -> Self {
        Self::from_config(&SourceConfig::default())
    }
}

impl NetstatSource {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone(), config.timeout())
    }

    /// Command line as it would be typed, for diagnostics
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command and collect its standard output
    ///
    /// The child is killed if it outlives the configured timeout.
    pub fn run(&self) -> Result<Vec<String>> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| NetStatError::CommandFailed(format!("{}: {}", self.command_line(), e)))?;

        let mut stdout = child.stdout.take().ok_or_else(|| {
            NetStatError::CommandFailed(format!("{}: stdout not captured", self.command_line()))
        })?;

        let deadline = Instant::now() + self.timeout;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let res = stdout.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(res);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(buf)) => {
                // Stdout can close before the process exits.
                loop {
                    match child.try_wait() {
                        Ok(Some(status)) => {
                            if !status.success() {
                                log::warn!("{} exited with {}", self.command_line(), status);
                            }
                            break;
                        }
                        Ok(None) if Instant::now() >= deadline => {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(self.timed_out());
                        }
                        Ok(None) => thread::sleep(REAP_POLL),
                        Err(e) => {
                            log::warn!("Failed to reap {}: {}", self.command_line(), e);
                            break;
                        }
                    }
                }
                let text = String::from_utf8_lossy(&buf);
                Ok(text.lines().map(str::to_string).collect())
            }
            Ok(Err(e)) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(NetStatError::Io(e))
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(self.timed_out())
            }
        }
    }

    fn timed_out(&self) -> NetStatError {
        NetStatError::Timeout(format!(
            "{} did not finish within {}s",
            self.command_line(),
            self.timeout.as_secs_f64()
        ))
    }
}

impl ConnectionSource for NetstatSource {
    fn fetch_lines(&self) -> Vec<String> {
        match self.run() {
            Ok(lines) => {
                log::debug!("{} produced {} lines", self.command_line(), lines.len());
                lines
            }
            Err(e) => {
                log::error!("Error running {}: {}", self.command_line(), e);
                Vec::new()
            }
        }
    }
}

/// Fixed line set, for replaying captured output
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    lines: Vec<String>,
}

impl StaticSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Split captured command output into lines
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }
}

impl ConnectionSource for StaticSource {
    fn fetch_lines(&self) -> Vec<String> {
        self.lines.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runs_netstat() {
        let source = NetstatSource::default();
        assert_eq!(source.command_line(), "netstat -an");
    }

    #[test]
    fn test_missing_command_yields_empty() {
        let source = NetstatSource::new(
            "netstatwiz-no-such-binary",
            Vec::new(),
            Duration::from_secs(1),
        );
        assert!(matches!(source.run(), Err(NetStatError::CommandFailed(_))));
        assert!(source.fetch_lines().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout_lines() {
        let source = NetstatSource::new(
            "sh",
            vec!["-c".into(), "printf 'one\\ntwo\\n'".into()],
            Duration::from_secs(5),
        );
        assert_eq!(source.fetch_lines(), vec!["one".to_string(), "two".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_yields_empty() {
        let source = NetstatSource::new(
            "sleep",
            vec!["5".into()],
            Duration::from_millis(100),
        );
        assert!(matches!(source.run(), Err(NetStatError::Timeout(_))));
        assert!(source.fetch_lines().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_after_stdout_closes() {
        let source = NetstatSource::new(
            "sh",
            vec!["-c".into(), "echo early; exec >&-; sleep 5".into()],
            Duration::from_millis(300),
        );
        let start = std::time::Instant::now();
        assert!(matches!(source.run(), Err(NetStatError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_static_source_replays_text() {
        let source = StaticSource::from_text("a\nb\n");
        assert_eq!(source.fetch_lines(), vec!["a".to_string(), "b".to_string()]);
    }
}
