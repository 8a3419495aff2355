//! HTML report emitters
//!
//! Each emitter has two paths: render and write the primary document, or, if
//! either step fails, write a small diagnostic placeholder to the same path.
//! Callers always get an [`EmitOutcome`] back, never an error.

pub mod map;
pub mod tables;

pub use map::{emit_map, render_map, MapReport};
pub use tables::{emit_tables, render_tables};

use crate::error::{NetStatError, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// What ended up at an emitter's output path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Primary document written
    Primary { path: PathBuf, bytes: u64 },
    /// Primary path failed; placeholder written instead
    Fallback { path: PathBuf, reason: String },
    /// Neither document could be written
    Failed { path: PathBuf, reason: String },
}

impl EmitOutcome {
    pub fn path(&self) -> &Path {
        match self {
            EmitOutcome::Primary { path, .. }
            | EmitOutcome::Fallback { path, .. }
            | EmitOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, EmitOutcome::Primary { .. })
    }

    /// Something readable is at the output path
    pub fn wrote_file(&self) -> bool {
        !matches!(self, EmitOutcome::Failed { .. })
    }
}

impl fmt::Display for EmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitOutcome::Primary { path, bytes } => {
                write!(f, "saved to {} ({} bytes)", path.display(), bytes)
            }
            EmitOutcome::Fallback { path, reason } => {
                write!(f, "placeholder written to {} ({})", path.display(), reason)
            }
            EmitOutcome::Failed { path, reason } => {
                write!(f, "could not write {}: {}", path.display(), reason)
            }
        }
    }
}

/// Write `primary()` to `path`, or `fallback(reason)` if that fails
pub fn emit_with_fallback<P, F>(path: &Path, primary: P, fallback: F) -> EmitOutcome
where
    P: FnOnce() -> Result<String>,
    F: FnOnce(&str) -> String,
{
    let path_buf = path.to_path_buf();

    let reason = match primary().and_then(|doc| write_document(path, &doc)) {
        Ok(bytes) => {
            log::info!("Wrote {} ({} bytes)", path.display(), bytes);
            return EmitOutcome::Primary { path: path_buf, bytes };
        }
        Err(e) => e.to_string(),
    };

    log::error!("Failed to produce {}: {}", path.display(), reason);
    match write_document(path, &fallback(&reason)) {
        Ok(_) => EmitOutcome::Fallback { path: path_buf, reason },
        Err(e) => {
            log::error!("Could not create fallback file {}: {}", path.display(), e);
            EmitOutcome::Failed {
                path: path_buf,
                reason: format!("{}; fallback: {}", reason, e),
            }
        }
    }
}

fn write_document(path: &Path, contents: &str) -> Result<u64> {
    fs::write(path, contents)?;
    let bytes = fs::metadata(path)?.len();
    if bytes == 0 && !contents.is_empty() {
        return Err(NetStatError::Render(format!(
            "{} is empty after writing",
            path.display()
        )));
    }
    Ok(bytes)
}

/// Minimal standalone page used when a primary render fails
pub(crate) fn placeholder_page(title: &str, heading: &str, lines: &[String]) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str(&format!("    <p class=\"error\">{}</p>\n", escape_html(line)));
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <title>{}</title>\n    <meta charset=\"utf-8\">\n    <style>\n        body {{ font-family: Arial, sans-serif; padding: 20px; }}\n        .error {{ color: red; }}\n    </style>\n</head>\n<body>\n    <h1>{}</h1>\n{}</body>\n</html>\n",
        escape_html(title),
        escape_html(heading),
        body
    )
}

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">O'Neil & Co</a>"#),
            "&lt;a href=&quot;x&quot;&gt;O&#39;Neil &amp; Co&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_primary_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let outcome = emit_with_fallback(&path, || Ok("<html></html>".into()), |_| unreachable!());
        assert_eq!(
            outcome,
            EmitOutcome::Primary { path: path.clone(), bytes: 13 }
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
    }

    #[test]
    fn test_render_failure_writes_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let outcome = emit_with_fallback(
            &path,
            || Err(NetStatError::Render("boom".into())),
            |reason| placeholder_page("t", "h", &[format!("Error details: {}", reason)]),
        );
        assert!(matches!(outcome, EmitOutcome::Fallback { .. }));
        assert!(outcome.wrote_file());
        assert!(!outcome.is_primary());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Error details: Render error: boom"));
    }

    #[test]
    fn test_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.html");
        let outcome = emit_with_fallback(&path, || Ok("x".into()), |_| "y".into());
        assert!(matches!(outcome, EmitOutcome::Failed { .. }));
        assert!(!outcome.wrote_file());
        assert_eq!(outcome.path(), path.as_path());
    }
}
