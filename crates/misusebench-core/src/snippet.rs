//! Code snippet extraction for published findings

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SnippetError;

/// An extracted code snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Snippet source text
    pub code: String,
    /// 1-based line number of the first snippet line in the original file
    pub first_line_number: usize,
}

/// Extract a snippet for a finding location
///
/// When a method name is given, the snippet is the declaration line and its
/// brace-balanced block; otherwise (or when the method cannot be found) the
/// whole file is returned from line 1.
pub fn extract_snippet(
    source_dir: &Path,
    file: &str,
    method: Option<&str>,
) -> Result<Snippet, SnippetError> {
    let path = source_dir.join(file);
    let content = fs::read_to_string(&path).map_err(|err| SnippetError::Unavailable {
        file: path.clone(),
        reason: err.to_string(),
    })?;

    if let Some(method) = method {
        // Match on the bare method name; metadata often records "name(Args)".
        let name = method.split('(').next().unwrap_or(method);
        if let Some(snippet) = extract_block(&content, name) {
            return Ok(snippet);
        }
    }

    Ok(Snippet {
        code: content,
        first_line_number: 1,
    })
}

/// Find the first line mentioning `name` and cut its brace-balanced block
fn extract_block(content: &str, name: &str) -> Option<Snippet> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.iter().position(|line| line.contains(name))?;

    let mut depth = 0usize;
    let mut opened = false;
    let mut end = start;
    for (offset, line) in lines[start..].iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        end = start + offset;
        if opened && depth == 0 {
            break;
        }
    }

    Some(Snippet {
        code: lines[start..=end].join("\n"),
        first_line_number: start + 1,
    })
}
