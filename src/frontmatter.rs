//! Frontmatter extraction for markdown post sources.
//!
//! A post file starts at byte 0 with a `---` delimiter line, followed by
//! `key: value` lines (blank lines ignored), a closing `---` line, and the
//! post body. Files without a leading block are not posts and parse to
//! `None` rather than an error.

use thiserror::Error;

/// Delimiter line that opens and closes the frontmatter block.
const DELIMITER: &str = "---";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("frontmatter block opened on line 1 is never closed")]
    Unterminated,
    #[error("malformed frontmatter line {line}: expected `key: value`, got {content:?}")]
    MalformedLine { line: usize, content: String },
}

/// A markdown source split into its frontmatter fields and body.
///
/// Fields keep their source order; interpretation of list and boolean
/// values is left to validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl Document {
    /// Look up a field value by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Split raw file text into frontmatter fields and body.
///
/// Returns `Ok(None)` when the file does not begin with a delimiter line.
///
/// # Errors
///
/// Returns an error when the block is opened but never closed, or contains
/// a line that is neither blank nor `key: value`.
pub fn parse(raw: &str) -> Result<Option<Document>, ParseError> {
    let mut lines = raw.lines().enumerate();

    match lines.next() {
        Some((_, first)) if first.trim_end() == DELIMITER => {}
        _ => return Ok(None),
    }

    let mut fields = Vec::new();
    let mut closed = false;

    for (idx, line) in &mut lines {
        let trimmed = line.trim();
        if trimmed == DELIMITER {
            closed = true;
            break;
        }
        if trimmed.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                fields.push((key.trim().to_string(), unquote(value.trim()).to_string()));
            }
            _ => {
                return Err(ParseError::MalformedLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            }
        }
    }

    if !closed {
        return Err(ParseError::Unterminated);
    }

    let body = lines.map(|(_, line)| line).collect::<Vec<_>>().join("\n");

    Ok(Some(Document { fields, body }))
}

/// Strip one level of matching surrounding quotes from a value.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
