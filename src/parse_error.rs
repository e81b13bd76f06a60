//! Structured parse error handling for inline error display.
//!
//! A failed load keeps the tab open with the raw text; the host renders
//! the message, position, and offending line next to it.

/// Structured parse error for inline error display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub context_line: Option<String>,
    pub display_name: String,
}

impl ParseError {
    /// Create a ParseError from a serde_json error
    pub fn from_serde_error(e: &serde_json::Error, raw_text: &str, display_name: &str) -> Self {
        let line = e.line();
        let column = e.column();

        // Extract the problematic line from the raw text
        let context_line = raw_text
            .lines()
            .nth(line.saturating_sub(1))
            .map(|s| s.to_string());

        // Classify the error for a friendlier message
        let message = match e.classify() {
            serde_json::error::Category::Io => format!("I/O error: {}", e),
            serde_json::error::Category::Syntax => {
                // Strip serde_json's trailing "at line X column Y"
                let full = e.to_string();
                if let Some(idx) = full.find(" at line ") {
                    full[..idx].to_string()
                } else {
                    full
                }
            }
            serde_json::error::Category::Data => format!("Data error: {}", e),
            serde_json::error::Category::Eof => "Unexpected end of file".to_string(),
        };

        ParseError {
            message,
            line: Some(line),
            column: Some(column),
            context_line,
            display_name: display_name.to_string(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(
                    f,
                    "{}: {} (line {}, column {})",
                    self.display_name, self.message, line, column
                )
            }
            _ => write!(f, "{}: {}", self.display_name, self.message),
        }
    }
}

impl std::error::Error for ParseError {}
