//! Artifact extraction from the model's final answer.

use regex::Regex;

/// Strategy for pulling a runnable artifact out of free-form model output.
pub trait ArtifactExtractor: Send + Sync {
    /// Returns the artifact, or `None` when the output holds no usable code.
    fn extract_artifact(&self, output: &str) -> Option<String>;
}

/// Takes the first fenced code block with a given language label.
///
/// When no such block exists, output that already starts with a function
/// definition is taken as-is.
#[derive(Debug, Clone)]
pub struct FencedBlockExtractor {
    pattern: Regex,
}

impl FencedBlockExtractor {
    /// Creates an extractor for blocks opened with "```" followed by `language`.
    pub fn new(language: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"(?s)```{}[ \t]*\r?\n(.*?)\r?\n[ \t]*```",
            regex::escape(language)
        ))?;
        Ok(Self { pattern })
    }

    /// Extractor for ```python blocks.
    pub fn python() -> Result<Self, regex::Error> {
        Self::new("python")
    }
}

impl ArtifactExtractor for FencedBlockExtractor {
    fn extract_artifact(&self, output: &str) -> Option<String> {
        if let Some(captures) = self.pattern.captures(output) {
            let code = captures.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            return (!code.is_empty()).then(|| code.to_string());
        }

        let trimmed = output.trim();
        if starts_with_definition(trimmed) {
            return Some(trimmed.to_string());
        }

        None
    }
}

fn starts_with_definition(text: &str) -> bool {
    text.strip_prefix("def")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FencedBlockExtractor {
        FencedBlockExtractor::python().unwrap()
    }

    #[test]
    fn test_first_fenced_block_wins() {
        let output = "Here is the fix:\n```python\ndef add(a, b):\n    return a + b\n```\n\
                      And a test:\n```python\nassert add(1, 2) == 3\n```";
        assert_eq!(
            extractor().extract_artifact(output).as_deref(),
            Some("def add(a, b):\n    return a + b")
        );
    }

    #[test]
    fn test_fenced_block_preferred_over_leading_def() {
        let output = "def broken():\n    pass\n\n```python\ndef fixed():\n    return 1\n```";
        assert_eq!(
            extractor().extract_artifact(output).as_deref(),
            Some("def fixed():\n    return 1")
        );
    }

    #[test]
    fn test_bare_definition_fallback() {
        let output = "\n  def add(a, b):\n    return a + b\n";
        assert_eq!(
            extractor().extract_artifact(output).as_deref(),
            Some("def add(a, b):\n    return a + b")
        );
    }

    #[test]
    fn test_no_code() {
        let e = extractor();
        assert_eq!(e.extract_artifact("I could not fix this function."), None);
        assert_eq!(e.extract_artifact(""), None);
        assert_eq!(e.extract_artifact("default values are wrong"), None);
        assert_eq!(e.extract_artifact("```python\n\n```"), None);
    }

    #[test]
    fn test_other_language_blocks_ignored() {
        let output = "```rust\nfn main() {}\n```";
        assert_eq!(extractor().extract_artifact(output), None);

        let rust = FencedBlockExtractor::new("rust").unwrap();
        assert_eq!(rust.extract_artifact(output).as_deref(), Some("fn main() {}"));
    }

    #[test]
    fn test_crlf_and_trailing_label_spaces() {
        let output = "```python  \r\nx = 1\r\n```";
        assert_eq!(extractor().extract_artifact(output).as_deref(), Some("x = 1"));
    }

    #[test]
    fn test_unclosed_fence_falls_through() {
        let output = "```python\ndef add(a, b):\n    return a + b";
        assert_eq!(extractor().extract_artifact(output), None);
    }
}
