//! Indentation-scoped source text buffer with idempotent saving.

use std::{
    fmt::{self, Write},
    fs,
    path::Path,
};

use quick_xml::escape::partial_escape;
use sha1::{Digest, Sha1};

use crate::Result;

/// Markup that passes through doc comments unescaped.
pub const DOC_ALLOWED_TAGS: [&str; 9] = [
    "<para>", "</para>", "<br/>", "<c>", "</c>", "<b>", "</b>", "<i>", "</i>",
];

const INDENT: &str = "    ";

/// Result of [`save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The file was created or its content replaced
    Written,
    /// The file already held identical bytes and was left untouched
    Unchanged,
}

/// Buffered source text with a scope counter.
///
/// Indentation is applied at the start of every non-empty line, whether the text arrives through
/// [`CodeWriter::line`] or through [`std::fmt::Write`] (`write!` / `writeln!`).
#[derive(Debug, Default, Clone)]
pub struct CodeWriter {
    buffer: String,
    depth: usize,
    line_start: bool,
}

impl CodeWriter {
    /// An empty writer at depth zero.
    #[must_use]
    pub fn new() -> Self {
        CodeWriter {
            buffer: String::new(),
            depth: 0,
            line_start: true,
        }
    }

    /// Current scope depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Write one line at the current depth.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !self.line_start {
            self.buffer.push('\n');
        }
        if !text.is_empty() {
            self.push_indent();
            self.buffer.push_str(text);
        }
        self.buffer.push('\n');
        self.line_start = true;
    }

    /// Write an empty line unless the previous line is already empty or opens a scope.
    pub fn blank(&mut self) {
        if self.buffer.is_empty() || self.buffer.ends_with("\n\n") || self.buffer.ends_with("{\n") {
            return;
        }
        self.line("");
    }

    /// Write `header` followed by an opening brace and enter the scope.
    pub fn open(&mut self, header: impl AsRef<str>) {
        self.line(header);
        self.line("{");
        self.depth += 1;
    }

    /// Leave the current scope and write the closing brace.
    pub fn close(&mut self) {
        self.close_with("");
    }

    /// Leave the current scope and write the closing brace followed by `suffix`, e.g. `;`.
    pub fn close_with(&mut self, suffix: &str) {
        self.depth = self.depth.saturating_sub(1);
        if self.buffer.ends_with("\n\n") {
            self.buffer.pop();
        }
        self.line(format!("}}{suffix}"));
    }

    /// Write a `///` summary block; every line is markup-escaped except [`DOC_ALLOWED_TAGS`].
    pub fn doc_comment(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.line("/// <summary>");
        for line in text.lines() {
            let line = escape_doc(line.trim_end());
            if line.is_empty() {
                self.line("///");
            } else {
                self.line(format!("/// {line}"));
            }
        }
        self.line("/// </summary>");
    }

    /// Write a `//` comment line.
    pub fn comment(&mut self, text: &str) {
        self.line(format!("// {text}"));
    }

    /// The text written so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Consume the writer, returning its text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }

    fn push_indent(&mut self) {
        for _ in 0..self.depth {
            self.buffer.push_str(INDENT);
        }
    }
}

impl Write for CodeWriter {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        for (index, segment) in text.split('\n').enumerate() {
            if index > 0 {
                self.buffer.push('\n');
                self.line_start = true;
            }
            if segment.is_empty() {
                continue;
            }
            if self.line_start {
                self.push_indent();
                self.line_start = false;
            }
            self.buffer.push_str(segment);
        }
        Ok(())
    }
}

/// Escape markup-significant characters of a doc comment line, keeping [`DOC_ALLOWED_TAGS`].
#[must_use]
pub fn escape_doc(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut rest = text;
    while !rest.is_empty() {
        if let Some(tag) = DOC_ALLOWED_TAGS.iter().find(|tag| rest.starts_with(**tag)) {
            escaped.push_str(tag);
            rest = &rest[tag.len()..];
            continue;
        }
        let next = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '<')
            .map_or(rest.len(), |(index, _)| index);
        escaped.push_str(&partial_escape(&rest[..next]));
        rest = &rest[next..];
    }
    escaped
}

/// SHA-1 of `data`, lower-case hex.
#[must_use]
pub fn content_digest(data: &[u8]) -> String {
    Sha1::digest(data)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Write `contents` to `path` unless the file already holds the same bytes.
///
/// Missing parent directories are created.
///
/// # Errors
/// Returns [`crate::Error::FileError`] if the file cannot be read or written.
pub fn save(path: &Path, contents: &str) -> Result<SaveOutcome> {
    if let Ok(existing) = fs::read(path) {
        if existing.len() == contents.len() && content_digest(&existing) == content_digest(contents.as_bytes()) {
            log::debug!("Unchanged {}", path.display());
            return Ok(SaveOutcome::Unchanged);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    log::debug!("Wrote {}", path.display());
    Ok(SaveOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes() {
        let mut writer = CodeWriter::new();
        writer.open("namespace Game");
        writer.open("public class Foo");
        writer.line("int x;");
        writer.blank();
        writer.close();
        writer.close();
        assert_eq!(
            writer.as_str(),
            "namespace Game\n{\n    public class Foo\n    {\n        int x;\n    }\n}\n"
        );
        assert_eq!(writer.depth(), 0);
    }

    #[test]
    fn fmt_write_indents() {
        let mut writer = CodeWriter::new();
        writer.open("class A");
        writeln!(writer, "int {} = {};", "x", 1).unwrap();
        write!(writer, "a\n\nb").unwrap();
        writer.close_with(";");
        assert_eq!(writer.as_str(), "class A\n{\n    int x = 1;\n    a\n\n    b\n};\n");
    }

    #[test]
    fn blank_lines_collapse() {
        let mut writer = CodeWriter::new();
        writer.blank();
        writer.line("a");
        writer.blank();
        writer.blank();
        writer.line("b");
        assert_eq!(writer.as_str(), "a\n\nb\n");
    }

    #[test]
    fn doc_escaping() {
        assert_eq!(escape_doc("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_doc("<c>Tick</c> <script>"), "<c>Tick</c> &lt;script&gt;");

        let mut writer = CodeWriter::new();
        writer.doc_comment("Fires <b>twice</b>\n\nthen stops");
        assert_eq!(
            writer.as_str(),
            "/// <summary>\n/// Fires <b>twice</b>\n///\n/// then stops\n/// </summary>\n"
        );
    }

    #[test]
    fn idempotent_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Game/Classes/AFoo.generated.cs");
        assert_eq!(save(&path, "class Foo {}\n").unwrap(), SaveOutcome::Written);
        assert_eq!(save(&path, "class Foo {}\n").unwrap(), SaveOutcome::Unchanged);
        assert_eq!(save(&path, "class Bar {}\n").unwrap(), SaveOutcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "class Bar {}\n");
    }
}
