// src/mirror/deb822.rs

//! Minimal deb822 (RFC 822 style) paragraph reader
//!
//! Used for mirror `Sources` indices and for exclusion stanzas. Field names
//! are matched case-insensitively. Continuation lines are joined to the
//! previous field with a newline, with the single leading space removed and
//! a lone `.` turned into an empty line.

use crate::error::{Error, Result};
use std::io::BufRead;

/// One stanza of `Field: value` pairs, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    fields: Vec<(String, String)>,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value by case-insensitive name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a field, replacing any existing value
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Iterate over `(name, value)` pairs in file order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Lines of a multi-line field, skipping the (usually empty) first line
    pub fn lines(&self, name: &str) -> impl Iterator<Item = &str> {
        self.get(name)
            .into_iter()
            .flat_map(|value| value.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

/// Streaming iterator over the paragraphs of a deb822 document
pub struct Paragraphs<R> {
    reader: R,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> Paragraphs<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            done: false,
        }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn next_paragraph(&mut self) -> Result<Option<Paragraph>> {
        let mut paragraph = Paragraph::new();

        while let Some(line) = self.read_line()? {
            if line.trim().is_empty() {
                if paragraph.is_empty() {
                    continue;
                }
                return Ok(Some(paragraph));
            }
            if line.starts_with('#') {
                continue;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                let Some((_, value)) = paragraph.fields.last_mut() else {
                    return Err(Error::ParseError(format!(
                        "line {}: continuation line without a field",
                        self.line_no
                    )));
                };
                let content = &line[1..];
                value.push('\n');
                if content.trim() != "." {
                    value.push_str(content);
                }
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(Error::ParseError(format!(
                    "line {}: expected `Field: value`, got {:?}",
                    self.line_no, line
                )));
            };
            paragraph
                .fields
                .push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok((!paragraph.is_empty()).then_some(paragraph))
    }
}

impl<R: BufRead> Iterator for Paragraphs<R> {
    type Item = Result<Paragraph>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_paragraph() {
            Ok(Some(paragraph)) => Some(Ok(paragraph)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse a whole in-memory document
pub fn parse_str(text: &str) -> Result<Vec<Paragraph>> {
    Paragraphs::new(text.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCES: &str = "\
Package: hello
Binary: hello
Version: 2.8-2
Directory: pool/main/h/hello
Checksums-Sha256:
 aaaa 1234 hello_2.8-2.dsc
 bbbb 5678 hello_2.8.orig.tar.gz
Section: devel

Package: libfoo
Version: 1.0-1
Description: a library
 first line
 .
 after blank
";

    #[test]
    fn test_parse_paragraphs() {
        let paragraphs = parse_str(SOURCES).unwrap();
        assert_eq!(paragraphs.len(), 2);

        let hello = &paragraphs[0];
        assert_eq!(hello.get("package"), Some("hello"));
        assert_eq!(hello.get("VERSION"), Some("2.8-2"));
        assert_eq!(
            hello.lines("checksums-sha256").collect::<Vec<_>>(),
            vec!["aaaa 1234 hello_2.8-2.dsc", "bbbb 5678 hello_2.8.orig.tar.gz"]
        );

        let libfoo = &paragraphs[1];
        assert_eq!(
            libfoo.get("Description"),
            Some("a library\nfirst line\n\nafter blank")
        );
    }

    #[test]
    fn test_comments_and_extra_blank_lines() {
        let text = "\n\n# excluded stuff\nPackage: foo\n\n\n\nPackage: bar\r\nFiles: *.jar\n";
        let paragraphs = parse_str(text).unwrap();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[1].get("Package"), Some("bar"));
        assert_eq!(paragraphs[1].get("files"), Some("*.jar"));
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        let err = parse_str("Package: foo\nnot a field\n").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));

        let err = parse_str(" orphan continuation\n").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_set_replaces_value() {
        let mut paragraph = Paragraph::new();
        paragraph.set("Package", "foo");
        paragraph.set("package", "bar");
        assert_eq!(paragraph.iter().count(), 1);
        assert_eq!(paragraph.get("Package"), Some("bar"));
    }
}
