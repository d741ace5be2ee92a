use std::collections::HashSet;

use crate::ResultParseError;

/// One `[name]` block and its entries, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: String) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    /// Look up a value by its exact, case-sensitive key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A parsed sectioned key/value document.
///
/// Section names and keys keep their case. Values are trimmed and an indented line directly
/// after an entry continues that entry's value on a new line. A section name may appear more than
/// once, each occurrence is its own [`Section`]. A key may appear only once per section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    pub fn parse(text: &str) -> Result<Self, ResultParseError> {
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

        let mut sections: Vec<Section> = Vec::new();
        let mut seen_keys = HashSet::new();
        // Whether the previous line was an entry that an indented line may continue.
        let mut can_continue = false;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                can_continue = false;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = raw.starts_with(char::is_whitespace);
            if indented && can_continue {
                if let Some((_, value)) = sections.last_mut().and_then(|s| s.entries.last_mut()) {
                    if !value.is_empty() {
                        value.push('\n');
                    }
                    value.push_str(trimmed);
                    continue;
                }
            }

            if let Some(name) = section_header(trimmed) {
                seen_keys.clear();
                sections.push(Section::new(name.to_string()));
                can_continue = false;
                continue;
            }

            let Some(section) = sections.last_mut() else {
                return Err(ResultParseError::MissingSectionHeader { line: line_no });
            };

            let Some((key, value)) = split_entry(trimmed) else {
                return Err(ResultParseError::MalformedLine {
                    line: line_no,
                    content: raw.to_string(),
                });
            };

            if !seen_keys.insert(key.to_string()) {
                return Err(ResultParseError::DuplicateKey {
                    line: line_no,
                    section: section.name.clone(),
                    key: key.to_string(),
                });
            }
            section.entries.push((key.to_string(), value.to_string()));
            can_continue = true;
        }

        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// The first section called `name`.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// `[name]` with at least one character between the brackets. Anything after the last `]` is
/// ignored.
fn section_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let end = rest.rfind(']')?;
    (end > 0).then(|| &rest[..end])
}

/// Split on the first `=` or `:`, whichever comes first. The key must not be empty.
fn split_entry(line: &str) -> Option<(&str, &str)> {
    let pos = line.find(['=', ':'])?;
    let key = line[..pos].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[pos + 1..].trim()))
}
