/// Why a result file could not be read at all.
///
/// Individual bad values never produce one of these, they fall back to defaults in
/// [`crate::NodeRecord`]. Only problems with the shape of the document do.
#[derive(Debug, thiserror::Error)]
pub enum ResultParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: entry found before any section header")]
    MissingSectionHeader { line: usize },
    #[error("line {line}: expected `key = value`, got {content:?}")]
    MalformedLine { line: usize, content: String },
    #[error("line {line}: key {key:?} already defined in section [{section}]")]
    DuplicateKey {
        line: usize,
        section: String,
        key: String,
    },
}
