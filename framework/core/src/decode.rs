use std::{borrow::Cow, fmt, str::FromStr};

/// How bytes that are not valid UTF-8 are turned into text.
///
/// The speed test executable writes its output and files in whatever encoding the host uses, so
/// every piece of text read from it goes through a [`DecodePolicy`] rather than failing on bad
/// bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Replace each invalid sequence with U+FFFD.
    #[default]
    Replace,
    /// Remove invalid sequences entirely.
    Drop,
}

impl DecodePolicy {
    /// Decode `bytes` into text according to this policy.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            DecodePolicy::Replace => String::from_utf8_lossy(bytes),
            DecodePolicy::Drop => match std::str::from_utf8(bytes) {
                Ok(s) => Cow::Borrowed(s),
                Err(_) => Cow::Owned(
                    bytes
                        .utf8_chunks()
                        .map(|chunk| chunk.valid())
                        .collect::<String>(),
                ),
            },
        }
    }

    /// Decode a single line of process output, stripping the trailing line terminator.
    pub fn decode_line(&self, bytes: &[u8]) -> String {
        let mut end = bytes.len();
        while end > 0 && matches!(bytes[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        self.decode(&bytes[..end]).into_owned()
    }
}

impl FromStr for DecodePolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(DecodePolicy::Replace),
            "drop" => Ok(DecodePolicy::Drop),
            _ => Err("Unknown decode policy, expected 'replace' or 'drop'"),
        }
    }
}

impl fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodePolicy::Replace => write!(f, "replace"),
            DecodePolicy::Drop => write!(f, "drop"),
        }
    }
}
