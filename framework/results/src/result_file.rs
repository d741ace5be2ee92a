use std::path::Path;

use serde::{Deserialize, Serialize};
use stairspeed_core::prelude::DecodePolicy;

use crate::{Document, NodeRecord, ResultParseError};

/// The reserved section describing the run rather than a node.
pub const BASIC_SECTION: &str = "Basic";

/// Values from the [`BASIC_SECTION`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultHeader {
    pub tester: Option<String>,
    pub generation_time: Option<String>,
}

/// A fully parsed result file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFile {
    pub header: ResultHeader,
    pub nodes: Vec<NodeRecord>,
}

impl ResultFile {
    pub fn parse(text: &str) -> Result<Self, ResultParseError> {
        let document = Document::parse(text)?;

        let header = document
            .section(BASIC_SECTION)
            .map(|basic| ResultHeader {
                tester: basic.get("Tester").map(str::to_string),
                generation_time: basic.get("GenerationTime").map(str::to_string),
            })
            .unwrap_or_default();

        let nodes = document
            .sections()
            .iter()
            .filter(|section| section.name != BASIC_SECTION)
            .map(NodeRecord::from_section)
            .collect();

        Ok(Self { header, nodes })
    }

    /// Read and parse a result file, decoding its bytes with `policy`.
    pub fn read_from_file<P>(path: P, policy: DecodePolicy) -> Result<Self, ResultParseError>
    where
        P: AsRef<Path>,
    {
        let bytes = std::fs::read(path)?;
        Self::parse(&policy.decode(&bytes))
    }
}

/// Read the node records from a result file, or nothing if the file can't be read.
///
/// Failures are logged rather than returned because a missing or broken result file is an
/// expected outcome of a failed speed test and should not stop a batch.
pub fn load_nodes<P>(path: P, policy: DecodePolicy) -> Vec<NodeRecord>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    match ResultFile::read_from_file(path, policy) {
        Ok(result) => {
            log::debug!(
                "Parsed {} node(s) from result file '{}'",
                result.nodes.len(),
                path.display()
            );
            result.nodes
        }
        Err(e) => {
            log::warn!("Failed to parse result file '{}': {e}", path.display());
            Vec::new()
        }
    }
}
