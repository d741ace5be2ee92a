//! Reading the result files written by the speed test executable.
//!
//! A result file is an INI-like document with one `Basic` section describing the run and one
//! section per tested node, named `protocol|server|port`. See [`ResultFile`] for the strict
//! entry point and [`load_nodes`] for the forgiving one used by the batch runner.

mod document;
mod error;
mod node;
mod result_file;
mod sidecar;

pub use document::{Document, Section};
pub use error::ResultParseError;
pub use node::{NodeEndpoint, NodeRecord};
pub use result_file::{load_nodes, ResultFile, ResultHeader, BASIC_SECTION};
pub use sidecar::{load_original_urls, original_urls_path};
