mod abort;
mod decode;
mod signal;

pub mod prelude {
    pub use crate::abort::BatchAbortError;
    pub use crate::decode::DecodePolicy;
    pub use crate::signal::{CompletionSentinel, LogMarker};
}
