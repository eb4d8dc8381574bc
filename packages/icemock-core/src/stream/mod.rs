//! Stream content, ICY encoding, and the per-connection interleaver.

pub mod icy;
pub mod metadata;
pub mod session;
pub mod source;

pub use icy::{encode_handshake, IcyFormatter};
pub use metadata::MetadataCycle;
pub use session::{InterleaveSession, SessionEnd, SessionOptions, SessionReport, Step};
pub use source::{SourceCursor, StreamSource};
