//! Chroma template file format library

pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use error::TplError;
pub use format::{TplFile, TplHeader, TplMetadata, HEADER_SIZE, MAGIC, VERSION};
pub use reader::TplReader;
pub use writer::TplWriter;
