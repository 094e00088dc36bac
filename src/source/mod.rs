pub mod decode;
pub mod reader;

pub use decode::{decode_line, DecodeError, LogRecord};
pub use reader::{ReaderError, TailLine, TailReader};
