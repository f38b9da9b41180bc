pub mod item_parser;
pub mod item_serializer;
pub mod rtf;
pub mod source;

pub use item_parser::parse;
pub use item_serializer::{apply_checkbox_states, reconstruct};
pub use source::{ParseError, decode_source};
