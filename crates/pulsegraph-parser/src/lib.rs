pub mod file_collect;
pub mod heuristics;
pub mod instrument;
pub mod language;
pub mod languages;
pub mod parser;

pub use file_collect::*;
pub use heuristics::*;
pub use instrument::{EditSet, Insertion, JavaInstrumenter};
pub use language::*;
pub use languages::*;
pub use parser::*;
