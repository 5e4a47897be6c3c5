pub mod ingest;
pub mod reconciled;
pub mod reconciler;
pub mod registry;

pub use ingest::*;
pub use reconciled::*;
pub use reconciler::*;
pub use registry::*;
