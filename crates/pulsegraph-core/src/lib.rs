pub mod config_manager;
pub mod edge;
pub mod error;
pub mod node;
pub mod trace;
pub mod traits;
pub mod types;

pub use config_manager::*;
pub use edge::*;
pub use error::*;
pub use node::*;
pub use trace::*;
pub use traits::*;
pub use types::*;
