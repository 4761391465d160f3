pub mod block;
pub mod config;
pub mod item;
pub mod write;

pub use block::*;
pub use config::*;
pub use item::*;
pub use write::*;
