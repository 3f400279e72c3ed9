pub mod message;
pub mod peers;
pub mod processor;
pub mod quorum;
pub mod store;

pub use message::*;
pub use peers::*;
pub use processor::*;
pub use quorum::*;
pub use store::*;
