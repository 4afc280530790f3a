pub mod issue;
pub mod message;

pub use issue::*;
pub use message::*;
