//! Message, content block and option types.

mod content;
mod message;
mod options;

pub use content::*;
pub use message::*;
pub use options::*;
