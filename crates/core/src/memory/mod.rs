pub mod conversation;
pub mod window;

pub use conversation::{ConversationMemory, MemoryError};
pub use window::BoundedWindow;
