pub mod manager;
pub mod registry;

pub use manager::{ConversationManager, ManagerStats};
pub use registry::ManagerRegistry;
