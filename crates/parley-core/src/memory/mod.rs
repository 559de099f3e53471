pub mod long_term;

pub use long_term::{BoxLongTermMemory, LongTermMemory, MemoryResponse};
