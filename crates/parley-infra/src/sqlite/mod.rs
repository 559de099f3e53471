pub mod pool;
pub mod turn;

pub use pool::DatabasePool;
pub use turn::{SqliteMessageStore, StoreTotals};
