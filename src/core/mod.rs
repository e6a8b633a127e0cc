//! 核心层：错误处理、中间件、存储抽象

pub mod error;
pub mod middleware;
pub mod response;
pub mod store;

pub use error::{CoreError, Violation};
pub use store::{MemoryStore, Resource, ResourceStore, StoreError};
