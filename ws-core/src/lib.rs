pub mod error;

pub use error::{ErrorCode, Result, WsError};
