pub mod error;
pub mod types;

pub use error::{EtlError, EtlResult};
pub use types::ServiceInfo;
