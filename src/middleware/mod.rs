pub mod access;
pub mod response;

pub use access::{access_policy_middleware, fetch_profile};
pub use response::{ApiResponse, ApiResult};
