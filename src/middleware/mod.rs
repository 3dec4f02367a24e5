pub mod auth;
pub mod json;
pub mod path;
pub mod response;

pub use auth::{authenticate, AuthSubject, Identity};
pub use json::JsonBody;
pub use path::ResourceId;
pub use response::{ApiResponse, ApiResult};
