pub mod access_guard;

pub use access_guard::{AccessError, AccessGuard};
