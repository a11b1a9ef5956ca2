// HTTP middleware
pub mod bearer_auth;
pub mod concurrency;
pub mod service_key;

pub use bearer_auth::*;
pub use concurrency::*;
pub use service_key::*;
