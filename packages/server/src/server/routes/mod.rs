// HTTP routes
pub mod auth;
pub mod health;
pub mod private;

pub use auth::*;
pub use health::*;
pub use private::*;
