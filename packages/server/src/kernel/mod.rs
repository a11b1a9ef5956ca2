//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod test_dependencies;
pub mod traits;

pub use deps::{PgIdentityBackend, TwilioGateway, TEST_IDENTIFIER_CODE};
pub use traits::{BaseIdentityBackend, BaseVerificationGateway, GatewayError};
