//! Pure payload work: path access, validation, field mapping and the
//! GraphQL documents the mapped variables feed into.

pub mod accessor;
pub mod documents;
pub mod mapper;
pub mod validator;

pub use accessor::{flatten_connection, get_path, set_path};
pub use documents::{GraphqlOperation, MutationBuilder};
pub use mapper::{transform, transform_at, Direction};
pub use validator::{validate, validate_webhook_event};
