pub mod body;
pub mod response;
pub mod validate;

pub use body::parse_body;
pub use response::{ApiError, Reply, WithData};
