//! Password hashing, bearer tokens, and the authenticated-user extractor.

pub mod extractor;
pub mod password;
pub mod token;

pub use extractor::AuthUser;
pub use password::{hash_password, verify_password};
pub use token::{create_access_token, decode_access_token};
