pub mod broker;
pub mod trade;
pub mod user;

pub use broker::*;
pub use trade::*;
pub use user::*;
