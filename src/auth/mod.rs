pub mod authentication;
pub mod permissions;
pub mod sessions;
pub mod user;

pub use authentication::*;
pub use permissions::*;
pub use sessions::*;
pub use user::*;
