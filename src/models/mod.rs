pub mod user;
pub mod contact;
pub mod category;

pub use user::*;
pub use contact::*;
pub use category::*;
