mod channel;
mod clone;
mod user;

pub use channel::*;
pub use clone::*;
pub use user::*;
