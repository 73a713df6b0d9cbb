pub mod slip;
pub mod subscription_request;
pub mod user;

pub use slip::{Game, Slip};
pub use subscription_request::SubscriptionRequest;
pub use user::{Plan, Role, User};
