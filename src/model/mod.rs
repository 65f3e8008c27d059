pub mod attendance;
pub mod message;
pub mod role;
