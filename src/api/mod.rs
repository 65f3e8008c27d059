pub mod attendance;
pub mod me;
pub mod message;
pub mod report;
pub mod staff;
