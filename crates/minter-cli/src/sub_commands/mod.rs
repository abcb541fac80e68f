pub mod connect;
pub mod count;
pub mod mint;
pub mod status;
pub mod watch;
