pub mod acknowledge;
pub mod send_event;
pub mod utils;
