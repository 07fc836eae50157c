pub mod listener;
pub mod supervisor;
mod timeout_io;

pub use listener::{Listener, ListenerHandle, ListenerSpec};
pub use supervisor::ListenerSupervisor;
