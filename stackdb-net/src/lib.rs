mod channel;
mod listener;

pub use channel::{LineChannel, TcpLineChannel};
pub use listener::Listener;
