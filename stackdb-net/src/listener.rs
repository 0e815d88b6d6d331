use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

use stackdb_base::Result;
use tracing::{info, warn};

use crate::channel::{LineChannel, TcpLineChannel};

/// Accepts connections and spawns one session per connection (§4's
/// listener/dispatcher). This is a boundary contract: the core never sees
/// more than a `Box<dyn LineChannel>` handed to `spawn_session`.
pub struct Listener {
    listener: TcpListener,
}

impl Listener {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Ok(Listener { listener: TcpListener::bind(addr)? })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, spawning one OS thread per connection
    /// (matching the original's one-pthread-per-client model; §5). A single
    /// failed accept is logged and does not stop the listener.
    pub fn serve<F>(&self, spawn_session: F) -> !
    where
        F: Fn(Box<dyn LineChannel>) + Send + Sync + 'static,
    {
        let spawn_session = Arc::new(spawn_session);
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let spawn_session = spawn_session.clone();
                    match TcpLineChannel::new(stream) {
                        Ok(channel) => {
                            info!(target: "stackdb", peer = %addr, "accepted connection");
                            thread::spawn(move || spawn_session(Box::new(channel)));
                        }
                        Err(err) => {
                            warn!(target: "stackdb", peer = %addr, %err, "failed to wrap accepted connection");
                        }
                    }
                }
                Err(err) => {
                    warn!(target: "stackdb", %err, "failed to accept connection");
                }
            }
        }
    }
}
