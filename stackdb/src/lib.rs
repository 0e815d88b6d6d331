//! Wiring for the listener binary: bind a `Listener`, hand every accepted
//! connection to a session against a shared `TableRegistry`. Kept separate
//! from `src/bin.rs` so the server can be driven from an integration test
//! without going through argument parsing or installing a log subscriber.

use std::sync::Arc;

use stackdb_base::Result;
use stackdb_net::Listener;
use stackdb_store::TableRegistry;
use tracing::info;

/// Binds `bind:port` and serves connections forever. Never returns on
/// success; the only way out is a bind failure.
pub fn serve(bind: &str, port: u16) -> Result<()> {
    let listener = Listener::bind((bind, port))?;
    serve_listener(listener)
}

/// Serves connections on an already-bound `Listener`. Split out from
/// [`serve`] so tests can bind an ephemeral port, read it back, and drive
/// the server without needing a fixed port number.
pub fn serve_listener(listener: Listener) -> ! {
    let registry = Arc::new(TableRegistry::new());
    if let Ok(addr) = listener.local_addr() {
        info!(target: "stackdb", %addr, "listening");
    }
    listener.serve(move |channel| {
        stackdb_session::run_session(channel, registry.clone());
    });
}
