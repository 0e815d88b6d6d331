use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Stack-based key-value store server.
#[derive(Parser)]
#[command(name = "stackdb")]
struct Args {
    /// Port to listen on.
    #[arg(long)]
    port: u16,

    /// Address to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(err) = stackdb::serve(&args.bind, args.port) {
        eprintln!("stackdb: {err}");
        std::process::exit(1);
    }
}
