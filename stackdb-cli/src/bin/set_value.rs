use clap::Parser;
use stackdb_cli::Client;

/// Push a value and store it under a table/key.
#[derive(Parser)]
#[command(name = "set_value")]
struct Args {
    host: String,
    port: u16,
    username: String,
    table: String,
    key: String,
    value: String,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("set_value: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> stackdb_base::Result<()> {
    let mut client = Client::connect(&args.host, args.port)?;
    client.login(&args.username)?;
    client.push(&args.value)?;
    client.set(&args.table, &args.key)?;
    client.bye();
    Ok(())
}
