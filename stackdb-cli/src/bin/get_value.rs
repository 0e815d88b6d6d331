use clap::Parser;
use stackdb_cli::Client;

/// Fetch a single value from a table and print it.
#[derive(Parser)]
#[command(name = "get_value")]
struct Args {
    host: String,
    port: u16,
    username: String,
    table: String,
    key: String,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("get_value: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> stackdb_base::Result<()> {
    let mut client = Client::connect(&args.host, args.port)?;
    client.login(&args.username)?;
    client.get(&args.table, &args.key)?;
    let value = client.top()?;
    println!("{value}");
    client.bye();
    Ok(())
}
