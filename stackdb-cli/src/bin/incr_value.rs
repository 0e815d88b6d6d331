use clap::Parser;
use stackdb_cli::Client;

/// Increment the value stored under a table/key by one.
#[derive(Parser)]
#[command(name = "incr_value")]
struct Args {
    /// Run the increment as a single transaction.
    #[arg(short = 't', long = "transaction")]
    transaction: bool,

    host: String,
    port: u16,
    username: String,
    table: String,
    key: String,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("incr_value: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> stackdb_base::Result<()> {
    let mut client = Client::connect(&args.host, args.port)?;
    client.login(&args.username)?;
    if args.transaction {
        client.begin()?;
    }
    client.get(&args.table, &args.key)?;
    client.push("1")?;
    client.add()?;
    client.set(&args.table, &args.key)?;
    if args.transaction {
        client.commit()?;
    }
    client.bye();
    Ok(())
}
