//! hazard_log - print how many hazards are logged and the first record.

use anyhow::Result;
use clap::Parser;

use hazard_stream::adapters::storage::SqliteHazardStore;

#[derive(Parser, Debug)]
#[command(name = "hazard_log", about = "Inspect the hazard log database")]
struct Args {
    /// Path to the hazard SQLite DB
    #[arg(long, env = "HAZARD_DB", default_value = "hazard_log.db")]
    db: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let store = SqliteHazardStore::open_existing(&args.db)?;

    println!("hazard_log: checking {}", args.db);
    println!("Total hazards logged: {}", store.total()?);
    match store.first()? {
        Some(h) => println!(
            "First record: id={} type={} timestamp={} location={} severity={}",
            h.id, h.hazard_type, h.timestamp, h.location_data, h.severity
        ),
        None => println!("No hazards logged yet."),
    }
    Ok(())
}
