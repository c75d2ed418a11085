//! Offline audit of a resolved round
//!
//! Reads a `RoundRecord` as JSON (from the history endpoint or a forfeit
//! response) and recomputes its crash point from the recorded seed.

use ascent::games::{round_engine::verify_round, HouseEdge, RoundRecord};
use clap::Parser;
use std::fs;

#[derive(Parser, Debug)]
#[command(name = "verify_round")]
#[command(about = "Recompute and check a crash round's outcome", long_about = None)]
struct Args {
    /// Path to the round record JSON
    #[arg(short, long)]
    record: String,

    /// House edge the round was played under
    #[arg(long, default_value = "0.01")]
    house_edge: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let edge = HouseEdge::new(args.house_edge)?;
    let raw = fs::read_to_string(&args.record)?;
    let record: RoundRecord = serde_json::from_str(&raw)?;

    println!("Round:        {}", record.round_id);
    println!("Bet:          {}", record.bet);
    println!("Crash point:  {:.2}", record.crash_point);

    match verify_round(&record, edge) {
        Ok(computed) => {
            println!("Recomputed:   {:.2}", computed);
            println!("✅ Round verified");
            Ok(())
        }
        Err(e) => {
            println!("❌ Verification failed: {}", e);
            Err(e.into())
        }
    }
}
