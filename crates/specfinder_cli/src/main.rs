//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run one JSON batch of raw records into a SQLite profile store.
//! - Print the batch summary and the top ranked profiles.
//!
//! Usage: `specfinder_cli <db_path> <records.json> [log_dir]`

use specfinder_core::{
    default_log_level, init_logging, open_db, IngestService, RawRecord, SearchQuery,
    SqliteProfileStore,
};
use std::error::Error;
use std::process::ExitCode;

const TOP_RESULTS: i64 = 10;

fn main() -> ExitCode {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let (db_path, records_path) = match args.as_slice() {
        [db_path, records_path] | [db_path, records_path, _] => (db_path, records_path),
        _ => {
            eprintln!("usage: specfinder_cli <db_path> <records.json> [log_dir]");
            return ExitCode::from(2);
        }
    };

    if let Some(log_dir) = args.get(2) {
        if let Err(err) = init_logging(default_log_level(), log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(db_path, records_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(db_path: &str, records_path: &str) -> Result<(), Box<dyn Error>> {
    let payload = std::fs::read_to_string(records_path)?;
    let records: Vec<RawRecord> = serde_json::from_str(&payload)?;

    let mut conn = open_db(db_path)?;
    let store = SqliteProfileStore::try_new(&mut conn)?;
    let mut service = IngestService::with_defaults(store)?;

    let summary = service.run_batch(records)?;
    println!(
        "created={} updated={} unchanged={} rejected={} ambiguous={}",
        summary.profiles_created,
        summary.profiles_updated,
        summary.unchanged,
        summary.rejected,
        summary.ambiguous
    );

    for profile in service.search(&SearchQuery::new(TOP_RESULTS))? {
        println!(
            "{}\t{}\t{}\t{:.3}\t{:.3}",
            profile.id,
            profile.display_name,
            profile.country.as_ref().map_or("--", |code| code.as_str()),
            profile.reputation.value().unwrap_or(0.0),
            profile.ai_relevance.value().unwrap_or(0.0)
        );
    }
    Ok(())
}
