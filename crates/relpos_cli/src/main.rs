//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `relpos_core` end to end against an in-memory store.
//! - Print the resulting order so wiring problems show up at a glance.
//! - Start file logging under `$RELPOS_LOG_DIR` (default: `<tmp>/relpos`).

use log::error;
use relpos_core::db::open_db_in_memory;
use relpos_core::{
    core_version, default_log_level, init_logging, OrderableItem, PositioningConfig,
    PositioningService, SqliteItemRepository,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

const LOG_DIR_ENV: &str = "RELPOS_LOG_DIR";

fn main() -> ExitCode {
    let log_dir = std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("relpos"));
    match run(&log_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("relpos: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(log_dir: &Path) -> Result<(), Box<dyn Error>> {
    init_logging(default_log_level(), &log_dir.to_string_lossy())?;
    println!("relpos_core version={}", core_version());

    let conn = open_db_in_memory()?;
    let repo = SqliteItemRepository::try_new(&conn)?;
    let mut service = PositioningService::new(repo, PositioningConfig::default())?;

    let board = Uuid::new_v4();
    let mut items: Vec<(&str, OrderableItem)> = Vec::new();
    for label in ["todo", "doing", "done"] {
        let mut item = service.create_item(board)?;
        service.move_to_end_and_save(&mut item)?;
        items.push((label, item));
    }

    // "done" jumps in front of "todo".
    let (head, tail) = items.split_at_mut(2);
    service.move_before_and_save(&mut tail[0].1, &head[0].1)?;

    for item in service.scoped_items(board)? {
        let label = items
            .iter()
            .find(|(_, known)| known.id == item.id)
            .map_or("?", |(label, _)| *label);
        println!(
            "{label:<6} id={} position={}",
            item.id,
            item.position
                .map_or_else(|| "unplaced".to_string(), |p| format!("{p:.3}"))
        );
    }
    Ok(())
}
