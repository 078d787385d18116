use std::{fs, path::Path};

use util::config::{AppConfig, database_url, is_dsn};
use util::logging::init_logging;

mod runner;

#[tokio::main]
async fn main() {
    let cfg = AppConfig::global().clone();
    let _log_guard = init_logging(&cfg.log_file, &cfg.log_level, cfg.log_to_stdout);

    let db_path = cfg.database_path;
    let url = database_url(&db_path);

    match std::env::args().nth(1).as_deref() {
        Some("clean") => {
            remove_db_file(&db_path);
        }
        Some("fresh") => {
            remove_db_file(&db_path);
            create_db_dir(&db_path);
            runner::run_all_migrations(&url).await;
        }
        _ => {
            create_db_dir(&db_path);
            runner::run_all_migrations(&url).await;
        }
    }
}

/// The on-disk file behind `DATABASE_PATH`, or `None` when it is a DSN.
fn db_file(path: &str) -> Option<&Path> {
    (!is_dsn(path)).then(|| Path::new(path))
}

fn remove_db_file(path: &str) {
    let Some(db_path) = db_file(path) else {
        println!("DATABASE_PATH is a connection string, nothing to delete: {path}");
        return;
    };
    if !db_path.exists() {
        println!("DB file does not exist: {}", db_path.display());
        return;
    }
    match fs::remove_file(db_path) {
        Ok(()) => println!("Deleted DB: {}", db_path.display()),
        Err(e) => {
            eprintln!("Failed to delete {}: {e}", db_path.display());
            std::process::exit(1);
        }
    }
}

fn create_db_dir(path: &str) {
    let Some(parent) = db_file(path).and_then(Path::parent) else {
        return;
    };
    if let Err(e) = fs::create_dir_all(parent) {
        eprintln!("Failed to create DB directory {}: {e}", parent.display());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_strings_have_no_file() {
        assert!(db_file("sqlite://data/x.db").is_none());
        assert!(db_file("sqlite::memory:").is_none());
        assert_eq!(db_file("data/x.db"), Some(Path::new("data/x.db")));
        assert_eq!(database_url("sqlite://data/x.db"), "sqlite://data/x.db");
    }
}
