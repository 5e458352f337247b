//! Operator tool: unlink shared status-table segments.
//!
//! Usage: `status-clean [SEGMENT...]`
//!
//! With no arguments both default segments (rwlock and mutex variants) are
//! removed. Absent segments are not errors.
use std::process::ExitCode;

use status_table::{LockBackend, StatusTable};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let outcome = if args.is_empty() {
        StatusTable::cleanup(LockBackend::RwLock)
            .and_then(|()| StatusTable::cleanup(LockBackend::Mutex))
    } else {
        args.iter()
            .try_for_each(|name| StatusTable::cleanup_named(name))
    };

    match outcome {
        Ok(()) => {
            println!("shared segments removed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("cleanup failed: {err}");
            ExitCode::FAILURE
        }
    }
}
