//! Demo reader: look up entries in the shared status table and print the
//! occupancy statistics.
//!
//! Usage: `status-reader [SEGMENT [KEY]...]`
//!
//! Exits non-zero if any requested key is missing.
use std::process::ExitCode;

use status_table::{LockBackend, StatusTable};

const DEMO_KEYS: &[i32] = &[7001, 7002, 7003, 7004, 7005, 8001];

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let table = match args.first() {
        Some(name) => StatusTable::open_named(name, LockBackend::RwLock),
        None => StatusTable::open(LockBackend::RwLock),
    };
    let table = match table {
        Ok(table) => table,
        Err(err) => {
            eprintln!("failed to open shared table: {err}");
            return ExitCode::FAILURE;
        }
    };

    let keys: Vec<i32> = if args.len() > 1 {
        let mut keys = Vec::with_capacity(args.len() - 1);
        for raw in &args[1..] {
            match raw.parse() {
                Ok(key) => keys.push(key),
                Err(_) => {
                    eprintln!("invalid key: {raw}");
                    return ExitCode::FAILURE;
                }
            }
        }
        keys
    } else {
        DEMO_KEYS.to_vec()
    };

    let mut missing = 0;
    for &key in &keys {
        if table.contains(key) {
            let value = table.get(key);
            println!("key {key}: {}", String::from_utf8_lossy(&value));
        } else {
            println!("key {key}: NOT FOUND");
            missing += 1;
        }
    }

    println!("total entries: {}", table.count());
    println!("{}", table.stats());

    if missing == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
