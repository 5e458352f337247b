//! Demo writer: publish entries into the shared status table.
//!
//! Usage: `status-writer [SEGMENT [KEY VALUE]...]`
//!
//! With no key/value pairs a small demo data set is written. Exits
//! non-zero if any insert fails.
use std::process::ExitCode;

use status_table::{LockBackend, OpStatus, StatusTable};

const DEMO_ENTRIES: &[(i32, &str)] = &[
    (7001, "dynamic load test 1"),
    (7002, "dynamic load test 2"),
    (7003, "dynamic load test 3"),
    (7004, "dynamic load test 4"),
    (7005, "dynamic load test 5"),
];

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
    println!(
        "attached to {} (creator: {})",
        table.segment_name(),
        table.is_creator()
    );

    let pairs: Vec<(i32, String)> = if args.len() > 1 {
        let rest = &args[1..];
        if rest.len() % 2 != 0 {
            eprintln!("usage: status-writer [SEGMENT [KEY VALUE]...]");
            return ExitCode::FAILURE;
        }
        let mut pairs = Vec::with_capacity(rest.len() / 2);
        for chunk in rest.chunks_exact(2) {
            let key: i32 = match chunk[0].parse() {
                Ok(key) => key,
                Err(_) => {
                    eprintln!("invalid key: {}", chunk[0]);
                    return ExitCode::FAILURE;
                }
            };
            pairs.push((key, chunk[1].clone()));
        }
        pairs
    } else {
        DEMO_ENTRIES
            .iter()
            .map(|&(key, value)| (key, value.to_string()))
            .collect()
    };

    let mut failures = 0;
    for (key, value) in &pairs {
        match table.add(*key, value.as_bytes()) {
            OpStatus::Ok => println!("added {key} -> {value}"),
            status => {
                eprintln!("failed to add {key}: {:?} ({})", status, status.code());
                failures += 1;
            }
        }
    }
    println!("entries now live: {}", table.count());

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
