//! Fixed-capacity, cross-process key→value table in POSIX shared memory.
//!
//! The table maps `i32` keys to short NUL-terminated byte strings and lives
//! entirely inside one named shared-memory segment, so independently
//! started processes operate on the same data. Lookup is open addressing
//! with double hashing; deletion is lazy (tombstones) with an in-place
//! compaction pass when the logical load gets excessive.
//!
//! The first process to create the segment initializes it and publishes an
//! init flag; later processes attach and wait on that flag. A
//! process-shared reader/writer lock in the segment serializes writers
//! against everyone while letting readers run in parallel; a recursive
//! process-shared mutex is available as a degraded backend
//! ([`LockBackend::Mutex`]).
//!
//! ```no_run
//! use status_table::{LockBackend, OpStatus, StatusTable};
//!
//! let table = StatusTable::open(LockBackend::RwLock)?;
//! assert_eq!(table.add(7001, b"hello"), OpStatus::Ok);
//! assert_eq!(table.get(7001), b"hello");
//! # Ok::<(), status_table::ShmError>(())
//! ```

pub mod error;
pub mod ffi;
pub mod shm;

pub use error::{OpStatus, Result, ShmError};
pub use shm::layout::{CAPACITY, MAX_LIVE, VALUE_CAP};
pub use shm::{LockBackend, StatusTable, TableStats};
