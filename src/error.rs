use thiserror::Error;

/// Bootstrap and OS-level failures.
///
/// These are fatal to the caller: without a mapped, initialized segment none
/// of the table invariants can hold, so the open aborts instead of limping
/// along. Table-level conditions (missing key, duplicate, no space) are
/// deliberately *not* errors — they are [`OpStatus`] codes.
#[derive(Error, Debug)]
pub enum ShmError {
    /// `shm_open` failed for the named segment.
    #[error("shm_open('{name}') failed: {source}")]
    Open {
        name: String,
        #[source]
        source: nix::Error,
    },

    /// The creator could not size the fresh segment.
    #[error("ftruncate('{name}') to {size} bytes failed: {source}")]
    Truncate {
        name: String,
        size: usize,
        #[source]
        source: nix::Error,
    },

    /// Mapping the segment into the address space failed.
    #[error("mmap('{name}') failed: {source}")]
    Map {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A process-shared lock object could not be constructed.
    #[error("shared lock initialization failed: {source}")]
    LockInit {
        #[source]
        source: std::io::Error,
    },

    /// `shm_unlink` failed for a reason other than the segment being absent.
    #[error("shm_unlink('{name}') failed: {source}")]
    Unlink {
        name: String,
        #[source]
        source: nix::Error,
    },

    /// Other I/O error while probing the segment.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShmError>;

/// Return code of a table operation.
///
/// The numeric values are the cross-language surface shared with C callers
/// of the cdylib; they are stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpStatus {
    Ok = 0,
    NotFound = -1,
    NoSpace = -2,
    Duplicate = -3,
}

impl OpStatus {
    /// The raw integer code (`OK=0`, `NOT_FOUND=-1`, `NO_SPACE=-2`,
    /// `DUPLICATE=-3`).
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == OpStatus::Ok
    }
}

impl From<OpStatus> for i32 {
    fn from(status: OpStatus) -> i32 {
        status.code()
    }
}
