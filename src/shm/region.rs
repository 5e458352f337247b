/// Shared-memory segment bootstrap.
///
/// Opens or creates the named POSIX shared-memory object holding one
/// [`SharedHeader`]. Exactly one process wins the `O_CREAT | O_EXCL` race
/// and becomes the creator; it sizes the object, constructs the lock
/// objects, seeds the hash functions, resets the slot array and publishes
/// `initialized`. Everyone else maps and waits for that flag.
///
/// The segment outlives any process by design: nothing here unlinks on
/// drop. Removal is the explicit [`unlink`] operator call.
use std::fs::File;
use std::sync::atomic::{fence, Ordering};
use std::thread;
use std::time::Duration;

use memmap2::{MmapMut, MmapOptions};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use rand::Rng;
use tracing::{debug, trace};

use super::layout::{SharedHeader, SlotState, SEGMENT_SIZE};
use super::lock::{LockBackend, ShmMutex, TableLock};
use crate::error::{Result, ShmError};

/// Sleep between polls while waiting on the creator.
const INIT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// The mapped segment, owning the mapping for this process's lifetime.
pub(crate) struct ShmSegment {
    mmap: MmapMut,
    name: String,
    is_creator: bool,
}

impl ShmSegment {
    /// Open the named segment, creating and initializing it if this process
    /// wins the creation race.
    ///
    /// Returns only once the segment is fully initialized, whether by this
    /// process or by the creator it attached behind.
    pub(crate) fn open_or_create(name: &str, backend: LockBackend) -> Result<Self> {
        let mode = Mode::from_bits_truncate(0o666);

        let (file, is_creator) = match shm_open(name, OFlag::O_RDWR, mode) {
            Ok(fd) => (File::from(fd), false),
            Err(Errno::ENOENT) => {
                match shm_open(name, OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR, mode) {
                    Ok(fd) => (File::from(fd), true),
                    Err(Errno::EEXIST) => {
                        // Another process won the race between our two opens.
                        let fd = shm_open(name, OFlag::O_RDWR, mode).map_err(|source| {
                            ShmError::Open {
                                name: name.to_string(),
                                source,
                            }
                        })?;
                        (File::from(fd), false)
                    }
                    Err(source) => {
                        return Err(ShmError::Open {
                            name: name.to_string(),
                            source,
                        })
                    }
                }
            }
            Err(source) => {
                return Err(ShmError::Open {
                    name: name.to_string(),
                    source,
                })
            }
        };

        if is_creator {
            if let Err(source) = ftruncate(&file, SEGMENT_SIZE as libc::off_t) {
                let _ = shm_unlink(name);
                return Err(ShmError::Truncate {
                    name: name.to_string(),
                    size: SEGMENT_SIZE,
                    source,
                });
            }
        } else {
            // The creator may still sit between shm_open and ftruncate;
            // mapping a short object and touching it would fault.
            while (file.metadata()?.len() as usize) < SEGMENT_SIZE {
                thread::sleep(INIT_POLL_INTERVAL);
            }
        }

        // Safety: the fd refers to a shared-memory object of at least
        // SEGMENT_SIZE bytes; the mapping is shared so all attachers see
        // the same pages.
        let mmap = unsafe { MmapOptions::new().len(SEGMENT_SIZE).map_mut(&file) }.map_err(
            |source| ShmError::Map {
                name: name.to_string(),
                source,
            },
        )?;

        let segment = ShmSegment {
            mmap,
            name: name.to_string(),
            is_creator,
        };

        if is_creator {
            segment.init_shared_state(backend)?;
            debug!(
                name = %segment.name,
                size = SEGMENT_SIZE,
                "created and initialized shared segment"
            );
        } else {
            segment.wait_initialized();
            trace!(name = %segment.name, "attached to existing shared segment");
        }

        Ok(segment)
    }

    /// One-time initialization, creator only.
    fn init_shared_state(&self, backend: LockBackend) -> Result<()> {
        // Safety: until `initialized` is published no other process touches
        // the segment, so the creator has exclusive access here.
        let header = unsafe { self.header_mut() };

        unsafe {
            TableLock::init(backend, self.table_lock_area())
                .map_err(|source| ShmError::LockInit { source })?;
            ShmMutex::init(self.init_mutex_area())
                .map_err(|source| ShmError::LockInit { source })?;
        }

        header.live_count = 0;
        header.tomb_count = 0;
        header.hash_seed = rand::thread_rng().gen();
        for slot in header.slots.iter_mut() {
            slot.key = 0;
            slot.value[0] = 0;
            slot.state = SlotState::Empty as u32;
            slot.hash_primary = 0;
        }

        // Publish. Attachers pair this with the acquire fence after their
        // init wait; on weakly ordered machines the flag alone is not enough.
        fence(Ordering::Release);
        header.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Attacher path: spin until the creator has published the segment.
    fn wait_initialized(&self) {
        let header = self.header();
        while !header.initialized.load(Ordering::Acquire) {
            thread::sleep(INIT_POLL_INTERVAL);
        }
        fence(Ordering::Acquire);
    }

    #[must_use]
    pub(crate) fn header(&self) -> &SharedHeader {
        // Safety: the mapping is SEGMENT_SIZE bytes of repr(C) header.
        unsafe { &*(self.mmap.as_ptr() as *const SharedHeader) }
    }

    /// Mutable view of the header.
    ///
    /// # Safety
    /// Caller must hold the table write lock, or (during creation) have
    /// exclusive ownership of the unpublished segment.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn header_mut(&self) -> &mut SharedHeader {
        &mut *(self.mmap.as_ptr() as *mut SharedHeader)
    }

    /// Raw pointer to the table-lock storage in the header.
    pub(crate) fn table_lock_area(&self) -> *mut u8 {
        let header = self.mmap.as_ptr() as *mut SharedHeader;
        unsafe { std::ptr::addr_of_mut!((*header).table_lock) as *mut u8 }
    }

    fn init_mutex_area(&self) -> *mut u8 {
        let header = self.mmap.as_ptr() as *mut SharedHeader;
        unsafe { std::ptr::addr_of_mut!((*header).init_mutex) as *mut u8 }
    }

    #[must_use]
    pub(crate) fn is_creator(&self) -> bool {
        self.is_creator
    }

    #[must_use]
    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

/// Remove the named segment. Absence is not an error; processes that still
/// have it mapped keep their mapping until they exit.
pub(crate) fn unlink(name: &str) -> Result<()> {
    match shm_unlink(name) {
        Ok(()) => {
            debug!(name = %name, "unlinked shared segment");
            Ok(())
        }
        Err(Errno::ENOENT) => Ok(()),
        Err(source) => Err(ShmError::Unlink {
            name: name.to_string(),
            source,
        }),
    }
}
