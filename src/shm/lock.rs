/// Cross-process locks using POSIX pthread primitives with the
/// PTHREAD_PROCESS_SHARED attribute.
///
/// The lock objects live inside the shared segment's header so every
/// attaching process operates on the same lock state. Two backends are
/// shipped: the reader/writer lock (concurrent readers, exclusive writers)
/// and a recursive mutex that serializes everything.
///
/// A failing lock syscall is fatal: partially acquired or leaked lock state
/// would corrupt every subsequent operation, so the checks here are hard
/// asserts rather than recoverable errors.
use std::io;

use super::layout::{MUTEX_SEGMENT_NAME, RWLOCK_SEGMENT_NAME};

/// Which lock protects the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockBackend {
    /// Process-shared `pthread_rwlock_t`; read ops run concurrently.
    RwLock,
    /// Process-shared recursive `pthread_mutex_t`; readers serialize.
    Mutex,
}

impl LockBackend {
    /// The segment name conventionally used by this backend.
    #[must_use]
    pub fn default_segment(self) -> &'static str {
        match self {
            LockBackend::RwLock => RWLOCK_SEGMENT_NAME,
            LockBackend::Mutex => MUTEX_SEGMENT_NAME,
        }
    }
}

/// A handle to a process-shared rwlock stored in the segment.
pub(crate) struct ShmRwLock {
    lock_ptr: *mut libc::pthread_rwlock_t,
}

unsafe impl Send for ShmRwLock {}
unsafe impl Sync for ShmRwLock {}

impl ShmRwLock {
    /// Initialize a new rwlock at the given memory location.
    ///
    /// # Safety
    /// `ptr` must point to at least `size_of::<pthread_rwlock_t>()` bytes of
    /// properly aligned shared memory, exclusively owned by the caller until
    /// the segment is published.
    pub(crate) unsafe fn init(ptr: *mut u8) -> io::Result<Self> {
        let lock_ptr = ptr as *mut libc::pthread_rwlock_t;

        let mut attr: libc::pthread_rwlockattr_t = std::mem::zeroed();
        let ret = libc::pthread_rwlockattr_init(&mut attr);
        if ret != 0 {
            return Err(io::Error::from_raw_os_error(ret));
        }

        let ret = libc::pthread_rwlockattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED);
        if ret != 0 {
            libc::pthread_rwlockattr_destroy(&mut attr);
            return Err(io::Error::from_raw_os_error(ret));
        }

        let ret = libc::pthread_rwlock_init(lock_ptr, &attr);
        libc::pthread_rwlockattr_destroy(&mut attr);
        if ret != 0 {
            return Err(io::Error::from_raw_os_error(ret));
        }

        Ok(ShmRwLock { lock_ptr })
    }

    /// Attach to an already-initialized rwlock at the given memory location.
    ///
    /// # Safety
    /// `ptr` must point to a `pthread_rwlock_t` previously initialized by
    /// [`ShmRwLock::init`] in this or another process.
    pub(crate) unsafe fn from_existing(ptr: *mut u8) -> Self {
        ShmRwLock {
            lock_ptr: ptr as *mut libc::pthread_rwlock_t,
        }
    }

    /// Acquire a read lock. Blocks until available.
    fn read_lock(&self) {
        let ret = unsafe { libc::pthread_rwlock_rdlock(self.lock_ptr) };
        assert_eq!(ret, 0, "pthread_rwlock_rdlock failed: {ret}");
    }

    /// Acquire a write lock. Blocks until available.
    fn write_lock(&self) {
        let ret = unsafe { libc::pthread_rwlock_wrlock(self.lock_ptr) };
        assert_eq!(ret, 0, "pthread_rwlock_wrlock failed: {ret}");
    }

    fn unlock(&self) {
        let ret = unsafe { libc::pthread_rwlock_unlock(self.lock_ptr) };
        assert_eq!(ret, 0, "pthread_rwlock_unlock failed: {ret}");
    }
}

/// A handle to a process-shared recursive mutex stored in the segment.
pub(crate) struct ShmMutex {
    lock_ptr: *mut libc::pthread_mutex_t,
}

unsafe impl Send for ShmMutex {}
unsafe impl Sync for ShmMutex {}

impl ShmMutex {
    /// Initialize a new recursive, process-shared mutex at `ptr`.
    ///
    /// # Safety
    /// Same contract as [`ShmRwLock::init`].
    pub(crate) unsafe fn init(ptr: *mut u8) -> io::Result<Self> {
        let lock_ptr = ptr as *mut libc::pthread_mutex_t;

        let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
        let ret = libc::pthread_mutexattr_init(&mut attr);
        if ret != 0 {
            return Err(io::Error::from_raw_os_error(ret));
        }

        let ret = libc::pthread_mutexattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED);
        if ret != 0 {
            libc::pthread_mutexattr_destroy(&mut attr);
            return Err(io::Error::from_raw_os_error(ret));
        }

        let ret = libc::pthread_mutexattr_settype(&mut attr, libc::PTHREAD_MUTEX_RECURSIVE);
        if ret != 0 {
            libc::pthread_mutexattr_destroy(&mut attr);
            return Err(io::Error::from_raw_os_error(ret));
        }

        let ret = libc::pthread_mutex_init(lock_ptr, &attr);
        libc::pthread_mutexattr_destroy(&mut attr);
        if ret != 0 {
            return Err(io::Error::from_raw_os_error(ret));
        }

        Ok(ShmMutex { lock_ptr })
    }

    /// Attach to an already-initialized mutex at `ptr`.
    ///
    /// # Safety
    /// `ptr` must point to a `pthread_mutex_t` previously initialized by
    /// [`ShmMutex::init`] in this or another process.
    pub(crate) unsafe fn from_existing(ptr: *mut u8) -> Self {
        ShmMutex {
            lock_ptr: ptr as *mut libc::pthread_mutex_t,
        }
    }

    fn lock(&self) {
        let ret = unsafe { libc::pthread_mutex_lock(self.lock_ptr) };
        assert_eq!(ret, 0, "pthread_mutex_lock failed: {ret}");
    }

    fn unlock(&self) {
        let ret = unsafe { libc::pthread_mutex_unlock(self.lock_ptr) };
        assert_eq!(ret, 0, "pthread_mutex_unlock failed: {ret}");
    }
}

/// The table lock, dispatching to the configured backend.
///
/// On the mutex backend a "read" acquisition is an exclusive acquisition;
/// the semantics are identical, readers just serialize.
pub(crate) enum TableLock {
    Rw(ShmRwLock),
    Mutex(ShmMutex),
}

impl TableLock {
    /// Initialize the backend's lock object at `ptr` (creator only).
    ///
    /// # Safety
    /// Same contract as [`ShmRwLock::init`].
    pub(crate) unsafe fn init(backend: LockBackend, ptr: *mut u8) -> io::Result<Self> {
        Ok(match backend {
            LockBackend::RwLock => TableLock::Rw(ShmRwLock::init(ptr)?),
            LockBackend::Mutex => TableLock::Mutex(ShmMutex::init(ptr)?),
        })
    }

    /// Attach to the backend's lock object at `ptr`.
    ///
    /// # Safety
    /// `ptr` must hold a lock object initialized with the same backend.
    pub(crate) unsafe fn from_existing(backend: LockBackend, ptr: *mut u8) -> Self {
        match backend {
            LockBackend::RwLock => TableLock::Rw(ShmRwLock::from_existing(ptr)),
            LockBackend::Mutex => TableLock::Mutex(ShmMutex::from_existing(ptr)),
        }
    }

    /// Acquire shared. Blocks; released when the guard drops.
    pub(crate) fn read(&self) -> ReadGuard<'_> {
        match self {
            TableLock::Rw(lock) => lock.read_lock(),
            TableLock::Mutex(mutex) => mutex.lock(),
        }
        ReadGuard { lock: self }
    }

    /// Acquire exclusive. Blocks; released when the guard drops.
    pub(crate) fn write(&self) -> WriteGuard<'_> {
        match self {
            TableLock::Rw(lock) => lock.write_lock(),
            TableLock::Mutex(mutex) => mutex.lock(),
        }
        WriteGuard { lock: self }
    }

    fn release(&self) {
        match self {
            TableLock::Rw(lock) => lock.unlock(),
            TableLock::Mutex(mutex) => mutex.unlock(),
        }
    }
}

/// Shared acquisition; releases on drop, on every exit path.
#[must_use]
pub(crate) struct ReadGuard<'a> {
    lock: &'a TableLock,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Exclusive acquisition; releases on drop, on every exit path.
#[must_use]
pub(crate) struct WriteGuard<'a> {
    lock: &'a TableLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
