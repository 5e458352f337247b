/// `#[repr(C)]` structures that live in the shared-memory segment.
///
/// This layout is the contract between processes: every attacher casts the
/// mapping base to [`SharedHeader`], so all fields are fixed-size, there are
/// no pointers, and the slot array is addressed by index only. No version
/// field is persisted; processes built with different layout assumptions
/// must not attach.
use std::sync::atomic::AtomicBool;

/// Number of slots in the table. Must be a power of two so probe positions
/// can be masked instead of taking a modulo.
pub const CAPACITY: usize = 2048;

/// Mask for reducing a hash to a slot index.
pub const CAPACITY_MASK: u32 = CAPACITY as u32 - 1;

/// Rehash trigger threshold on `live + tombstones`.
pub const MAX_LOAD: f64 = 0.75;

/// Hard cap on occupied slots.
pub const MAX_LIVE: usize = (CAPACITY as f64 * MAX_LOAD) as usize;

/// Slot value size including the mandatory trailing NUL; payloads are at
/// most `VALUE_CAP - 1` bytes.
pub const VALUE_CAP: usize = 256;

/// Bytes reserved in the header for each lock object.
///
/// `pthread_rwlock_t` is 56 bytes on x86_64 Linux and 200 bytes on arm64
/// macOS; `pthread_mutex_t` is smaller on both. Over-allocating keeps the
/// header layout identical across platforms and lock backends.
pub const LOCK_AREA_SIZE: usize = 256;

/// Segment name used by the reader/writer-lock backend.
pub const RWLOCK_SEGMENT_NAME: &str = "/rwlock_optimized_status_memory";

/// Segment name used by the mutex backend.
pub const MUTEX_SEGMENT_NAME: &str = "/optimized_status_memory";

/// Total segment size: the header is the whole segment.
pub const SEGMENT_SIZE: usize = std::mem::size_of::<SharedHeader>();

const _: () = assert!(CAPACITY.is_power_of_two());
const _: () = assert!(MAX_LIVE == 1536);
const _: () = assert!(LOCK_AREA_SIZE >= std::mem::size_of::<libc::pthread_rwlock_t>());
const _: () = assert!(LOCK_AREA_SIZE >= std::mem::size_of::<libc::pthread_mutex_t>());

/// Lifecycle state of one slot.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Empty = 0,
    Occupied = 1,
    /// Logically deleted. Conducts probe sequences past it; reclaimed by
    /// insert reuse or rehash.
    Tombstone = 2,
}

impl SlotState {
    /// Decode the raw on-segment tag. Unknown values read as `Empty` so a
    /// torn or foreign byte can never be mistaken for live data.
    #[must_use]
    pub fn from_raw(raw: u32) -> SlotState {
        match raw {
            1 => SlotState::Occupied,
            2 => SlotState::Tombstone,
            _ => SlotState::Empty,
        }
    }
}

/// One cell of the table array.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Slot {
    pub key: i32,               // 0..4
    pub value: [u8; VALUE_CAP], // 4..260  (NUL-terminated)
    pub state: u32,             // 260..264
    pub hash_primary: u32,      // 264..268 (cached primary hash, for stats)
}

pub const SLOT_SIZE: usize = 268;

const _: () = assert!(std::mem::size_of::<Slot>() == SLOT_SIZE);

impl Slot {
    #[must_use]
    pub fn state(&self) -> SlotState {
        SlotState::from_raw(self.state)
    }

    /// The stored value up to (not including) the first NUL.
    #[must_use]
    pub fn value_bytes(&self) -> &[u8] {
        let end = self
            .value
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VALUE_CAP);
        &self.value[..end]
    }

    /// Copy `bytes` into the value area and NUL-terminate. Bytes beyond the
    /// terminator are left as-is; readers stop at the NUL.
    pub fn write_value(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() < VALUE_CAP);
        self.value[..bytes.len()].copy_from_slice(bytes);
        self.value[bytes.len()] = 0;
    }
}

/// Reserved, 8-aligned storage for one pthread lock object.
#[repr(C, align(8))]
pub struct LockArea(pub [u8; LOCK_AREA_SIZE]);

const _: () =
    assert!(std::mem::align_of::<LockArea>() >= std::mem::align_of::<libc::pthread_rwlock_t>());
const _: () =
    assert!(std::mem::align_of::<LockArea>() >= std::mem::align_of::<libc::pthread_mutex_t>());

/// Header at offset 0 of the segment; the slot array completes it.
///
/// `initialized` is the segment-wide init barrier: the creator publishes it
/// with release ordering only after both lock objects are constructed and
/// the slot array is reset, and attachers acquire-load it before their first
/// lock acquisition.
#[repr(C)]
pub struct SharedHeader {
    pub initialized: AtomicBool, // 0..1
    pub live_count: i32,         // 4..8
    pub tomb_count: i32,         // 8..12
    pub hash_seed: u32,          // 12..16
    pub table_lock: LockArea,    // 16..272  (rwlock or mutex, per backend)
    pub init_mutex: LockArea,    // 272..528 (recursive; reserved for init)
    pub slots: [Slot; CAPACITY], // 528..
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn header_field_offsets() {
        assert_eq!(offset_of!(SharedHeader, initialized), 0);
        assert_eq!(offset_of!(SharedHeader, live_count), 4);
        assert_eq!(offset_of!(SharedHeader, tomb_count), 8);
        assert_eq!(offset_of!(SharedHeader, hash_seed), 12);
        assert_eq!(offset_of!(SharedHeader, table_lock), 16);
        assert_eq!(offset_of!(SharedHeader, init_mutex), 16 + LOCK_AREA_SIZE);
        assert_eq!(offset_of!(SharedHeader, slots), 16 + 2 * LOCK_AREA_SIZE);
    }

    #[test]
    fn segment_size_covers_all_slots() {
        assert_eq!(SEGMENT_SIZE, 16 + 2 * LOCK_AREA_SIZE + CAPACITY * SLOT_SIZE);
    }

    #[test]
    fn slot_state_round_trip() {
        assert_eq!(SlotState::from_raw(SlotState::Empty as u32), SlotState::Empty);
        assert_eq!(
            SlotState::from_raw(SlotState::Occupied as u32),
            SlotState::Occupied
        );
        assert_eq!(
            SlotState::from_raw(SlotState::Tombstone as u32),
            SlotState::Tombstone
        );
        // Unknown tags degrade to Empty.
        assert_eq!(SlotState::from_raw(7), SlotState::Empty);
    }

    #[test]
    fn slot_value_round_trip() {
        let mut slot = Slot {
            key: 0,
            value: [0xAA; VALUE_CAP],
            state: 0,
            hash_primary: 0,
        };
        slot.write_value(b"hello");
        assert_eq!(slot.value_bytes(), b"hello");

        // Empty value is a lone NUL.
        slot.write_value(b"");
        assert_eq!(slot.value_bytes(), b"");

        // Largest legal payload.
        let max = vec![b'x'; VALUE_CAP - 1];
        slot.write_value(&max);
        assert_eq!(slot.value_bytes(), &max[..]);
    }
}
