/// Shared-memory status table.
///
/// Provides [`StatusTable`] — a fixed-capacity, cross-process `i32` → bytes
/// table living in a POSIX shared-memory segment. The whole structure
/// (init flag, counters, lock objects, slot array) is one `#[repr(C)]`
/// header; processes address slots by index only, so the mapping address
/// may differ per process.
///
/// Every operation takes the segment's process-shared lock: reads acquire
/// shared, mutations acquire exclusive. Deletion is lazy (tombstones); a
/// compaction pass rebuilds the table in place when live entries plus
/// tombstones would cross the load ceiling.
pub mod hash;
pub mod layout;
mod lock;
pub mod probe;
mod region;

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::error::{OpStatus, Result};
use hash::{primary_hash, secondary_hash};
use layout::{SharedHeader, SlotState, CAPACITY, MAX_LIVE, VALUE_CAP};
use lock::TableLock;
use probe::{find_insert_slot, find_occupied, probe_distance, InsertSlot};
use region::ShmSegment;

pub use lock::LockBackend;

/// Handle to the shared table.
///
/// One instance per process per segment is typical, but additional handles
/// to the same segment are fine — they share the same pages and lock
/// objects. The handle owns this process's mapping; dropping it unmaps but
/// never removes the segment (see [`StatusTable::cleanup`]).
pub struct StatusTable {
    segment: ShmSegment,
    lock: TableLock,
}

// All access to the shared state goes through the process-shared table
// lock, so handles may be shared and sent across threads.
unsafe impl Send for StatusTable {}
unsafe impl Sync for StatusTable {}

impl StatusTable {
    /// Open (or create and initialize) the backend's default segment.
    pub fn open(backend: LockBackend) -> Result<Self> {
        Self::open_named(backend.default_segment(), backend)
    }

    /// Open (or create and initialize) a specific named segment.
    ///
    /// The name must be a valid POSIX shared-memory object name (leading
    /// `/`, no other slashes). All processes attaching to one segment must
    /// use the same lock backend; the header does not record which backend
    /// initialized it.
    pub fn open_named(name: &str, backend: LockBackend) -> Result<Self> {
        let segment = ShmSegment::open_or_create(name, backend)?;
        // Safety: the segment is initialized (we either initialized it or
        // waited for the creator), so the lock object exists.
        let lock = unsafe { TableLock::from_existing(backend, segment.table_lock_area()) };
        Ok(StatusTable { segment, lock })
    }

    /// Remove the backend's default segment. Operator action; absent
    /// segment is not an error.
    pub fn cleanup(backend: LockBackend) -> Result<()> {
        region::unlink(backend.default_segment())
    }

    /// Remove a specific named segment.
    pub fn cleanup_named(name: &str) -> Result<()> {
        region::unlink(name)
    }

    /// Name of the segment this handle is attached to.
    #[must_use]
    pub fn segment_name(&self) -> &str {
        self.segment.name()
    }

    /// Whether this process created (and initialized) the segment.
    #[must_use]
    pub fn is_creator(&self) -> bool {
        self.segment.is_creator()
    }

    /// Insert a new entry. Fails with `Duplicate` if the key is present and
    /// `NoSpace` if the value is too long or the table is at capacity.
    pub fn add(&self, key: i32, value: &[u8]) -> OpStatus {
        if value.len() >= VALUE_CAP {
            return OpStatus::NoSpace;
        }
        let _guard = self.lock.write();
        // Safety: write lock held.
        let header = unsafe { self.segment.header_mut() };

        if rehash_if_needed(header) != OpStatus::Ok {
            return OpStatus::NoSpace;
        }

        let h1 = primary_hash(header.hash_seed, key);
        let h2 = secondary_hash(header.hash_seed, key);
        match find_insert_slot(&header.slots, key, h1, h2) {
            InsertSlot::Duplicate(_) => OpStatus::Duplicate,
            InsertSlot::Full => OpStatus::NoSpace,
            InsertSlot::Vacant(idx) => {
                if header.live_count as usize >= MAX_LIVE {
                    return OpStatus::NoSpace;
                }
                occupy_slot(header, idx, key, value, h1);
                OpStatus::Ok
            }
        }
    }

    /// Overwrite the value of an existing entry.
    pub fn update(&self, key: i32, value: &[u8]) -> OpStatus {
        if value.len() >= VALUE_CAP {
            return OpStatus::NoSpace;
        }
        let _guard = self.lock.write();
        // Safety: write lock held.
        let header = unsafe { self.segment.header_mut() };

        let h1 = primary_hash(header.hash_seed, key);
        let h2 = secondary_hash(header.hash_seed, key);
        match find_occupied(&header.slots, key, h1, h2) {
            Some(idx) => {
                header.slots[idx].write_value(value);
                OpStatus::Ok
            }
            None => OpStatus::NotFound,
        }
    }

    /// Insert or overwrite.
    pub fn upsert(&self, key: i32, value: &[u8]) -> OpStatus {
        if value.len() >= VALUE_CAP {
            return OpStatus::NoSpace;
        }
        let _guard = self.lock.write();
        // Safety: write lock held.
        let header = unsafe { self.segment.header_mut() };

        let h1 = primary_hash(header.hash_seed, key);
        let h2 = secondary_hash(header.hash_seed, key);
        if let Some(idx) = find_occupied(&header.slots, key, h1, h2) {
            header.slots[idx].write_value(value);
            return OpStatus::Ok;
        }

        if rehash_if_needed(header) != OpStatus::Ok {
            return OpStatus::NoSpace;
        }
        // The key is known absent under this lock, so the search can only
        // come back vacant or full.
        match find_insert_slot(&header.slots, key, h1, h2) {
            InsertSlot::Vacant(idx) => {
                if header.live_count as usize >= MAX_LIVE {
                    return OpStatus::NoSpace;
                }
                occupy_slot(header, idx, key, value, h1);
                OpStatus::Ok
            }
            _ => OpStatus::NoSpace,
        }
    }

    /// Copy out the value stored under `key`. Missing keys return an empty
    /// buffer; note the empty value is itself legal, so presence checks
    /// belong to [`StatusTable::contains`].
    #[must_use]
    pub fn get(&self, key: i32) -> Vec<u8> {
        let _guard = self.lock.read();
        let header = self.segment.header();

        let h1 = primary_hash(header.hash_seed, key);
        let h2 = secondary_hash(header.hash_seed, key);
        match find_occupied(&header.slots, key, h1, h2) {
            Some(idx) => header.slots[idx].value_bytes().to_vec(),
            None => Vec::new(),
        }
    }

    /// Mark the entry deleted. The slot becomes a tombstone and keeps
    /// conducting probe sequences until compaction reclaims it.
    pub fn remove(&self, key: i32) -> OpStatus {
        let _guard = self.lock.write();
        // Safety: write lock held.
        let header = unsafe { self.segment.header_mut() };

        let h1 = primary_hash(header.hash_seed, key);
        let h2 = secondary_hash(header.hash_seed, key);
        match find_occupied(&header.slots, key, h1, h2) {
            Some(idx) => {
                header.slots[idx].state = SlotState::Tombstone as u32;
                header.live_count -= 1;
                header.tomb_count += 1;
                OpStatus::Ok
            }
            None => OpStatus::NotFound,
        }
    }

    #[must_use]
    pub fn contains(&self, key: i32) -> bool {
        let _guard = self.lock.read();
        let header = self.segment.header();

        let h1 = primary_hash(header.hash_seed, key);
        let h2 = secondary_hash(header.hash_seed, key);
        find_occupied(&header.slots, key, h1, h2).is_some()
    }

    /// Reset every slot to Empty. The hash seed is kept.
    pub fn clear(&self) -> OpStatus {
        let _guard = self.lock.write();
        // Safety: write lock held.
        let header = unsafe { self.segment.header_mut() };

        for slot in header.slots.iter_mut() {
            slot.state = SlotState::Empty as u32;
        }
        header.live_count = 0;
        header.tomb_count = 0;
        debug!(name = %self.segment.name(), "cleared table");
        OpStatus::Ok
    }

    /// Number of live entries.
    #[must_use]
    pub fn count(&self) -> usize {
        let _guard = self.lock.read();
        self.segment.header().live_count as usize
    }

    /// `live / CAPACITY`. Tombstones do not contribute.
    #[must_use]
    pub fn load_factor(&self) -> f64 {
        let _guard = self.lock.read();
        self.segment.header().live_count as f64 / CAPACITY as f64
    }

    /// Overwrite values for the given keys where present. Entries with
    /// oversized values are skipped. Returns the number of keys updated;
    /// the batch never aborts partway.
    pub fn batch_update(&self, updates: &BTreeMap<i32, Vec<u8>>) -> usize {
        let _guard = self.lock.write();
        // Safety: write lock held.
        let header = unsafe { self.segment.header_mut() };

        let mut applied = 0;
        for (&key, value) in updates {
            if value.len() >= VALUE_CAP {
                continue;
            }
            let h1 = primary_hash(header.hash_seed, key);
            let h2 = secondary_hash(header.hash_seed, key);
            if let Some(idx) = find_occupied(&header.slots, key, h1, h2) {
                header.slots[idx].write_value(value);
                applied += 1;
            }
        }
        applied
    }

    /// Replace `out` with a snapshot of every live entry. Tombstones are
    /// invisible. Returns the number of entries copied.
    pub fn batch_get(&self, out: &mut BTreeMap<i32, Vec<u8>>) -> usize {
        let _guard = self.lock.read();
        let header = self.segment.header();

        out.clear();
        for slot in header.slots.iter() {
            if slot.state() == SlotState::Occupied {
                out.insert(slot.key, slot.value_bytes().to_vec());
            }
        }
        out.len()
    }

    /// Occupancy and probe-distance statistics, recomputed under the read
    /// lock from each occupied slot's cached primary hash.
    #[must_use]
    pub fn stats(&self) -> TableStats {
        let _guard = self.lock.read();
        let header = self.segment.header();

        let mut total_probes = 0_usize;
        let mut max_probes = 0_usize;
        let mut occupied = 0_usize;
        for (idx, slot) in header.slots.iter().enumerate() {
            if slot.state() != SlotState::Occupied {
                continue;
            }
            let h2 = secondary_hash(header.hash_seed, slot.key);
            let probes = probe_distance(idx, slot.hash_primary, h2);
            total_probes += probes;
            max_probes = max_probes.max(probes);
            occupied += 1;
        }

        TableStats {
            capacity: CAPACITY,
            live: header.live_count as usize,
            tombstones: header.tomb_count as usize,
            load_factor: header.live_count as f64 / CAPACITY as f64,
            hash_seed: header.hash_seed,
            avg_probe_distance: if occupied > 0 {
                total_probes as f64 / occupied as f64
            } else {
                0.0
            },
            max_probe_distance: max_probes,
        }
    }
}

/// Write a live entry into `idx`, maintaining the counters.
fn occupy_slot(header: &mut SharedHeader, idx: usize, key: i32, value: &[u8], h1: u32) {
    if header.slots[idx].state() == SlotState::Tombstone {
        header.tomb_count -= 1;
    }
    let slot = &mut header.slots[idx];
    slot.key = key;
    slot.write_value(value);
    slot.state = SlotState::Occupied as u32;
    slot.hash_primary = h1;
    header.live_count += 1;
}

/// Compact the table in place when live entries plus tombstones reach the
/// load ceiling. Lazy deletion accumulates tombstones even while `live`
/// stays low; rebuilding drops them all and restores short probe chains.
///
/// The snapshot is process-local, which is fine: the caller holds the write
/// lock for the whole pass. The seed is unchanged, so cached primary hashes
/// stay valid.
fn rehash_if_needed(header: &mut SharedHeader) -> OpStatus {
    if header.tomb_count == 0 || ((header.live_count + header.tomb_count) as usize) < MAX_LIVE {
        return OpStatus::Ok;
    }

    debug!(
        live = header.live_count,
        tomb = header.tomb_count,
        "compacting slot table in place"
    );

    let snapshot: Vec<(i32, [u8; VALUE_CAP])> = header
        .slots
        .iter()
        .filter(|slot| slot.state() == SlotState::Occupied)
        .map(|slot| (slot.key, slot.value))
        .collect();

    for slot in header.slots.iter_mut() {
        slot.state = SlotState::Empty as u32;
    }
    header.live_count = 0;
    header.tomb_count = 0;

    for (key, value) in &snapshot {
        let h1 = primary_hash(header.hash_seed, *key);
        let h2 = secondary_hash(header.hash_seed, *key);
        match find_insert_slot(&header.slots, *key, h1, h2) {
            InsertSlot::Vacant(idx) => {
                let slot = &mut header.slots[idx];
                slot.key = *key;
                slot.value = *value;
                slot.state = SlotState::Occupied as u32;
                slot.hash_primary = h1;
                header.live_count += 1;
            }
            // Re-inserting at most MAX_LIVE entries into an all-empty table
            // cannot fail while the probe policy holds.
            _ => {
                debug_assert!(false, "compaction could not place key {key}");
                return OpStatus::NoSpace;
            }
        }
    }
    OpStatus::Ok
}

/// Snapshot of table occupancy, as reported by [`StatusTable::stats`].
#[derive(Clone, Copy, Debug)]
pub struct TableStats {
    pub capacity: usize,
    pub live: usize,
    pub tombstones: usize,
    pub load_factor: f64,
    pub hash_seed: u32,
    pub avg_probe_distance: f64,
    pub max_probe_distance: usize,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== status table statistics ===")?;
        writeln!(f, "capacity:           {}", self.capacity)?;
        writeln!(f, "live entries:       {}", self.live)?;
        writeln!(f, "tombstones:         {}", self.tombstones)?;
        writeln!(f, "load factor:        {:.4}", self.load_factor)?;
        writeln!(f, "hash seed:          {}", self.hash_seed)?;
        writeln!(f, "avg probe distance: {:.3}", self.avg_probe_distance)?;
        write!(f, "max probe distance: {}", self.max_probe_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    /// Table on a throwaway segment, unlinked when the test ends (pass or
    /// panic).
    struct TestTable {
        table: StatusTable,
        name: String,
    }

    impl Drop for TestTable {
        fn drop(&mut self) {
            let _ = region::unlink(&self.name);
        }
    }

    fn open_test(tag: &str, backend: LockBackend) -> TestTable {
        let name = format!("/status-table-{}-{tag}", std::process::id());
        let _ = region::unlink(&name);
        let table = StatusTable::open_named(&name, backend).expect("open test table");
        TestTable { table, name }
    }

    #[test]
    fn add_then_get_round_trips() {
        let t = open_test("basic", LockBackend::RwLock);
        assert_eq!(t.table.add(1, b"a"), OpStatus::Ok);
        assert_eq!(t.table.add(2, b"b"), OpStatus::Ok);
        assert_eq!(t.table.get(1), b"a");
        assert_eq!(t.table.get(2), b"b");
        assert_eq!(t.table.count(), 2);
        assert_eq!(t.table.get(3), b"");
    }

    #[test]
    fn duplicate_add_keeps_first_value() {
        let t = open_test("dup", LockBackend::RwLock);
        assert_eq!(t.table.add(1, b"a"), OpStatus::Ok);
        assert_eq!(t.table.add(1, b"b"), OpStatus::Duplicate);
        assert_eq!(t.table.get(1), b"a");
        assert_eq!(t.table.count(), 1);
    }

    #[test]
    fn upsert_and_update_semantics() {
        let t = open_test("upsert", LockBackend::RwLock);
        assert_eq!(t.table.upsert(1, b"a"), OpStatus::Ok);
        assert_eq!(t.table.upsert(1, b"b"), OpStatus::Ok);
        assert_eq!(t.table.get(1), b"b");
        assert_eq!(t.table.add(1, b"c"), OpStatus::Duplicate);
        assert_eq!(t.table.update(2, b"x"), OpStatus::NotFound);
        assert_eq!(t.table.update(1, b"z"), OpStatus::Ok);
        assert_eq!(t.table.get(1), b"z");
    }

    #[test]
    fn remove_is_idempotent() {
        let t = open_test("remove", LockBackend::RwLock);
        assert_eq!(t.table.add(7, b"x"), OpStatus::Ok);
        assert_eq!(t.table.remove(7), OpStatus::Ok);
        assert_eq!(t.table.remove(7), OpStatus::NotFound);
        assert!(!t.table.contains(7));
        assert_eq!(t.table.get(7), b"");
        assert_eq!(t.table.count(), 0);
    }

    #[test]
    fn contains_tracks_occupancy_even_for_empty_values() {
        let t = open_test("contains", LockBackend::RwLock);
        assert!(!t.table.contains(5));
        assert_eq!(t.table.add(5, b""), OpStatus::Ok);
        assert!(t.table.contains(5));
        assert_eq!(t.table.get(5), b"");
        assert_eq!(t.table.remove(5), OpStatus::Ok);
        assert!(!t.table.contains(5));
    }

    #[test]
    fn oversized_values_are_rejected_without_side_effects() {
        let t = open_test("gate", LockBackend::RwLock);
        let too_long = vec![b'x'; VALUE_CAP];
        assert_eq!(t.table.add(1, &too_long), OpStatus::NoSpace);
        assert_eq!(t.table.upsert(1, &too_long), OpStatus::NoSpace);
        assert_eq!(t.table.count(), 0);

        assert_eq!(t.table.add(1, b"ok"), OpStatus::Ok);
        assert_eq!(t.table.update(1, &too_long), OpStatus::NoSpace);
        assert_eq!(t.table.get(1), b"ok");

        // Longest legal payload still fits.
        let max = vec![b'y'; VALUE_CAP - 1];
        assert_eq!(t.table.update(1, &max), OpStatus::Ok);
        assert_eq!(t.table.get(1), max);
    }

    #[test]
    fn tombstoned_slots_are_reused() {
        let t = open_test("tombstone", LockBackend::RwLock);
        for key in 0..1000 {
            assert_eq!(t.table.add(key, b"v"), OpStatus::Ok, "add {key}");
        }
        for key in 0..1000 {
            assert_eq!(t.table.remove(key), OpStatus::Ok, "remove {key}");
        }
        assert_eq!(t.table.count(), 0);
        for key in 0..1000 {
            assert_eq!(t.table.add(key, b"w"), OpStatus::Ok, "re-add {key}");
        }
        assert_eq!(t.table.count(), 1000);
        let expected = 1000.0 / CAPACITY as f64;
        assert!((t.table.load_factor() - expected).abs() < 1e-9);
    }

    #[test]
    fn table_rejects_inserts_beyond_max_live() {
        let t = open_test("overflow", LockBackend::RwLock);
        for key in 0..MAX_LIVE as i32 {
            assert_eq!(t.table.add(key, b"v"), OpStatus::Ok, "add {key}");
        }
        assert_eq!(t.table.add(MAX_LIVE as i32, b"v"), OpStatus::NoSpace);
        assert_eq!(t.table.upsert(MAX_LIVE as i32, b"v"), OpStatus::NoSpace);
        assert_eq!(t.table.count(), MAX_LIVE);
        // Existing keys can still be overwritten at capacity.
        assert_eq!(t.table.upsert(0, b"w"), OpStatus::Ok);
    }

    #[test]
    fn add_remove_churn_survives_compaction() {
        let t = open_test("churn", LockBackend::RwLock);
        // Far more cycles than CAPACITY; without tombstone reclamation the
        // probe paths would fill up and adds would start failing.
        for key in 0..(2 * CAPACITY as i32) {
            assert_eq!(t.table.add(key, b"cycle"), OpStatus::Ok, "add {key}");
            assert_eq!(t.table.remove(key), OpStatus::Ok, "remove {key}");
        }
        assert_eq!(t.table.count(), 0);
    }

    #[test]
    fn batch_get_snapshots_live_entries_only() {
        let t = open_test("batchget", LockBackend::RwLock);
        for key in 0..20 {
            assert_eq!(t.table.add(key, format!("v{key}").as_bytes()), OpStatus::Ok);
        }
        for key in 0..10 {
            assert_eq!(t.table.remove(key), OpStatus::Ok);
        }

        let mut out = BTreeMap::new();
        out.insert(999, b"stale".to_vec());
        let copied = t.table.batch_get(&mut out);
        assert_eq!(copied, 10);
        assert_eq!(out.len(), 10);
        for key in 10..20 {
            assert_eq!(out[&key], format!("v{key}").into_bytes());
        }
        assert!(!out.contains_key(&999));
    }

    #[test]
    fn batch_update_reports_successes_and_skips_bad_entries() {
        let t = open_test("batchupd", LockBackend::RwLock);
        assert_eq!(t.table.add(1, b"a"), OpStatus::Ok);
        assert_eq!(t.table.add(2, b"b"), OpStatus::Ok);

        let mut updates = BTreeMap::new();
        updates.insert(1, b"A".to_vec());
        updates.insert(2, vec![b'x'; VALUE_CAP]); // oversized: skipped
        updates.insert(3, b"C".to_vec()); // absent: not counted
        assert_eq!(t.table.batch_update(&updates), 1);

        assert_eq!(t.table.get(1), b"A");
        assert_eq!(t.table.get(2), b"b");
        assert!(!t.table.contains(3));
    }

    #[test]
    fn clear_resets_counts_but_keeps_seed() {
        let t = open_test("clear", LockBackend::RwLock);
        let seed_before = t.table.stats().hash_seed;
        for key in 0..50 {
            assert_eq!(t.table.add(key, b"v"), OpStatus::Ok);
        }
        t.table.remove(0);
        assert_eq!(t.table.clear(), OpStatus::Ok);
        let stats = t.table.stats();
        assert_eq!(stats.live, 0);
        assert_eq!(stats.tombstones, 0);
        assert_eq!(stats.hash_seed, seed_before);
        assert_eq!(t.table.count(), 0);
        // The table is usable again after clear.
        assert_eq!(t.table.add(1, b"fresh"), OpStatus::Ok);
    }

    #[test]
    fn stats_report_probe_distances() {
        let t = open_test("stats", LockBackend::RwLock);
        for key in 0..500 {
            assert_eq!(t.table.add(key, b"v"), OpStatus::Ok);
        }
        let stats = t.table.stats();
        assert_eq!(stats.capacity, CAPACITY);
        assert_eq!(stats.live, 500);
        assert_eq!(stats.tombstones, 0);
        assert!(stats.avg_probe_distance >= 1.0);
        assert!(stats.max_probe_distance >= 1);
        assert!((stats.avg_probe_distance as usize) <= stats.max_probe_distance);
        assert!((stats.load_factor - 500.0 / CAPACITY as f64).abs() < 1e-9);

        let rendered = stats.to_string();
        assert!(rendered.contains("live entries:       500"));
    }

    #[test]
    fn mutex_backend_has_identical_semantics() {
        let t = open_test("mutexvariant", LockBackend::Mutex);
        assert_eq!(t.table.add(1, b"a"), OpStatus::Ok);
        assert_eq!(t.table.add(1, b"b"), OpStatus::Duplicate);
        assert_eq!(t.table.upsert(2, b"c"), OpStatus::Ok);
        assert_eq!(t.table.get(1), b"a");
        assert_eq!(t.table.count(), 2);
        assert_eq!(t.table.remove(1), OpStatus::Ok);
        assert_eq!(t.table.remove(1), OpStatus::NotFound);
        assert_eq!(t.table.count(), 1);
    }

    #[test]
    fn second_handle_in_same_process_sees_writes() {
        let t = open_test("twohandles", LockBackend::RwLock);
        let other =
            StatusTable::open_named(&t.name, LockBackend::RwLock).expect("second handle");
        assert!(!other.is_creator());
        assert_eq!(t.table.add(42, b"shared"), OpStatus::Ok);
        assert_eq!(other.get(42), b"shared");
        assert_eq!(other.count(), 1);
    }

    #[test]
    fn concurrent_readers_and_writer_make_progress() {
        let t = open_test("threads", LockBackend::RwLock);
        for key in 0..256 {
            assert_eq!(t.table.add(key, b"seed"), OpStatus::Ok);
        }

        let shared =
            Arc::new(StatusTable::open_named(&t.name, LockBackend::RwLock).expect("attach"));
        let writer = {
            let table = shared.clone();
            thread::spawn(move || {
                for round in 0..2_000_i32 {
                    let key = round % 256;
                    assert_eq!(table.upsert(key, b"written"), OpStatus::Ok);
                }
            })
        };
        let readers: Vec<_> = (0..2)
            .map(|_| {
                let table = shared.clone();
                thread::spawn(move || {
                    for round in 0..2_000_i32 {
                        let key = round % 256;
                        let value = table.get(key);
                        // Either the seed value or an overwrite, never torn.
                        assert!(value == b"seed" || value == b"written");
                    }
                })
            })
            .collect();

        writer.join().expect("writer");
        for reader in readers {
            reader.join().expect("reader");
        }
        assert_eq!(shared.count(), 256);
    }
}
