//! Open-addressed hash table keyed by interned string identity.
//!
//! One generic implementation backs the VM's globals table, every class's
//! method table, every instance's field table, and (via [`crate::strings`])
//! the string-interning set itself — all four are "map from `ObjString*`
//! identity to `Value`" with the same tombstone/linear-probing design.

use crate::object::{Obj, ObjString};
use crate::value::Value;

const MAX_LOAD: f64 = 0.75;

#[derive(Clone, Copy)]
struct Entry {
    key: *mut ObjString,
    value: Value,
}

impl Entry {
    const fn empty() -> Entry {
        Entry { key: core::ptr::null_mut(), value: Value::NIL }
    }
}

/// A `Table` maps interned-string identity to `Value`. Two calls to
/// `tableSet`/`insert` with pointer-equal keys observe the same slot; keys
/// are never hashed or compared by content here, only by address, because
/// callers are expected to have already interned the key (see
/// [`crate::strings::Interner`]).
pub struct Table {
    entries: Vec<Entry>,
    count: usize,
}

impl Table {
    pub fn new() -> Table {
        Table { entries: Vec::new(), count: 0 }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Linear probe starting at `hash & (capacity - 1)`, matching the
    /// reference table exactly: the first tombstone encountered is
    /// remembered and returned if the key is absent, so repeated
    /// insert/delete cycles reuse freed slots instead of growing forever.
    fn find_entry(entries: &[Entry], capacity: usize, key: *const ObjString) -> usize {
        let hash = unsafe { (*key).hash };
        let mut index = (hash as usize) & (capacity - 1);
        let mut tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            if entry.key.is_null() {
                if entry.value.is_nil() {
                    return tombstone.unwrap_or(index);
                } else if tombstone.is_none() {
                    tombstone = Some(index);
                }
            } else if core::ptr::eq(entry.key, key) {
                return index;
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    fn adjust_capacity(&mut self, capacity: usize) {
        let mut entries = vec![Entry::empty(); capacity];
        let mut count = 0;
        for entry in &self.entries {
            if entry.key.is_null() {
                continue;
            }
            let dest = Self::find_entry(&entries, capacity, entry.key);
            entries[dest] = *entry;
            count += 1;
        }
        self.entries = entries;
        self.count = count;
    }

    /// Returns `true` if `key` was not already present.
    pub fn set(&mut self, key: *mut ObjString, value: Value) -> bool {
        if (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            let new_capacity = if self.capacity() < 8 { 8 } else { self.capacity() * 2 };
            self.adjust_capacity(new_capacity);
        }
        let index = Self::find_entry(&self.entries, self.capacity(), key);
        let entry = &mut self.entries[index];
        let is_new_key = entry.key.is_null();
        if is_new_key && entry.value.is_nil() {
            self.count += 1;
        }
        entry.key = key;
        entry.value = value;
        is_new_key
    }

    pub fn get(&self, key: *const ObjString) -> Option<Value> {
        if self.count == 0 {
            return None;
        }
        let index = Self::find_entry(&self.entries, self.capacity(), key);
        let entry = &self.entries[index];
        if entry.key.is_null() { None } else { Some(entry.value) }
    }

    /// Places a tombstone (`key = null`, `value = true`) so later probes
    /// keep walking past this slot.
    pub fn delete(&mut self, key: *const ObjString) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = Self::find_entry(&self.entries, self.capacity(), key);
        let entry = &mut self.entries[index];
        if entry.key.is_null() {
            return false;
        }
        entry.key = core::ptr::null_mut();
        entry.value = Value::TRUE;
        true
    }

    pub fn add_all(&mut self, from: &Table) {
        for entry in &from.entries {
            if !entry.key.is_null() {
                self.set(entry.key, entry.value);
            }
        }
    }

    /// Finds an interned string by content without allocating a probe key,
    /// used by the interner to dedupe a freshly scanned/concatenated byte
    /// string against an existing `ObjString`.
    pub fn find_string(&self, bytes: &[u8], hash: u32) -> Option<*mut ObjString> {
        if self.count == 0 {
            return None;
        }
        let capacity = self.capacity();
        let mut index = (hash as usize) & (capacity - 1);
        loop {
            let entry = &self.entries[index];
            if entry.key.is_null() {
                if entry.value.is_nil() {
                    return None;
                }
            } else {
                let key = unsafe { &*entry.key };
                if key.hash == hash && key.bytes.as_ref() == bytes {
                    return Some(entry.key);
                }
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    /// GC hook: drop any entry whose key is not marked, so an otherwise-dead
    /// interned string isn't kept alive (or worse, resurrected on the next
    /// lookup) just because it is still sitting in the intern table.
    pub fn remove_unmarked(&mut self) {
        for entry in &mut self.entries {
            if !entry.key.is_null() {
                let marked = unsafe { (*(entry.key as *mut Obj)).marked.get() };
                if !marked {
                    entry.key = core::ptr::null_mut();
                    entry.value = Value::TRUE;
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (*mut ObjString, Value)> + '_ {
        self.entries.iter().filter(|e| !e.key.is_null()).map(|e| (e.key, e.value))
    }
}

impl Default for Table {
    fn default() -> Table {
        Table::new()
    }
}
