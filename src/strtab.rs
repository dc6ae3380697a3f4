//! The string table system (spec component C): URI / prefix / local-name /
//! value partitions, their cross-references, and the bounded global value
//! partition with FIFO eviction.
//!
//! Layout grounded on `original_source/trunk/include/procTypes.h`'s
//! `URITable`/`PrefixTable`/`LocalNamesTable`/`ValueTable`/`ValueLocalCrossTable`,
//! style (newtype wrapper over a growable row vec) grounded on the teacher's
//! `Settings(HashMap<Setting, VarInt>)` in `webtransport-proto/src/settings.rs`.

use std::collections::HashMap;

use crate::bitstream::{BitBuffer, Sink, Source};
use crate::codec;
use crate::error::{ErrorCode, Result};
use crate::qname::{preloaded_uri, QNameId};

/// A sentinel value-row back-pointer indicating "no longer present" — set
/// when the owning global-value row was evicted. A lookup that dereferences
/// this sentinel is treated as a miss; no compaction is attempted (§9 design
/// note, §4.C).
const INVALIDATED: usize = usize::MAX;

/// Default threshold above which [`ValueTable`] keeps a hash index instead
/// of relying on linear scans (§4.C).
pub const DEFAULT_HASH_THRESHOLD: u32 = 100;

/// Tuning knob: the build-time cap on prefixes per URI row. The C original
/// fixes this via `exipConfig.h`; here it is a per-[`StringTables`]
/// constructor argument with this as the default.
pub const DEFAULT_MAX_PREFIXES_PER_URI: usize = 3;

#[derive(Debug, Default, Clone)]
struct LocalNameRow {
    local_name: String,
    /// Global value-table row indices last seen with this (uri, ln), in
    /// insertion order. A `INVALIDATED` entry means that global row has
    /// since been evicted.
    cross: Vec<usize>,
}

#[derive(Debug, Default, Clone)]
struct UriRow {
    uri: String,
    prefixes: Vec<String>,
    local_names: Vec<LocalNameRow>,
}

/// Indexed lookup over the global value table. Two implementations are kept
/// behind this trait per §9's "keep the interface behind a trait with two
/// implementations" design note: a real hash index once the table is large
/// enough to be worth it, and a no-op linear-scan stand-in below threshold.
trait ValueIndex: std::fmt::Debug {
    fn insert(&mut self, value: &str, slot: usize);
    fn remove(&mut self, value: &str);
    fn find(&self, rows: &[Option<ValueRow>], value: &str) -> Option<usize>;
}

#[derive(Debug, Default)]
struct HashValueIndex(HashMap<String, usize>);

impl ValueIndex for HashValueIndex {
    fn insert(&mut self, value: &str, slot: usize) {
        self.0.insert(value.to_string(), slot);
    }

    fn remove(&mut self, value: &str) {
        self.0.remove(value);
    }

    fn find(&self, _rows: &[Option<ValueRow>], value: &str) -> Option<usize> {
        self.0.get(value).copied()
    }
}

#[derive(Debug, Default)]
struct LinearValueIndex;

impl ValueIndex for LinearValueIndex {
    fn insert(&mut self, _value: &str, _slot: usize) {}
    fn remove(&mut self, _value: &str) {}

    fn find(&self, rows: &[Option<ValueRow>], value: &str) -> Option<usize> {
        rows.iter()
            .position(|r| r.as_ref().is_some_and(|r| r.value == value))
    }
}

#[derive(Debug, Clone)]
struct ValueRow {
    value: String,
    /// Back-pointer to the owning (uri, ln) local cross-table slot, so an
    /// eviction can invalidate it.
    owner: (u16, usize, usize),
}

/// The global value partition: insertion-ordered, fixed capacity, FIFO
/// eviction over a monotonically increasing `globalID`.
struct ValueTable {
    rows: Vec<Option<ValueRow>>,
    capacity: Option<u32>,
    next_id: u64,
    index: Box<dyn ValueIndex>,
}

impl std::fmt::Debug for ValueTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueTable")
            .field("rows", &self.rows)
            .field("capacity", &self.capacity)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl ValueTable {
    fn new(capacity: Option<u32>) -> Self {
        let use_hash = capacity.map_or(true, |c| c >= DEFAULT_HASH_THRESHOLD);
        let index: Box<dyn ValueIndex> = if use_hash {
            Box::new(HashValueIndex::default())
        } else {
            Box::new(LinearValueIndex)
        };
        Self {
            rows: Vec::new(),
            capacity,
            next_id: 0,
            index,
        }
    }

    fn slot_for(&self, id: u64) -> usize {
        match self.capacity {
            Some(c) => (id % c as u64) as usize,
            None => id as usize,
        }
    }

    fn lookup(&self, value: &str) -> Option<usize> {
        self.index.find(&self.rows, value)
    }

    /// Inserts `value`, evicting the slot that would collide under the FIFO
    /// ring if the table is at capacity. Returns the row index the value now
    /// occupies.
    fn insert(
        &mut self,
        value: String,
        owner: (u16, usize, usize),
        cross_tables: &mut [UriRow],
    ) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        let slot = self.slot_for(id);

        if slot >= self.rows.len() {
            self.rows.resize(slot + 1, None);
        } else if let Some(old) = self.rows[slot].take() {
            // Displaced row: invalidate its owner's back-pointer and drop it
            // from the hash index (§4.C eviction steps 1-2).
            self.index.remove(&old.value);
            let (uri_id, ln_id, cross_idx) = old.owner;
            if let Some(uri) = cross_tables.get_mut(uri_id as usize) {
                if let Some(ln) = uri.local_names.get_mut(ln_id) {
                    if let Some(slot_ref) = ln.cross.get_mut(cross_idx) {
                        *slot_ref = INVALIDATED;
                    }
                }
            }
        }

        self.index.insert(&value, slot);
        self.rows[slot] = Some(ValueRow { value, owner });
        slot
    }

    fn get(&self, slot: usize) -> Option<&str> {
        self.rows.get(slot).and_then(|r| r.as_ref()).map(|r| r.value.as_str())
    }
}

/// Per-stream string table: the four partitions plus the running cursor
/// used by the string-table-aware literal codec (§4.B).
pub struct StringTables {
    uris: Vec<UriRow>,
    values: ValueTable,
    max_prefixes_per_uri: usize,
    value_max_length: Option<u32>,
}

impl std::fmt::Debug for StringTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringTables")
            .field("uris", &self.uris)
            .finish()
    }
}

impl StringTables {
    /// Builds a fresh table with the four preloaded URI rows (§3: "", xml
    /// namespace, xsi namespace, xsd namespace) and their fixed local names.
    pub fn new(value_partition_capacity: Option<u32>, value_max_length: Option<u32>) -> Self {
        let mut uris = vec![
            UriRow {
                uri: String::new(),
                ..Default::default()
            },
            UriRow {
                uri: "http://www.w3.org/XML/1998/namespace".to_string(),
                prefixes: vec!["xml".to_string()],
                local_names: vec![LocalNameRow {
                    local_name: "base".to_string(),
                    cross: Vec::new(),
                }, LocalNameRow {
                    local_name: "id".to_string(),
                    cross: Vec::new(),
                }, LocalNameRow {
                    local_name: "lang".to_string(),
                    cross: Vec::new(),
                }, LocalNameRow {
                    local_name: "space".to_string(),
                    cross: Vec::new(),
                }],
            },
            UriRow {
                uri: "http://www.w3.org/2001/XMLSchema-instance".to_string(),
                prefixes: vec!["xsi".to_string()],
                local_names: vec![
                    LocalNameRow {
                        local_name: "nil".to_string(),
                        cross: Vec::new(),
                    },
                    LocalNameRow {
                        local_name: "type".to_string(),
                        cross: Vec::new(),
                    },
                ],
            },
            UriRow {
                uri: "http://www.w3.org/2001/XMLSchema".to_string(),
                prefixes: vec!["xsd".to_string()],
                local_names: Vec::new(),
            },
        ];
        debug_assert_eq!(uris.len(), preloaded_uri::FIRST_DYNAMIC as usize);
        uris.shrink_to_fit();
        Self {
            uris,
            values: ValueTable::new(value_partition_capacity),
            max_prefixes_per_uri: DEFAULT_MAX_PREFIXES_PER_URI,
            value_max_length,
        }
    }

    pub fn with_max_prefixes_per_uri(mut self, n: usize) -> Self {
        self.max_prefixes_per_uri = n;
        self
    }

    // --- URI partition ---

    pub fn lookup_uri(&self, uri: &str) -> Option<u16> {
        self.uris.iter().position(|r| r.uri == uri).map(|i| i as u16)
    }

    pub fn add_uri(&mut self, uri: &str) -> u16 {
        if let Some(id) = self.lookup_uri(uri) {
            return id;
        }
        self.uris.push(UriRow {
            uri: uri.to_string(),
            ..Default::default()
        });
        (self.uris.len() - 1) as u16
    }

    pub fn uri_str(&self, uri_id: u16) -> Option<&str> {
        self.uris.get(uri_id as usize).map(|r| r.uri.as_str())
    }

    pub fn uri_count(&self) -> usize {
        self.uris.len()
    }

    // --- Prefix sub-table ---

    pub fn lookup_prefix(&self, uri_id: u16, prefix: &str) -> Option<u16> {
        self.uris
            .get(uri_id as usize)?
            .prefixes
            .iter()
            .position(|p| p == prefix)
            .map(|i| i as u16)
    }

    pub fn add_prefix(&mut self, uri_id: u16, prefix: &str) -> Result<u16> {
        if let Some(id) = self.lookup_prefix(uri_id, prefix) {
            return Ok(id);
        }
        let row = self
            .uris
            .get_mut(uri_id as usize)
            .ok_or(ErrorCode::OutOfBoundBuffer)?;
        if row.prefixes.len() >= self.max_prefixes_per_uri {
            return Err(ErrorCode::TooMuchPrefixesPerUri);
        }
        row.prefixes.push(prefix.to_string());
        Ok((row.prefixes.len() - 1) as u16)
    }

    // --- Local-name sub-table ---

    pub fn lookup_ln(&self, uri_id: u16, local_name: &str) -> Option<usize> {
        self.uris
            .get(uri_id as usize)?
            .local_names
            .iter()
            .position(|r| r.local_name == local_name)
    }

    pub fn add_ln(&mut self, uri_id: u16, local_name: &str) -> Result<usize> {
        if let Some(id) = self.lookup_ln(uri_id, local_name) {
            return Ok(id);
        }
        let row = self
            .uris
            .get_mut(uri_id as usize)
            .ok_or(ErrorCode::OutOfBoundBuffer)?;
        row.local_names.push(LocalNameRow {
            local_name: local_name.to_string(),
            cross: Vec::new(),
        });
        Ok(row.local_names.len() - 1)
    }

    pub fn ln_count(&self, uri_id: u16) -> usize {
        self.uris
            .get(uri_id as usize)
            .map(|u| u.local_names.len())
            .unwrap_or(0)
    }

    pub fn ln_str(&self, uri_id: u16, ln_id: usize) -> Option<&str> {
        self.uris
            .get(uri_id as usize)?
            .local_names
            .get(ln_id)
            .map(|r| r.local_name.as_str())
    }

    pub fn qname_str(&self, qname: QNameId) -> Option<(&str, &str)> {
        Some((self.uri_str(qname.uri_id)?, self.ln_str(qname.uri_id, qname.ln_id)?))
    }

    // --- Local value cross-table ---

    /// `n` for the n-bit local-hit index, i.e. `ceil(log2(count))` over the
    /// (uri, ln)'s live (non-invalidated) cross-table entries.
    pub fn local_value_bits(&self, uri_id: u16, ln_id: usize) -> u8 {
        let count = self
            .uris
            .get(uri_id as usize)
            .and_then(|u| u.local_names.get(ln_id))
            .map(|ln| ln.cross.iter().filter(|&&s| s != INVALIDATED).count())
            .unwrap_or(0);
        bits_for_count(count.max(1))
    }

    /// Looks up `value` among the local hits recorded for `(uri, ln)`,
    /// returning its index into the *live* local cross-table (the index used
    /// on the wire), or `None` on a miss — including a miss against an
    /// invalidated (evicted) slot.
    pub fn lookup_local_value(&self, uri_id: u16, ln_id: usize, value: &str) -> Option<u32> {
        let ln = self.uris.get(uri_id as usize)?.local_names.get(ln_id)?;
        let mut live_index = 0u32;
        for &global_slot in &ln.cross {
            if global_slot == INVALIDATED {
                continue;
            }
            if self.values.get(global_slot) == Some(value) {
                return Some(live_index);
            }
            live_index += 1;
        }
        None
    }

    /// Resolves a local-hit wire index back to its string, skipping
    /// invalidated slots the same way [`Self::lookup_local_value`] does.
    pub fn local_value_at(&self, uri_id: u16, ln_id: usize, local_index: u32) -> Option<&str> {
        let ln = self.uris.get(uri_id as usize)?.local_names.get(ln_id)?;
        let global_slot = ln
            .cross
            .iter()
            .filter(|&&s| s != INVALIDATED)
            .nth(local_index as usize)?;
        self.values.get(*global_slot)
    }

    // --- Global value partition ---

    pub fn global_value_bits(&self) -> u8 {
        bits_for_count(self.values.rows.iter().filter(|r| r.is_some()).count().max(1))
    }

    pub fn lookup_global_value(&self, value: &str) -> Option<u32> {
        self.values.lookup(value).map(|s| s as u32)
    }

    pub fn global_value_at(&self, slot: u32) -> Option<&str> {
        self.values.get(slot as usize)
    }

    /// Adds `value` to both the global table (subject to capacity/length)
    /// and the `(uri, ln)` local cross-table, per §4.B step 4. No-op (but
    /// not an error) if the value exceeds `valueMaxLength`: the caller must
    /// have already chosen to encode it as a miss without calling this.
    pub fn add_value(&mut self, uri_id: u16, ln_id: usize, value: &str) {
        if let Some(max) = self.value_max_length {
            if value.chars().count() as u32 > max {
                return;
            }
        }
        let ln_row = match self
            .uris
            .get_mut(uri_id as usize)
            .and_then(|u| u.local_names.get_mut(ln_id))
        {
            Some(r) => r,
            None => return,
        };
        let cross_idx = ln_row.cross.len();
        ln_row.cross.push(0); // placeholder, fixed up below

        let slot = self
            .values
            .insert(value.to_string(), (uri_id, ln_id, cross_idx), &mut self.uris);

        // Re-borrow: insert() may have resized `self.uris` vectors (it only
        // mutates existing rows, never the Vec length, so the index above is
        // still valid).
        self.uris[uri_id as usize].local_names[ln_id].cross[cross_idx] = slot;
    }
}

/// `n`-bit read/write that tolerates `n == 0` (an index into a partition
/// with at most one live entry needs no bits at all), unlike
/// [`codec::encode_n_bit_uint`]/[`codec::decode_n_bit_uint`] which assume a
/// caller-guaranteed non-zero width the way event-code parts always are.
fn write_index(buf: &mut BitBuffer, bits: u8, v: u32, sink: &mut dyn Sink) -> Result<()> {
    if bits == 0 {
        Ok(())
    } else {
        codec::encode_n_bit_uint(buf, bits, v, sink)
    }
}

fn read_index(buf: &mut BitBuffer, bits: u8, source: &mut dyn Source) -> Result<u32> {
    if bits == 0 {
        Ok(0)
    } else {
        codec::decode_n_bit_uint(buf, bits, source)
    }
}

/// The three-state literal encoding (§4.B "String-table-aware string
/// codec") used for CH values, QName local-names, and URI strings alike:
/// a flag selects local-partition hit (0), global-partition hit (1), or a
/// literal miss (`flag - 2` code points follow), with a miss adding the new
/// string to both tables unless it exceeds `valueMaxLength`.
pub fn encode_table_string(
    buf: &mut BitBuffer,
    uri_id: u16,
    ln_id: usize,
    value: &str,
    tables: &mut StringTables,
    sink: &mut dyn Sink,
) -> Result<()> {
    if let Some(local_index) = tables.lookup_local_value(uri_id, ln_id, value) {
        codec::encode_uint(buf, 0, sink)?;
        let bits = tables.local_value_bits(uri_id, ln_id);
        return write_index(buf, bits, local_index, sink);
    }
    if let Some(global_index) = tables.lookup_global_value(value) {
        codec::encode_uint(buf, 1, sink)?;
        let bits = tables.global_value_bits();
        return write_index(buf, bits, global_index, sink);
    }
    let chars: Vec<char> = value.chars().collect();
    codec::encode_uint(buf, chars.len() as u64 + 2, sink)?;
    for c in chars {
        codec::encode_uint(buf, c as u64, sink)?;
    }
    tables.add_value(uri_id, ln_id, value);
    Ok(())
}

pub fn decode_table_string(
    buf: &mut BitBuffer,
    uri_id: u16,
    ln_id: usize,
    tables: &mut StringTables,
    source: &mut dyn Source,
) -> Result<String> {
    let flag = codec::decode_uint(buf, source)?;
    match flag {
        0 => {
            let bits = tables.local_value_bits(uri_id, ln_id);
            let index = read_index(buf, bits, source)?;
            tables
                .local_value_at(uri_id, ln_id, index)
                .map(str::to_owned)
                .ok_or(ErrorCode::InvalidExiInput)
        }
        1 => {
            let bits = tables.global_value_bits();
            let index = read_index(buf, bits, source)?;
            tables
                .global_value_at(index)
                .map(str::to_owned)
                .ok_or(ErrorCode::InvalidExiInput)
        }
        n => {
            let len = (n - 2) as usize;
            let mut s = String::with_capacity(len);
            for _ in 0..len {
                let cp = codec::decode_uint(buf, source)? as u32;
                s.push(char::from_u32(cp).ok_or(ErrorCode::InvalidExiInput)?);
            }
            tables.add_value(uri_id, ln_id, &s);
            Ok(s)
        }
    }
}

/// QName component codec (§4.B: "QName local parts, and URI strings go
/// through the three-state literal encoding" too): a one-bit-narrower
/// two-state variant, since the URI and local-name partitions have no
/// local/global split of their own — `0` is always the literal-miss flag,
/// `1..=count` hits existing row `flag - 1`.
pub fn encode_uri_ref(
    buf: &mut BitBuffer,
    uri: &str,
    tables: &mut StringTables,
    sink: &mut dyn Sink,
) -> Result<u16> {
    let bits = bits_for_count(tables.uri_count() + 1);
    if let Some(id) = tables.lookup_uri(uri) {
        write_index(buf, bits, id as u32 + 1, sink)?;
        Ok(id)
    } else {
        write_index(buf, bits, 0, sink)?;
        codec::encode_string_only(buf, uri, sink)?;
        Ok(tables.add_uri(uri))
    }
}

pub fn decode_uri_ref(buf: &mut BitBuffer, tables: &mut StringTables, source: &mut dyn Source) -> Result<u16> {
    let bits = bits_for_count(tables.uri_count() + 1);
    let flag = read_index(buf, bits, source)?;
    if flag == 0 {
        let uri = codec::decode_string_only(buf, source)?;
        Ok(tables.add_uri(&uri))
    } else {
        Ok(flag as u16 - 1)
    }
}

pub fn encode_ln_ref(
    buf: &mut BitBuffer,
    uri_id: u16,
    local_name: &str,
    tables: &mut StringTables,
    sink: &mut dyn Sink,
) -> Result<usize> {
    let bits = bits_for_count(tables.ln_count(uri_id) + 1);
    if let Some(id) = tables.lookup_ln(uri_id, local_name) {
        write_index(buf, bits, id as u32 + 1, sink)?;
        Ok(id)
    } else {
        write_index(buf, bits, 0, sink)?;
        codec::encode_string_only(buf, local_name, sink)?;
        tables.add_ln(uri_id, local_name)
    }
}

pub fn decode_ln_ref(
    buf: &mut BitBuffer,
    uri_id: u16,
    tables: &mut StringTables,
    source: &mut dyn Source,
) -> Result<usize> {
    let bits = bits_for_count(tables.ln_count(uri_id) + 1);
    let flag = read_index(buf, bits, source)?;
    if flag == 0 {
        let local_name = codec::decode_string_only(buf, source)?;
        tables.add_ln(uri_id, &local_name)
    } else {
        Ok(flag as usize - 1)
    }
}

/// Encodes a full qname (uri then local-name) via [`encode_uri_ref`]/
/// [`encode_ln_ref`], as every `SE(qname)`/`AT(qname)` learned production
/// requires.
pub fn encode_qname(
    buf: &mut BitBuffer,
    qname: QNameId,
    tables: &mut StringTables,
    sink: &mut dyn Sink,
) -> Result<()> {
    let uri = tables.uri_str(qname.uri_id).ok_or(ErrorCode::OutOfBoundBuffer)?.to_string();
    encode_uri_ref(buf, &uri, tables, sink)?;
    let local_name = tables
        .ln_str(qname.uri_id, qname.ln_id)
        .ok_or(ErrorCode::OutOfBoundBuffer)?
        .to_string();
    encode_ln_ref(buf, qname.uri_id, &local_name, tables, sink)?;
    Ok(())
}

pub fn decode_qname(buf: &mut BitBuffer, tables: &mut StringTables, source: &mut dyn Source) -> Result<QNameId> {
    let uri_id = decode_uri_ref(buf, tables, source)?;
    let ln_id = decode_ln_ref(buf, uri_id, tables, source)?;
    Ok(QNameId::new(uri_id, ln_id))
}

fn bits_for_count(count: usize) -> u8 {
    if count <= 1 {
        return 0;
    }
    (usize::BITS - (count - 1).leading_zeros()) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preloaded_uris_are_fixed() {
        let t = StringTables::new(None, None);
        assert_eq!(t.lookup_uri(""), Some(preloaded_uri::EMPTY));
        assert_eq!(
            t.lookup_uri("http://www.w3.org/XML/1998/namespace"),
            Some(preloaded_uri::XML)
        );
        assert_eq!(
            t.lookup_uri("http://www.w3.org/2001/XMLSchema-instance"),
            Some(preloaded_uri::XSI)
        );
        assert_eq!(
            t.lookup_uri("http://www.w3.org/2001/XMLSchema"),
            Some(preloaded_uri::XSD)
        );
    }

    #[test]
    fn global_value_hit_after_add() {
        let mut t = StringTables::new(None, None);
        let uri = t.add_uri("http://example.com");
        let ln = t.add_ln(uri, "r").unwrap();
        t.add_value(uri, ln, "alpha");
        assert_eq!(t.lookup_global_value("alpha"), Some(0));
        assert_eq!(t.lookup_local_value(uri, ln, "alpha"), Some(0));
    }

    #[test]
    fn capacity_eviction_moves_fifo_slot_and_invalidates_local_backpointer() {
        let mut t = StringTables::new(Some(2), None);
        let uri = t.add_uri("u");
        let ln = t.add_ln(uri, "ln").unwrap();
        t.add_value(uri, ln, "a"); // slot 0
        t.add_value(uri, ln, "b"); // slot 1
        t.add_value(uri, ln, "c"); // evicts slot 0 ("a")

        assert_eq!(t.lookup_global_value("a"), None);
        assert_eq!(t.lookup_global_value("c"), Some(0));
        // "a"'s local cross-table slot is now a stale sentinel, treated as a
        // miss rather than compacted away.
        assert_eq!(t.lookup_local_value(uri, ln, "a"), None);
        // "b" and "c" are still reachable locally.
        assert!(t.lookup_local_value(uri, ln, "b").is_some());
        assert!(t.lookup_local_value(uri, ln, "c").is_some());
    }

    #[test]
    fn prefix_cap_enforced() {
        let mut t = StringTables::new(None, None).with_max_prefixes_per_uri(1);
        let uri = t.add_uri("u");
        t.add_prefix(uri, "p0").unwrap();
        assert_eq!(
            t.add_prefix(uri, "p1").unwrap_err(),
            ErrorCode::TooMuchPrefixesPerUri
        );
    }

    #[test]
    fn value_max_length_bypass_skips_table() {
        let mut t = StringTables::new(None, Some(3));
        let uri = t.add_uri("u");
        let ln = t.add_ln(uri, "ln").unwrap();
        t.add_value(uri, ln, "toolong");
        assert_eq!(t.lookup_global_value("toolong"), None);
        assert_eq!(t.lookup_local_value(uri, ln, "toolong"), None);
    }

    #[test]
    fn bits_for_count_matches_ceil_log2() {
        assert_eq!(bits_for_count(1), 0);
        assert_eq!(bits_for_count(2), 1);
        assert_eq!(bits_for_count(3), 2);
        assert_eq!(bits_for_count(4), 2);
        assert_eq!(bits_for_count(5), 3);
    }

    #[test]
    fn table_string_second_occurrence_is_a_one_bit_local_hit() {
        use crate::bitstream::{BitBuffer, MemorySink, MemorySource};

        let mut t = StringTables::new(None, None);
        let uri = t.add_uri("");
        let ln = t.add_ln(uri, "r").unwrap();

        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        // Miss: flag=2 (length 0 + 2), then 5 code points.
        encode_table_string(&mut w, uri, ln, "alpha", &mut t, &mut sink).unwrap();
        // Hit: flag=0 (local-partition hit), then the local-table index.
        encode_table_string(&mut w, uri, ln, "alpha", &mut t, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();

        let mut source = MemorySource::new(&sink.0);
        let mut r = BitBuffer::for_reading();
        let mut t2 = StringTables::new(None, None);
        let uri2 = t2.add_uri("");
        let ln2 = t2.add_ln(uri2, "r").unwrap();
        assert_eq!(
            decode_table_string(&mut r, uri2, ln2, &mut t2, &mut source).unwrap(),
            "alpha"
        );
        assert_eq!(
            decode_table_string(&mut r, uri2, ln2, &mut t2, &mut source).unwrap(),
            "alpha"
        );
    }

    #[test]
    fn table_string_miss_then_global_hit_from_a_different_local_name() {
        use crate::bitstream::{BitBuffer, MemorySink, MemorySource};

        let mut t = StringTables::new(None, None);
        let uri = t.add_uri("");
        let ln_a = t.add_ln(uri, "a").unwrap();
        let ln_b = t.add_ln(uri, "b").unwrap();

        let mut sink = MemorySink::default();
        let mut w = BitBuffer::for_writing();
        encode_table_string(&mut w, uri, ln_a, "shared", &mut t, &mut sink).unwrap();
        encode_table_string(&mut w, uri, ln_b, "shared", &mut t, &mut sink).unwrap();
        w.close_writer(&mut sink).unwrap();

        let mut source = MemorySource::new(&sink.0);
        let mut r = BitBuffer::for_reading();
        let mut t2 = StringTables::new(None, None);
        let uri2 = t2.add_uri("");
        let ln_a2 = t2.add_ln(uri2, "a").unwrap();
        let ln_b2 = t2.add_ln(uri2, "b").unwrap();
        assert_eq!(
            decode_table_string(&mut r, uri2, ln_a2, &mut t2, &mut source).unwrap(),
            "shared"
        );
        assert_eq!(
            decode_table_string(&mut r, uri2, ln_b2, &mut t2, &mut source).unwrap(),
            "shared"
        );
    }
}
