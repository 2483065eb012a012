//! Label pools: per-node residual key suffixes plus a fixed-width value
//! payload, addressed by trie slot id.
//!
//! Two interchangeable layouts are provided.  `PlainPool` keeps one owned
//! buffer per slot id and is the simple baseline; `BitmapPool` packs a group
//! of consecutive ids into a single buffer behind an occupancy word and is
//! the compact option.  Both are append-only: a slot id is claimed once and
//! never released.

pub mod bitmap;
pub mod plain;

pub use bitmap::BitmapPool;
pub use plain::PlainPool;

use std::io::{self,Write};
use std::marker::PhantomData;

/// Fixed-width payload stored little-endian after each label.
pub trait Value: Copy + Default {
    const WIDTH: usize;
    fn load(bytes: &[u8]) -> Self;
    fn store(self,bytes: &mut [u8]);
}

macro_rules! int_value {
    ($($t:ty),*) => {$(
        impl Value for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();
            fn load(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                let n = raw.len();
                raw.copy_from_slice(&bytes[..n]);
                <$t>::from_le_bytes(raw)
            }
            fn store(self,bytes: &mut [u8]) {
                bytes[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }
        }
    )*};
}

int_value!(u8,u16,u32,u64,usize,i8,i16,i32,i64);

/// Outcome of probing a pool slot against a residual key range.
pub struct LabelMatch {
    /// the stored label accounts for the entire query range
    pub hit: bool,
    /// length of the query prefix that matched the stored label
    pub num_match: usize,
}

/// Writable view of one stored value payload.  It borrows the pool, so it
/// lives only until the next pool operation; re-acquire it afterwards.
pub struct ValueCell<'a,V: Value> {
    bytes: &'a mut [u8],
    marker: PhantomData<V>,
}

impl<'a,V: Value> ValueCell<'a,V> {
    pub(crate) fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes, marker: PhantomData }
    }

    pub fn get(&self) -> V {
        V::load(self.bytes)
    }

    pub fn set(&mut self,val: V) {
        val.store(self.bytes)
    }
}

/// Storage for node labels and values.
///
/// `append` panics when the id already holds an entry: the dictionary only
/// appends at freshly created trie nodes, so a second append at the same id
/// is a bug, not a recoverable state.  `value` and `value_cell` re-resolve
/// the id on every call, which keeps them valid across the buffer
/// reallocations of the packed variant.
pub trait LabelPool {
    type Value: Value;

    /// pool able to hold one entry for every slot id below num_slots
    fn with_slots(num_slots: u64) -> Self;

    fn name() -> String;

    /// Match the query range against the suffix stored at id.  A query that
    /// the stored label accounts for entirely (terminator included) is a
    /// hit; otherwise `num_match` reports how far the two agreed.
    fn compare_and_get(&self,id: u64,label: &[u8]) -> LabelMatch;

    /// Claim id and store the label range with a zero value payload.
    fn append(&mut self,id: u64,label: &[u8]);

    /// Read the value stored at id; the id must hold an entry.
    fn value(&self,id: u64) -> Self::Value;

    /// Writable view of the value stored at id; the id must hold an entry.
    fn value_cell(&mut self,id: u64) -> ValueCell<'_,Self::Value>;

    fn num_ptrs(&self) -> u64;
    fn num_labels(&self) -> u64;
    fn sum_bytes(&self) -> u64;
    fn show_stat<W: Write>(&self,os: &mut W) -> io::Result<()>;
}

// *************** TESTS *****************

#[test]
fn value_round_trip() {
    let mut bytes = [0u8;8];
    0xDEAD_BEEFu32.store(&mut bytes);
    assert_eq!(u32::load(&bytes),0xDEAD_BEEF);
    assert_eq!(bytes[4..8],[0,0,0,0]);
    (-7i64).store(&mut bytes);
    assert_eq!(i64::load(&bytes),-7);
}

#[test]
fn cell_writes_through() {
    let mut bytes = [0u8;4];
    let mut cell: ValueCell<u32> = ValueCell::new(&mut bytes);
    assert_eq!(cell.get(),0);
    cell.set(99);
    assert_eq!(cell.get(),99);
    assert_eq!(u32::load(&bytes),99);
}
