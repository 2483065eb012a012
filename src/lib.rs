//! # pdtrie
//!
//! A dynamic dictionary over byte-string keys with the footprint of a
//! compact trie.  Keys are path-decomposed: a hashed slot-table trie
//! (`bonsai`) holds the branching structure, while a label pool (`pool`)
//! keeps each key's residual tail next to its fixed-width value.  The
//! `dict` module ties the two together.
//!
//! * `bonsai` — compact trie where slot positions double as node ids
//! * `pool` — label storage, a plain per-slot variant and a group-packed
//!   bitmap variant in four group sizes
//! * `dict` — find/update over byte keys
//!
//! Capacity is fixed up front from an expected key count and a target load
//! factor; there is no deletion, iteration, or rehashing.
//!
//! ## Example
//!
//! ```rs
//! use pdtrie::dict::{Dict,Setting,STD_SETTING};
//! use pdtrie::pool::PlainPool;
//!
//! let setting = Setting { num_keys: 1000, ..STD_SETTING };
//! let mut dic: Dict<PlainPool<u32>> = Dict::new(setting).expect("bad setting");
//! dic.update(b"alpha").expect("out of capacity").set(7);
//! assert_eq!(dic.find(b"alpha"),Some(7));
//! assert_eq!(dic.find(b"alp"),None);
//! ```

mod tools;
pub mod bonsai;
pub mod dict;
pub mod pool;

/// Dictionary errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("fixed_len must be a power of 2")]
    FixedLenNotPower2,
    #[error("load_factor must lie strictly between 0 and 1")]
    BadLoadFactor,
    #[error("bit width must satisfy 0 < width <= 64")]
    BadBitWidth,
    #[error("slot table needs at least one slot")]
    EmptySlotTable,
    #[error("slot table is full")]
    SlotTableFull,
    #[error("too many distinct key bytes")]
    AlphabetOverflow,
}
