//! Compact dynamic trie over a hashed slot table.
//!
//! A simple rendition of the m-Bonsai (recursive) layout described by
//! Poyias and Raman, "Improved practical compact dynamic tries", SPIRE 2015.
//! A child is keyed by its (parent id, edge symbol) pair: the pair is hashed,
//! the remainder picks an ideal slot and the quotient is stored in whichever
//! slot linear probing lands on, together with the probe distance.  Slot
//! positions double as node ids, so the whole trie is one bit-packed array
//! plus a small spill map for probe distances too large to store inline.

use std::collections::BTreeMap;
use std::io::{self,Write};

use crate::tools::bits::num_bits;
use crate::tools::fit_vector::FitVector;
use crate::Error;

/// Outcome of `add_child`: the child slot, either freshly claimed or
/// already present from an earlier insertion.
pub enum AddChild {
    Created(u64),
    Found(u64),
}

struct HashValue {
    rem: u64,
    quo: u64,
}

pub struct Bonsai {
    num_nodes: u64,
    num_slots: u64,
    alphabet_size: u64,
    width_1st: u8,
    root_id: u64,
    empty_mark: u64,
    /// saturation value of the inline displacement field
    max_dsp1: u64,
    prime: u64,
    multiplier: u64,
    slots: FitVector,
    /// displacements that saturated the inline field
    aux_map: BTreeMap<u64,u32>,
}

impl Bonsai {
    pub fn new(num_slots: u64,alphabet_size: u64,width_1st: u8) -> Result<Self,Error> {
        if num_slots == 0 {
            return Err(Error::EmptySlotTable);
        }
        if width_1st == 0 || width_1st >= 64 {
            return Err(Error::BadBitWidth);
        }
        // one past the largest quotient the hash can hand back: the prime
        // overshoots alphabet_size * num_slots + num_slots - 1, so quotients
        // up to alphabet_size + 1 are reachable and the sentinel sits above
        let empty_mark = alphabet_size + 2;
        let width_slot = num_bits(empty_mark) + width_1st;
        if width_slot > 64 {
            return Err(Error::BadBitWidth);
        }
        if num_bits(alphabet_size.saturating_sub(1)) < num_bits(empty_mark) {
            log::warn!(
                "slot quotients take {} bits where the alphabet needs only {}",
                num_bits(empty_mark),
                num_bits(alphabet_size.saturating_sub(1))
            );
        }
        let prime = greater_prime(alphabet_size * num_slots + num_slots - 1);
        let slots = FitVector::filled(num_slots,width_slot,empty_mark << width_1st)?;
        Ok(Self {
            num_nodes: 1, // root
            num_slots,
            alphabet_size,
            width_1st,
            root_id: num_slots / 2,
            empty_mark,
            max_dsp1: (1u64 << width_1st) - 1,
            prime,
            multiplier: u64::MAX / prime,
            slots,
            aux_map: BTreeMap::new(),
        })
    }

    pub fn root(&self) -> u64 {
        self.root_id
    }

    /// Walk the probe chain of (node_id, symbol), returning the child slot
    /// if one was registered.
    pub fn get_child(&self,node_id: u64,symbol: u64) -> Option<u64> {
        assert!(symbol < self.alphabet_size,"out-of-range symbol in get_child");
        let hv = self.hash(node_id,symbol);
        assert!(hv.quo < self.empty_mark,"out-of-range quotient in get_child");
        let mut pos = hv.rem;
        let mut cnt = 0;
        loop {
            if pos != self.root_id {
                let quo = self.quo_at(pos);
                if quo == self.empty_mark {
                    return None;
                }
                if quo == hv.quo && self.dsp_at(pos) == Some(cnt) {
                    return Some(pos);
                }
            }
            pos = self.next(pos);
            cnt += 1;
        }
    }

    /// Like `get_child`, but the first empty slot on the probe chain is
    /// claimed for the pair when no registration is found en route.
    pub fn add_child(&mut self,node_id: u64,symbol: u64) -> Result<AddChild,Error> {
        assert!(symbol < self.alphabet_size,"out-of-range symbol in add_child");
        let hv = self.hash(node_id,symbol);
        assert!(hv.quo < self.empty_mark,"out-of-range quotient in add_child");
        let mut pos = hv.rem;
        let mut cnt = 0;
        loop {
            if pos != self.root_id {
                let quo = self.quo_at(pos);
                if quo == self.empty_mark {
                    self.write_slot(pos,hv.quo,cnt);
                    self.num_nodes += 1;
                    if self.num_nodes == self.num_slots {
                        return Err(Error::SlotTableFull);
                    }
                    return Ok(AddChild::Created(pos));
                }
                if quo == hv.quo && self.dsp_at(pos) == Some(cnt) {
                    return Ok(AddChild::Found(pos));
                }
            }
            pos = self.next(pos);
            cnt += 1;
        }
    }

    pub fn num_slots(&self) -> u64 {
        self.num_slots
    }

    pub fn num_nodes(&self) -> u64 {
        self.num_nodes
    }

    /// mean probe distance over the occupied slots
    pub fn average_dsp(&self) -> f64 {
        let mut num_used = 0;
        let mut sum_dsp = 0;
        for pos in 0..self.num_slots {
            if self.quo_at(pos) != self.empty_mark {
                num_used += 1;
                sum_dsp += self.dsp_at(pos).unwrap_or(0);
            }
        }
        match num_used {
            0 => 0.0,
            n => sum_dsp as f64 / n as f64,
        }
    }

    pub fn show_stat<W: Write>(&self,os: &mut W) -> io::Result<()> {
        writeln!(os,"Show statistics of Bonsai")?;
        writeln!(os," - num_nodes:\t{}",self.num_nodes())?;
        writeln!(os," - num_slots:\t{}",self.num_slots())?;
        writeln!(os," - num_auxs:\t{}",self.aux_map.len())?;
        writeln!(os," - load_factor:\t{}",self.num_nodes as f64 / self.num_slots as f64)?;
        writeln!(os," - slot_width:\t{}",self.slots.width())?;
        writeln!(os," - slot_memory:\t{}",self.slots.size_in_bytes())?;
        writeln!(os," - average_dsp:\t{}",self.average_dsp())?;
        Ok(())
    }

    fn hash(&self,node_id: u64,symbol: u64) -> HashValue {
        let c = symbol * self.num_slots + node_id;
        let c_rnd = (c % self.prime).wrapping_mul(self.multiplier) % self.prime;
        HashValue {
            rem: c_rnd % self.num_slots,
            quo: c_rnd / self.num_slots,
        }
    }

    fn next(&self,pos: u64) -> u64 {
        match pos + 1 >= self.num_slots {
            true => 0,
            false => pos + 1,
        }
    }

    fn quo_at(&self,pos: u64) -> u64 {
        self.slots.get(pos) >> self.width_1st
    }

    /// The stored probe distance; None when the inline field saturated and
    /// the spill map has no entry, which no probe count will ever equal.
    fn dsp_at(&self,pos: u64) -> Option<u64> {
        let dsp = self.slots.get(pos) & self.max_dsp1;
        if dsp < self.max_dsp1 {
            return Some(dsp);
        }
        self.aux_map.get(&pos).map(|&d| d as u64)
    }

    fn write_slot(&mut self,pos: u64,quo: u64,dsp: u64) {
        let mut val = quo << self.width_1st;
        if dsp < self.max_dsp1 {
            val |= dsp;
        } else {
            val |= self.max_dsp1;
            debug_assert!(!self.aux_map.contains_key(&pos));
            self.aux_map.insert(pos,dsp as u32);
        }
        self.slots.set(pos,val);
    }
}

fn is_prime(n: u64) -> bool {
    if n == 2 {
        return true;
    }
    if n <= 1 || n % 2 == 0 {
        return false;
    }
    let mut i = 3;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// smallest prime strictly greater than n
fn greater_prime(n: u64) -> u64 {
    let mut ret = n + 1;
    if ret % 2 == 0 && ret != 2 {
        ret += 1;
    }
    while !is_prime(ret) {
        ret += 2;
    }
    ret
}

// *************** TESTS *****************

#[test]
fn primes() {
    assert!(is_prime(2));
    assert!(is_prime(13));
    assert!(!is_prime(1));
    assert!(!is_prime(91));
    assert_eq!(greater_prime(1),2);
    assert_eq!(greater_prime(13),17);
    assert_eq!(greater_prime(89),97);
}

#[test]
fn children_come_back() {
    let mut trie = Bonsai::new(512,1 << 10,6).unwrap();
    let root = trie.root();
    let mut ids = Vec::new();
    for symbol in 0..200u64 {
        match trie.add_child(root,symbol).unwrap() {
            AddChild::Created(id) => ids.push(id),
            AddChild::Found(_) => panic!("fresh symbol already present"),
        }
    }
    for symbol in 0..200u64 {
        assert_eq!(trie.get_child(root,symbol),Some(ids[symbol as usize]));
    }
    assert_eq!(trie.get_child(root,500),None);
    assert_eq!(trie.num_nodes(),201);
}

#[test]
fn duplicate_add_is_found() {
    let mut trie = Bonsai::new(128,256,4).unwrap();
    let root = trie.root();
    let id = match trie.add_child(root,42).unwrap() {
        AddChild::Created(id) => id,
        AddChild::Found(_) => panic!("fresh symbol already present"),
    };
    match trie.add_child(root,42).unwrap() {
        AddChild::Created(_) => panic!("second add must not create"),
        AddChild::Found(found) => assert_eq!(found,id),
    }
    assert_eq!(trie.num_nodes(),2);
}

#[test]
fn deep_chains_survive_narrow_inline_width() {
    // width_1st = 1 saturates the inline field at displacement 1, pushing
    // almost every probe distance through the spill map
    let mut trie = Bonsai::new(256,512,1).unwrap();
    let root = trie.root();
    let mut ids = Vec::new();
    for symbol in 0..150u64 {
        match trie.add_child(root,symbol).unwrap() {
            AddChild::Created(id) => ids.push(id),
            AddChild::Found(_) => panic!("fresh symbol already present"),
        }
    }
    for symbol in 0..150u64 {
        assert_eq!(trie.get_child(root,symbol),Some(ids[symbol as usize]));
    }
}

#[test]
fn capacity_is_fatal() {
    let mut trie = Bonsai::new(16,64,2).unwrap();
    let root = trie.root();
    let mut result = Ok(());
    for symbol in 0..16u64 {
        if let Err(e) = trie.add_child(root,symbol) {
            result = Err(e);
            break;
        }
    }
    assert!(matches!(result,Err(Error::SlotTableFull)));
}

#[test]
fn rejects_bad_construction() {
    assert!(matches!(Bonsai::new(0,256,6),Err(Error::EmptySlotTable)));
    assert!(matches!(Bonsai::new(128,256,0),Err(Error::BadBitWidth)));
}
