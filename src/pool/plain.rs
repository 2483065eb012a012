//! Baseline label storage: one owned buffer per slot id holding the residual
//! key bytes (terminator included) directly followed by the value payload.
//! Memory-hungry on sparse tables but the fastest to probe.

use std::io::{self,Write};
use std::marker::PhantomData;

use super::{LabelMatch,LabelPool,Value,ValueCell};

pub struct PlainPool<V: Value> {
    pools: Vec<Option<Box<[u8]>>>,
    num_labels: u64,
    sum_bytes: u64,
    marker: PhantomData<V>,
}

impl<V: Value> LabelPool for PlainPool<V> {
    type Value = V;

    fn with_slots(num_slots: u64) -> Self {
        Self {
            pools: vec![None; num_slots as usize],
            num_labels: 0,
            sum_bytes: 0,
            marker: PhantomData,
        }
    }

    fn name() -> String {
        "plain".to_string()
    }

    fn compare_and_get(&self,id: u64,label: &[u8]) -> LabelMatch {
        let buf = match &self.pools[id as usize] {
            Some(buf) => buf,
            None => return LabelMatch { hit: false, num_match: 0 },
        };
        if label.is_empty() {
            return LabelMatch { hit: true, num_match: 0 };
        }
        // the stored terminator stops any longer query before it can run
        // into the value bytes
        let num_match = buf.iter().zip(label.iter()).take_while(|(a,b)| a == b).count();
        LabelMatch { hit: num_match == label.len(), num_match }
    }

    fn append(&mut self,id: u64,label: &[u8]) {
        if self.pools[id as usize].is_some() {
            panic!("label slot {} is already occupied",id);
        }
        self.num_labels += 1;
        let new_alloc = label.len() + V::WIDTH;
        self.sum_bytes += new_alloc as u64;
        let mut buf = vec![0u8; new_alloc];
        buf[..label.len()].copy_from_slice(label);
        self.pools[id as usize] = Some(buf.into_boxed_slice());
    }

    fn value(&self,id: u64) -> V {
        let buf = self.pools[id as usize].as_ref().expect("value read from an unused label slot");
        V::load(&buf[buf.len() - V::WIDTH..])
    }

    fn value_cell(&mut self,id: u64) -> ValueCell<'_,V> {
        let buf = self.pools[id as usize].as_mut().expect("value read from an unused label slot");
        let at = buf.len() - V::WIDTH;
        ValueCell::new(&mut buf[at..])
    }

    fn num_ptrs(&self) -> u64 {
        self.pools.len() as u64
    }

    fn num_labels(&self) -> u64 {
        self.num_labels
    }

    fn sum_bytes(&self) -> u64 {
        self.sum_bytes
    }

    fn show_stat<W: Write>(&self,os: &mut W) -> io::Result<()> {
        writeln!(os,"Show statistics of {} pool",Self::name())?;
        writeln!(os," - num_ptrs:\t{}",self.num_ptrs())?;
        writeln!(os," - num_labels:\t{}",self.num_labels())?;
        writeln!(os," - sum_bytes:\t{}",self.sum_bytes())?;
        writeln!(os," - ave_length:\t{}",self.sum_bytes() as f64 / self.num_labels() as f64)?;
        Ok(())
    }
}

// *************** TESTS *****************

#[cfg(test)]
fn terminated(key: &[u8]) -> Vec<u8> {
    let mut buf = key.to_vec();
    buf.push(0);
    buf
}

#[test]
fn stores_and_matches() {
    let mut pool: PlainPool<u64> = PlainPool::with_slots(16);
    let key = terminated(b"gadget");
    pool.append(3,&key);
    pool.value_cell(3).set(77);

    let m = pool.compare_and_get(3,&key);
    assert!(m.hit);
    assert_eq!(m.num_match,key.len());
    assert_eq!(pool.value(3),77);

    let m = pool.compare_and_get(5,&key);
    assert!(!m.hit);
    assert_eq!(m.num_match,0);
}

#[test]
fn partial_match_reports_prefix() {
    let mut pool: PlainPool<u64> = PlainPool::with_slots(16);
    pool.append(0,&terminated(b"gadget"));

    let m = pool.compare_and_get(0,&terminated(b"gadfly"));
    assert!(!m.hit);
    assert_eq!(m.num_match,3);

    // a strict prefix stops at the stored byte where the query terminates
    let m = pool.compare_and_get(0,&terminated(b"gad"));
    assert!(!m.hit);
    assert_eq!(m.num_match,3);

    // a longer query stops at the stored terminator
    let m = pool.compare_and_get(0,&terminated(b"gadgets"));
    assert!(!m.hit);
    assert_eq!(m.num_match,6);
}

#[test]
fn empty_labels_work() {
    let mut pool: PlainPool<u32> = PlainPool::with_slots(4);
    pool.append(1,&[]);
    pool.value_cell(1).set(5);
    let m = pool.compare_and_get(1,&[]);
    assert!(m.hit);
    assert_eq!(pool.value(1),5);
}

#[test]
#[should_panic]
fn double_append_panics() {
    let mut pool: PlainPool<u32> = PlainPool::with_slots(4);
    pool.append(2,&terminated(b"x"));
    pool.append(2,&terminated(b"y"));
}
