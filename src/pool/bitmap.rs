//! Group-packed label storage in the manner of a sparse table: a group of
//! consecutive slot ids shares one occupancy word and one contiguous buffer
//! of vbyte-length-prefixed entries kept in id order.  An entry is located
//! by a masked popcount on the occupancy word followed by skipping that many
//! entries, the skipping approach of Askitis and Zobel, "Cache-conscious
//! collision resolution in string hash tables", SPIRE 2005.
//!
//! The group word type picks the group size: `u8` packs 8 ids per buffer,
//! `u64` packs 64.  Appending splices the new entry into a fresh buffer, so
//! anything previously resolved into the group must be re-resolved.

use std::io::{self,Write};
use std::marker::PhantomData;

use num_traits::PrimInt;

use super::{LabelMatch,LabelPool,Value,ValueCell};
use crate::tools::bits::{get_bit,popcount_below,set_bit};
use crate::tools::vbyte;

pub struct BitmapPool<V: Value,W: PrimInt> {
    pools: Vec<Option<Box<[u8]>>>,
    bitmap: Vec<W>,
    num_labels: u64,
    sum_bytes: u64,
    marker: PhantomData<V>,
}

impl<V: Value,W: PrimInt> BitmapPool<V,W> {
    /// ids per group
    const GROUP_SIZE: u64 = (std::mem::size_of::<W>() * 8) as u64;

    /// byte offset just past the first count entries of a group buffer
    fn skip_entries(buf: &[u8],count: usize) -> usize {
        let mut p = 0;
        for _ in 0..count {
            let (len,used) = vbyte::decode(&buf[p..]);
            p += used + len as usize + V::WIDTH;
        }
        p
    }

    /// label offset and label length of the entry for id, which must exist
    fn entry(&self,id: u64) -> (&[u8],usize,usize) {
        let group = (id / Self::GROUP_SIZE) as usize;
        let offset = (id % Self::GROUP_SIZE) as usize;
        assert!(get_bit(self.bitmap[group],offset),"value read from an unused label slot");
        let buf = self.pools[group].as_ref().expect("occupied group has no buffer");
        let loc = popcount_below(self.bitmap[group],offset);
        let p = Self::skip_entries(buf,loc);
        let (len,used) = vbyte::decode(&buf[p..]);
        (buf,p + used,len as usize)
    }

    fn count_vbytes(&self) -> [u64;8] {
        let mut counts = [0u64;8];
        for (buf,word) in self.pools.iter().zip(self.bitmap.iter()) {
            let buf = match buf {
                Some(buf) => buf,
                None => continue,
            };
            let mut p = 0;
            for _ in 0..word.count_ones() {
                let (len,used) = vbyte::decode(&buf[p..]);
                counts[used - 1] += 1;
                p += used + len as usize + V::WIDTH;
            }
        }
        counts
    }
}

impl<V: Value,W: PrimInt> LabelPool for BitmapPool<V,W> {
    type Value = V;

    fn with_slots(num_slots: u64) -> Self {
        let num_groups = (num_slots / Self::GROUP_SIZE + 1) as usize;
        Self {
            pools: vec![None; num_groups],
            bitmap: vec![W::zero(); num_groups],
            num_labels: 0,
            sum_bytes: 0,
            marker: PhantomData,
        }
    }

    fn name() -> String {
        format!("bitmap{}",Self::GROUP_SIZE)
    }

    fn compare_and_get(&self,id: u64,label: &[u8]) -> LabelMatch {
        let group = (id / Self::GROUP_SIZE) as usize;
        let offset = (id % Self::GROUP_SIZE) as usize;
        if !get_bit(self.bitmap[group],offset) {
            return LabelMatch { hit: false, num_match: 0 };
        }
        let buf = self.pools[group].as_ref().expect("occupied group has no buffer");
        let loc = popcount_below(self.bitmap[group],offset);
        let mut p = Self::skip_entries(buf,loc);
        let (len,used) = vbyte::decode(&buf[p..]);
        p += used;
        let len = len as usize;
        if label.is_empty() {
            return LabelMatch { hit: true, num_match: 0 };
        }
        let stored = &buf[p..p + len];
        let num_match = stored.iter().zip(label.iter()).take_while(|(a,b)| a == b).count();
        if num_match < len {
            return LabelMatch { hit: false, num_match };
        }
        // all stored bytes matched; the query terminator must land exactly here
        match label.get(len) {
            Some(0) => LabelMatch { hit: true, num_match: len + 1 },
            _ => LabelMatch { hit: false, num_match: len },
        }
    }

    fn append(&mut self,id: u64,label: &[u8]) {
        let group = (id / Self::GROUP_SIZE) as usize;
        let offset = (id % Self::GROUP_SIZE) as usize;
        if get_bit(self.bitmap[group],offset) {
            panic!("label slot {} is already occupied",id);
        }
        self.num_labels += 1;
        // the stored length drops the query range's trailing terminator
        let label_len = label.len().saturating_sub(1);
        let entry_len = vbyte::size(label_len as u64) + label_len + V::WIDTH;
        self.sum_bytes += entry_len as u64;

        let new_buf = match self.pools[group].take() {
            None => {
                let mut buf = vec![0u8; entry_len];
                let n = vbyte::encode(&mut buf,label_len as u64);
                buf[n..n + label_len].copy_from_slice(&label[..label_len]);
                buf
            }
            Some(old) => {
                let loc = popcount_below(self.bitmap[group],offset);
                let front = Self::skip_entries(&old,loc);
                let mut buf = vec![0u8; old.len() + entry_len];
                buf[..front].copy_from_slice(&old[..front]);
                let mut p = front;
                p += vbyte::encode(&mut buf[p..],label_len as u64);
                buf[p..p + label_len].copy_from_slice(&label[..label_len]);
                p += label_len + V::WIDTH; // value bytes stay zero
                buf[p..].copy_from_slice(&old[front..]);
                buf
            }
        };
        self.pools[group] = Some(new_buf.into_boxed_slice());
        self.bitmap[group] = set_bit(self.bitmap[group],offset);
    }

    fn value(&self,id: u64) -> V {
        let (buf,at,len) = self.entry(id);
        V::load(&buf[at + len..at + len + V::WIDTH])
    }

    fn value_cell(&mut self,id: u64) -> ValueCell<'_,V> {
        let group = (id / Self::GROUP_SIZE) as usize;
        let offset = (id % Self::GROUP_SIZE) as usize;
        assert!(get_bit(self.bitmap[group],offset),"value read from an unused label slot");
        let loc = popcount_below(self.bitmap[group],offset);
        let buf = self.pools[group].as_mut().expect("occupied group has no buffer");
        let p = Self::skip_entries(buf,loc);
        let (len,used) = vbyte::decode(&buf[p..]);
        let at = p + used + len as usize;
        ValueCell::new(&mut buf[at..at + V::WIDTH])
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

    fn show_stat<W2: Write>(&self,os: &mut W2) -> io::Result<()> {
        writeln!(os,"Show statistics of {} pool",Self::name())?;
        writeln!(os," - num_ptrs:\t{}",self.num_ptrs())?;
        writeln!(os," - num_labels:\t{}",self.num_labels())?;
        writeln!(os," - sum_bytes:\t{}",self.sum_bytes())?;
        writeln!(os," - ave_length:\t{}",self.sum_bytes() as f64 / self.num_ptrs() as f64)?;
        writeln!(os," - rate_vbyte_counts:")?;
        let counts = self.count_vbytes();
        for (i,count) in counts.iter().enumerate() {
            if *count == 0 {
                break;
            }
            writeln!(os,"   - {}B:\t{}",i + 1,*count as f64 / self.num_labels() as f64)?;
        }
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
    let mut pool: BitmapPool<u64,u8> = BitmapPool::with_slots(64);
    let key = terminated(b"gadget");
    pool.append(11,&key);
    pool.value_cell(11).set(77);

    let m = pool.compare_and_get(11,&key);
    assert!(m.hit);
    assert_eq!(m.num_match,key.len());
    assert_eq!(pool.value(11),77);

    let m = pool.compare_and_get(12,&key);
    assert!(!m.hit);
    assert_eq!(m.num_match,0);
}

#[test]
fn partial_match_reports_prefix() {
    let mut pool: BitmapPool<u64,u16> = BitmapPool::with_slots(64);
    pool.append(0,&terminated(b"gadget"));

    let m = pool.compare_and_get(0,&terminated(b"gadfly"));
    assert!(!m.hit);
    assert_eq!(m.num_match,3);

    let m = pool.compare_and_get(0,&terminated(b"gad"));
    assert!(!m.hit);
    assert_eq!(m.num_match,3);

    let m = pool.compare_and_get(0,&terminated(b"gadgets"));
    assert!(!m.hit);
    assert_eq!(m.num_match,6);
}

#[test]
fn group_buffer_stays_in_id_order() {
    let mut pool: BitmapPool<u16,u8> = BitmapPool::with_slots(16);
    // append within one group in scrambled id order
    pool.append(5,&terminated(b"ee"));
    pool.append(1,&terminated(b"a"));
    pool.append(7,&terminated(b"ggg"));
    pool.append(3,&terminated(b"cc"));

    // layout: [1]"a" [3]"cc" [5]"ee" [7]"ggg", each as vbyte(len) label value
    let expected = [
        vec![1u8],b"a".to_vec(),vec![0,0],
        vec![2],b"cc".to_vec(),vec![0,0],
        vec![2],b"ee".to_vec(),vec![0,0],
        vec![3],b"ggg".to_vec(),vec![0,0],
    ].concat();
    assert_eq!(pool.pools[0].as_ref().unwrap().to_vec(),expected);
    assert_eq!(pool.bitmap[0],0b1010_1010);
}

#[test]
fn values_survive_later_appends_to_the_group() {
    let mut pool: BitmapPool<u32,u8> = BitmapPool::with_slots(32);
    pool.append(4,&terminated(b"delta"));
    pool.value_cell(4).set(40);
    // splicing in front of and behind the entry must not disturb it
    pool.append(2,&terminated(b"beta"));
    pool.append(6,&terminated(b"zeta"));
    assert_eq!(pool.value(4),40);
    assert_eq!(pool.value(2),0);
    let m = pool.compare_and_get(4,&terminated(b"delta"));
    assert!(m.hit);
}

#[test]
fn empty_labels_work() {
    let mut pool: BitmapPool<u32,u64> = BitmapPool::with_slots(256);
    pool.append(130,&[]);
    pool.value_cell(130).set(9);
    let m = pool.compare_and_get(130,&[]);
    assert!(m.hit);
    assert_eq!(pool.value(130),9);
}

#[test]
#[should_panic]
fn double_append_panics() {
    let mut pool: BitmapPool<u32,u8> = BitmapPool::with_slots(16);
    pool.append(2,&terminated(b"x"));
    pool.append(2,&terminated(b"y"));
}
