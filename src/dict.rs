//! Dictionary over byte-string keys, built from a Bonsai trie and a label
//! pool by path decomposition.
//!
//! A key is split across a trie path and a tail: the descent matches the
//! label stored at the current node, follows step edges past each
//! `fixed_len` chunk of the matched prefix, then branches on the first
//! disagreeing byte.  The branch symbol packs the byte's character code with
//! the offset inside the current label chunk, so one trie edge carries both.
//! Character codes are handed out in first-seen order, which keeps the
//! effective alphabet as small as the input allows.
//!
//! Keys are ordinary byte slices; a zero terminator is appended internally
//! and distinguishes a stored key from a longer stored key it prefixes.
//! Keys therefore must not contain the zero byte themselves.

use std::io::{self,Write};

use crate::bonsai::{AddChild,Bonsai};
use crate::pool::{LabelPool,ValueCell};
use crate::tools::bits::is_power2;
use crate::Error;

/// symbol reserved for chaining step nodes along labels longer than fixed_len
pub const STEP_SYMBOL: u64 = 0xFF;

/// codes above this are reserved: the unseen mark, the step sentinel's low
/// byte, and one spare
const CODE_MAX: u8 = 0xFF - 3;

/// alphabet slots never handed out as character codes
const RESERVED_CODES: u64 = 3;

/// table entry for a byte no key has used yet
const UNSEEN: u8 = 0xFF;

/// Construction parameters for a dictionary.
#[derive(Clone,Copy,Debug)]
pub struct Setting {
    /// expected number of keys, used for sizing only
    pub num_keys: u64,
    /// target occupancy of the slot table
    pub load_factor: f64,
    /// label chunk granularity, must be a power of two
    pub fixed_len: u64,
    /// bits of probe distance stored inline in each slot
    pub width_1st: u8,
}

/// the parameters the tests and the bench defaults are built around
pub const STD_SETTING: Setting = Setting {
    num_keys: 1 << 10,
    load_factor: 0.8,
    fixed_len: 32,
    width_1st: 6,
};

impl Setting {
    pub fn num_slots(&self) -> u64 {
        (self.num_keys as f64 / self.load_factor).ceil() as u64
    }

    pub fn alphabet_size(&self) -> u64 {
        (self.fixed_len << 8) - RESERVED_CODES
    }

    pub fn show_stat<W: Write>(&self,os: &mut W) -> io::Result<()> {
        writeln!(os,"Show statistics of Setting")?;
        writeln!(os," - num_keys:\t{}",self.num_keys)?;
        writeln!(os," - load_factor:\t{}",self.load_factor)?;
        writeln!(os," - fixed_len:\t{}",self.fixed_len)?;
        writeln!(os," - width_1st:\t{}",self.width_1st)?;
        Ok(())
    }
}

pub struct Dict<P: LabelPool> {
    setting: Setting,
    num_keys: u64,
    num_steps: u64,
    /// first-seen permutation of input bytes to character codes
    table: [u8;256],
    num_chars: u8,
    trie: Bonsai,
    pool: P,
}

impl<P: LabelPool> Dict<P> {
    pub fn new(setting: Setting) -> Result<Self,Error> {
        if !is_power2(setting.fixed_len) {
            return Err(Error::FixedLenNotPower2);
        }
        if !(setting.load_factor > 0.0 && setting.load_factor < 1.0) {
            return Err(Error::BadLoadFactor);
        }
        let trie = Bonsai::new(setting.num_slots(),setting.alphabet_size(),setting.width_1st)?;
        let pool = P::with_slots(trie.num_slots());
        log::debug!(
            "new {}: {} slots of alphabet {}",
            Self::name(),
            trie.num_slots(),
            setting.alphabet_size()
        );
        Ok(Self {
            setting,
            num_keys: 0,
            num_steps: 0,
            table: [UNSEEN;256],
            num_chars: 0,
            trie,
            pool,
        })
    }

    pub fn name() -> String {
        format!("dict_{}",P::name())
    }

    /// Look up key, returning its value if present.
    pub fn find(&self,key: &[u8]) -> Option<P::Value> {
        let kbuf = terminated(key);
        let mut range: &[u8] = &kbuf;
        let mut node = self.trie.root();

        while !range.is_empty() {
            let m = self.pool.compare_and_get(node,range);
            if m.hit {
                return Some(self.pool.value(node));
            }
            let mut num_match = m.num_match as u64;
            range = &range[m.num_match..];

            // follow step nodes past every whole chunk of the matched prefix
            while self.setting.fixed_len <= num_match {
                node = self.trie.get_child(node,STEP_SYMBOL)?;
                num_match -= self.setting.fixed_len;
            }

            let code = self.table[range[0] as usize];
            if code == UNSEEN {
                return None;
            }
            node = self.trie.get_child(node,make_symbol(code,num_match))?;
            range = &range[1..];
        }

        let m = self.pool.compare_and_get(node,&[]);
        match m.hit {
            true => Some(self.pool.value(node)),
            false => None,
        }
    }

    /// Insert key if absent and return a writable view of its value cell,
    /// zero-initialised on first creation.  The cell borrows the dictionary,
    /// so it is gone by the next call; re-acquire it with another `update`.
    pub fn update(&mut self,key: &[u8]) -> Result<ValueCell<'_,P::Value>,Error> {
        let kbuf = terminated(key);
        let mut range: &[u8] = &kbuf;
        let mut node = self.trie.root();

        if self.num_keys == 0 {
            // first insert, the whole key becomes the root label
            self.num_keys = 1;
            self.pool.append(node,range);
            return Ok(self.pool.value_cell(node));
        }

        while !range.is_empty() {
            let m = self.pool.compare_and_get(node,range);
            if m.hit {
                return Ok(self.pool.value_cell(node));
            }
            let mut num_match = m.num_match as u64;
            range = &range[m.num_match..];

            while self.setting.fixed_len <= num_match {
                node = match self.trie.add_child(node,STEP_SYMBOL)? {
                    AddChild::Created(id) => {
                        self.num_steps += 1;
                        id
                    }
                    AddChild::Found(id) => id,
                };
                num_match -= self.setting.fixed_len;
            }

            let next = range[0];
            if self.table[next as usize] == UNSEEN {
                self.table[next as usize] = self.num_chars;
                self.num_chars += 1;
                if self.num_chars > CODE_MAX {
                    return Err(Error::AlphabetOverflow);
                }
            }
            let symbol = make_symbol(self.table[next as usize],num_match);
            range = &range[1..];
            node = match self.trie.add_child(node,symbol)? {
                AddChild::Created(id) => {
                    self.num_keys += 1;
                    self.pool.append(id,range);
                    return Ok(self.pool.value_cell(id));
                }
                AddChild::Found(id) => id,
            };
        }

        let m = self.pool.compare_and_get(node,&[]);
        if !m.hit {
            self.num_keys += 1;
            self.pool.append(node,&[]);
        }
        Ok(self.pool.value_cell(node))
    }

    pub fn num_keys(&self) -> u64 {
        self.num_keys
    }

    pub fn num_steps(&self) -> u64 {
        self.num_steps
    }

    pub fn num_chars(&self) -> u8 {
        self.num_chars
    }

    pub fn trie(&self) -> &Bonsai {
        &self.trie
    }

    pub fn show_stat<W: Write>(&self,os: &mut W) -> io::Result<()> {
        self.setting.show_stat(os)?;
        writeln!(os,"Show statistics of {}",Self::name())?;
        writeln!(os," - num_keys:\t{}",self.num_keys())?;
        writeln!(os," - num_steps:\t{}",self.num_steps())?;
        writeln!(os," - num_chars:\t{}",self.num_chars())?;
        self.trie.show_stat(os)?;
        self.pool.show_stat(os)?;
        Ok(())
    }
}

fn terminated(key: &[u8]) -> Vec<u8> {
    debug_assert!(!key.contains(&0),"keys cannot contain the zero byte");
    let mut buf = Vec::with_capacity(key.len() + 1);
    buf.extend_from_slice(key);
    buf.push(0);
    buf
}

fn make_symbol(code: u8,offset: u64) -> u64 {
    let symbol = code as u64 | (offset << 8);
    debug_assert!(symbol != STEP_SYMBOL);
    symbol
}

// *************** TESTS *****************

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{BitmapPool,PlainPool};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng,SeedableRng};

    fn small_setting() -> Setting {
        Setting { num_keys: 64, ..STD_SETTING }
    }

    fn singleton<P: LabelPool<Value = u64>>() {
        let mut dic: Dict<P> = Dict::new(small_setting()).unwrap();
        dic.update(b"alpha").unwrap().set(7);
        assert_eq!(dic.find(b"alpha"),Some(7));
        assert_eq!(dic.find(b"alph"),None);
        assert_eq!(dic.find(b"alphaa"),None);
        assert_eq!(dic.num_keys(),1);
    }

    #[test]
    fn singleton_all_pools() {
        singleton::<PlainPool<u64>>();
        singleton::<BitmapPool<u64,u8>>();
        singleton::<BitmapPool<u64,u16>>();
        singleton::<BitmapPool<u64,u32>>();
        singleton::<BitmapPool<u64,u64>>();
    }

    fn shared_prefix<P: LabelPool<Value = u64>>() {
        let mut dic: Dict<P> = Dict::new(small_setting()).unwrap();
        dic.update(b"car").unwrap().set(1);
        dic.update(b"cart").unwrap().set(2);
        dic.update(b"cartoon").unwrap().set(3);
        assert_eq!(dic.find(b"car"),Some(1));
        assert_eq!(dic.find(b"cart"),Some(2));
        assert_eq!(dic.find(b"cartoon"),Some(3));
        assert_eq!(dic.find(b"ca"),None);
        assert_eq!(dic.find(b"carto"),None);
        assert_eq!(dic.num_keys(),3);
    }

    #[test]
    fn shared_prefix_all_pools() {
        shared_prefix::<PlainPool<u64>>();
        shared_prefix::<BitmapPool<u64,u8>>();
        shared_prefix::<BitmapPool<u64,u64>>();
    }

    #[test]
    fn step_chaining() {
        // a single long key lands whole in the root label; its extension
        // then has to walk the matched prefix in fixed_len chunks
        let setting = Setting { num_keys: 64, fixed_len: 4, ..STD_SETTING };
        let mut dic: Dict<PlainPool<u64>> = Dict::new(setting).unwrap();
        let long_key = [b'A';60];
        let mut longer_key = long_key.to_vec();
        longer_key.push(b'B');
        dic.update(&long_key).unwrap().set(42);
        dic.update(&longer_key).unwrap().set(43);
        assert_eq!(dic.find(&long_key),Some(42));
        assert_eq!(dic.find(&longer_key),Some(43));
        assert!(dic.num_steps() >= 1);
        assert_eq!(dic.num_steps(),15);
    }

    #[test]
    fn update_is_idempotent() {
        let mut dic: Dict<BitmapPool<u64,u8>> = Dict::new(small_setting()).unwrap();
        dic.update(b"omega").unwrap().set(11);
        assert_eq!(dic.num_keys(),1);
        assert_eq!(dic.update(b"omega").unwrap().get(),11);
        assert_eq!(dic.num_keys(),1);
    }

    #[test]
    fn update_returns_the_same_cell() {
        let mut dic: Dict<BitmapPool<u64,u16>> = Dict::new(small_setting()).unwrap();
        dic.update(b"kappa").unwrap().set(5);
        let mut cell = dic.update(b"kappa").unwrap();
        assert_eq!(cell.get(),5);
        cell.set(9);
        assert_eq!(dic.find(b"kappa"),Some(9));
    }

    #[test]
    fn distinct_keys_get_distinct_cells() {
        let mut dic: Dict<PlainPool<u64>> = Dict::new(small_setting()).unwrap();
        dic.update(b"left").unwrap().set(1);
        dic.update(b"right").unwrap().set(2);
        dic.update(b"left").unwrap().set(10);
        assert_eq!(dic.find(b"left"),Some(10));
        assert_eq!(dic.find(b"right"),Some(2));
    }

    #[test]
    fn empty_key_is_a_key() {
        let mut dic: Dict<PlainPool<u64>> = Dict::new(small_setting()).unwrap();
        dic.update(b"").unwrap().set(3);
        dic.update(b"a").unwrap().set(4);
        assert_eq!(dic.find(b""),Some(3));
        assert_eq!(dic.find(b"a"),Some(4));
        assert_eq!(dic.num_keys(),2);
    }

    #[test]
    fn alphabet_overflow_is_fatal() {
        let mut dic: Dict<PlainPool<u64>> = Dict::new(Setting { num_keys: 512, ..STD_SETTING }).unwrap();
        dic.update(&[1,1]).unwrap().set(1);
        // each key branches off the root label at offset 1, spending one
        // character code per distinct second byte
        let mut result = Ok(());
        for c in 2..=254u8 {
            if let Err(e) = dic.update(&[1,c]) {
                result = Err((c,e));
                break;
            }
        }
        match result {
            Err((c,Error::AlphabetOverflow)) => assert_eq!(c,254),
            Err((c,e)) => panic!("unexpected error {:?} at byte {}",e,c),
            Ok(()) => panic!("expected alphabet overflow"),
        }
    }

    #[test]
    fn rejects_bad_settings() {
        let bad_len = Setting { fixed_len: 33, ..STD_SETTING };
        assert!(matches!(Dict::<PlainPool<u64>>::new(bad_len),Err(Error::FixedLenNotPower2)));
        let bad_load = Setting { load_factor: 1.5, ..STD_SETTING };
        assert!(matches!(Dict::<PlainPool<u64>>::new(bad_load),Err(Error::BadLoadFactor)));
    }

    fn make_key(rng: &mut StdRng,max_length: usize) -> Vec<u8> {
        let length = rng.gen_range(0..max_length);
        (0..length).map(|_| rng.gen_range(b'A'..=b'Z')).collect()
    }

    fn stress<P: LabelPool<Value = u64>>() {
        let mut rng = StdRng::seed_from_u64(20170221);

        let mut keys: Vec<Vec<u8>> = (0..1024).map(|_| make_key(&mut rng,1000)).collect();
        keys.sort();
        keys.dedup();

        let mut others = Vec::new();
        for _ in 0..1024 {
            let key = make_key(&mut rng,1000);
            if keys.binary_search(&key).is_err() {
                others.push(key);
            }
        }

        keys.shuffle(&mut rng);

        let setting = Setting { num_keys: keys.len() as u64, ..STD_SETTING };
        let mut dic: Dict<P> = Dict::new(setting).unwrap();

        for (i,key) in keys.iter().enumerate() {
            let mut cell = dic.update(key).unwrap();
            assert_eq!(cell.get(),0);
            cell.set(i as u64 + 1);
        }
        assert_eq!(dic.num_keys(),keys.len() as u64);

        for (i,key) in keys.iter().enumerate() {
            assert_eq!(dic.update(key).unwrap().get(),i as u64 + 1);
        }
        assert_eq!(dic.num_keys(),keys.len() as u64);

        for (i,key) in keys.iter().enumerate() {
            assert_eq!(dic.find(key),Some(i as u64 + 1));
        }

        for key in &others {
            assert_eq!(dic.find(key),None);
        }
    }

    #[test]
    fn stress_plain() {
        stress::<PlainPool<u64>>();
    }

    #[test]
    fn stress_bitmap8() {
        stress::<BitmapPool<u64,u8>>();
    }

    #[test]
    fn stress_bitmap16() {
        stress::<BitmapPool<u64,u16>>();
    }

    #[test]
    fn stress_bitmap32() {
        stress::<BitmapPool<u64,u32>>();
    }

    #[test]
    fn stress_bitmap64() {
        stress::<BitmapPool<u64,u64>>();
    }
}
