//! Variable-byte codec for the length prefixes in the packed label pool.
//! Little-endian base 128, the high bit of each byte marks continuation.

/// encoded size of val in bytes, always at least 1
pub fn size(mut val: u64) -> usize {
    let mut n = 1;
    while val > 127 {
        n += 1;
        val >>= 7;
    }
    n
}

/// write val into codes, returning the number of bytes written
pub fn encode(codes: &mut [u8],mut val: u64) -> usize {
    let mut i = 0;
    while val > 127 {
        codes[i] = (val & 127) as u8 | 0x80;
        val >>= 7;
        i += 1;
    }
    codes[i] = (val & 127) as u8;
    i + 1
}

/// read one value from the front of codes, returning (value, bytes consumed)
pub fn decode(codes: &[u8]) -> (u64,usize) {
    let mut val = 0;
    let mut i = 0;
    let mut shift = 0;
    while codes[i] & 0x80 != 0 {
        val |= ((codes[i] & 127) as u64) << shift;
        shift += 7;
        i += 1;
    }
    val |= ((codes[i] & 127) as u64) << shift;
    (val,i + 1)
}

// *************** TESTS *****************

#[test]
fn sizes() {
    assert_eq!(size(0),1);
    assert_eq!(size(127),1);
    assert_eq!(size(128),2);
    assert_eq!(size(16383),2);
    assert_eq!(size(16384),3);
    assert_eq!(size(u64::MAX),10);
}

#[test]
fn known_encodings() {
    let mut buf = [0u8;10];
    let n = encode(&mut buf,300);
    assert_eq!(buf[0..n].to_vec(),hex::decode("ac02").unwrap());
    let n = encode(&mut buf,0);
    assert_eq!(buf[0..n].to_vec(),hex::decode("00").unwrap());
    let n = encode(&mut buf,127);
    assert_eq!(buf[0..n].to_vec(),hex::decode("7f").unwrap());
    let n = encode(&mut buf,128);
    assert_eq!(buf[0..n].to_vec(),hex::decode("8001").unwrap());
}

#[test]
fn invertibility() {
    let mut buf = [0u8;10];
    for shift in 0..63 {
        for delta in [0u64,1] {
            let val = (1u64 << shift) - 1 + delta;
            let n = encode(&mut buf,val);
            assert_eq!(n,size(val));
            let (back,used) = decode(&buf);
            assert_eq!(back,val);
            assert_eq!(used,n);
        }
    }
}
