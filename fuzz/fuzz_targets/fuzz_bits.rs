#![no_main]

use bitforge::{pack_bits, unpack_bytes, BitSequence};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Packing after unpacking is the identity
    let bits = unpack_bytes(data);
    assert_eq!(bits.len(), data.len() * 8);
    assert_eq!(pack_bits(&bits), data);

    // Trailing bits beyond a byte boundary are dropped
    if !bits.is_empty() {
        let trimmed = &bits[..bits.len() - 1];
        assert_eq!(pack_bits(trimmed).len(), data.len() - 1);
    }

    // Text form accepts exactly the '0'/'1' strings
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(seq) = text.parse::<BitSequence>() {
            assert_eq!(seq.to_string(), text.trim());
        }
    }

    // Raw values other than 0/1 are rejected
    let valid = data.iter().all(|&b| b <= 1);
    assert_eq!(BitSequence::from_bits(data.to_vec()).is_ok(), valid);
});
