//! Nix-flavoured base32 encoding.
//!
//! Differs from RFC 4648: the alphabet omits `e`, `o`, `u` and `t`, there is no padding, and the
//! output is produced from the most significant 5-bit group down, so the encoding reads
//! "backwards" compared to the input bytes.

const ALPHABET: &[u8; 32] = b"0123456789abcdfghijklmnpqrsvwxyz";

/// Length of the encoding of `len` input bytes.
pub const fn encoded_len(len: usize) -> usize {
    (len * 8).div_ceil(5)
}

/// Encode `input` using the Nix base32 alphabet.
pub fn encode(input: &[u8]) -> String {
    let len = encoded_len(input.len());
    let mut out = String::with_capacity(len);

    for n in (0..len).rev() {
        let bit = n * 5;
        let byte = bit / 8;
        let shift = bit % 8;
        let low = u16::from(input[byte]) >> shift;
        let high = input.get(byte + 1).map_or(0, |b| u16::from(*b) << (8 - shift));
        out.push(char::from(ALPHABET[usize::from((low | high) & 0x1f)]));
    }

    out
}
