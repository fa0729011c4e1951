//! Module for some utility functions, including test sample handling

// A compression pointer starts with the two top bits set, as explained in the RFC1035
pub fn is_pointer(x: u8) -> bool {
    x & 0b1100_0000 == 0b1100_0000
}

// A domain name is null terminated or terminated by a pointer
pub fn is_sentinel(x: u8) -> bool {
    x == 0 || is_pointer(x)
}

/// Convert a wireshark-like hex dump block into raw bytes. Each line starts
/// with an offset token which is skipped; a `;` starts a comment.
///
/// ```
/// use probelib::util::get_sample_slice;
///
/// let sample = r#"
/// 0000   12 34 81 80   ; header start
/// 0004   00 01
/// "#;
/// assert_eq!(get_sample_slice(sample), &[0x12, 0x34, 0x81, 0x80, 0x00, 0x01]);
/// ```
pub fn get_sample_slice(sample: &str) -> Vec<u8> {
    let mut v = Vec::new();

    for line in sample.lines() {
        let data = match line.find(';') {
            Some(i) => &line[..i],
            None => line,
        };

        // first token is the offset
        for hex in data.split_whitespace().skip(1) {
            // a malformed sample is a test bug, not runtime data
            v.push(u8::from_str_radix(hex, 16).unwrap());
        }
    }

    v
}
