#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let cleaned = btwcheck::clean_vat_number("BE", s);
        // Checksum validity implies format validity.
        if btwcheck::belgian::is_valid_checksum(&cleaned) {
            assert!(btwcheck::belgian::is_valid_format(&cleaned));
        }
    }
});
