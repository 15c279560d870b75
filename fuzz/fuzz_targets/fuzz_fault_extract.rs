#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(fault) = btwcheck::vies::soap::extract_fault_string(s) {
            let _ = btwcheck::vies::soap::classify_fault(&fault);
        }
    }
});
