#![no_main]

use libfuzzer_sys::fuzz_target;
use marcmap::{MarcxmlSource, RecordSource};

// The MARCXML source must turn malformed input into errors, not panics.
fuzz_target!(|data: &[u8]| {
    let mut source = MarcxmlSource::new(data);
    for _ in 0..64 {
        match source.next_record() {
            Ok(Some(_)) => {},
            Ok(None) | Err(_) => break,
        }
    }
});
