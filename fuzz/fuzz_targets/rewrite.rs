#![no_main]

use libfuzzer_sys::fuzz_target;
use probeweave::{engine::NoCompanions, Rewriter};

fuzz_target!(|data: &[u8]| {
    let _ = Rewriter::default().rewrite(data, "fuzz/Unit", &NoCompanions);
});
