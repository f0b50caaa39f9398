#![no_main]

use cordyceps_splay::{model::CursorEquivalenceInput, Splay};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: CursorEquivalenceInput| {
    cordyceps_splay::model::run_cursor_equivalence::<Splay>(input.values, input.ops);
});
