#![no_main]
use libfuzzer_sys::fuzz_target;

use cordyceps_splay::{
    model::{run_vec_equivalence, Op},
    Basic, Splay,
};

fuzz_target!(|input: (bool, Vec<Op>)| {
    let (basic, ops) = input;

    if basic {
        run_vec_equivalence::<Basic>(ops)
    } else {
        run_vec_equivalence::<Splay>(ops)
    }
});
