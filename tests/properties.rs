use proptest::prelude::*;

use crcforge::kernel::{cross_check, reflect, Algorithm};
use crcforge::model::ModelBuilder;
use crcforge::qm::{permutations, simplify};

const ALL: [Algorithm; 3] = [Algorithm::BitByBit, Algorithm::BitByBitFast, Algorithm::TableDriven];

// crc-64/jones, used as the base model for the variable-width sweep
const JONES_POLY: u128 = 0xad93d23594c935a9;
const JONES_XOR_IN: u128 = u64::MAX as u128;
const JONES_XOR_OUT: u128 = 0;

fn reduced_model(width: usize) -> crcforge::Model {
    let mask = (1u128 << width) - 1;
    let mut b = ModelBuilder::new();
    b.width(width).unwrap();
    b.poly(JONES_POLY & mask);
    b.xor_in(JONES_XOR_IN & mask);
    b.xor_out(JONES_XOR_OUT & mask);
    b.reflect_in(true);
    b.reflect_out(true);
    b.build().unwrap()
}

proptest! {
    #[test]
    fn reflection_is_involutive(v: u64, n in 1usize..=64) {
        let v = (v as u128) & ((1u128 << n) - 1);
        prop_assert_eq!(reflect(reflect(v, n), n), v);
    }

    #[test]
    fn all_algorithms_agree_on_random_input(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let m = reduced_model(32);
        let r = cross_check(&m, &ALL, &bytes);
        prop_assert!(r.is_ok());
    }
}

#[test]
fn variable_width_sweep() {
    for &w in &[
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 15, 16, 17, 23, 24, 25, 31, 32, 33, 63, 64,
    ] {
        let m = reduced_model(w);
        let result = cross_check(&m, &ALL, b"123456789");
        assert!(result.is_ok(), "width {} disagreed: {:?}", w, result);
    }
}

#[test]
fn permutation_completeness_over_random_terms() {
    let ones: Vec<u128> = vec![1, 2, 6, 8, 15];
    let terms = simplify(4, &ones, &[]);
    let mut covered = std::collections::HashSet::new();
    for t in &terms {
        for p in permutations(t) {
            covered.insert(u128::from_str_radix(&p, 2).unwrap());
        }
    }
    for o in ones {
        assert!(covered.contains(&o));
    }
}
