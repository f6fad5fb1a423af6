//! Useful random generators.
use proptest::prelude::*;

pub fn arb_write_sizes(
	count_max: usize,
	size_max: u64,
) -> impl Strategy<Value = Vec<u64>> {
	proptest::collection::vec(0..=size_max, 0..=count_max)
}

pub fn arb_input(len_max: usize) -> impl Strategy<Value = Vec<u8>> {
	proptest::collection::vec(any::<u8>(), 0..=len_max)
}
