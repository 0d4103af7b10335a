//! Mixed-radix counter over the alphabet, with seek-by-N (spec §4.3).
//!
//! Grounded on `examples/original_source/src/main.cpp`'s
//! `next_combination`/`get_combination` pair; split here into
//! `next`/`apply` to match the split naming the rest of the crate uses
//! (hash engine, kernel generator) and to let both the CPU pool and
//! the device pool share the exact same stepping logic the kernel
//! re-derives per work-item (spec §4.3 "GPU striping").

use crate::alphabet::Alphabet;
use crate::hash_string::HashString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ok,
    Exhausted,
}

/// Advance `counts` (least-significant digit first) by `inc`, carrying
/// through the mixed-radix alphabet base. Returns `Exhausted` if the
/// carry would propagate past the highest digit.
pub fn next(counts: &mut [usize], inc: usize, alphabet_len: usize) -> Step {
    if counts.is_empty() {
        return Step::Exhausted;
    }
    counts[0] += inc;
    for i in 0..counts.len() {
        if counts[i] >= alphabet_len {
            let carry = counts[i] / alphabet_len;
            counts[i] %= alphabet_len;
            if i + 1 >= counts.len() {
                return Step::Exhausted;
            }
            counts[i + 1] += carry;
        }
    }
    Step::Ok
}

/// Write `alphabet[counts[i]]` into every primary wildcard position,
/// and into the mirrored secondary position when one exists at the
/// same ordinal `i` (spec §4.3 `apply`).
pub fn apply(
    hash_string: &mut HashString,
    counts: &[usize],
    alphabet: &Alphabet,
    primary_indices: &[usize],
    secondary_indices: &[usize],
) {
    for (i, &count) in counts.iter().enumerate() {
        let byte = alphabet.byte_at(count);
        hash_string.set_byte(primary_indices[i], byte);
        if i < secondary_indices.len() {
            hash_string.set_byte(secondary_indices[i], byte);
        }
    }
}

/// Total number of candidates `alphabet_len ^ width` represents, as a
/// `u128` so wide patterns don't silently wrap.
pub fn total_combinations(alphabet_len: usize, width: usize) -> u128 {
    (alphabet_len as u128).pow(width as u32)
}

/// The ordinal position `counts` represents in enumeration order,
/// i.e. how many `next` calls from the all-zero start it took to
/// reach it. Used by the GPU device pool to size the final batch.
pub fn position(counts: &[usize], alphabet_len: usize) -> u128 {
    let mut value: u128 = 0;
    let mut place: u128 = 1;
    for &digit in counts {
        value += digit as u128 * place;
        place *= alphabet_len as u128;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustive_visits_every_tuple_in_order() {
        let alphabet_len = 3;
        let width = 2;
        let mut counts = vec![0usize; width];
        let mut seen = Vec::new();
        seen.push(counts.clone());
        loop {
            match next(&mut counts, 1, alphabet_len) {
                Step::Ok => seen.push(counts.clone()),
                Step::Exhausted => break,
            }
        }
        assert_eq!(seen.len(), 9); // 3^2
        assert_eq!(seen[0], vec![0, 0]);
        assert_eq!(seen[1], vec![1, 0]);
        assert_eq!(seen[3], vec![0, 1]);
        assert_eq!(*seen.last().unwrap(), vec![2, 2]);
    }

    #[test]
    fn striping_visits_same_multiset_as_single_threaded() {
        let alphabet_len = 4;
        let width = 3;
        let total = total_combinations(alphabet_len, width) as usize;

        let mut single = Vec::new();
        let mut counts = vec![0usize; width];
        single.push(counts.clone());
        while next(&mut counts, 1, alphabet_len) == Step::Ok {
            single.push(counts.clone());
        }

        let num_threads = 3;
        let mut striped = Vec::new();
        for t in 0..num_threads {
            let mut counts = vec![0usize; width];
            if t > 0 && next(&mut counts, t, alphabet_len) == Step::Exhausted {
                continue;
            }
            striped.push(counts.clone());
            while next(&mut counts, num_threads, alphabet_len) == Step::Ok {
                striped.push(counts.clone());
            }
        }

        assert_eq!(striped.len(), total);
        let mut single_sorted = single.clone();
        let mut striped_sorted = striped.clone();
        single_sorted.sort();
        striped_sorted.sort();
        assert_eq!(single_sorted, striped_sorted);
    }

    #[test]
    fn empty_width_is_immediately_exhausted() {
        let mut counts: Vec<usize> = Vec::new();
        assert_eq!(next(&mut counts, 1, 10), Step::Exhausted);
    }
}
