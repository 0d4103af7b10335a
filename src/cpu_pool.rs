//! Striped CPU worker pool (spec §4.5).
//!
//! Grounded on `examples/original_source/src/main.cpp`'s thread-per-core
//! loop (`std::thread` spawned per `hardware_concurrency`, each striding
//! the combination space by the thread count) and on the teacher's own
//! preference for `std::thread::scope` over manual `Arc<Mutex<_>>>`
//! plumbing wherever borrowed data outlives the scope (no shared mutable
//! state is needed here beyond the lock-free `Progress` counter and the
//! `MatchSink`, which is already internally synchronized).

use crate::enumerator::{self, Step};
use crate::pattern::Pattern;
use crate::progress::Progress;
use crate::sink::{Match, MatchSink};
use crate::target_index::TargetIndex;

/// How many candidates a worker tries before publishing progress, to
/// keep the atomic counter off the hot per-candidate path.
const PROGRESS_BATCH: u64 = 10_000;

/// Run the full CPU search for `pattern`, reporting any match against
/// `targets` to `sink`. Blocks until every thread exhausts its stripe.
pub fn search(
    pattern: &Pattern,
    targets: &TargetIndex,
    progress: &Progress,
    sink: &dyn MatchSink,
    num_threads: usize,
) {
    let num_threads = num_threads.max(1);
    let alphabet_len = pattern.alphabet.len();
    let width = pattern.wildcard_width();

    if width == 0 {
        // No wildcards: a single literal candidate.
        let digest = crate::hash::hash_full(&pattern.hash_string);
        progress.add(1);
        if targets.contains(digest) {
            sink.report(Match {
                digest,
                text: pattern.render_match(&pattern.hash_string),
                label: targets.label_for_output(digest),
            });
        }
        return;
    }

    std::thread::scope(|scope| {
        for t in 0..num_threads {
            scope.spawn(move || run_stripe(pattern, targets, progress, sink, t, num_threads, width, alphabet_len));
        }
    });
}

fn run_stripe(
    pattern: &Pattern,
    targets: &TargetIndex,
    progress: &Progress,
    sink: &dyn MatchSink,
    thread_index: usize,
    num_threads: usize,
    width: usize,
    alphabet_len: usize,
) {
    let mut counts = vec![0usize; width];
    if thread_index > 0 && enumerator::next(&mut counts, thread_index, alphabet_len) == Step::Exhausted {
        return;
    }

    let mut candidate = pattern.hash_string.clone();
    let mut tried_since_report: u64 = 0;

    loop {
        enumerator::apply(
            &mut candidate,
            &counts,
            &pattern.alphabet,
            &pattern.primary_indices,
            &pattern.secondary_indices,
        );
        let digest = crate::hash::hash_full(&candidate);
        if targets.contains(digest) {
            sink.report(Match {
                digest,
                text: pattern.render_match(&candidate),
                label: targets.label_for_output(digest),
            });
        }

        tried_since_report += 1;
        if tried_since_report >= PROGRESS_BATCH {
            progress.add(tried_since_report);
            tried_since_report = 0;
        }

        if enumerator::next(&mut counts, num_threads, alphabet_len) == Step::Exhausted {
            break;
        }
    }

    if tried_since_report > 0 {
        progress.add(tried_since_report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;

    #[test]
    fn finds_the_planted_preimage() {
        let pattern = Pattern::new("A**", Alphabet::parse("letters"));
        let planted = {
            let mut hs = pattern.hash_string.clone();
            hs.set_byte(1, b'B');
            hs.set_byte(2, b'C');
            crate::hash::hash_full(&hs)
        };
        let targets = TargetIndex::new([planted]);
        let progress = Progress::new(enumerator::total_combinations(26, 2));
        let sink = crate::sink::CollectingSink::new();

        search(&pattern, &targets, &progress, &sink, 4);

        let found = sink.into_matches();
        assert_eq!(found.len(), 1);
        // 'A' is a fixed character and prints as typed; only the two
        // wildcard positions are lowercased.
        assert_eq!(found[0].text, "Abc");
    }

    #[test]
    fn no_wildcards_tries_exactly_one_candidate() {
        let pattern = Pattern::new("ABC", Alphabet::parse("letters"));
        let digest = crate::hash::hash_full(&pattern.hash_string);
        let targets = TargetIndex::new([digest]);
        let progress = Progress::new(1);
        let sink = crate::sink::CollectingSink::new();

        search(&pattern, &targets, &progress, &sink, 4);

        assert_eq!(progress.completed(), 1);
        assert_eq!(sink.into_matches().len(), 1);
    }

    #[test]
    fn striping_with_more_threads_than_combinations_is_safe() {
        let pattern = Pattern::new("A*", Alphabet::parse("hex"));
        let targets = TargetIndex::new([]);
        let progress = Progress::new(enumerator::total_combinations(16, 1));
        let sink = crate::sink::CollectingSink::new();

        search(&pattern, &targets, &progress, &sink, 64);

        assert_eq!(progress.completed(), 16);
    }
}
