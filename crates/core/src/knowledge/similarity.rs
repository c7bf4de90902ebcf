//! String similarity strategies used for FAQ lookup.
//!
//! Every strategy returns a ratio in `[0, 1]`: identical strings score `1.0`, strings with no
//! characters in common score `0.0`.

use std::collections::HashMap;

use crate::config::SimilarityKind;

/// Sequences at least this long get their most frequent characters dropped from the index.
const POPULAR_MIN_LEN: usize = 200;

pub trait SimilarityStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Similarity between `query` and `candidate`.
    fn ratio(&self, query: &str, candidate: &str) -> f64;
}

pub fn strategy_for(kind: SimilarityKind) -> Box<dyn SimilarityStrategy> {
    match kind {
        SimilarityKind::SequenceRatio => Box::new(SequenceRatio),
        SimilarityKind::Levenshtein => Box::new(NormalizedLevenshtein),
    }
}

/// Ratcliff/Obershelp longest-matching-block ratio, `2 * M / T`.
///
/// `M` counts the characters in the matching blocks found by repeatedly taking the longest
/// common substring and recursing on both sides of it. `T` is the combined length. Matches
/// the behavior of Python's `difflib.SequenceMatcher(None, query, candidate).ratio()`,
/// including the popular-character heuristic for candidates of 200+ characters.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequenceRatio;

impl SimilarityStrategy for SequenceRatio {
    fn name(&self) -> &'static str {
        "sequence_ratio"
    }

    fn ratio(&self, query: &str, candidate: &str) -> f64 {
        let a: Vec<char> = query.chars().collect();
        let b: Vec<char> = candidate.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }

        let matched = BlockMatcher::new(&a, &b).matched_len();
        (2.0 * matched as f64) / total as f64
    }
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(j);
        }

        if b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    fn matched_len(&self) -> usize {
        let mut matched = 0;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, size) = self.longest_match(alo, ahi, blo, bhi);
            if size == 0 {
                continue;
            }

            matched += size;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + size < ahi && j + size < bhi {
                pending.push((i + size, ahi, j + size, bhi));
            }
        }

        matched
    }

    /// Longest block `a[i..i+size] == b[j..j+size]` inside the given window. Ties go to the
    /// block that starts earliest in `a`, then earliest in `b`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        let mut run_lengths: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_runs: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }

                    let run = j
                        .checked_sub(1)
                        .and_then(|previous| run_lengths.get(&previous))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_runs.insert(j, run);
                    if run > best_size {
                        best_i = i + 1 - run;
                        best_j = j + 1 - run;
                        best_size = run;
                    }
                }
            }
            run_lengths = next_runs;
        }

        // Popular characters are missing from the index; grow the block across them.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }
}

/// `1 - distance / max_len` over Unicode scalar values.
#[derive(Clone, Copy, Debug, Default)]
pub struct NormalizedLevenshtein;

impl SimilarityStrategy for NormalizedLevenshtein {
    fn name(&self) -> &'static str {
        "levenshtein"
    }

    fn ratio(&self, query: &str, candidate: &str) -> f64 {
        let a: Vec<char> = query.chars().collect();
        let b: Vec<char> = candidate.chars().collect();
        let longest = a.len().max(b.len());
        if longest == 0 {
            return 1.0;
        }

        1.0 - levenshtein_distance(&a, &b) as f64 / longest as f64
    }
}

fn levenshtein_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1).min(current[j] + 1).min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
