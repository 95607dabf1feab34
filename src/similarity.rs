//! Block-matching similarity between two strings.
//!
//! The score is `2 * M / T`, where `M` is the total size of the matching blocks and `T` is the
//! combined length of both inputs. Matching blocks are found by locating the longest common
//! block, then recursing on the unmatched text to its left and right. This tolerates
//! insertions, deletions and substitutions far better than a prefix comparison, and it is what
//! the alignment thresholds are calibrated against.
//!
//! Strings are compared as sequences of Unicode scalar values.

use std::collections::HashMap;

/// Second sequences at least this long get the "popular element" treatment.
const AUTOJUNK_MIN_LEN: usize = 200;

/// A run of equal elements: `a[a_start..a_start + len] == b[b_start..b_start + len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingBlock {
    pub a_start: usize,
    pub b_start: usize,
    pub len: usize,
}

/// Similarity ratio in `[0, 1]`. Returns `0.0` when either input is empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let matched: usize = Matcher::new(&a, &b)
        .matching_blocks()
        .iter()
        .map(|block| block.len)
        .sum();

    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

/// Matching blocks between `a` and `b`, ordered by position and with adjacent blocks merged.
pub fn matching_blocks(a: &str, b: &str) -> Vec<MatchingBlock> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    Matcher::new(&a, &b).matching_blocks()
}

struct Matcher<'a> {
    a: &'a [char],
    b: &'a [char],
    // Positions of each element of `b`, ascending. Popular elements are absent.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        // Elements that make up more than 1% of a long `b` may extend a match but never seed one.
        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` x `b[blo..bhi]`.
    ///
    /// Ties prefer the block starting earliest in `a`, then earliest in `b`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchingBlock {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0usize);

        // j2len[j] = length of the match ending at a[i - 1], b[j].
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_j2len = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > best_len {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_len = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Grow the block over equal elements that were excluded from seeding (popular ones).
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && self.a[best_i + best_len] == self.b[best_j + best_len]
        {
            best_len += 1;
        }

        MatchingBlock {
            a_start: best_i,
            b_start: best_j,
            len: best_len,
        }
    }

    fn matching_blocks(&self) -> Vec<MatchingBlock> {
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let block = self.longest_match(alo, ahi, blo, bhi);
            if block.len == 0 {
                continue;
            }
            let (i, j, k) = (block.a_start, block.b_start, block.len);
            blocks.push(block);
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }

        blocks.sort_by_key(|block| (block.a_start, block.b_start));

        let mut merged: Vec<MatchingBlock> = Vec::with_capacity(blocks.len());
        for block in blocks {
            match merged.last_mut() {
                Some(last)
                    if last.a_start + last.len == block.a_start
                        && last.b_start + last.len == block.b_start =>
                {
                    last.len += block.len;
                }
                _ => merged.push(block),
            }
        }
        merged
    }

    #[cfg(test)]
    fn is_popular(&self, c: char) -> bool {
        self.b.contains(&c) && !self.b2j.contains_key(&c)
    }
}
