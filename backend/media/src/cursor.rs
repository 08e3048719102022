/// One delivery's slice of the corpus plus where the next one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusRange {
    pub start: u32,
    pub end: u32,
    pub next_cursor: u32,
}

impl CorpusRange {
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }

    pub fn page_count(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// Range of `count` pages starting at `cursor` in a corpus of `size` pages.
///
/// The range is clamped at the corpus end rather than wrapping mid-delivery;
/// the following delivery starts again at page 1. An out-of-range cursor is
/// read as 1 and a zero count as 1.
pub fn next_range(cursor: u32, count: u32, size: u32) -> CorpusRange {
    let size = size.max(1);
    let start = if (1..=size).contains(&cursor) { cursor } else { 1 };
    let count = count.max(1);
    let end = start.saturating_add(count - 1).min(size);
    let next_cursor = if end < size { end + 1 } else { 1 };
    CorpusRange {
        start,
        end,
        next_cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wird_core::QURAN_PAGES;

    #[test]
    fn range_bounds_hold_for_every_cursor() {
        for n in [1, 2, 3, 7, 20, 604, 1000] {
            for c in 1..=QURAN_PAGES {
                let r = next_range(c, n, QURAN_PAGES);
                assert_eq!(r.start, c);
                assert!(r.start <= r.end && r.end <= QURAN_PAGES);
                assert!((1..=QURAN_PAGES).contains(&r.next_cursor));
                if r.end == QURAN_PAGES {
                    assert_eq!(r.next_cursor, 1);
                } else {
                    assert_eq!(r.next_cursor, r.end + 1);
                }
            }
        }
    }

    #[test]
    fn one_cycle_covers_the_corpus_exactly_once() {
        for n in [1, 2, 5, 10, 13, 604] {
            let mut seen = vec![0u32; QURAN_PAGES as usize + 1];
            let mut cursor = 1;
            for _ in 0..QURAN_PAGES.div_ceil(n) {
                let r = next_range(cursor, n, QURAN_PAGES);
                for page in r.pages() {
                    seen[page as usize] += 1;
                }
                cursor = r.next_cursor;
            }
            assert!(seen[1..].iter().all(|&count| count == 1), "n = {n}");
            assert_eq!(cursor, 1);
        }
    }

    #[test]
    fn clamps_at_corpus_end() {
        let r = next_range(603, 5, QURAN_PAGES);
        assert_eq!((r.start, r.end, r.next_cursor), (603, 604, 1));
        assert_eq!(r.page_count(), 2);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(next_range(5, 0, QURAN_PAGES), next_range(5, 1, QURAN_PAGES));
        assert_eq!(next_range(0, 2, QURAN_PAGES).start, 1);
        assert_eq!(next_range(700, 2, QURAN_PAGES).start, 1);
    }
}
