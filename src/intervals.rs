/// Covered and empty stretches along a subject of fixed length
///
/// Ranges are collected unsorted as they are added; sorting and merging
/// happen on each walk.

/// Kind of a walked segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalKind {
    Empty,
    Covered,
}

/// Set of covered ranges over `[0, length)`
#[derive(Debug, Clone, Default)]
pub struct IntervalSet {
    length: u64,
    covered: Vec<(u64, u64)>,
}

impl IntervalSet {
    pub fn new(length: u64) -> Self {
        IntervalSet {
            length,
            covered: Vec::new(),
        }
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Mark `[start, end)` as covered. The range is clipped to the axis and
    /// dropped if nothing is left.
    pub fn add(&mut self, start: i64, end: i64) {
        let start = start.max(0) as u64;
        let end = end.max(0) as u64;
        let end = end.min(self.length);
        if start < end {
            self.covered.push((start, end));
        }
    }

    /// Walk `[0, length)` as alternating empty and covered segments
    pub fn walk(&self) -> Walk {
        let mut intervals = self.covered.clone();
        intervals.sort_unstable();
        Walk {
            intervals,
            next: 0,
            position: 0,
            length: self.length,
        }
    }
}

/// Iterator over the segments of an `IntervalSet`
#[derive(Debug, Clone)]
pub struct Walk {
    intervals: Vec<(u64, u64)>,
    next: usize,
    position: u64,
    length: u64,
}

impl Iterator for Walk {
    type Item = (IntervalKind, (u64, u64));

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.length {
            return None;
        }

        let next_start = self
            .intervals
            .get(self.next)
            .map(|&(start, _)| start)
            .unwrap_or(self.length);

        if next_start > self.position {
            let segment = (IntervalKind::Empty, (self.position, next_start));
            self.position = next_start;
            return Some(segment);
        }

        // Merge every interval touching or overlapping the current run
        let mut end = self.intervals[self.next].1;
        self.next += 1;
        while let Some(&(start, stop)) = self.intervals.get(self.next) {
            if start > end {
                break;
            }
            end = end.max(stop);
            self.next += 1;
        }

        let segment = (IntervalKind::Covered, (self.position, end));
        self.position = end;
        Some(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use IntervalKind::{Covered, Empty};

    #[test]
    fn test_no_coverage() {
        let set = IntervalSet::new(100);
        let segments: Vec<_> = set.walk().collect();
        assert_eq!(segments, vec![(Empty, (0, 100))]);
    }

    #[test]
    fn test_single_interval() {
        let mut set = IntervalSet::new(100);
        set.add(20, 30);
        let segments: Vec<_> = set.walk().collect();
        assert_eq!(
            segments,
            vec![(Empty, (0, 20)), (Covered, (20, 30)), (Empty, (30, 100))]
        );
    }

    #[test]
    fn test_full_coverage() {
        let mut set = IntervalSet::new(100);
        set.add(0, 60);
        set.add(50, 100);
        let segments: Vec<_> = set.walk().collect();
        assert_eq!(segments, vec![(Covered, (0, 100))]);
    }

    #[test]
    fn test_adjacent_intervals_merge() {
        let mut set = IntervalSet::new(50);
        set.add(30, 40);
        set.add(10, 20);
        set.add(20, 30);
        let segments: Vec<_> = set.walk().collect();
        assert_eq!(
            segments,
            vec![(Empty, (0, 10)), (Covered, (10, 40)), (Empty, (40, 50))]
        );
    }

    #[test]
    fn test_contained_interval() {
        let mut set = IntervalSet::new(50);
        set.add(10, 40);
        set.add(15, 20);
        set.add(45, 48);
        let segments: Vec<_> = set.walk().collect();
        assert_eq!(
            segments,
            vec![
                (Empty, (0, 10)),
                (Covered, (10, 40)),
                (Empty, (40, 45)),
                (Covered, (45, 48)),
                (Empty, (48, 50)),
            ]
        );
    }

    #[test]
    fn test_ranges_clipped_to_axis() {
        let mut set = IntervalSet::new(100);
        set.add(-30, 10);
        set.add(90, 250);
        set.add(150, 200);
        set.add(-20, -5);
        let segments: Vec<_> = set.walk().collect();
        assert_eq!(
            segments,
            vec![(Covered, (0, 10)), (Empty, (10, 90)), (Covered, (90, 100))]
        );
    }

    #[test]
    fn test_walk_is_restartable() {
        let mut set = IntervalSet::new(100);
        set.add(20, 30);
        let first: Vec<_> = set.walk().collect();
        let second: Vec<_> = set.walk().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_length_axis() {
        let mut set = IntervalSet::new(0);
        set.add(0, 10);
        assert_eq!(set.walk().count(), 0);
    }
}
