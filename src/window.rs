use crate::error::{Error, Result};
use std::fmt;
use std::iter::Fuse;
use std::sync::Arc;

/// One value at one 0-based position of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord<V> {
    pub sequence_id: Arc<str>,
    pub position: u64,
    pub value: V,
}

impl<V> PositionRecord<V> {
    pub fn new(sequence_id: Arc<str>, position: u64, value: V) -> Self {
        PositionRecord {
            sequence_id,
            position,
            value,
        }
    }
}

/// A run of at most `capacity` consecutive records from one sequence.
#[derive(Debug)]
pub struct Window<V> {
    sequence_id: Arc<str>,
    start: u64,
    capacity: usize,
    values: Vec<V>,
}

impl<V> Window<V> {
    /// Open a window with `first` as its first record.
    fn open(first: PositionRecord<V>, capacity: usize) -> Self {
        let mut values = Vec::with_capacity(capacity);
        values.push(first.value);
        Window {
            sequence_id: first.sequence_id,
            start: first.position,
            capacity,
            values,
        }
    }

    fn push(&mut self, value: V) {
        debug_assert!(!self.is_full());
        self.values.push(value);
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn sequence_id(&self) -> &str {
        &self.sequence_id
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Exclusive end: `start` plus the number of records held.
    pub fn end(&self) -> u64 {
        self.start + self.values.len() as u64
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }
}

/// The reduced value of one flushed window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult<O> {
    pub sequence_id: Arc<str>,
    pub start: u64,
    pub end: u64,
    pub value: O,
}

/// Bedgraph data line. Floats use the shortest representation that
/// round-trips, so integral means print as `4.0`.
impl fmt::Display for WindowResult<f64> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:?}",
            self.sequence_id, self.start, self.end, self.value
        )
    }
}

/// Aggregation applied to every flushed window.
pub trait Reduction {
    type Value;
    type Output;

    /// Reduce a window to one value, or `None` to emit nothing for it.
    fn reduce(&self, window: &Window<Self::Value>) -> Option<Self::Output>;
}

/// Arithmetic mean of the window's values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean;

impl Reduction for Mean {
    type Value = f64;
    type Output = f64;

    fn reduce(&self, window: &Window<f64>) -> Option<f64> {
        if window.is_empty() {
            return None;
        }
        Some(window.values().iter().sum::<f64>() / window.len() as f64)
    }
}

/// Streams fixed-size windows over position records.
///
/// Windows are flushed when they reach `capacity`, when the sequence changes,
/// and at the end of the input. The first error from the record source is
/// passed through and ends the stream.
///
/// # Example
/// ```
/// use gdatools::window::{Mean, PositionRecord, WindowReducer};
/// use std::sync::Arc;
/// let a: Arc<str> = Arc::from("seqA");
/// let b: Arc<str> = Arc::from("seqB");
/// let records = vec![
///     Ok(PositionRecord::new(a.clone(), 0, 1.0)),
///     Ok(PositionRecord::new(a, 1, 2.0)),
///     Ok(PositionRecord::new(b, 2, 3.0)),
/// ];
/// let lines: Vec<String> = WindowReducer::new(records, Mean, 3)
///     .unwrap()
///     .map(|w| w.unwrap().to_string())
///     .collect();
/// assert_eq!(lines, vec!["seqA 0 2 1.5", "seqB 2 3 3.0"]);
/// ```
pub struct WindowReducer<I, R>
where
    I: Iterator<Item = Result<PositionRecord<R::Value>>>,
    R: Reduction,
{
    records: Fuse<I>,
    reduction: R,
    capacity: usize,
    window: Option<Window<R::Value>>,
    failed: bool,
}

impl<I, R> WindowReducer<I, R>
where
    I: Iterator<Item = Result<PositionRecord<R::Value>>>,
    R: Reduction,
{
    pub fn new<T>(records: T, reduction: R, capacity: usize) -> Result<Self>
    where
        T: IntoIterator<IntoIter = I, Item = I::Item>,
    {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }
        Ok(WindowReducer {
            records: records.into_iter().fuse(),
            reduction,
            capacity,
            window: None,
            failed: false,
        })
    }

    fn finish(&self, window: Window<R::Value>) -> Option<WindowResult<R::Output>> {
        let value = self.reduction.reduce(&window)?;
        Some(WindowResult {
            end: window.end(),
            start: window.start,
            sequence_id: window.sequence_id,
            value,
        })
    }
}

impl<I, R> Iterator for WindowReducer<I, R>
where
    I: Iterator<Item = Result<PositionRecord<R::Value>>>,
    R: Reduction,
{
    type Item = Result<WindowResult<R::Output>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if self.window.as_ref().map_or(false, Window::is_full) {
                let full = self.window.take()?;
                match self.finish(full) {
                    Some(result) => return Some(Ok(result)),
                    None => continue,
                }
            }

            match self.records.next() {
                Some(Ok(rec)) => {
                    let same_sequence = self
                        .window
                        .as_ref()
                        .map_or(false, |w| w.sequence_id == rec.sequence_id);
                    if same_sequence {
                        if let Some(window) = self.window.as_mut() {
                            window.push(rec.value);
                        }
                        continue;
                    }
                    let closed = self.window.replace(Window::open(rec, self.capacity));
                    if let Some(result) = closed.and_then(|w| self.finish(w)) {
                        return Some(Ok(result));
                    }
                }
                Some(Err(e)) => {
                    self.window = None;
                    self.failed = true;
                    return Some(Err(e));
                }
                None => {
                    let last = self.window.take()?;
                    if let Some(result) = self.finish(last) {
                        return Some(Ok(result));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(rows: &[(&str, u64, f64)]) -> Vec<Result<PositionRecord<f64>>> {
        rows.iter()
            .map(|(id, pos, val)| Ok(PositionRecord::new(Arc::from(*id), *pos, *val)))
            .collect()
    }

    fn run(rows: &[(&str, u64, f64)], capacity: usize) -> Vec<WindowResult<f64>> {
        WindowReducer::new(records(rows), Mean, capacity)
            .unwrap()
            .map(|w| w.unwrap())
            .collect()
    }

    #[test]
    fn test_mean_of_full_window() {
        let out = run(&[("chr1", 0, 2.0), ("chr1", 1, 4.0), ("chr1", 2, 6.0)], 3);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, 4.0);
        assert_eq!((out[0].start, out[0].end), (0, 3));
        assert_eq!(out[0].to_string(), "chr1 0 3 4.0");
    }

    #[test]
    fn test_sequence_boundary_forces_flush() {
        let out = run(&[("seqA", 0, 1.0), ("seqA", 1, 2.0), ("seqB", 2, 3.0)], 3);
        let lines: Vec<String> = out.iter().map(|w| w.to_string()).collect();
        assert_eq!(lines, vec!["seqA 0 2 1.5", "seqB 2 3 3.0"]);
    }

    #[test]
    fn test_partial_final_window() {
        let rows: Vec<(&str, u64, f64)> = (0..7).map(|i| ("chr1", i, i as f64)).collect();
        let out = run(&rows, 3);
        assert_eq!(out.len(), 3);
        assert_eq!((out[2].start, out[2].end), (6, 7));
        assert_eq!(out[2].value, 6.0);
    }

    #[test]
    fn test_windows_partition_input() {
        let mut rows = Vec::new();
        for (id, len) in [("a", 11_u64), ("b", 5), ("c", 1), ("d", 8)] {
            for i in 0..len {
                rows.push((id, i, 1.0));
            }
        }
        let capacity = 4;
        let out = run(&rows, capacity);

        let total: u64 = out.iter().map(|w| w.end - w.start).sum();
        assert_eq!(total as usize, rows.len());

        for pair in out.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.sequence_id == next.sequence_id {
                // only the last window of a run may be short
                assert_eq!((prev.end - prev.start) as usize, capacity);
                assert_eq!(prev.end, next.start);
            } else {
                assert_eq!(next.start, 0);
            }
        }
        assert_eq!(out.len(), 3 + 2 + 1 + 2);
    }

    #[test]
    fn test_capacity_one() {
        let out = run(&[("a", 0, 1.0), ("a", 1, 2.0), ("b", 0, 3.0)], 1);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].sequence_id.as_ref(), "b");
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let reducer = WindowReducer::new(records(&[]), Mean, 0);
        assert!(matches!(reducer, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_input() {
        assert!(run(&[], 10).is_empty());
    }

    #[test]
    fn test_error_halts_stream() {
        let mut input = records(&[("a", 0, 1.0), ("a", 1, 2.0), ("a", 2, 3.0)]);
        input.insert(2, Err(Error::invalid_input(3, "a\t3\tx", "bad value")));
        let mut reducer = WindowReducer::new(input, Mean, 2).unwrap();
        assert_eq!(reducer.next().unwrap().unwrap().value, 1.5);
        assert!(matches!(
            reducer.next(),
            Some(Err(Error::InvalidInput { line_number: 3, .. }))
        ));
        assert!(reducer.next().is_none());
    }

    #[test]
    fn test_skipped_windows_are_not_emitted() {
        struct OddOnly;
        impl Reduction for OddOnly {
            type Value = f64;
            type Output = f64;
            fn reduce(&self, window: &Window<f64>) -> Option<f64> {
                (window.start() % 2 == 1).then(|| window.values()[0])
            }
        }
        let input = records(&[("a", 0, 1.0), ("a", 1, 2.0), ("a", 2, 3.0), ("a", 3, 4.0)]);
        let out: Vec<WindowResult<f64>> = WindowReducer::new(input, OddOnly, 1)
            .unwrap()
            .map(|w| w.unwrap())
            .collect();
        let values: Vec<f64> = out.iter().map(|w| w.value).collect();
        assert_eq!(values, vec![2.0, 4.0]);
    }

    #[test]
    fn test_rerun_is_identical() {
        let rows: Vec<(&str, u64, f64)> =
            (0..50).map(|i| ("s", i, (i * 7 % 13) as f64 / 3.0)).collect();
        let first: Vec<String> = run(&rows, 6).iter().map(|w| w.to_string()).collect();
        let second: Vec<String> = run(&rows, 6).iter().map(|w| w.to_string()).collect();
        assert_eq!(first, second);
    }
}
