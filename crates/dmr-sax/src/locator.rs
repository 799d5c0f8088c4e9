//! Line tracking for diagnostics.

use std::cell::Cell;
use std::io::{self, BufRead, Read};
use std::rc::Rc;

/// Shared handle reporting the 1-based line the event source has reached.
#[derive(Debug, Clone, Default)]
pub struct Locator {
    newlines: Rc<Cell<u64>>,
}

impl Locator {
    /// Line of the most recently delivered event.
    pub fn line(&self) -> u64 {
        self.newlines.get() + 1
    }

    fn advance(&self, consumed: &[u8]) {
        let count = consumed.iter().filter(|&&b| b == b'\n').count() as u64;
        if count > 0 {
            self.newlines.set(self.newlines.get() + count);
        }
    }
}

/// Input wrapper that counts newlines as the XML reader consumes bytes.
pub(crate) struct LineTracker<R> {
    inner: R,
    locator: Locator,
}

impl<R> LineTracker<R> {
    pub(crate) fn new(inner: R, locator: Locator) -> Self {
        Self { inner, locator }
    }
}

impl<R: Read> Read for LineTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.locator.advance(&buf[..n]);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for LineTracker<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if let Ok(available) = self.inner.fill_buf() {
            let end = amt.min(available.len());
            self.locator.advance(&available[..end]);
        }
        self.inner.consume(amt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_consumed_lines() {
        let locator = Locator::default();
        let mut tracker = LineTracker::new(&b"a\nb\nc"[..], locator.clone());
        assert_eq!(locator.line(), 1);
        tracker.consume(2);
        assert_eq!(locator.line(), 2);
        let mut rest = String::new();
        tracker.read_to_string(&mut rest).expect("read rest");
        assert_eq!(rest, "b\nc");
        assert_eq!(locator.line(), 3);
    }
}
