use std::ops::{Range, RangeFrom, RangeTo};

/// Something that selects a page of rows: `(skip, length)`.
pub trait PageRange {
    fn page(&self) -> (Option<u64>, Option<u64>);
}

impl PageRange for () {
    fn page(&self) -> (Option<u64>, Option<u64>) {
        (None, None)
    }
}

/// `skip..end`
impl PageRange for Range<u64> {
    fn page(&self) -> (Option<u64>, Option<u64>) {
        (Some(self.start), Some(self.end.saturating_sub(self.start)))
    }
}

/// First `end` rows.
impl PageRange for RangeTo<u64> {
    fn page(&self) -> (Option<u64>, Option<u64>) {
        (None, Some(self.end))
    }
}

/// Everything after `start` rows.
impl PageRange for RangeFrom<u64> {
    fn page(&self) -> (Option<u64>, Option<u64>) {
        (Some(self.start), None)
    }
}

impl PageRange for (Option<u64>, Option<u64>) {
    fn page(&self) -> (Option<u64>, Option<u64>) {
        *self
    }
}
