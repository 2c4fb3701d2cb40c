/// A page of entries addressed by a 1-based inclusive display range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Rows to skip, 0-based.
    pub skip: i64,
    /// Rows the caller asked for.
    pub limit: i64,
}

impl PageWindow {
    /// `from` is clamped to 1 and `to` to `from`, so an inverted range
    /// collapses to the single row at `from`.
    pub fn from_range(from: i64, to: i64) -> Self {
        let from = from.max(1);
        let to = to.max(from);
        Self {
            skip: from - 1,
            limit: to - from + 1,
        }
    }

    /// Split rows fetched with one lookahead row past `limit` into the page
    /// and a "more pages exist" flag.
    pub fn split<T>(&self, mut rows: Vec<T>) -> (Vec<T>, bool) {
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        let more = rows.len() > limit;
        if more {
            rows.truncate(limit);
        }
        (rows, more)
    }
}
