/// Normalized `skip`/`take` pagination arguments.
///
/// A negative `take` pages backwards: the query runs with its ordering
/// reversed, and the page is flipped back before it is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub skip: usize,
    pub take: Option<usize>,
    pub backwards: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("`skip` must not be negative, got {0}")]
    NegativeSkip(i32),
}

impl Window {
    pub fn new(take: Option<i32>, skip: Option<i32>) -> Result<Self, WindowError> {
        let skip = match skip {
            Some(skip) if skip < 0 => return Err(WindowError::NegativeSkip(skip)),
            Some(skip) => skip as usize,
            None => 0,
        };

        Ok(Self {
            skip,
            take: take.map(|take| take.unsigned_abs() as usize),
            backwards: take.map_or(false, |take| take < 0),
        })
    }

    pub fn limit(&self) -> Option<i64> {
        self.take.map(|take| take as i64)
    }

    pub fn offset(&self) -> i64 {
        self.skip as i64
    }

    /// Applies the window in memory. `items` must be in query order, i.e.
    /// already reversed when paging backwards.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let mut page: Vec<T> = items
            .into_iter()
            .skip(self.skip)
            .take(self.take.unwrap_or(usize::MAX))
            .collect();
        self.restore_order(&mut page);
        page
    }

    /// Undoes the ordering reversal of backwards pagination.
    pub fn restore_order<T>(&self, page: &mut [T]) {
        if self.backwards {
            page.reverse();
        }
    }
}
