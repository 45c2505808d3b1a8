//! Relay-style cursor pagination over offset-addressable result sets.

use crate::filters::Page;
use async_graphql::connection::{Connection, Edge, EmptyFields};
use async_graphql::{OutputType, SimpleObject};

/// Extra connection field carrying the unpaginated match count.
#[derive(SimpleObject, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalCount {
    pub total_count: usize,
}

pub type CountedConnection<T> = Connection<usize, T, TotalCount, EmptyFields>;

/// Half-open `[start, end)` window over `total` ordered items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl Window {
    /// Cursors are item offsets: `after` excludes itself and everything before it,
    /// `before` excludes itself and everything after it.
    pub fn new(
        total: usize,
        after: Option<usize>,
        before: Option<usize>,
        first: Option<usize>,
        last: Option<usize>,
    ) -> Self {
        let mut end = before.unwrap_or(total).min(total);
        let mut start = after.map(|a| a.saturating_add(1)).unwrap_or(0).min(end);
        if let Some(first) = first {
            end = start.saturating_add(first).min(end);
        }
        if let Some(last) = last {
            start = start.max(end.saturating_sub(last));
        }
        Self { start, end, total }
    }

    pub fn page(&self) -> Page {
        Page::new(self.start, Some(self.end - self.start))
    }

    pub fn into_connection<T, I>(self, nodes: I) -> CountedConnection<T>
    where
        T: OutputType,
        I: IntoIterator<Item = T>,
    {
        let mut connection = Connection::with_additional_fields(
            self.start > 0,
            self.end < self.total,
            TotalCount {
                total_count: self.total,
            },
        );
        connection.edges.extend(
            nodes
                .into_iter()
                .enumerate()
                .map(|(i, node)| Edge::new(self.start + i, node)),
        );
        connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page() {
        let w = Window::new(10, None, None, Some(3), None);
        assert_eq!((w.start, w.end), (0, 3));
    }

    #[test]
    fn after_cursor() {
        let w = Window::new(10, Some(2), None, Some(3), None);
        assert_eq!((w.start, w.end), (3, 6));
    }

    #[test]
    fn last_before_cursor() {
        let w = Window::new(10, None, Some(8), None, Some(2));
        assert_eq!((w.start, w.end), (6, 8));
    }

    #[test]
    fn last_larger_than_window_keeps_start() {
        let w = Window::new(10, Some(4), Some(7), None, Some(50));
        assert_eq!((w.start, w.end), (5, 7));
    }

    #[test]
    fn cursor_past_end_is_empty() {
        let w = Window::new(3, Some(10), None, Some(5), None);
        assert_eq!((w.start, w.end), (3, 3));
        assert_eq!(w.page(), Page::new(3, Some(0)));
    }
}
