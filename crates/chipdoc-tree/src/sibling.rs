/// Per-group iteration state shared by every loader.
///
/// Tracks which children of one open group were visited, the last child
/// group that was left (`last_group`), and the next `Data` leaf to read.
/// A fresh cursor is created each time the group is entered.
#[derive(Clone, Debug, Default)]
pub struct SiblingCursor {
    last_group: Option<usize>,
    visited: Vec<bool>,
    next_data: usize,
}

impl SiblingCursor {
    pub fn new(child_count: usize) -> Self {
        Self {
            last_group: None,
            visited: vec![false; child_count],
            next_data: 0,
        }
    }

    /// Ring scan for the next unvisited child accepted by `matches`, starting
    /// just after the last group left and wrapping once to index 0.
    pub fn next_group(&self, matches: impl Fn(usize) -> bool) -> Option<usize> {
        let len = self.visited.len();
        let start = self.last_group.map_or(0, |i| i + 1).min(len);
        (start..len)
            .chain(0..start)
            .find(|&i| !self.visited[i] && matches(i))
    }

    /// First child in document order accepted by `matches`, visited or not.
    pub fn find_first(&self, matches: impl Fn(usize) -> bool) -> Option<usize> {
        (0..self.visited.len()).find(|&i| matches(i))
    }

    pub fn mark_visited(&mut self, index: usize) {
        if let Some(slot) = self.visited.get_mut(index) {
            *slot = true;
        }
    }

    /// Record that child `index` was just left.
    pub fn left(&mut self, index: usize) {
        self.last_group = Some(index);
    }

    /// Next unread leaf accepted by `is_data`, scanning forward only.
    pub fn next_data(&mut self, is_data: impl Fn(usize) -> bool) -> Option<usize> {
        let found = (self.next_data..self.visited.len()).find(|&i| is_data(i))?;
        self.next_data = found + 1;
        self.visited[found] = true;
        Some(found)
    }
}
