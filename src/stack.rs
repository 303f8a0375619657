// ABOUTME: Explicit stack of open array/map frames used in place of recursion.
// ABOUTME: Each frame counts the child slots still expected in its container.

use crate::error::{Error, Result};

/// The kind of an open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Array,
    Map,
}

/// Bookkeeping for one open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    /// Child slots still expected. Maps count keys and values separately.
    pub remaining: u64,
}

/// Open containers, innermost last.
///
/// A nested container counts as a single child of its parent: the parent's
/// count is reduced when the nested frame is popped, not when it is pushed.
#[derive(Debug, Default, Clone)]
pub struct ContainerStack {
    frames: Vec<Frame>,
}

impl ContainerStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting level. Zero at a top-level value boundary.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn push_array(&mut self, count: u32) {
        self.frames.push(Frame {
            kind: FrameKind::Array,
            remaining: u64::from(count),
        });
    }

    pub fn push_map(&mut self, pair_count: u32) {
        self.frames.push(Frame {
            kind: FrameKind::Map,
            remaining: u64::from(pair_count) * 2,
        });
    }

    /// Fail if the innermost container has no children left to read.
    #[inline]
    pub fn check_count(&self) -> Result<()> {
        match self.frames.last() {
            Some(frame) if frame.remaining == 0 => Err(Error::StackUnderflow),
            _ => Ok(()),
        }
    }

    /// Record that one direct child of the innermost container was consumed.
    #[inline]
    pub fn reduce_count(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.remaining = frame.remaining.saturating_sub(1);
        }
    }

    /// Child slots left in the innermost container (0 at top level).
    #[inline]
    #[must_use]
    pub fn top_remaining(&self) -> u64 {
        self.frames.last().map_or(0, |f| f.remaining)
    }

    /// Pop the innermost frame and count it as one consumed child of its parent.
    pub fn pop(&mut self) -> Result<Frame> {
        let frame = self.frames.pop().ok_or(Error::StackMismatch)?;
        self.reduce_count();
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_counts_keys_and_values() {
        let mut stack = ContainerStack::new();
        stack.push_map(3);
        assert_eq!(stack.top_remaining(), 6);
        assert_eq!(stack.top().map(|f| f.kind), Some(FrameKind::Map));
    }

    #[test]
    fn test_check_count_underflow() {
        let mut stack = ContainerStack::new();
        // Top level never underflows
        stack.check_count().unwrap();

        stack.push_array(1);
        stack.check_count().unwrap();
        stack.reduce_count();
        assert_eq!(stack.check_count(), Err(Error::StackUnderflow));
    }

    #[test]
    fn test_pop_counts_nested_as_one_child() {
        let mut stack = ContainerStack::new();
        stack.push_array(2);
        stack.push_map(1);
        assert_eq!(stack.depth(), 2);

        let frame = stack.pop().unwrap();
        assert_eq!(frame.kind, FrameKind::Map);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top_remaining(), 1);
    }

    #[test]
    fn test_pop_empty_is_mismatch() {
        let mut stack = ContainerStack::new();
        assert_eq!(stack.pop(), Err(Error::StackMismatch));
    }
}
