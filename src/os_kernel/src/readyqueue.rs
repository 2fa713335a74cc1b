//! Ready queue: a fixed-capacity, priority-ordered queue of runnable tasks.
//!
//! Grounded in `Os_Task.c`'s `rq[]`/`rq_head`/`rq_tail` ring buffer: tasks
//! are inserted in descending-priority order (ties broken FIFO, i.e. a
//! newly activated task goes after any already-ready task of equal
//! priority) so `front()` is always the next task `schedule()` should run.
//! Capacity is `MAX_TASKS`; a task id never appears twice.

use arrayvec::ArrayVec;

use crate::id::TaskId;
use crate::limits::MAX_TASKS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    task: TaskId,
    priority: u8,
}

#[derive(Debug)]
pub struct ReadyQueue {
    entries: ArrayVec<Entry, MAX_TASKS>,
}

impl ReadyQueue {
    pub const fn new() -> Self {
        Self {
            entries: ArrayVec::new_const(),
        }
    }

    /// Inserts `task` in priority order. No-op if `task` is already queued
    /// (mirrors the original's "already in `rq`" guard in `ActivateTask`).
    pub fn push(&mut self, task: TaskId, priority: u8) {
        if self.entries.iter().any(|e| e.task == task) {
            return;
        }
        let pos = self
            .entries
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(self.entries.len());
        // Capacity is `MAX_TASKS` and every live task appears at most once,
        // so this can never overflow.
        self.entries.insert(pos, Entry { task, priority });
    }

    pub fn pop_front(&mut self) -> Option<TaskId> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0).task)
        }
    }

    pub fn front(&self) -> Option<TaskId> {
        self.entries.first().map(|e| e.task)
    }

    pub fn remove(&mut self, task: TaskId) {
        self.entries.retain(|e| e.task != task);
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.entries.iter().any(|e| e.task == task)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "host_test"))]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_task_jumps_ahead_of_lower_priority_ones() {
        let mut q = ReadyQueue::new();
        q.push(TaskId::new_unchecked(1), 1);
        q.push(TaskId::new_unchecked(2), 5);
        q.push(TaskId::new_unchecked(3), 3);
        assert_eq!(q.pop_front(), Some(TaskId::new_unchecked(2)));
        assert_eq!(q.pop_front(), Some(TaskId::new_unchecked(3)));
        assert_eq!(q.pop_front(), Some(TaskId::new_unchecked(1)));
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn equal_priority_ties_break_fifo() {
        let mut q = ReadyQueue::new();
        q.push(TaskId::new_unchecked(1), 2);
        q.push(TaskId::new_unchecked(2), 2);
        assert_eq!(q.pop_front(), Some(TaskId::new_unchecked(1)));
        assert_eq!(q.pop_front(), Some(TaskId::new_unchecked(2)));
    }

    #[test]
    fn pushing_an_already_queued_task_is_a_no_op() {
        let mut q = ReadyQueue::new();
        q.push(TaskId::new_unchecked(1), 1);
        q.push(TaskId::new_unchecked(1), 9);
        assert_eq!(q.front(), Some(TaskId::new_unchecked(1)));
        q.pop_front();
        assert!(q.is_empty());
    }
}
