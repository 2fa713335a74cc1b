//! Resource service: a non-reentrant binary mutex with a reserved ceiling
//! priority field.
//!
//! Grounded in `Os_Resource.c`'s `GetResource`/`ReleaseResource`: a resource
//! is either free or held by exactly one task. `GetResource` by the task
//! that already holds it is a no-op (already owned by caller, do nothing)
//! rather than an error, since the baseline doesn't support nested locking
//! and so has
//! no count to unwind; `GetResource` while another task holds it is
//! rejected rather than queued (OSEK "standard" resources are
//! non-reentrant by spec — nesting is the caller's job via distinct
//! resources). `ceiling_priority` is carried in the configuration but, as
//! in the original baseline, is not yet used to raise the holding task's
//! effective priority — a priority-ceiling protocol is out of scope here.

use crate::error::StatusId;
use crate::id::TaskId;

#[derive(Debug, Clone, Copy)]
pub struct ResourceConfig {
    /// Reserved for a future priority-ceiling-protocol implementation;
    /// read but not acted on.
    pub ceiling_priority: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct Resource {
    pub config: ResourceConfig,
    holder: Option<TaskId>,
}

impl Resource {
    pub const fn new(config: ResourceConfig) -> Self {
        Self {
            config,
            holder: None,
        }
    }

    pub fn get(&mut self, task: TaskId) -> Result<(), StatusId> {
        match self.holder {
            None => {
                self.holder = Some(task);
                Ok(())
            }
            Some(holder) if holder == task => Ok(()),
            Some(_) => Err(StatusId::InvalidState),
        }
    }

    /// A release by a task that isn't the current holder (including a
    /// release of an already-free resource) is a no-op, not an error:
    /// there is no lock for it to have mismatched.
    pub fn release(&mut self, task: TaskId) -> Result<(), StatusId> {
        if self.holder == Some(task) {
            self.holder = None;
        }
        Ok(())
    }

    pub fn holder(&self) -> Option<TaskId> {
        self.holder
    }
}

#[cfg(all(test, feature = "host_test"))]
mod tests {
    use super::*;

    fn resource() -> Resource {
        Resource::new(ResourceConfig { ceiling_priority: 0 })
    }

    #[test]
    fn get_by_the_current_holder_is_a_no_op() {
        let mut r = resource();
        let t = TaskId::new_unchecked(1);
        r.get(t).unwrap();
        r.get(t).unwrap();
        assert_eq!(r.holder(), Some(t));
    }

    #[test]
    fn get_by_another_task_while_held_is_rejected() {
        let mut r = resource();
        r.get(TaskId::new_unchecked(1)).unwrap();
        assert_eq!(
            r.get(TaskId::new_unchecked(2)).unwrap_err(),
            StatusId::InvalidState
        );
    }

    #[test]
    fn release_by_a_non_holder_is_a_no_op_not_an_error() {
        let mut r = resource();
        r.get(TaskId::new_unchecked(1)).unwrap();
        r.release(TaskId::new_unchecked(2)).unwrap();
        assert_eq!(r.holder(), Some(TaskId::new_unchecked(1)));
    }

    #[test]
    fn release_of_an_already_free_resource_is_a_no_op() {
        let mut r = resource();
        r.release(TaskId::new_unchecked(1)).unwrap();
        assert_eq!(r.holder(), None);
    }
}
