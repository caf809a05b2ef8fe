use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::READ_HANDLE_BASE;

use super::ReadHandle;

/// Handles of every session in the process. Reports of a read may still arrive after its
/// session is gone, so a later session must not issue the same handle.
static READ_HANDLES: HandleAllocator = HandleAllocator::new();

/// Issues read handles, starting at [`READ_HANDLE_BASE`] and never reusing one.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(READ_HANDLE_BASE),
        }
    }

    /// The allocator shared by all sessions in the process.
    pub fn global() -> &'static HandleAllocator {
        &READ_HANDLES
    }

    // Wraparound is not checked, a u64 is not exhausted within a process lifetime.
    pub fn next_read_handle(&self) -> ReadHandle {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use super::*;

    #[test]
    fn test_sequential_handles() {
        let handles = HandleAllocator::new();
        assert_eq!(handles.next_read_handle(), 256);
        assert_eq!(handles.next_read_handle(), 257);
        assert_eq!(handles.next_read_handle(), 258);
    }

    #[test]
    fn test_global_handles_are_shared() {
        let first = HandleAllocator::global().next_read_handle();
        let second = HandleAllocator::global().next_read_handle();
        assert!(first >= READ_HANDLE_BASE);
        assert!(second > first);
    }

    #[test]
    fn test_concurrent_handles_are_unique() {
        let handles = Arc::new(HandleAllocator::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handles = handles.clone();
                thread::spawn(move || {
                    (0..100)
                        .map(|_| handles.next_read_handle())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen = HashSet::new();
        for worker in workers {
            for handle in worker.join().unwrap() {
                assert!(handle >= READ_HANDLE_BASE);
                assert!(seen.insert(handle));
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
