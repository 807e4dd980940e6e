//! Deterministic terminal allocator for integration tests.
//!
//! Hands out fake, never-dereferenced addresses, records every call, and
//! fails on request.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ptr::{self, NonNull};
use std::sync::Mutex;

use allochook::{RawAllocator, RecordingSink};

/// Base of the fake address space.
pub const BASE: usize = 0x1_0000;

/// Usable sizes are requests rounded up to this.
pub const GRANULE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCall {
    Malloc { size: usize },
    Free { addr: usize },
    Memalign { align: usize, size: usize },
    Realloc { addr: usize, size: usize },
    UsableSize { addr: usize },
}

#[derive(Default)]
struct State {
    next: usize,
    live: HashMap<usize, usize>,
    calls: Vec<MockCall>,
    fail_remaining: usize,
}

pub struct MockAllocator {
    state: Mutex<State>,
    journal: Option<RecordingSink>,
}

impl MockAllocator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next: BASE,
                ..State::default()
            }),
            journal: None,
        }
    }

    /// Also write a marker into `journal` whenever the allocator is called.
    pub fn journaling(journal: &RecordingSink) -> Self {
        Self {
            journal: Some(RecordingSink::sharing("mock", journal)),
            ..Self::new()
        }
    }

    /// Make the next `count` allocating calls return null.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().unwrap().fail_remaining = count;
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn live_blocks(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }

    pub fn usable_of(size: usize) -> usize {
        (size.max(1) + GRANULE - 1) / GRANULE * GRANULE
    }

    fn mark(&self, note: &'static str) {
        if let Some(journal) = &self.journal {
            journal.mark(note);
        }
    }

    fn carve(&self, align: usize, size: usize, call: MockCall) -> *mut u8 {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            return ptr::null_mut();
        }
        let addr = (state.next + align - 1) / align * align;
        let usable = Self::usable_of(size);
        state.next = addr + usable + GRANULE;
        state.live.insert(addr, usable);
        addr as *mut u8
    }
}

unsafe impl RawAllocator for MockAllocator {
    fn malloc(&self, size: usize) -> *mut u8 {
        self.mark("mock:malloc");
        self.carve(GRANULE, size, MockCall::Malloc { size })
    }

    unsafe fn free(&self, ptr: *mut u8) {
        self.mark("mock:free");
        let mut state = self.state.lock().unwrap();
        let addr = ptr as usize;
        state.calls.push(MockCall::Free { addr });
        if !ptr.is_null() {
            assert!(state.live.remove(&addr).is_some(), "free of unknown block {addr:#x}");
        }
    }

    fn memalign(&self, alignment: usize, size: usize) -> *mut u8 {
        self.mark("mock:memalign");
        self.carve(alignment.max(GRANULE), size, MockCall::Memalign { align: alignment, size })
    }

    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        self.mark("mock:realloc");
        let addr = ptr as usize;
        let call = MockCall::Realloc { addr, size };
        if ptr.is_null() {
            return self.carve(GRANULE, size, call);
        }
        if size == 0 {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call);
            assert!(state.live.remove(&addr).is_some(), "realloc of unknown block {addr:#x}");
            return ptr::null_mut();
        }

        // Genuine: always move, keep the old block on failure.
        let new_ptr = self.carve(GRANULE, size, call);
        if !new_ptr.is_null() {
            self.state.lock().unwrap().live.remove(&addr);
        }
        new_ptr
    }

    unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        let addr = ptr.as_ptr() as usize;
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::UsableSize { addr });
        *state.live.get(&addr).expect("usable_size of unknown block")
    }
}
