//! An event journal for tests and offline analysis.

use std::ptr::NonNull;
use std::sync::Arc;

use crossbeam_queue::SegQueue;

use crate::api::request::{AllocRequest, Caller};
use crate::api::sink::EventSink;

/// One sink callback, with pointers reduced to addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// `post_init`
    PostInit,
    /// `pre_alloc`, with the request as the caller made it.
    PreAlloc {
        requested: AllocRequest,
        caller: Caller,
    },
    /// `post_successful_alloc`
    PostSuccessfulAlloc {
        alloc_ptr: usize,
        modified: AllocRequest,
        requested: AllocRequest,
        caller: Caller,
    },
    /// `pre_nonnull_free`
    PreNonnullFree { user_ptr: usize, usable_size: usize },
    /// `post_nonnull_free`
    PostNonnullFree { user_ptr: usize },
    /// `pre_nonnull_nonzero_realloc`
    PreNonnullNonzeroRealloc {
        user_ptr: usize,
        requested_size: usize,
        caller: Caller,
    },
    /// `post_nonnull_nonzero_realloc`; `result` is `None` on failure.
    PostNonnullNonzeroRealloc {
        user_ptr: usize,
        modified_size: usize,
        old_usable_size: usize,
        caller: Caller,
        result: Option<usize>,
    },
    /// A milestone inserted with [`RecordingSink::mark`].
    Marker(&'static str),
}

/// A journal entry: which sink saw what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Label of the recording sink.
    pub label: &'static str,
    /// The event.
    pub event: HookEvent,
}

/// Appends every callback to a lock-free journal.
///
/// Several sinks can share one journal (see [`RecordingSink::sharing`]),
/// which shows how events from nested chain links interleave.
///
/// Pushing to the journal allocates, so never put this sink on a chain that
/// serves as the process allocator.
#[derive(Clone)]
pub struct RecordingSink {
    label: &'static str,
    journal: Arc<SegQueue<RecordedEvent>>,
}

impl RecordingSink {
    /// A sink with its own, empty journal.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            journal: Arc::new(SegQueue::new()),
        }
    }

    /// A sink writing into the same journal as `other`.
    pub fn sharing(label: &'static str, other: &RecordingSink) -> Self {
        Self {
            label,
            journal: Arc::clone(&other.journal),
        }
    }

    /// This sink's label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Record a caller milestone between hook events.
    pub fn mark(&self, note: &'static str) {
        self.record(HookEvent::Marker(note));
    }

    /// Number of entries waiting in the journal.
    pub fn len(&self) -> usize {
        self.journal.len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    /// Take every entry from the shared journal, oldest first.
    pub fn drain(&self) -> Vec<RecordedEvent> {
        let mut entries = Vec::with_capacity(self.journal.len());
        while let Some(entry) = self.journal.pop() {
            entries.push(entry);
        }
        entries
    }

    /// Take every entry, keeping only the events.
    pub fn drain_events(&self) -> Vec<HookEvent> {
        self.drain().into_iter().map(|entry| entry.event).collect()
    }

    fn record(&self, event: HookEvent) {
        self.journal.push(RecordedEvent {
            label: self.label,
            event,
        });
    }
}

impl EventSink for RecordingSink {
    fn post_init(&self) {
        self.record(HookEvent::PostInit);
    }

    fn pre_alloc(&self, request: AllocRequest, caller: Caller) -> AllocRequest {
        self.record(HookEvent::PreAlloc {
            requested: request,
            caller,
        });
        request
    }

    fn post_successful_alloc(
        &self,
        alloc_ptr: NonNull<u8>,
        modified: AllocRequest,
        requested: AllocRequest,
        caller: Caller,
    ) {
        self.record(HookEvent::PostSuccessfulAlloc {
            alloc_ptr: alloc_ptr.as_ptr() as usize,
            modified,
            requested,
            caller,
        });
    }

    fn pre_nonnull_free(&self, user_ptr: NonNull<u8>, usable_size: usize) {
        self.record(HookEvent::PreNonnullFree {
            user_ptr: user_ptr.as_ptr() as usize,
            usable_size,
        });
    }

    fn post_nonnull_free(&self, user_ptr: NonNull<u8>) {
        self.record(HookEvent::PostNonnullFree {
            user_ptr: user_ptr.as_ptr() as usize,
        });
    }

    fn pre_nonnull_nonzero_realloc(
        &self,
        user_ptr: NonNull<u8>,
        requested_size: usize,
        caller: Caller,
    ) {
        self.record(HookEvent::PreNonnullNonzeroRealloc {
            user_ptr: user_ptr.as_ptr() as usize,
            requested_size,
            caller,
        });
    }

    fn post_nonnull_nonzero_realloc(
        &self,
        user_ptr: NonNull<u8>,
        modified_size: usize,
        old_usable_size: usize,
        caller: Caller,
        result: Option<NonNull<u8>>,
    ) {
        self.record(HookEvent::PostNonnullNonzeroRealloc {
            user_ptr: user_ptr.as_ptr() as usize,
            modified_size,
            old_usable_size,
            caller,
            result: result.map(|p| p.as_ptr() as usize),
        });
    }
}
