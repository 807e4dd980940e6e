//! A counting chain installed as the process allocator.

#![cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "macos",
    target_os = "ios"
))]

use std::alloc::{GlobalAlloc, Layout};

use allochook::{CountingSink, HookedAlloc, Interceptor, Next, SystemAllocator, Terminal};

#[global_allocator]
static GLOBAL: HookedAlloc<Interceptor<CountingSink, Terminal<SystemAllocator>>> =
    HookedAlloc::new(Interceptor::new(
        CountingSink::new(),
        Next::terminal(SystemAllocator),
    ));

fn sink() -> &'static CountingSink {
    GLOBAL.hooks().sink()
}

#[test]
fn test_box_goes_through_chain() {
    let before = sink().stats();
    let boxed = std::hint::black_box(Box::new([7u64; 32]));
    let during = sink().stats();
    drop(boxed);
    let after = sink().stats();

    assert!(GLOBAL.is_initialized());
    assert_eq!(during.inits, 1);
    assert!(during.allocations > before.allocations);
    assert!(after.frees > during.frees);
}

#[test]
fn test_vec_growth_reallocs() {
    let before = sink().stats();
    let mut v: Vec<u8> = Vec::with_capacity(1);
    for i in 0..10_000u32 {
        v.push(i as u8);
        std::hint::black_box(&v);
    }
    assert_eq!(v.len(), 10_000);
    assert!(sink().stats().reallocs > before.reallocs);
}

#[test]
fn test_over_aligned_layouts() {
    let layout = Layout::from_size_align(100, 4096).unwrap();
    unsafe {
        let ptr = GLOBAL.alloc(layout);
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % 4096, 0);
        ptr.write_bytes(0x11, 100);

        let grown = GLOBAL.realloc(ptr, layout, 10_000);
        assert!(!grown.is_null());
        assert_eq!(grown as usize % 4096, 0);
        assert!(std::slice::from_raw_parts(grown, 100).iter().all(|&b| b == 0x11));

        GLOBAL.dealloc(grown, Layout::from_size_align(10_000, 4096).unwrap());
    }
}

#[test]
fn test_usable_size_covers_request() {
    let layout = Layout::from_size_align(33, 8).unwrap();
    unsafe {
        let ptr = GLOBAL.alloc(layout);
        let ptr = std::ptr::NonNull::new(ptr).unwrap();
        assert!(GLOBAL.usable_size(ptr) >= 33);
        GLOBAL.dealloc(ptr.as_ptr(), layout);
    }
}
