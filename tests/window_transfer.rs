//! # Window Sharing Integration Tests
//!
//! Windows handed to other threads by reference and by parcel, and the
//! budget and registry that account for them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use turcursor::window::{HandleTable, OwnerTracker, WindowRegistry};
use turcursor::{RowWindow, WindowAllocationError, WindowBudget, WindowError};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn filled(rows: usize) -> RowWindow {
    let window = RowWindow::builder()
        .name("results")
        .capacity(64 * 1024)
        .shared_memory(true)
        .build()
        .unwrap();
    assert!(window.set_num_columns(2));
    for i in 0..rows {
        assert!(window.alloc_row());
        assert!(window.put_long(i as i64, i, 0).unwrap());
        assert!(window.put_string(&format!("value {}", i), i, 1).unwrap());
    }
    window
}

// ============================================================================
// Parcels
// ============================================================================

#[test]
fn test_parcel_round_trip_across_threads() {
    init_logging();
    let table = Arc::new(HandleTable::new());
    let window = filled(100);
    let released = Arc::new(AtomicUsize::new(0));
    let counter = released.clone();
    window.on_released(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let parcel = window.write_to_parcel(&table).unwrap();
    let (tx, rx) = mpsc::channel();

    let receiver_table = table.clone();
    let receiver = std::thread::spawn(move || {
        let remote = RowWindow::from_parcel(&parcel, &receiver_table).unwrap();
        tx.send(()).unwrap();
        (0..remote.num_rows())
            .map(|row| remote.get_long(row, 0).unwrap())
            .sum::<i64>()
    });

    rx.recv().unwrap();
    // the receiver's reference keeps the storage alive
    window.close();
    assert_eq!(released.load(Ordering::SeqCst), 0);

    let sum = receiver.join().unwrap();
    assert_eq!(sum, (0..100).sum::<i64>());
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_parcel_carries_start_position() {
    let table = HandleTable::new();
    let window = RowWindow::new("offset", 4096).unwrap();
    assert!(window.set_num_columns(1));
    window.set_start_position(1_000).unwrap();
    assert!(window.alloc_row());
    window.put_double(2.5, 1_000, 0).unwrap();

    let remote = RowWindow::from_parcel(&window.write_to_parcel(&table).unwrap(), &table).unwrap();

    assert_eq!(remote.start_position(), 1_000);
    assert_eq!(remote.get_double(1_000, 0).unwrap(), 2.5);
    assert!(remote.get_double(0, 0).is_err());
}

#[test]
fn test_parcel_after_last_release_is_refused() {
    let table = HandleTable::new();
    let parcel = {
        let window = filled(1);
        window.write_to_parcel(&table).unwrap()
    };

    let err = RowWindow::from_parcel(&parcel, &table).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<WindowError>(),
        Some(WindowError::Released { .. })
    ));
}

// ============================================================================
// Concurrent Holders
// ============================================================================

#[test]
fn test_readers_share_one_window() {
    let window = filled(500);
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let reader = window.share();
            std::thread::spawn(move || {
                for row in 0..reader.num_rows() {
                    assert_eq!(
                        reader.get_string(row, 1).unwrap(),
                        Some(format!("value {}", row))
                    );
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(window.reference_count(), 1);
}

#[test]
fn test_last_holder_on_any_thread_frees_storage() {
    let window = filled(10);
    let released = Arc::new(AtomicUsize::new(0));
    let counter = released.clone();
    window.on_released(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let holders: Vec<RowWindow> = (0..16).map(|_| window.share()).collect();
    drop(window);

    let threads: Vec<_> = holders
        .into_iter()
        .map(|holder| std::thread::spawn(move || drop(holder)))
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(released.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Budget and Registry
// ============================================================================

#[test]
fn test_budget_exhaustion_names_the_holders() {
    init_logging();
    let budget = Arc::new(WindowBudget::with_limit(4 * 1024 * 1024));
    let tracker = Arc::new(OwnerTracker::new());
    let builder = RowWindow::builder()
        .capacity(1024 * 1024)
        .budget(budget.clone())
        .registry(tracker.clone())
        .owner("sync-adapter");

    let held: Vec<RowWindow> = (0..4).map(|_| builder.build().unwrap()).collect();
    assert_eq!(budget.used(), 4 * 1024 * 1024);

    let err = builder.build().unwrap_err();
    let alloc = err.downcast_ref::<WindowAllocationError>().unwrap();
    assert_eq!(alloc.live_windows, 4);
    assert_eq!(
        tracker.summary().unwrap(),
        "owner sync-adapter: 4 windows, 4194304 bytes"
    );

    drop(held);
    assert_eq!(tracker.live_windows(), 0);
    assert_eq!(budget.stats().peak_used, 4 * 1024 * 1024);
    assert!(builder.build().is_ok());
}
