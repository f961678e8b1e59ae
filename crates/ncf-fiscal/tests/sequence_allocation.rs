use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use ncf_fiscal::fiscal::{
    AllocationError, CompanyId, InMemorySequenceStore, SequenceAllocator, SequenceRange,
    SequenceRangeId, SequenceStore, Series, TypeCode,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn company() -> CompanyId {
    CompanyId("main".to_string())
}

fn range(id: &str, start: u32, end: u32) -> SequenceRange {
    SequenceRange::new(
        SequenceRangeId(id.to_string()),
        "2026 authorization",
        company(),
        TypeCode::new("01").expect("valid code"),
        Series::new('B').expect("valid series"),
        start,
        end,
        date(2026, 1, 1),
        date(2026, 12, 31),
    )
    .expect("valid range")
}

fn allocator_with(ranges: Vec<SequenceRange>) -> SequenceAllocator<InMemorySequenceStore> {
    let store = Arc::new(InMemorySequenceStore::default());
    for range in ranges {
        store.insert(range).expect("insert range");
    }
    SequenceAllocator::new(store)
}

#[test]
fn allocation_is_gapless_and_ends_exhausted() {
    let allocator = allocator_with(vec![range("seq", 1, 2)]);
    let id = SequenceRangeId("seq".to_string());
    let today = date(2026, 6, 1);

    let first = allocator.allocate(&id, today).expect("first number");
    assert_eq!(first.as_str(), "B0100000001");
    let second = allocator.allocate(&id, today).expect("second number");
    assert_eq!(second.as_str(), "B0100000002");

    assert!(matches!(
        allocator.allocate(&id, today),
        Err(AllocationError::SequenceExhausted { .. })
    ));
}

#[test]
fn preview_matches_the_next_allocation() {
    let allocator = allocator_with(vec![range("seq", 1, 10)]);
    let id = SequenceRangeId("seq".to_string());
    let today = date(2026, 6, 1);

    for _ in 0..3 {
        let range = allocator
            .store()
            .fetch(&id)
            .expect("fetch")
            .expect("range exists");
        let previewed = allocator.preview(&range);
        let issued = allocator.allocate(&id, today).expect("allocate");
        assert_eq!(previewed, issued);
    }
}

#[test]
fn preview_does_not_consume() {
    let allocator = allocator_with(vec![range("seq", 1, 10)]);
    let id = SequenceRangeId("seq".to_string());

    let before = allocator
        .store()
        .fetch(&id)
        .expect("fetch")
        .expect("range exists");
    let _ = allocator.preview(&before);
    let _ = allocator.preview(&before);
    let after = allocator
        .store()
        .fetch(&id)
        .expect("fetch")
        .expect("range exists");
    assert_eq!(before.cursor, after.cursor);
}

#[test]
fn concurrent_callers_never_share_a_number() {
    let allocator = allocator_with(vec![range("seq", 1, 1000)]);
    let today = date(2026, 6, 1);
    let threads = 8;
    let per_thread = 25;

    let mut handles = Vec::new();
    for _ in 0..threads {
        let allocator = allocator.clone();
        handles.push(thread::spawn(move || {
            let id = SequenceRangeId("seq".to_string());
            let mut issued = Vec::new();
            while issued.len() < per_thread {
                match allocator.allocate(&id, today) {
                    Ok(number) => issued.push(number.as_str().to_string()),
                    // Contention budget ran out; the caller retries.
                    Err(AllocationError::AllocationConflict { .. }) => continue,
                    Err(other) => panic!("unexpected allocation failure: {other}"),
                }
            }
            issued
        }));
    }

    let mut all: Vec<String> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("thread finished"))
        .collect();
    all.sort();
    all.dedup();
    assert_eq!(all.len(), threads * per_thread);

    // Exactly the first N numbers of the deterministic sequence.
    let expected: Vec<String> = (1..=(threads * per_thread) as u32)
        .map(|n| format!("B01{n:08}"))
        .collect();
    assert_eq!(all, expected);
}

#[test]
fn active_range_lookup_prefers_the_latest_window() {
    let mut older = range("older", 1, 100);
    older.valid_from = date(2025, 1, 1);
    older.valid_until = date(2026, 12, 31);
    let newer = range("newer", 200, 300);
    let allocator = allocator_with(vec![older, newer]);

    let picked = allocator
        .find_active_range(
            &TypeCode::new("01").expect("valid code"),
            &company(),
            date(2026, 6, 1),
        )
        .expect("active range");
    assert_eq!(picked.id, SequenceRangeId("newer".to_string()));
}

#[test]
fn lookup_skips_disabled_and_out_of_window_ranges() {
    let mut disabled = range("disabled", 1, 100);
    disabled.enabled = false;
    let allocator = allocator_with(vec![disabled]);

    let result = allocator.find_active_range(
        &TypeCode::new("01").expect("valid code"),
        &company(),
        date(2026, 6, 1),
    );
    assert!(matches!(
        result,
        Err(AllocationError::NoActiveSequence { .. })
    ));

    // Outside the validity window the same lookup also fails.
    let fresh = allocator_with(vec![range("seq", 1, 100)]);
    assert!(matches!(
        fresh.find_active_range(
            &TypeCode::new("01").expect("valid code"),
            &company(),
            date(2027, 6, 1),
        ),
        Err(AllocationError::NoActiveSequence { .. })
    ));
}

#[test]
fn disabled_range_refuses_to_allocate() {
    let mut disabled = range("seq", 1, 100);
    disabled.enabled = false;
    let allocator = allocator_with(vec![disabled]);

    assert!(matches!(
        allocator.allocate(&SequenceRangeId("seq".to_string()), date(2026, 6, 1)),
        Err(AllocationError::SequenceUnavailable { .. })
    ));
}

#[test]
fn company_alerts_collect_low_stock_and_expiry() {
    let mut low = range("low", 1, 100);
    low.cursor = 95;
    low.low_stock_threshold = 10;
    let comfortable = range("comfortable", 1, 100_000);
    let allocator = allocator_with(vec![low, comfortable]);

    let alerts = allocator
        .alerts_for_company(&company(), date(2026, 6, 1))
        .expect("alerts");
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("Low stock: only 5 NCF numbers left"));
}
