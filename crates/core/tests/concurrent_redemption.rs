//! Concurrent redemptions against a shared in-memory ledger.

use std::{
    sync::atomic::{AtomicU32, Ordering},
    thread,
};

use testresult::TestResult;

use rebate::prelude::*;

const THREADS: u32 = 32;

#[test]
fn exactly_limit_redemptions_succeed_under_contention() -> TestResult {
    let id = PromotionId::from("launch");
    let mut ledger = InMemoryUsageLedger::new();

    ledger.register(id.clone(), UsageLimits::with_usage_limit(5, 0));

    let recorded = AtomicU32::new(0);
    let rejected = AtomicU32::new(0);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| match ledger.try_record_redemption(&id, None) {
                Ok(RedemptionOutcome::Recorded(_)) => {
                    recorded.fetch_add(1, Ordering::Relaxed);
                }
                Ok(_) | Err(_) => {
                    rejected.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    assert_eq!(recorded.load(Ordering::Relaxed), 5);
    assert_eq!(rejected.load(Ordering::Relaxed), THREADS - 5);
    assert_eq!(ledger.usage(&id)?.map(|usage| usage.usage_count), Some(5));

    Ok(())
}

#[test]
fn per_customer_limit_holds_under_contention() -> TestResult {
    let id = PromotionId::from("welcome");
    let alice = CustomerId::from("alice");
    let bob = CustomerId::from("bob");
    let mut ledger = InMemoryUsageLedger::new();

    ledger.register(id.clone(), UsageLimits::with_per_customer_limit(1));

    thread::scope(|scope| {
        for index in 0..THREADS {
            let customer = if index % 2 == 0 { &alice } else { &bob };
            let ledger = &ledger;
            let id = &id;

            scope.spawn(move || ledger.try_record_redemption(id, Some(customer)));
        }
    });

    assert_eq!(ledger.customer_usage(&id, &alice)?, 1);
    assert_eq!(ledger.customer_usage(&id, &bob)?, 1);
    assert_eq!(ledger.usage(&id)?.map(|usage| usage.usage_count), Some(2));

    Ok(())
}

#[test]
fn batch_records_each_applied_promotion_once() -> TestResult {
    let ids = [PromotionId::from("a"), PromotionId::from("b")];
    let mut ledger = InMemoryUsageLedger::new();

    ledger.register(ids[0].clone(), UsageLimits::with_usage_limit(1, 0));
    ledger.register(ids[1].clone(), UsageLimits::with_usage_limit(1, 1));

    let report = ledger.record_batch(&ids, None);

    assert_eq!(report.recorded(), [(PromotionId::from("a"), 1)]);
    assert_eq!(
        report.rejected(),
        [(PromotionId::from("b"), RedemptionOutcome::LimitReached)]
    );
    assert!(!report.is_clean());

    Ok(())
}
