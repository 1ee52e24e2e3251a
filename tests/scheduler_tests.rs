//! Scheduler tests: allocation by priority, neighbor assist order, backpressure, stop/restart.
//! Timing-based: processing delays are chosen so assertions sit well inside a delay window.

use crossbeam_channel::{Receiver, bounded};
use rankpool::scheduler::{Origin, Processor, find_assist};
use rankpool::{
    ProcessError, Producer, ProducerRegistry, Scheduler, SchedulerOpts, WorkItem,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn seeded(priority: i64, n: usize) -> Producer {
    let p = Producer::with_queue(priority).unwrap();
    for i in 1..=n {
        p.enqueue(WorkItem::new(
            format!("Producer {priority}"),
            format!("Message {i}"),
        ));
    }
    p
}

fn opts(delay_ms: u64) -> SchedulerOpts {
    SchedulerOpts::with_delay(Duration::from_millis(delay_ms))
}

fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn drain(rx: &Receiver<WorkItem>) -> Vec<WorkItem> {
    rx.try_iter().collect()
}

// --- allocation ---

#[test]
fn test_single_producer_drains_all_items() {
    let (tx, rx) = bounded(10);
    let p1 = seeded(1, 4);
    let scheduler = Scheduler::with_opts(vec![p1.clone()], tx, opts(20));
    assert!(scheduler.start().unwrap());

    assert!(wait_until(ms(2000), || rx.len() == 4));
    scheduler.stop();
    assert_eq!(p1.queue().len(), 0);
    assert_eq!(rx.len(), 4);
}

#[test]
fn test_higher_priority_producer_drains_first() {
    let (tx, rx) = bounded(10);
    let p1 = seeded(1, 4);
    let p4 = seeded(4, 4);
    let scheduler = Scheduler::with_opts(vec![p1.clone(), p4.clone()], tx, opts(300));
    scheduler.start().unwrap();

    thread::sleep(ms(150));
    scheduler.stop();
    assert_eq!(p4.queue().len(), 0);
    assert_eq!(p1.queue().len(), 3);

    // In-flight items still complete and are delivered after stop.
    assert!(wait_until(ms(2000), || rx.len() == 5));
    assert!(wait_until(ms(1000), || scheduler.active_workers() == 0));
    assert_eq!(p1.queue().len(), 3);
    assert_eq!(rx.len(), 5);
}

#[test]
fn test_four_producers_get_priority_many_workers() {
    let (tx, rx) = bounded(10);
    let producers: Vec<Producer> = (1..=4).map(|p| seeded(p, 4)).collect();
    let scheduler = Scheduler::with_opts(producers.clone(), tx, opts(300));
    scheduler.start().unwrap();

    thread::sleep(ms(150));
    scheduler.stop();
    let left: Vec<usize> = producers.iter().map(|p| p.queue().len()).collect();
    assert_eq!(left, vec![3, 2, 1, 0]);
    assert!(wait_until(ms(2000), || rx.len() == 10));
}

#[test]
fn test_duplicate_priorities_count_once() {
    let (tx, _rx) = bounded(10);
    let scheduler = Scheduler::new(
        vec![
            seeded(1, 0),
            Producer::with_queue(1).unwrap(),
            Producer::with_queue(1).unwrap(),
        ],
        tx,
    );
    assert_eq!(scheduler.producer_count(), 1);
}

#[test]
fn test_pool_size_caps_concurrent_workers() {
    let (tx, _rx) = bounded(10);
    let p4 = seeded(4, 8);
    let scheduler = Scheduler::with_opts(
        vec![p4.clone()],
        tx,
        SchedulerOpts {
            pool_size: 2,
            ..opts(300)
        },
    );
    assert_eq!(scheduler.pool_size(), 2);
    scheduler.start().unwrap();

    thread::sleep(ms(100));
    assert_eq!(scheduler.active_workers(), 2);
    assert_eq!(p4.queue().len(), 6);
    scheduler.stop();
}

// --- neighbor assist ---

#[test]
fn test_find_assist_prefers_nearest_higher() {
    let p1 = seeded(1, 1);
    let p2 = seeded(2, 0);
    let p3 = seeded(3, 1);
    let p4 = seeded(4, 1);
    let registry = ProducerRegistry::register(vec![p1.clone(), p2.clone(), p3, p4.clone()]);

    let assist = find_assist(&registry, &p2).unwrap();
    assert_eq!(assist.origin, Origin::Above);
    assert_eq!(assist.source_priority, 3);
    assert_eq!(assist.item.source_info(), "Producer 3");
    assert_eq!(p1.queue().len(), 1);
    assert_eq!(p4.queue().len(), 1);
}

#[test]
fn test_find_assist_skips_empty_higher_neighbor() {
    let p1 = seeded(1, 1);
    let p2 = seeded(2, 0);
    let p3 = seeded(3, 0);
    let p4 = seeded(4, 2);
    let registry = ProducerRegistry::register(vec![p1.clone(), p2.clone(), p3, p4.clone()]);

    let assist = find_assist(&registry, &p2).unwrap();
    assert_eq!(assist.origin, Origin::Above);
    assert_eq!(assist.source_priority, 4);
    assert_eq!(p4.queue().len(), 1);
    assert_eq!(p1.queue().len(), 1);
}

#[test]
fn test_find_assist_falls_back_to_lower() {
    let p1 = seeded(1, 2);
    let p2 = seeded(2, 0);
    let p3 = seeded(3, 1);
    let p4 = seeded(4, 0);
    let registry = ProducerRegistry::register(vec![p1.clone(), p2, p3, p4.clone()]);

    // Owner 4 has no higher neighbor, so only the downward walk runs.
    let assist = find_assist(&registry, &p4).unwrap();
    assert_eq!(assist.origin, Origin::Below);
    assert_eq!(assist.source_priority, 3);

    // Now 3 and 2 are empty; the walk continues down to 1.
    let assist = find_assist(&registry, &p4).unwrap();
    assert_eq!(assist.origin, Origin::Below);
    assert_eq!(assist.source_priority, 1);
    assert_eq!(p1.queue().len(), 1);
}

#[test]
fn test_find_assist_none_when_all_neighbors_empty() {
    let p1 = seeded(1, 0);
    let p2 = seeded(2, 3);
    let p3 = seeded(3, 0);
    let registry = ProducerRegistry::register(vec![p1, p2.clone(), p3]);
    assert!(find_assist(&registry, &p2).is_none());
    // Own queue is never searched.
    assert_eq!(p2.queue().len(), 3);
}

#[test]
fn test_help_enabled_drains_lower_neighbor() {
    let (tx, rx) = bounded(10);
    let p1 = seeded(1, 4);
    let p4 = seeded(4, 0);
    let scheduler = Scheduler::with_opts(vec![p1.clone(), p4.clone()], tx, opts(200));
    scheduler.start().unwrap();
    scheduler.set_help_enabled(true);
    assert!(scheduler.help_enabled());

    // Alone, producer 1 would still hold 3 items here.
    assert!(wait_until(ms(100), || p1.queue().is_empty()));
    assert!(wait_until(ms(2000), || scheduler.stats().delivered == 4));
    scheduler.stop();
    assert_eq!(rx.len(), 4);
    let stats = scheduler.stats();
    assert_eq!(stats.delivered, 4);
    // Producer 1's own worker takes at most one before the helpers clear the rest.
    assert!(stats.assisted_down >= 3);
    assert_eq!(stats.assisted_up, 0);
}

#[test]
fn test_help_enabled_drains_higher_neighbor() {
    let (tx, rx) = bounded(10);
    let p1 = seeded(1, 0);
    let p4 = seeded(4, 5);
    let scheduler = Scheduler::with_opts(vec![p1.clone(), p4.clone()], tx, opts(150));
    scheduler.set_help_enabled(true);
    scheduler.start().unwrap();

    assert!(wait_until(ms(100), || p4.queue().is_empty()));
    scheduler.stop();
    assert!(wait_until(ms(2000), || scheduler.stats().delivered == 5));
    assert_eq!(rx.len(), 5);
    assert_eq!(scheduler.stats().assisted_up, 1);
}

#[test]
fn test_help_takes_from_higher_before_lower() {
    let (tx, rx) = bounded(20);
    let p1 = seeded(1, 5);
    let p2 = seeded(2, 0);
    let p3 = seeded(3, 5);
    let scheduler = Scheduler::with_opts(
        vec![p1.clone(), p2, p3.clone()],
        tx,
        SchedulerOpts {
            help_enabled: true,
            ..opts(300)
        },
    );
    scheduler.start().unwrap();

    // Producer 3's three workers plus producer 2's two helpers take all five of 3's items;
    // producer 1 only loses the one its own worker took.
    thread::sleep(ms(100));
    assert_eq!(p3.queue().len(), 0);
    assert_eq!(p1.queue().len(), 4);

    scheduler.stop();
    assert!(wait_until(ms(2000), || scheduler.stats().delivered == 6));
    assert_eq!(rx.len(), 6);
    let stats = scheduler.stats();
    assert_eq!(stats.assisted_up, 2);
    assert_eq!(stats.assisted_down, 0);
    assert_eq!(stats.by_source.get(&3), Some(&5));
}

#[test]
fn test_help_disabled_leaves_neighbor_alone() {
    let (tx, _rx) = bounded(10);
    let p1 = seeded(1, 4);
    let p4 = seeded(4, 0);
    let scheduler = Scheduler::with_opts(vec![p1.clone(), p4], tx, opts(200));
    scheduler.set_help_enabled(true);
    scheduler.set_help_disabled();
    scheduler.start().unwrap();

    thread::sleep(ms(100));
    assert_eq!(p1.queue().len(), 3);
    scheduler.stop();
}

// --- backpressure ---

#[test]
fn test_full_output_blocks_all_dequeues() {
    let (tx, rx) = bounded(3);
    let p1 = seeded(1, 20);
    let p4 = seeded(4, 20);
    let scheduler = Scheduler::with_opts(
        vec![p1, p4],
        tx,
        SchedulerOpts {
            help_enabled: true,
            ..opts(0)
        },
    );
    scheduler.start().unwrap();

    // 3 items sit in the channel and each of the 5 workers holds one blocked send.
    assert!(wait_until(ms(2000), || scheduler.registry().pending() == 32));
    thread::sleep(ms(100));
    assert_eq!(rx.len(), 3);
    assert_eq!(scheduler.registry().pending(), 32);

    // Freeing capacity lets exactly that many more items through.
    let got = (0..3).map(|_| rx.recv().unwrap()).count();
    assert_eq!(got, 3);
    assert!(wait_until(ms(2000), || scheduler.registry().pending() == 29));
    thread::sleep(ms(100));
    assert_eq!(rx.len(), 3);
    assert_eq!(scheduler.registry().pending(), 29);

    scheduler.stop();
    drop(rx);
}

#[test]
fn test_channel_never_exceeds_bound() {
    let (tx, rx) = bounded(2);
    let p4 = seeded(4, 40);
    let scheduler = Scheduler::with_opts(vec![p4.clone()], tx, opts(1));
    scheduler.start().unwrap();

    let mut received = 0;
    while received < 40 {
        assert!(rx.len() <= 2);
        if rx.recv_timeout(ms(2000)).is_ok() {
            received += 1;
        } else {
            break;
        }
    }
    assert_eq!(received, 40);
    assert!(p4.queue().is_empty());
    scheduler.stop();
}

// --- stop / restart ---

#[test]
fn test_stop_and_start_are_idempotent() {
    let (tx, _rx) = bounded(10);
    let scheduler = Scheduler::with_opts(vec![seeded(2, 0)], tx, opts(10));
    assert!(!scheduler.is_running());
    assert!(!scheduler.stop());

    assert!(scheduler.start().unwrap());
    assert!(!scheduler.start().unwrap());
    assert!(scheduler.is_running());

    assert!(scheduler.stop());
    assert!(!scheduler.stop());
    assert!(!scheduler.is_running());
    assert!(wait_until(ms(1000), || scheduler.active_workers() == 0));
}

#[test]
fn test_restart_resumes_remaining_items() {
    let (tx, rx) = bounded(10);
    let p1 = seeded(1, 6);
    let scheduler = Scheduler::with_opts(vec![p1.clone()], tx, opts(100));
    scheduler.start().unwrap();

    thread::sleep(ms(150));
    scheduler.stop();
    assert!(wait_until(ms(1000), || scheduler.active_workers() == 0));
    assert_eq!(p1.queue().len(), 4);
    assert_eq!(rx.len(), 2);

    thread::sleep(ms(150));
    assert_eq!(p1.queue().len(), 4);

    assert!(scheduler.start().unwrap());
    assert!(wait_until(ms(3000), || rx.len() == 6));
    assert!(p1.queue().is_empty());
    scheduler.stop();
}

#[test]
fn test_quick_restart_retires_previous_workers() {
    let (tx, _rx) = bounded(10);
    let p1 = seeded(1, 10);
    let scheduler = Scheduler::with_opts(vec![p1], tx, opts(200));
    scheduler.start().unwrap();
    thread::sleep(ms(50));

    // Old worker is mid-item; it must not keep running alongside the new one.
    scheduler.stop();
    scheduler.start().unwrap();
    assert!(wait_until(ms(500), || scheduler.active_workers() == 2));
    thread::sleep(ms(300));
    assert_eq!(scheduler.active_workers(), 1);
    scheduler.stop();
}

#[test]
fn test_shutdown_joins_pool() {
    let (tx, rx) = bounded(10);
    let p2 = seeded(2, 4);
    let scheduler = Scheduler::with_opts(vec![p2.clone()], tx, opts(10));
    scheduler.start().unwrap();
    assert!(wait_until(ms(2000), || rx.len() == 4));
    scheduler.shutdown().unwrap();
    // Scheduler and its workers are gone, so the channel is disconnected once drained.
    assert_eq!(drain(&rx).len(), 4);
    assert!(rx.recv().is_err());
}

// --- errors ---

#[test]
fn test_closed_output_ends_worker() {
    let (tx, rx) = bounded(10);
    drop(rx);
    let p1 = seeded(1, 3);
    let scheduler = Scheduler::with_opts(vec![p1.clone()], tx, opts(0));
    scheduler.start().unwrap();

    // First item is taken and lost on the failed send; the worker stops there.
    assert!(wait_until(ms(1000), || p1.queue().len() == 2
        && scheduler.active_workers() == 0));
    thread::sleep(ms(50));
    assert_eq!(p1.queue().len(), 2);
    assert_eq!(scheduler.stats().delivered, 0);
}

#[test]
fn test_failed_item_is_dropped_and_worker_continues() {
    let (tx, rx) = bounded(10);
    let p1 = seeded(1, 4);
    let flaky: Arc<dyn Processor> =
        Arc::new(|item: WorkItem| -> Result<WorkItem, ProcessError> {
            if item.item_id() == "Message 1" {
                return Err(ProcessError::Failed("bad input".to_string()));
            }
            Ok(item)
        });
    let scheduler =
        Scheduler::with_processor(vec![p1.clone()], tx, SchedulerOpts::default(), flaky);
    scheduler.start().unwrap();

    assert!(wait_until(ms(2000), || scheduler.stats().delivered == 3));
    assert!(scheduler.is_running());
    assert_eq!(scheduler.active_workers(), 1);
    assert!(p1.queue().is_empty());
    assert_eq!(scheduler.stats().failed, 1);
    let ids: Vec<String> = drain(&rx)
        .iter()
        .map(|item| item.item_id().to_string())
        .collect();
    assert_eq!(ids, vec!["Message 2", "Message 3", "Message 4"]);

    // Still serving after the failure.
    p1.enqueue(WorkItem::new("Producer 1", "Message 5"));
    let late = rx.recv_timeout(ms(2000)).unwrap();
    assert_eq!(late.item_id(), "Message 5");
    scheduler.stop();
}

#[test]
fn test_cancelled_processing_ends_worker() {
    let (tx, rx) = bounded(10);
    let p1 = seeded(1, 3);
    let cancelling: Arc<dyn Processor> =
        Arc::new(|_item: WorkItem| -> Result<WorkItem, ProcessError> {
            Err(ProcessError::Cancelled("shutting down".to_string()))
        });
    let scheduler =
        Scheduler::with_processor(vec![p1.clone()], tx, SchedulerOpts::default(), cancelling);
    scheduler.start().unwrap();

    assert!(wait_until(ms(1000), || p1.queue().len() == 2
        && scheduler.active_workers() == 0));
    thread::sleep(ms(50));
    assert_eq!(p1.queue().len(), 2);
    assert!(rx.is_empty());
    assert_eq!(scheduler.stats().failed, 0);
    scheduler.stop();
}

#[test]
fn test_custom_processor_output_is_delivered() {
    let (tx, rx) = bounded(10);
    let p3 = seeded(3, 2);
    let upper: Arc<dyn Processor> =
        Arc::new(|item: WorkItem| -> Result<WorkItem, ProcessError> {
            Ok(WorkItem::with_payload(
                item.source_info(),
                item.item_id(),
                item.payload().to_uppercase(),
            ))
        });
    let scheduler = Scheduler::with_processor(vec![p3], tx, SchedulerOpts::default(), upper);
    scheduler.start().unwrap();

    let a = rx.recv_timeout(ms(2000)).unwrap();
    let b = rx.recv_timeout(ms(2000)).unwrap();
    scheduler.stop();
    for item in [a, b] {
        assert_eq!(item.source_info(), "Producer 3");
        assert_eq!(item.payload(), item.payload().to_uppercase());
    }
}

// --- volume ---

#[test]
fn test_bulk_load_delivers_every_item() {
    const PER_PRODUCER: usize = 1000;
    let (tx, rx) = bounded(10);
    let producers: Vec<Producer> = (1..=4).map(|p| seeded(p, PER_PRODUCER)).collect();
    let scheduler = Scheduler::with_opts(
        producers.clone(),
        tx,
        SchedulerOpts {
            help_enabled: true,
            ..opts(1)
        },
    );
    scheduler.start().unwrap();

    let total = PER_PRODUCER * producers.len();
    let mut per_source = std::collections::BTreeMap::<String, usize>::new();
    for _ in 0..total {
        let item = rx.recv_timeout(ms(10_000)).unwrap();
        *per_source.entry(item.source_info().to_string()).or_insert(0) += 1;
    }
    scheduler.stop();

    assert!(producers.iter().all(|p| p.queue().is_empty()));
    for p in 1..=4 {
        assert_eq!(per_source.get(&format!("Producer {p}")), Some(&PER_PRODUCER));
    }
    assert!(wait_until(ms(2000), || scheduler.stats().delivered == total as u64));
    scheduler.shutdown().unwrap();
    assert!(rx.try_recv().is_err());
}
