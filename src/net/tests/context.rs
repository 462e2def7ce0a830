use crate::net::NetworkContext;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn posted_tasks_run_in_submission_order() {
    let mut ctx = NetworkContext::new().unwrap();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    for i in 0..5 {
        let order = order.clone();
        ctx.post(async move {
            order.lock().unwrap().push(i);
        });
    }
    ctx.poll_one();
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn poll_one_drains_tasks_posted_from_within_a_running_task() {
    let mut ctx = NetworkContext::new().unwrap();
    let handle = ctx.handle();
    let count = Arc::new(AtomicUsize::new(0));
    let inner_count = count.clone();
    ctx.post(async move {
        inner_count.fetch_add(1, Ordering::SeqCst);
        handle.post(async move {
            inner_count.fetch_add(1, Ordering::SeqCst);
        });
    });
    ctx.poll_one();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn handle_post_is_usable_from_another_thread() {
    let mut ctx = NetworkContext::new().unwrap();
    let handle = ctx.handle();
    let count = Arc::new(AtomicUsize::new(0));
    let thread_count = count.clone();
    let worker = std::thread::spawn(move || {
        handle.post(async move {
            thread_count.fetch_add(1, Ordering::SeqCst);
        });
    });
    worker.join().unwrap();
    ctx.poll_one();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
