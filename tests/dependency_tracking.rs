//! Dynamic dependency discovery and re-subscription.

use spark_reactive::{
    batch, computed, observable, subscribe, tracking_depth, untrack, Computed, ComputedState,
    Observable, ReactiveError,
};
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

fn recorder<T: Clone + 'static>(source: &Computed<T>) -> Rc<RefCell<Vec<(T, T)>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    // Dropping a Listener handle does not unsubscribe
    source.subscribe(move |new, old| l.borrow_mut().push((new.clone(), old.clone())));
    log
}

#[test]
fn doubling_emits_once_per_distinct_value() {
    let x = observable(1);
    let y = computed!(x => x.get() * 2);
    let log = recorder(&y);

    x.set(3);
    x.set(3);
    assert_eq!(*log.borrow(), vec![(6, 2)]);
}

#[test]
fn switching_a_flag_drops_the_unused_branch() {
    let use_a = observable(true);
    let a = observable(1);
    let b = observable(2);
    let runs = Rc::new(Cell::new(0));

    let r = runs.clone();
    let pick = computed!(use_a, a, b => {
        r.set(r.get() + 1);
        if use_a.get() { a.get() } else { b.get() }
    });
    assert_eq!(runs.get(), 1);

    // b is not read yet
    b.set(20);
    assert_eq!(runs.get(), 1);

    use_a.set(false);
    assert_eq!(pick.get(), 20);
    assert_eq!(runs.get(), 2);

    // a is no longer read
    a.set(10);
    assert_eq!(runs.get(), 2);
    assert!(!a.has_listeners());

    use_a.set(true);
    assert_eq!(pick.get(), 10);
    assert!(a.has_listeners());
    assert!(!b.has_listeners());
}

#[test]
fn stable_dependencies_keep_their_subscription() {
    let a = observable(1);
    let b = observable(1);
    let changes = Rc::new(RefCell::new(Vec::new()));

    let c = changes.clone();
    a.set_listener_change_callback(move |has| c.borrow_mut().push(has));

    let sum = computed!(a, b => a.get() + b.get());
    b.set(2);
    b.set(3);
    assert_eq!(sum.get(), 4);

    // Subscribed once, never churned
    assert_eq!(*changes.borrow(), vec![true]);
}

#[test]
fn subscription_order_follows_first_read() {
    let a = observable(1);
    let b = observable(2);
    let flip = observable(false);

    let c = computed!(a, b, flip => {
        if flip.get() { b.get() + a.get() } else { a.get() + b.get() }
    });
    assert_eq!(c.dependency_count(), 3);

    flip.set(true);
    assert_eq!(c.dependency_count(), 3);
    assert_eq!(c.get(), 3);
}

#[test]
fn nested_evaluation_keeps_frames_separate() {
    let outer_src = observable(1);
    let inner_src = observable(10);

    // Built inside another computed's evaluation
    let holder: Rc<RefCell<Option<Computed<i32>>>> = Rc::new(RefCell::new(None));
    let h = holder.clone();
    let outer = computed!(outer_src, inner_src => {
        let inner = computed!(inner_src => inner_src.get() + 1);
        let value = outer_src.get() + inner.get();
        *h.borrow_mut() = Some(inner);
        value
    });

    assert_eq!(outer.get(), 12);
    // outer read outer_src and the inner computed, not inner_src itself
    assert_eq!(outer.dependency_count(), 2);
    assert_eq!(tracking_depth(), 0);
}

#[test]
fn untracked_reads_are_not_dependencies() {
    let tracked = observable(1);
    let ignored = observable(100);
    let c = computed!(tracked, ignored => tracked.get() + untrack(|| ignored.get()));

    ignored.set(200);
    assert_eq!(c.get(), 101);
    assert_eq!(c.evaluation_count(), 1);

    tracked.set(2);
    assert_eq!(c.get(), 202);
}

#[test]
fn diamond_without_and_with_batch() {
    let a = observable(1);
    let b = observable(1);
    let sum = computed!(a, b => a.get() + b.get());

    a.set(2);
    b.set(2);
    assert_eq!(sum.evaluation_count(), 3);

    batch(|| {
        a.set(3);
        b.set(3);
        assert_eq!(sum.state(), ComputedState::Stale);
    });
    assert_eq!(sum.evaluation_count(), 4);
    assert_eq!(sum.get(), 6);
}

#[test]
fn listener_setting_another_observable_nests() {
    let a = observable(1);
    let b = observable(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    let (b2, l) = (b.clone(), log.clone());
    let _forward = a.subscribe(move |new, _| {
        l.borrow_mut().push("a-listener start");
        b2.set(*new * 100);
        l.borrow_mut().push("a-listener end");
    });
    let l = log.clone();
    let _on_b = subscribe(&b, move || l.borrow_mut().push("b changed"));

    a.set(2);
    assert_eq!(
        *log.borrow(),
        vec!["a-listener start", "b changed", "a-listener end"]
    );
}

#[test]
fn failing_compute_propagates_and_keeps_state() {
    let divisor = observable(2);
    let quotient = computed!(divisor => {
        let d = divisor.get();
        if d == 0 {
            panic!("division by zero");
        }
        100 / d
    });
    let later_listener_ran = Rc::new(Cell::new(false));
    let flag = later_listener_ran.clone();
    let _later = divisor.subscribe(move |_, _| flag.set(true));

    let result = catch_unwind(AssertUnwindSafe(|| divisor.set(0)));
    assert!(result.is_err());
    assert_eq!(quotient.peek(), 50);
    assert_eq!(quotient.dependency_count(), 1);
    // The failure aborted the emission before the later listener
    assert!(!later_listener_ran.get());
    assert_eq!(tracking_depth(), 0);

    divisor.set(4);
    assert_eq!(quotient.get(), 25);
}

#[test]
fn self_write_is_reported_as_a_cycle() {
    let n: Observable<i32> = observable(0);
    let c = computed!(n => {
        let v = n.get();
        if v == 1 {
            n.set(2);
        }
        v
    });

    let payload = catch_unwind(AssertUnwindSafe(|| n.set(1))).unwrap_err();
    assert_eq!(
        payload.downcast_ref::<ReactiveError>(),
        Some(&ReactiveError::CyclicEvaluation)
    );
    assert_eq!(c.peek(), 0);

    // Not stuck in the evaluating state
    n.set(5);
    assert_eq!(c.get(), 5);
}

#[test]
fn two_way_computed() {
    let first = observable(String::from("Ada"));
    let last = observable(String::from("Lovelace"));

    let full = Computed::writable(
        {
            let (first, last) = (first.clone(), last.clone());
            move || format!("{} {}", first.get(), last.get())
        },
        {
            let (first, last) = (first.clone(), last.clone());
            move |value: String| {
                let mut parts = value.splitn(2, ' ');
                first.set(parts.next().unwrap_or_default().to_string());
                last.set(parts.next().unwrap_or_default().to_string());
            }
        },
    );

    full.set(String::from("Grace Hopper")).unwrap();
    assert_eq!(first.get(), "Grace");
    assert_eq!(last.get(), "Hopper");
    assert_eq!(full.get(), "Grace Hopper");
}
