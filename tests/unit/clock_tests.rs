//! Unit tests for the timestamp clocks.

use bifrost::clock::{Clock, ManualClock, SystemClock, UptimeClock};

#[test]
fn manual_clock_reports_set_and_advanced_values() {
    let clock = ManualClock::new(100);
    assert_eq!(clock.now_millis(), 100);

    clock.advance(25);
    assert_eq!(clock.now_millis(), 125);

    clock.set(7);
    assert_eq!(clock.now_millis(), 7);
}

#[test]
fn uptime_clock_is_monotonic() {
    let clock = UptimeClock::new();
    let first = clock.now_millis();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = clock.now_millis();

    assert!(second >= first + 5, "{second} must be at least {first} + 5");
}

#[test]
fn system_clock_is_epoch_based() {
    // 2020-09-13T12:26:40Z
    assert!(SystemClock.now_millis() > 1_600_000_000_000);
}

#[test]
fn clocks_work_behind_references_and_boxes() {
    let clock = ManualClock::new(3);
    let by_ref: &dyn Clock = &clock;
    let boxed: Box<dyn Clock> = Box::new(ManualClock::new(4));

    assert_eq!((&by_ref).now_millis(), 3);
    assert_eq!(boxed.now_millis(), 4);
}
