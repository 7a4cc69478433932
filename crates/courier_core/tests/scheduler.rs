use courier_core::{
    Clock, ManualClock, MutationBatch, MutationClassifier, RescanScheduler, ScanPlan,
    ScheduleConfig,
};
use pretty_assertions::assert_eq;

/// Startup and periodic scans pushed far out so only mutation timers fire.
fn quiet_config() -> ScheduleConfig {
    ScheduleConfig {
        initial_scan_ms: 1_000_000,
        second_scan_ms: 1_000_000,
        periodic_ms: 1_000_000,
        ..ScheduleConfig::default()
    }
}

fn attachment_batch() -> MutationBatch {
    MutationBatch::from_classes(["aQH a0Y"])
}

fn list_batch() -> MutationBatch {
    MutationBatch::from_classes(["zA yO x7"])
}

#[test]
fn mutations_are_classified_by_class_fragment() {
    let classifier = MutationClassifier::default();

    let class = classifier.classify(&attachment_batch());
    assert!(class.attachments);
    assert!(!class.list_rows);

    let class = classifier.classify(&list_batch());
    assert!(!class.attachments);
    assert!(class.list_rows);

    let class = classifier.classify(&MutationBatch::from_classes(["ii gt adP"]));
    assert!(class.attachments);

    // Token match, not substring: "zAx" is not a list row.
    let class = classifier.classify(&MutationBatch::from_classes(["zAx"]));
    assert!(!class.list_rows);
}

#[test]
fn two_mutations_inside_debounce_window_run_one_scan() {
    let clock = ManualClock::new(0);
    let mut scheduler =
        RescanScheduler::new(quiet_config(), MutationClassifier::default(), clock.now_ms());

    scheduler.on_mutations(&attachment_batch(), clock.now_ms());
    clock.advance(300);
    scheduler.on_mutations(&attachment_batch(), clock.now_ms());

    // The first deadline (500) was replaced by 800.
    clock.set(600);
    assert!(scheduler.poll(clock.now_ms()).is_empty());

    let mut scans = 0;
    for _ in 0..20 {
        clock.advance(100);
        if scheduler.poll(clock.now_ms()).attachments {
            scans += 1;
        }
    }
    assert_eq!(scans, 1);
}

#[test]
fn classes_have_independent_timers_with_distinct_delays() {
    let config = quiet_config();
    let mut scheduler = RescanScheduler::new(config.clone(), MutationClassifier::default(), 0);

    scheduler.on_mutations(&attachment_batch(), 0);
    scheduler.on_mutations(&list_batch(), 0);

    assert_eq!(scheduler.next_deadline(), config.attachment_debounce_ms);
    assert_eq!(
        scheduler.poll(config.attachment_debounce_ms),
        ScanPlan {
            attachments: true,
            list_view: false,
            navigated: false
        }
    );
    assert_eq!(scheduler.next_deadline(), config.list_debounce_ms);
    assert_eq!(
        scheduler.poll(config.list_debounce_ms),
        ScanPlan {
            attachments: false,
            list_view: true,
            navigated: false
        }
    );
}

#[test]
fn startup_runs_two_delayed_full_scans_then_periodic() {
    let config = ScheduleConfig::default();
    let mut scheduler = RescanScheduler::new(config.clone(), MutationClassifier::default(), 0);

    assert!(scheduler.poll(config.initial_scan_ms - 1).is_empty());
    let first = scheduler.poll(config.initial_scan_ms);
    assert!(first.attachments && first.list_view && !first.navigated);

    assert!(scheduler.poll(config.second_scan_ms - 1).is_empty());
    assert!(scheduler.poll(config.second_scan_ms).attachments);

    assert_eq!(scheduler.next_deadline(), config.periodic_ms);
    assert!(scheduler.poll(config.periodic_ms).attachments);
    assert_eq!(scheduler.next_deadline(), 2 * config.periodic_ms);
}

#[test]
fn fragment_change_triggers_navigation_scan_after_settle_delay() {
    let config = quiet_config();
    let mut scheduler = RescanScheduler::new(config.clone(), MutationClassifier::default(), 0);
    scheduler.start_at("https://mail.example.com/mail/u/0/#inbox");

    assert!(!scheduler.on_location("https://mail.example.com/mail/u/0/#inbox", 10));
    assert!(scheduler.on_location(
        "https://mail.example.com/mail/u/0/#inbox/FMfcgzQXJWRtbDpxSwZt",
        100
    ));

    assert!(scheduler.poll(100 + config.navigation_settle_ms - 1).is_empty());
    let plan = scheduler.poll(100 + config.navigation_settle_ms);
    assert!(plan.navigated);
    assert!(plan.attachments && plan.list_view);
}
