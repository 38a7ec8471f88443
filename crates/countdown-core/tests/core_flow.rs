use countdown_core::cli::Invocation;
use countdown_core::commands::dispatch;
use countdown_core::config::Config;
use countdown_core::countdown::{Countdown, CountdownConfig};
use countdown_core::datastore::DataStore;
use countdown_core::day::{CalendarDay, FixedClock, days_between};
use countdown_core::error::CountdownError;
use countdown_core::render::{EnglishDates, Renderer};
use countdown_core::store::{
    CountdownStateStore, DEFAULT_START_KEY, KeyValueStore, MemoryStore, StorageKeys,
};
use tempfile::tempdir;

fn day(y: i32, m: u32, d: u32) -> CalendarDay {
    CalendarDay::from_ymd(y, m, d).expect("valid date")
}

fn invocation(command: &str, args: &[&str]) -> Invocation {
    Invocation {
        command: command.to_string(),
        command_args: args.iter().map(|arg| arg.to_string()).collect(),
    }
}

fn run_command<S: KeyValueStore>(
    state: &mut CountdownStateStore<S>,
    today: CalendarDay,
    command: &str,
    args: &[&str],
) -> anyhow::Result<String> {
    let cfg = Config::default();
    let renderer = Renderer::plain("graduation", Box::new(EnglishDates));
    let mut out = Vec::new();
    dispatch(
        state,
        &cfg,
        &renderer,
        invocation(command, args),
        &FixedClock(today),
        &mut out,
    )?;
    Ok(String::from_utf8(out).expect("utf8 output"))
}

#[test]
fn first_run_bootstraps_start_and_builds_grid() {
    let temp = tempdir().expect("tempdir");
    let datastore = DataStore::open(temp.path()).expect("open datastore");
    let mut state = CountdownStateStore::open(datastore, StorageKeys::default());

    let today = day(2025, 1, 10);
    let deadline = day(2027, 6, 1);
    let config = CountdownConfig::bootstrap(&mut state, today, deadline);
    assert_eq!(config.start, today);
    assert_eq!(
        state
            .backend()
            .get(DEFAULT_START_KEY)
            .expect("read start")
            .as_deref(),
        Some("2025-01-10")
    );

    let countdown = Countdown::new(config);
    assert_eq!(countdown.box_count() as i64, days_between(today, deadline));
    assert_eq!(countdown.grid().first_day(), Some(day(2025, 1, 6)));
    assert_eq!(countdown.grid().last_day(), Some(day(2027, 6, 6)));
    assert!(
        countdown
            .grid()
            .weeks()
            .iter()
            .all(|week| week.cells().len() == 7)
    );

    countdown
        .edit_notes(&mut state, today, &["- buy cap\n", "* gown  ", "\n"].concat())
        .expect("edit notes");
    assert_eq!(
        state.notes().get(&today.key()),
        ["buy cap".to_string(), "gown".to_string()]
    );

    // A later session on a new day keeps the original start and notes.
    let datastore = DataStore::open(temp.path()).expect("reopen datastore");
    let mut state = CountdownStateStore::open(datastore, StorageKeys::default());
    let config = CountdownConfig::bootstrap(&mut state, day(2025, 4, 2), deadline);
    assert_eq!(config.start, today);
    assert_eq!(state.notes().count(&today.key()), 2);
}

#[test]
fn start_after_deadline_is_recomputed() {
    let backend = MemoryStore::new().with_entry(DEFAULT_START_KEY, "2027-09-01");
    let mut state = CountdownStateStore::open(backend, StorageKeys::default());

    let config = CountdownConfig::bootstrap(&mut state, day(2025, 1, 10), day(2027, 6, 1));
    assert_eq!(config.start, day(2025, 1, 10));
    assert_eq!(
        state
            .backend()
            .get(DEFAULT_START_KEY)
            .expect("read start")
            .as_deref(),
        Some("2025-01-10")
    );
}

#[test]
fn corrupt_persisted_state_degrades_to_defaults() {
    let backend = MemoryStore::new()
        .with_entry(DEFAULT_START_KEY, "tomorrow-ish")
        .with_entry("graduation-day-notes", "{\"2025-01-10\": ");
    let mut state = CountdownStateStore::open(backend, StorageKeys::default());

    assert!(state.notes().is_empty());
    let output = run_command(&mut state, day(2025, 1, 10), "show", &[]).expect("show");
    assert!(output.starts_with("872 days left until graduation\n"), "{output}");
}

#[test]
fn commands_edit_export_and_clear_notes() {
    let mut state = CountdownStateStore::open(MemoryStore::new(), StorageKeys::default());
    let today = day(2025, 1, 10);

    let output = run_command(&mut state, today, "edit", &["today", "- buy cap", "* gown  "])
        .expect("edit");
    assert_eq!(output, "10 January 2025\n• buy cap\n• gown\n");

    let output = run_command(&mut state, today, "export", &[]).expect("export");
    let exported: serde_json::Value = serde_json::from_str(&output).expect("export is JSON");
    assert_eq!(exported, serde_json::json!({ "2025-01-10": ["buy cap", "gown"] }));

    let output = run_command(&mut state, day(2025, 1, 12), "list", &[]).expect("list");
    let lines: Vec<&str> = output.lines().collect();
    assert!(lines[2].starts_with("2025-01-10 Friday    level-2"), "{output}");
    assert!(lines[3].starts_with("2025-01-11 Saturday  dead"), "{output}");
    assert!(lines[4].starts_with("2025-01-12 Sunday    future today"), "{output}");

    let output = run_command(&mut state, today, "clear", &["2025-01-10"]).expect("clear");
    assert_eq!(output, "Cleared notes for 2025-01-10.\n");
    assert!(state.notes().is_empty());

    let err = run_command(&mut state, today, "edit", &["2027-06-01", "party"])
        .expect_err("deadline is not an active day");
    assert!(matches!(
        err.downcast_ref::<CountdownError>(),
        Some(CountdownError::OutOfRange { .. })
    ));
}

#[test]
fn watch_renders_requested_ticks() {
    let mut state = CountdownStateStore::open(MemoryStore::new(), StorageKeys::default());
    let output = run_command(&mut state, day(2027, 6, 1), "watch", &["--ticks", "1"])
        .expect("watch");
    assert!(output.starts_with("The graduation day has arrived!"), "{output}");
    assert!(output.contains("(no days left to count)"), "{output}");
}
