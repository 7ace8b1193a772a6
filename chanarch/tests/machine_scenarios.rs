use chanarch::machine::{Action, Event, Retrieval, State};
use chanarch_core::{
    ChanError, ChannelStatus, Quality, RunConfig, Sample, SamplingMode, TimeZoneMode,
};
use chrono::{DateTime, Utc};

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn sample(secs: i64, value: f64) -> Sample {
    Sample {
        ts: ts(secs),
        value,
        valid: true,
        quality: Quality::Good,
    }
}

fn cfg(mode: SamplingMode, fixed: Option<f64>, end_secs: i64) -> RunConfig {
    RunConfig {
        zone: TimeZoneMode::Utc,
        mode,
        fixed_interval: fixed,
        output_path: "report.txt".into(),
        global_start: ts(0),
        global_end: ts(end_secs),
    }
}

fn tick(machine: Retrieval, ready: bool) -> (Retrieval, Vec<Action>) {
    machine.handle(Event::Tick {
        archiver_ready: ready,
    })
}

/// Step ticks (archiver ready) until the machine asks for a page.
fn drive_to_request(mut machine: Retrieval) -> (Retrieval, Action) {
    for _ in 0..1_000 {
        let (next, mut actions) = tick(machine, true);
        machine = next;
        if let Some(pos) = actions
            .iter()
            .position(|a| matches!(a, Action::RequestPage { .. }))
        {
            return (machine, actions.swap_remove(pos));
        }
        assert!(
            actions.is_empty(),
            "unexpected actions before first request: {actions:?}"
        );
    }
    panic!("machine never issued a page request");
}

fn deliver(machine: Retrieval, okay: bool, samples: Vec<Sample>) -> (Retrieval, Vec<Action>) {
    machine.handle(Event::Page {
        okay,
        samples,
        diagnostic: String::new(),
    })
}

#[test]
fn three_pages_reconcile_into_one_series() {
    let machine = Retrieval::new(cfg(SamplingMode::Raw, None, 100), vec!["sim://x".into()]);

    let (machine, _req) = drive_to_request(machine);
    let (machine, _) = deliver(machine, true, vec![sample(10, 1.0), sample(30, 2.0)]);
    assert_eq!(machine.state, State::SendPage);
    assert_eq!(machine.cursor, ts(30));

    let (machine, _req) = drive_to_request(machine);
    let (machine, _) = deliver(machine, true, vec![sample(50, 3.0), sample(70, 4.0)]);
    assert_eq!(machine.cursor, ts(70));

    let (machine, _req) = drive_to_request(machine);
    // Final page ends exactly at the window end: channel complete.
    let (machine, _) = deliver(machine, true, vec![sample(100, 5.0)]);

    assert_eq!(machine.state, State::Finalize);
    let channel = &machine.channels[0];
    assert_eq!(channel.status, ChannelStatus::Okay);
    assert_eq!(channel.page_count, 3);
    assert_eq!(channel.series.len(), 5);
    for pair in channel.series.windows(2) {
        assert!(pair[0].ts < pair[1].ts);
    }
}

#[test]
fn overlapping_second_page_is_deduplicated() {
    let machine = Retrieval::new(cfg(SamplingMode::Raw, None, 200), vec!["sim://x".into()]);

    let (machine, _req) = drive_to_request(machine);
    let (machine, _) = deliver(
        machine,
        true,
        vec![sample(10, 1.0), sample(20, 2.0), sample(30, 3.0)],
    );

    let (machine, _req) = drive_to_request(machine);
    // First two samples repeat the accumulated tail.
    let (machine, _) = deliver(
        machine,
        true,
        vec![sample(20, 9.0), sample(30, 9.0), sample(40, 4.0), sample(200, 5.0)],
    );

    let channel = &machine.channels[0];
    assert_eq!(channel.series.len(), 3 + 4 - 2);
    assert_eq!(channel.series[1].value, 2.0);
    assert_eq!(channel.series[2].value, 3.0);
}

#[test]
fn page_without_forward_progress_force_completes() {
    let machine = Retrieval::new(cfg(SamplingMode::Raw, None, 1_000), vec!["sim://x".into()]);

    let (machine, _req) = drive_to_request(machine);
    let (machine, _) = deliver(machine, true, vec![sample(10, 1.0), sample(30, 2.0)]);
    assert_eq!(machine.state, State::SendPage);

    let (machine, _req) = drive_to_request(machine);
    // Data arrives but the last timestamp does not advance past the cursor.
    let (machine, _) = deliver(machine, true, vec![sample(30, 2.0)]);

    assert_eq!(machine.state, State::Finalize);
    assert_eq!(machine.channels[0].status, ChannelStatus::Okay);
}

#[test]
fn failed_channel_is_not_fatal_to_the_run() {
    let machine = Retrieval::new(
        cfg(SamplingMode::Linear, Some(1.0), 10),
        vec!["sim://bad".into(), "sim://good".into()],
    );

    let (machine, req) = drive_to_request(machine);
    match req {
        Action::RequestPage { ref name, .. } => assert_eq!(name, "sim://bad"),
        other => panic!("expected page request, got {other:?}"),
    }
    let (machine, _) = deliver(machine, false, Vec::new());
    assert_eq!(machine.channels[0].status, ChannelStatus::Failed);
    assert_eq!(machine.state, State::BeginChannel);

    let (machine, _req) = drive_to_request(machine);
    let (mut machine, _) = deliver(machine, true, vec![sample(2, 7.0)]);
    assert_eq!(machine.channels[1].status, ChannelStatus::Okay);
    assert_eq!(machine.state, State::Finalize);

    // Finalize emits the report, then the machine settles in Done.
    let (next, actions) = tick(machine, true);
    machine = next;
    assert!(matches!(actions.as_slice(), [Action::WriteReport]));
    let (machine, actions) = tick(machine, true);
    assert!(matches!(actions.as_slice(), [Action::Finished]));
    assert_eq!(machine.state, State::Done);
}

#[test]
fn empty_first_page_fails_the_channel_with_empty_output() {
    let machine = Retrieval::new(cfg(SamplingMode::Linear, None, 10), vec!["sim://x".into()]);

    let (machine, _req) = drive_to_request(machine);
    let (machine, _) = deliver(machine, true, Vec::new());

    assert_eq!(machine.channels[0].status, ChannelStatus::Failed);
    assert!(machine.channels[0].series.is_empty());
    assert_eq!(machine.state, State::Finalize);
}

#[test]
fn multi_channel_fixed_grids_align_at_window_start() {
    let machine = Retrieval::new(
        cfg(SamplingMode::Linear, Some(1.0), 10),
        vec!["sim://a".into(), "sim://b".into()],
    );

    let (machine, _req) = drive_to_request(machine);
    let (machine, _) = deliver(machine, true, vec![sample(2, 1.0)]);
    let (machine, _req) = drive_to_request(machine);
    let (machine, _) = deliver(machine, true, vec![sample(5, 2.0)]);

    for channel in &machine.channels {
        assert_eq!(channel.series.len(), 11);
        assert_eq!(channel.series[0].ts, ts(0));
        assert!(!channel.series[0].is_displayable());
    }
    // Step-hold picks the real samples up from their own timestamps.
    assert!(machine.channels[0].series[2].is_displayable());
    assert!(!machine.channels[1].series[4].is_displayable());
    assert!(machine.channels[1].series[5].is_displayable());
}

#[test]
fn multi_channel_run_without_fixed_interval_gets_the_default() {
    let machine = Retrieval::new(
        cfg(SamplingMode::Linear, None, 10),
        vec!["sim://a".into(), "sim://b".into()],
    );
    let (machine, actions) = tick(machine, false);
    assert!(actions.is_empty());
    assert_eq!(machine.cfg.fixed_interval, Some(1.0));
}

#[test]
fn setup_rejects_inverted_window() {
    let mut bad = cfg(SamplingMode::Linear, None, 10);
    bad.global_end = ts(-1);
    let machine = Retrieval::new(bad, vec!["sim://x".into()]);

    let (machine, actions) = tick(machine, false);
    assert_eq!(machine.state, State::ErrorExit);
    assert!(matches!(
        actions.as_slice(),
        [Action::Fatal(ChanError::Config(_))]
    ));
}

#[test]
fn readiness_timeout_is_fatal() {
    let mut machine = Retrieval::new(cfg(SamplingMode::Linear, None, 10), vec!["sim://x".into()]);

    // Setup + 20 s settle + 60 s readiness wait at 100 ms per tick.
    for _ in 0..(1 + 200 + 599) {
        let (next, actions) = tick(machine, false);
        machine = next;
        assert!(actions.is_empty());
    }
    let (machine, actions) = tick(machine, false);
    assert_eq!(machine.state, State::ErrorExit);
    assert!(matches!(
        actions.as_slice(),
        [Action::Fatal(ChanError::ReadinessTimeout { .. })]
    ));
}

#[test]
fn response_timeout_is_fatal() {
    let machine = Retrieval::new(cfg(SamplingMode::Raw, None, 100), vec!["sim://x".into()]);
    let (mut machine, _req) = drive_to_request(machine);

    for _ in 0..599 {
        let (next, actions) = tick(machine, true);
        machine = next;
        assert!(actions.is_empty());
    }
    let (machine, actions) = tick(machine, true);
    assert_eq!(machine.state, State::ErrorExit);
    match actions.as_slice() {
        [Action::Fatal(ChanError::ResponseTimeout { channel, .. })] => {
            assert_eq!(channel, "sim://x");
        }
        other => panic!("expected response timeout, got {other:?}"),
    }
}

#[test]
fn request_window_is_padded_and_floored() {
    // Window of 1000 s: padding is 5%.
    let machine = Retrieval::new(cfg(SamplingMode::Raw, None, 1_000), vec!["sim://x".into()]);
    let (machine, req) = drive_to_request(machine);
    match req {
        Action::RequestPage { start, end, max_points, .. } => {
            assert_eq!(start, ts(0));
            assert_eq!(end, ts(1_050));
            assert_eq!(max_points, 20_000);
        }
        other => panic!("expected page request, got {other:?}"),
    }

    // Near the window end the 60 s floor dominates.
    let (machine, _) = deliver(machine, true, vec![sample(990, 1.0)]);
    let (_machine, req) = drive_to_request(machine);
    match req {
        Action::RequestPage { start, end, .. } => {
            assert_eq!(start, ts(990));
            assert_eq!(end, ts(990 + 60));
        }
        other => panic!("expected page request, got {other:?}"),
    }
}
