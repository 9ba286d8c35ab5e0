//! Scheduler runs against the synthetic document under a paused clock.

use std::sync::Arc;
use std::time::Duration;

use demoreel_common::config::AppConfig;
use demoreel_document::synthetic::DocumentCall;
use demoreel_document::{Rect, SyntheticDocument};
use demoreel_scheduler::TimelineScheduler;
use demoreel_script_model::{
    Action, ActionKind, HighlightStyle, Script, Section, StepOutcome, StepPhase, TimingMetadata,
};
use proptest::prelude::*;

fn page() -> Arc<SyntheticDocument> {
    Arc::new(
        SyntheticDocument::default()
            .with_element("#signup", Rect::new(400.0, 300.0, 160.0, 48.0))
            .with_element("#email", Rect::new(400.0, 380.0, 240.0, 36.0))
            .with_page(
                "https://example.com/pricing",
                &[("#plans", Rect::new(100.0, 200.0, 900.0, 400.0))],
            ),
    )
}

fn script(sections: Vec<Section>) -> Script {
    Script {
        title: None,
        start_url: None,
        sections,
    }
}

async fn run(doc: Arc<SyntheticDocument>, script: &Script) -> TimingMetadata {
    run_with(doc, script, &AppConfig::default()).await
}

async fn run_with(doc: Arc<SyntheticDocument>, script: &Script, config: &AppConfig) -> TimingMetadata {
    let mut scheduler = TimelineScheduler::new(doc, config);
    scheduler.run(script).await.unwrap().timing
}

fn measured_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.scheduler.follow_measured_clock = true;
    config
}

fn windows(timing: &TimingMetadata) -> Vec<(u64, u64)> {
    timing
        .sections()
        .iter()
        .map(|s| (s.start_time_ms, s.end_time_ms))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn single_section_without_actions_matches_expected_timing() {
    let script = Script::from_json(
        r#"{"sections":[{"id":"s1","name":"Intro","narration":"Hello world this is a test","duration":5,"actions":[]}]}"#,
    )
    .unwrap();

    let timing = run(page(), &script).await;

    let expected: TimingMetadata = serde_json::from_str(
        r#"{"sections":[{"id":"s1","startTimeMs":0,"endTimeMs":5000,"narration":"Hello world this is a test"}],"totalDurationMs":5000}"#,
    )
    .unwrap();
    assert_eq!(timing, expected);
}

#[tokio::test(start_paused = true)]
async fn sections_are_contiguous_and_respect_the_floor() {
    let mut intro = Section::new("intro", "Welcome", 3.0);
    intro.actions = vec![
        Action::new(ActionKind::Hover, 0)
            .with_selector("#signup")
            .with_highlight(HighlightStyle::Spotlight, Some(2500)),
        Action::new(ActionKind::Click, 4000).with_selector("#signup"),
    ];
    let empty = Section::new("pause", "", 2.0);
    let mut form = Section::new("form", "Fill the form", 1.0);
    form.actions = vec![Action::new(ActionKind::Type, 500)
        .with_selector("#email")
        .with_value("demo@example.com")
        .with_highlight(HighlightStyle::Box, None)];

    let sections = script(vec![intro, empty, form]);
    let timing = run(page(), &sections).await;

    // intro: highlight 0..2500, click paced to 4000, occupies 1000 more.
    // pause: floor of 2000.
    // form: type paced to +500; no declared highlight duration, so the step
    // is accounted at 1000 even though the box plays for 2000.
    assert_eq!(windows(&timing), vec![(0, 5000), (5000, 7000), (7000, 8500)]);
    assert_eq!(timing.total_duration_ms(), 8500);

    // Following the measured clock records the full box instead.
    let measured = run_with(page(), &sections, &measured_config()).await;
    assert_eq!(windows(&measured), vec![(0, 5000), (5000, 7000), (7000, 9500)]);
}

#[tokio::test(start_paused = true)]
async fn missing_selectors_do_not_abort_and_timing_still_advances() {
    let config = AppConfig::default();

    let mut section = Section::new("broken", "Nothing here", 1.0);
    section.actions = vec![
        Action::new(ActionKind::Click, 0)
            .with_selector("#gone")
            .with_highlight(HighlightStyle::Arrow, Some(2000)),
        Action::new(ActionKind::Hover, 3000)
            .with_selector("#also-gone")
            .with_highlight(HighlightStyle::Box, Some(1500)),
    ];
    let doc = page();
    let mut scheduler = TimelineScheduler::new(doc.clone(), &config);
    let run = scheduler.run(&script(vec![section])).await.unwrap();

    assert_eq!(run.timing.sections()[0].end_time_ms, 4500);
    assert_eq!(run.diagnostics.skipped_count(), 4);
    assert_eq!(run.diagnostics.failed_count(), 0);
    assert!(doc.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_target_advances_by_the_default_step() {
    let build = || {
        let mut missing = Section::new("missing", "", 0.0);
        missing.actions = vec![Action::new(ActionKind::Click, 0).with_selector("#missing")];
        let mut present = Section::new("present", "", 0.0);
        present.actions = vec![Action::new(ActionKind::Click, 0)
            .with_selector("#signup")
            .with_highlight(HighlightStyle::Box, None)];
        script(vec![missing, present])
    };

    // The click waits out the 5 s element timeout, but each step is
    // recorded at the 1000 ms default.
    let timing = run(page(), &build()).await;
    assert_eq!(windows(&timing), vec![(0, 1000), (1000, 2000)]);
}

#[tokio::test(start_paused = true)]
async fn navigation_reattaches_the_overlay() {
    let mut section = Section::new("tour", "", 0.0);
    section.actions = vec![
        Action::new(ActionKind::Hover, 0)
            .with_selector("#signup")
            .with_highlight(HighlightStyle::Box, Some(500)),
        Action::new(ActionKind::Navigate, 1000).with_value("https://example.com/pricing"),
        Action::new(ActionKind::Hover, 2000)
            .with_selector("#plans")
            .with_highlight(HighlightStyle::Zoom, Some(500)),
    ];
    let doc = page();
    let mut scheduler = TimelineScheduler::new(doc.clone(), &AppConfig::default());
    let run = scheduler.run(&script(vec![section])).await.unwrap();

    let overlays: Vec<&StepOutcome> = run
        .diagnostics
        .records
        .iter()
        .filter(|r| r.phase == StepPhase::Overlay)
        .map(|r| &r.outcome)
        .collect();
    assert_eq!(overlays, vec![&StepOutcome::Ok, &StepOutcome::Ok]);

    let created = doc
        .calls()
        .iter()
        .filter(|c| matches!(c, DocumentCall::CreateSurface(_)))
        .count();
    assert_eq!(created, 2);
    // The second surface is removed at the end of the run.
    assert!(doc.live_surfaces().is_empty());
    assert_eq!(doc.url(), "https://example.com/pricing");
}

#[tokio::test(start_paused = true)]
async fn measured_overrun_extends_the_section_only_when_followed() {
    let mut section = Section::new("slow", "", 1.0);
    section.actions = vec![Action::new(ActionKind::Wait, 0).with_value("3s")];
    let slow = script(vec![section]);

    let nominal = run(page(), &slow).await;
    assert_eq!(nominal.sections()[0].end_time_ms, 1000);

    let measured = run_with(page(), &slow, &measured_config()).await;
    assert_eq!(measured.sections()[0].end_time_ms, 3000);
}

#[tokio::test(start_paused = true)]
async fn start_page_failure_is_fatal() {
    let doc = page();
    doc.fail_navigation("https://down.example.com");
    let mut script = script(vec![Section::new("s1", "Hi", 1.0)]);
    script.start_url = Some("https://down.example.com".to_string());

    let mut scheduler = TimelineScheduler::new(doc, &AppConfig::default());
    assert!(scheduler.run(&script).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn closed_document_degrades_every_step() {
    let doc = page();
    doc.terminate();
    let mut section = Section::new("late", "", 2.0);
    section.actions = vec![Action::new(ActionKind::Click, 0)
        .with_selector("#signup")
        .with_highlight(HighlightStyle::Spotlight, Some(1000))];

    let mut scheduler = TimelineScheduler::new(doc, &AppConfig::default());
    let run = scheduler.run(&script(vec![section])).await.unwrap();
    assert_eq!(run.timing.total_duration_ms(), 2000);
    assert!(run.diagnostics.degraded().count() >= 2);
}

#[tokio::test(start_paused = true)]
async fn identical_runs_produce_identical_timing() {
    let build = || {
        let mut a = Section::new("a", "First part", 2.0);
        a.actions = vec![
            Action::new(ActionKind::Scroll, 250).with_value("0,400"),
            Action::new(ActionKind::Click, 1200)
                .with_selector("#signup")
                .with_highlight(HighlightStyle::Arrow, Some(1800)),
        ];
        let b = Section::new("b", "Second part", 1.5);
        script(vec![a, b])
    };

    let first = run(page(), &build()).await;
    let second = run(page(), &build()).await;
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn action_latency_is_absorbed_only_when_following_the_clock() {
    let laggy = || {
        Arc::new(
            SyntheticDocument::default()
                .with_action_latency(Duration::from_millis(1500))
                .with_element("#signup", Rect::new(0.0, 0.0, 10.0, 10.0)),
        )
    };
    let mut section = Section::new("laggy", "", 0.0);
    section.actions = vec![Action::new(ActionKind::Click, 0).with_selector("#signup")];
    let script = script(vec![section]);

    assert_eq!(run(laggy(), &script).await.total_duration_ms(), 1000);
    assert_eq!(
        run_with(laggy(), &script, &measured_config())
            .await
            .total_duration_ms(),
        1500
    );
}

#[tokio::test(start_paused = true)]
async fn absurd_offsets_saturate_instead_of_overflowing() {
    let mut section = Section::new("far", "", 1.0);
    section.actions = vec![Action::new(ActionKind::Wait, u64::MAX - 10).with_value("0")];
    let mut after = Section::new("after", "", 1.0);
    after.actions = vec![Action::new(ActionKind::Wait, 5).with_value("0")];

    let timing = run(page(), &script(vec![section, after])).await;
    assert_eq!(windows(&timing), vec![(0, u64::MAX), (u64::MAX, u64::MAX)]);
}

fn arb_section() -> impl Strategy<Value = Section> {
    let action = (0u64..4000, prop::option::of(100u64..3000), any::<bool>()).prop_map(
        |(offset, highlight, existing)| {
            let selector = if existing { "#signup" } else { "#missing" };
            let action = Action::new(ActionKind::Hover, offset).with_selector(selector);
            match highlight {
                Some(ms) => action.with_highlight(HighlightStyle::Box, Some(ms)),
                None => action,
            }
        },
    );
    (0u32..6, prop::collection::vec(action, 0..4)).prop_map(|(secs, mut actions)| {
        actions.sort_by_key(|a| a.timing_offset_ms);
        let mut section = Section::new("s", "words", secs as f64);
        section.actions = actions;
        section
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn timing_is_contiguous_for_any_script(sections in prop::collection::vec(arb_section(), 0..4)) {
        let sections: Vec<Section> = sections
            .into_iter()
            .enumerate()
            .map(|(i, mut s)| {
                s.id = format!("s{i}");
                s
            })
            .collect();
        let script = script(sections);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        let timing = runtime.block_on(run(page(), &script));

        prop_assert_eq!(timing.sections().len(), script.sections.len());
        let mut expected_start = 0;
        for (window, section) in timing.sections().iter().zip(&script.sections) {
            prop_assert_eq!(window.start_time_ms, expected_start);
            prop_assert!(window.duration_ms() >= section.nominal_duration_ms());
            expected_start = window.end_time_ms;
        }
        prop_assert_eq!(timing.total_duration_ms(), expected_start);
    }
}
