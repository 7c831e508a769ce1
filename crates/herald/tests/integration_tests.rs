//! Integration tests for herald.
//!
//! These drive the scheduler, the publish pipeline and the command
//! channel together against a fixed clock and stubbed providers, the
//! way the daemon wires them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use pretty_assertions::assert_eq;
use tokio::sync::watch;

use herald_gateway::{
    Command, CommandChannel, GatewayError, ProbeFn, ProviderLiveness, command_channel,
};
use herald_pipeline::{
    Generate, GenerationError, ImageSize, Post, PostError, PublishPipeline,
};
use herald_schedule::{
    Clock, FailureReason, PublishFn, ScheduleStore, SelectionPolicy, Theme, Tick, TickScheduler,
    TimeOfDay,
};

const ZONE: Tz = chrono_tz::Asia::Taipei;

/// Clock the tests turn by hand.
#[derive(Clone)]
struct TestClock {
    now: Arc<Mutex<DateTime<Tz>>>,
}

impl TestClock {
    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Self {
        Self {
            now: Arc::new(Mutex::new(ZONE.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap())),
        }
    }

    fn set(&self, y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) {
        *self.now.lock().unwrap() = ZONE.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap();
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Tz> {
        *self.now.lock().unwrap()
    }
}

struct StubGenerator {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Generate for StubGenerator {
    async fn generate(&self, _prompt: &str, _size: ImageSize) -> Result<Vec<u8>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(GenerationError::Api {
                status: 500,
                message: "stub failure".to_string(),
            })
        } else {
            Ok(vec![0xAB; 16])
        }
    }

    async fn alive(&self) -> bool {
        !self.fail
    }
}

struct StubPoster {
    fail: bool,
    captions: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Post for StubPoster {
    async fn post(&self, caption: &str, _artifact: Option<&[u8]>) -> Result<(), PostError> {
        if self.fail {
            return Err(PostError::Api {
                status: 503,
                message: "stub failure".to_string(),
            });
        }
        self.captions.lock().unwrap().push(caption.to_string());
        Ok(())
    }

    async fn alive(&self) -> bool {
        !self.fail
    }
}

struct Harness {
    store: Arc<ScheduleStore>,
    clock: TestClock,
    scheduler: TickScheduler<TestClock>,
    publish: PublishFn,
    generator_calls: Arc<AtomicUsize>,
    captions: Arc<Mutex<Vec<String>>>,
}

/// Build the scheduler exactly as the daemon does, with stubbed providers.
fn harness(
    times: &[(u8, u8)],
    themes: &[&str],
    clock: TestClock,
    fail_generation: bool,
    fail_post: bool,
) -> Harness {
    let times = times
        .iter()
        .map(|&(h, m)| TimeOfDay::new(h, m).unwrap())
        .collect::<Vec<_>>();
    let themes = themes
        .iter()
        .map(|label| Theme::new(*label).unwrap())
        .collect::<Vec<_>>();
    let store = Arc::new(ScheduleStore::new(times, themes));

    let generator_calls = Arc::new(AtomicUsize::new(0));
    let captions = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Arc::new(PublishPipeline::new(
        StubGenerator {
            fail: fail_generation,
            calls: Arc::clone(&generator_calls),
        },
        StubPoster {
            fail: fail_post,
            captions: Arc::clone(&captions),
        },
        ImageSize::Square1024,
    ));

    let scheduler = TickScheduler::new(
        Arc::clone(&store),
        clock.clone(),
        SelectionPolicy::ByMinute,
        Duration::from_secs(60),
    );

    let publish: PublishFn = {
        let pipeline = Arc::clone(&pipeline);
        let clock = clock.clone();
        Box::new(move |theme: Theme| {
            let pipeline = Arc::clone(&pipeline);
            let clock = clock.clone();
            Box::pin(async move { pipeline.publish(&theme, clock.now()).await })
        })
    };

    Harness {
        store,
        clock,
        scheduler,
        publish,
        generator_calls,
        captions,
    }
}

mod scheduled_firing {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn fires_once_per_minute_and_again_next_day() {
        let clock = TestClock::at(2025, 3, 10, 8, 0, 10);
        let h = harness(&[(8, 0)], &["morning"], clock, false, false);

        let tick = h.scheduler.evaluate(&h.publish).await;
        let Tick::Fired(outcome) = tick else {
            panic!("expected a fire, got {tick:?}");
        };
        assert!(outcome.success);
        assert_eq!(outcome.theme.as_str(), "morning");

        // Later in the same minute: suppressed
        h.clock.set(2025, 3, 10, 8, 0, 45);
        assert_eq!(h.scheduler.evaluate(&h.publish).await, Tick::AlreadyFired);

        // Same time of day the next day: fires again
        h.clock.set(2025, 3, 11, 8, 0, 5);
        assert!(matches!(
            h.scheduler.evaluate(&h.publish).await,
            Tick::Fired(o) if o.success
        ));

        assert_eq!(h.generator_calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            *h.captions.lock().unwrap(),
            vec![
                "morning - scheduled post 2025-03-10 08:00".to_string(),
                "morning - scheduled post 2025-03-11 08:00".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn off_schedule_minute_does_nothing() {
        let clock = TestClock::at(2025, 3, 10, 9, 30, 0);
        let h = harness(&[(8, 0)], &["morning"], clock, false, false);

        assert_eq!(h.scheduler.evaluate(&h.publish).await, Tick::NotDue);
        assert_eq!(h.generator_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn paused_schedule_skips_due_minute() {
        let clock = TestClock::at(2025, 3, 10, 8, 0, 0);
        let h = harness(&[(8, 0)], &["morning"], clock, false, false);

        h.store.set_paused(true).await;
        assert_eq!(h.scheduler.evaluate(&h.publish).await, Tick::Paused);

        // Resuming within the same minute still fires: pause never
        // recorded the minute.
        h.store.set_paused(false).await;
        assert!(matches!(h.scheduler.evaluate(&h.publish).await, Tick::Fired(_)));
    }

    #[tokio::test]
    async fn empty_theme_list_skips_without_recording_the_minute() {
        let clock = TestClock::at(2025, 3, 10, 12, 0, 0);
        let h = harness(&[(12, 0)], &[], clock, false, false);

        assert_eq!(h.scheduler.evaluate(&h.publish).await, Tick::NoThemes);

        // A theme added within the same minute gets picked up because
        // the skip left no fire record.
        h.store.add_theme(Theme::new("late").unwrap()).await;
        assert!(matches!(
            h.scheduler.evaluate(&h.publish).await,
            Tick::Fired(o) if o.theme.as_str() == "late"
        ));
    }

    #[tokio::test]
    async fn by_minute_policy_indexes_theme_list() {
        let clock = TestClock::at(2025, 3, 10, 10, 2, 0);
        let h = harness(&[(10, 2)], &["a", "b", "c"], clock, false, false);

        // minute 2 % 3 themes = index 2
        assert!(matches!(
            h.scheduler.evaluate(&h.publish).await,
            Tick::Fired(o) if o.theme.as_str() == "c"
        ));
    }

    #[tokio::test]
    async fn mutation_after_snapshot_applies_next_tick() {
        let clock = TestClock::at(2025, 3, 10, 7, 59, 30);
        let h = harness(&[(8, 0)], &["morning"], clock, false, false);

        assert_eq!(h.scheduler.evaluate(&h.publish).await, Tick::NotDue);

        // Time added between ticks is honored as soon as it matches.
        h.store.add_time(TimeOfDay::new(7, 59).unwrap()).await;
        assert!(matches!(h.scheduler.evaluate(&h.publish).await, Tick::Fired(_)));
    }
}

mod failure_handling {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn generation_failure_skips_posting_and_records_the_minute() {
        let clock = TestClock::at(2025, 3, 10, 18, 0, 0);
        let h = harness(&[(18, 0)], &["evening"], clock, true, false);

        let Tick::Fired(outcome) = h.scheduler.evaluate(&h.publish).await else {
            panic!("expected a fire");
        };
        assert!(!outcome.success);
        assert_eq!(outcome.reason, Some(FailureReason::GenerationFailed));
        assert!(h.captions.lock().unwrap().is_empty());

        // No retry within the minute even after a failure
        h.clock.set(2025, 3, 10, 18, 0, 50);
        assert_eq!(h.scheduler.evaluate(&h.publish).await, Tick::AlreadyFired);
        assert_eq!(h.generator_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn post_failure_yields_post_failed_outcome() {
        let clock = TestClock::at(2025, 3, 10, 22, 0, 0);
        let h = harness(&[(22, 0)], &["night"], clock, false, true);

        let Tick::Fired(outcome) = h.scheduler.evaluate(&h.publish).await else {
            panic!("expected a fire");
        };
        assert!(!outcome.success);
        assert_eq!(outcome.reason, Some(FailureReason::PostFailed));
        assert_eq!(h.generator_calls.load(Ordering::SeqCst), 1);
    }
}

mod command_interleaving {
    use super::*;
    use pretty_assertions::assert_eq;

    fn healthy_probe() -> ProbeFn {
        Box::new(|| {
            Box::pin(async {
                ProviderLiveness {
                    generation: true,
                    posting: true,
                }
            })
        })
    }

    #[tokio::test]
    async fn commands_reshape_the_live_schedule() {
        let clock = TestClock::at(2025, 3, 10, 9, 30, 0);
        let h = harness(&[(8, 0)], &["morning", "art"], clock, false, false);

        let channel = CommandChannel::new(
            Arc::clone(&h.store),
            h.scheduler.last_outcome(),
            healthy_probe(),
            ZONE,
        );
        let (sender, rx) = command_channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let actor = tokio::spawn(channel.run(rx, shutdown_rx));

        // Not on the schedule yet
        assert_eq!(h.scheduler.evaluate(&h.publish).await, Tick::NotDue);

        let ack = sender
            .submit(Command::parse("addtime 09:30").unwrap())
            .await
            .unwrap();
        assert_eq!(ack, "added publish time 09:30");

        // The added time fires on the very next tick
        assert!(matches!(h.scheduler.evaluate(&h.publish).await, Tick::Fired(_)));

        let ack = sender
            .submit(Command::parse("removetheme art").unwrap())
            .await
            .unwrap();
        assert_eq!(ack, "removed theme 'art'");

        let ack = sender
            .submit(Command::parse("themes").unwrap())
            .await
            .unwrap();
        assert_eq!(ack, "themes: morning");

        let ack = sender.submit(Command::parse("pause").unwrap()).await.unwrap();
        assert_eq!(ack, "scheduled publishing paused");

        h.clock.set(2025, 3, 10, 9, 31, 0);
        h.store.add_time(TimeOfDay::new(9, 31).unwrap()).await;
        assert_eq!(h.scheduler.evaluate(&h.publish).await, Tick::Paused);

        let ack = sender.submit(Command::parse("resume").unwrap()).await.unwrap();
        assert_eq!(ack, "scheduled publishing resumed");
        assert!(matches!(h.scheduler.evaluate(&h.publish).await, Tick::Fired(_)));

        shutdown_tx.send(true).unwrap();
        actor.await.unwrap();

        // Actor is gone; further submissions fail cleanly
        let err = sender
            .submit(Command::parse("status").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::ChannelClosed);
    }

    #[tokio::test]
    async fn status_reflects_last_outcome_in_the_configured_zone() {
        let clock = TestClock::at(2025, 3, 10, 8, 0, 0);
        let h = harness(&[(8, 0)], &["morning"], clock, false, false);

        assert!(matches!(h.scheduler.evaluate(&h.publish).await, Tick::Fired(_)));

        let channel = CommandChannel::new(
            Arc::clone(&h.store),
            h.scheduler.last_outcome(),
            healthy_probe(),
            ZONE,
        );
        let status = channel.apply(Command::Status).await;

        assert!(status.contains("zone: Asia/Taipei"), "{status}");
        assert!(status.contains("times: 08:00"), "{status}");
        assert!(status.contains("themes (1): morning"), "{status}");
        assert!(status.contains("paused: false"), "{status}");
        assert!(
            status.contains("last publish: 'morning' at 2025-03-10 08:00 (success)"),
            "{status}"
        );
        assert!(
            status.contains("providers: generation ok, posting ok"),
            "{status}"
        );
    }
}
