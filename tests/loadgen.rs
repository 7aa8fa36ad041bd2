//! Load generator against a live service.

use std::time::Duration;

use calculator_app::loadgen::{LoadTest, RampSchedule, Stage};

mod common;

#[tokio::test]
async fn test_ramp_against_service() {
    let app = common::spawn_app().await;

    let schedule = RampSchedule::new(
        1,
        vec![
            Stage {
                duration: Duration::from_millis(200),
                target: 3,
            },
            Stage {
                duration: Duration::from_millis(200),
                target: 3,
            },
        ],
    );

    let report = LoadTest::new(&app.url(""), schedule)
        .with_think_time(Duration::from_millis(20))
        .with_tick(Duration::from_millis(10))
        .run()
        .await;

    assert!(report.requests > 0);
    assert_eq!(report.failures, 0);
    assert_eq!(report.successes + report.client_errors, report.requests);
    assert_eq!(report.peak_vus, 3);
    assert_eq!(app.tracer.stats().in_flight(), 0);

    app.stop().await;
}
