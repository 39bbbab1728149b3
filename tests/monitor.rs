//! Integration tests for the monitoring service using a mock source.
//!
//! These tests drive every query operation end to end over in-memory
//! weekly record sets, so results are deterministic and no network is used.

use std::io;
use std::sync::{Arc, Mutex};

use camera_monitor::{
    CameraMonitor, DeviceObservation, Metric, MockPeriodSource, MonitorError, Month,
    ObservationDate, PeriodOrdinal, PeriodRecordSet, SearchCriteria,
};
use tracing_subscriber::fmt::MakeWriter;

fn date(text: &str) -> ObservationDate {
    ObservationDate::parse(text).unwrap()
}

fn week(n: u8) -> PeriodOrdinal {
    PeriodOrdinal::new(n).unwrap()
}

fn enero() -> Month {
    Month::new(1, "enero").unwrap()
}

/// Camera with one infraction and frame count per listed day.
fn camera(id: &str, name: &str, total: u64, days: &[(&str, u64, u64)]) -> DeviceObservation {
    days.iter().fold(
        DeviceObservation::new(id, name, total)
            .with_uptime("6 days")
            .with_storage_used("40%"),
        |device, (day, infractions, frames)| {
            device
                .with_infractions(date(day), *infractions)
                .with_frames(date(day), *frames)
        },
    )
}

/// Two weeks of January: week 1 and week 3 have data.
fn january_source() -> MockPeriodSource {
    let week1 = PeriodRecordSet::new([
        camera(
            "A",
            "Av. Libertador",
            10,
            &[("2024-01-05", 4, 40), ("2024-01-06", 6, 60)],
        ),
        camera("B", "Av. Corrientes", 3, &[("2024-01-05", 3, 300)]),
    ]);
    let week3 = PeriodRecordSet::new([camera(
        "A",
        "Av. Libertador",
        20,
        &[("2024-01-15", 20, 100)],
    )]);

    MockPeriodSource::new()
        .with_period(&enero(), week(1), week1)
        .with_period(&enero(), week(3), week3)
}

// ==================== Listing Tests ====================

/// Test listing one week returns its cameras in source order.
#[tokio::test]
async fn test_list_devices_single_week() {
    let monitor = CameraMonitor::new(january_source());

    let listings = monitor.list_devices(&enero(), Some(week(1))).await.unwrap();
    let ids: Vec<&str> = listings.iter().map(|l| l.device_id.as_str()).collect();

    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(listings[0].total_infractions, 10);
    assert_eq!(listings[0].storage_used, "40%");
    assert!(listings.iter().all(|l| l.period == week(1)));
}

/// Test listing the month covers every week with data.
#[tokio::test]
async fn test_list_devices_whole_month() {
    let monitor = CameraMonitor::new(january_source());

    let listings = monitor.list_devices(&enero(), None).await.unwrap();
    let entries: Vec<(u8, &str)> = listings
        .iter()
        .map(|l| (l.period.get(), l.device_id.as_str()))
        .collect();

    assert_eq!(entries, vec![(1, "A"), (1, "B"), (3, "A")]);
}

/// Test a missing week is reported as not found.
#[tokio::test]
async fn test_list_devices_missing_week() {
    let monitor = CameraMonitor::new(january_source());

    let result = monitor.list_devices(&enero(), Some(week(2))).await;
    let err = result.unwrap_err();
    assert!(matches!(err, MonitorError::PeriodNotFound { .. }));
    assert!(err.is_not_found());
}

/// Test a month without any data is reported as not found.
#[tokio::test]
async fn test_list_devices_empty_month() {
    let monitor = CameraMonitor::new(january_source());
    let febrero = Month::new(2, "febrero").unwrap();

    let result = monitor.list_devices(&febrero, None).await;
    assert!(matches!(result, Err(MonitorError::MonthNotFound(_))));
}

// ==================== Status Tests ====================

/// Test a camera's raw observation is returned unchanged.
#[tokio::test]
async fn test_device_status() {
    let monitor = CameraMonitor::new(january_source());

    let device = monitor.device_status(&enero(), week(1), "A").await.unwrap();
    assert_eq!(device.name, "Av. Libertador");
    assert_eq!(device.total, 10);
    assert_eq!(device.infractions.get(&date("2024-01-06")), 6);
}

/// Test unknown cameras and weeks are distinguished.
#[tokio::test]
async fn test_device_status_not_found() {
    let monitor = CameraMonitor::new(january_source());

    let missing_device = monitor.device_status(&enero(), week(1), "Z").await;
    assert!(matches!(
        missing_device,
        Err(MonitorError::DeviceNotFound { ref device_id, .. }) if device_id == "Z"
    ));

    let missing_week = monitor.device_status(&enero(), week(4), "A").await;
    assert!(matches!(missing_week, Err(MonitorError::PeriodNotFound { .. })));
}

// ==================== Performance Tests ====================

/// Test a camera's performance across every week it reported in.
#[tokio::test]
async fn test_analyze_performance_across_month() {
    let monitor = CameraMonitor::new(january_source());

    let results = monitor
        .analyze_performance(&enero(), None, Some("A"))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let a = &results[0];
    assert_eq!(a.periods_analyzed, 2);
    assert_eq!(a.infraction_stats.sum, 30.0);
    assert_eq!(a.infraction_stats.mean, 15.0);
    assert_eq!(a.infraction_stats.min, 10.0);
    assert_eq!(a.infraction_stats.max, 20.0);
    assert_eq!(a.daily_infraction_avg, 10.0);
    assert_eq!(a.daily_frame_avg, 66.67);
    // 30 infractions over 200 frames
    assert_eq!(a.efficiency, 15.0);
}

/// Test analyzing one week only covers that week.
#[tokio::test]
async fn test_analyze_performance_single_week() {
    let monitor = CameraMonitor::new(january_source());

    let results = monitor
        .analyze_performance(&enero(), Some(week(1)), None)
        .await
        .unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.device_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(results[0].periods_analyzed, 1);
    assert_eq!(results[0].efficiency, 10.0);
    assert_eq!(results[1].efficiency, 1.0);
}

/// Test analyzing an unknown camera is not found.
#[tokio::test]
async fn test_analyze_performance_unknown_device() {
    let monitor = CameraMonitor::new(january_source());

    let result = monitor.analyze_performance(&enero(), None, Some("Z")).await;
    assert!(matches!(result, Err(MonitorError::DeviceNotFound { .. })));
}

// ==================== Comparison Tests ====================

/// Test cameras are ranked by the chosen metric.
#[tokio::test]
async fn test_compare_devices() {
    let monitor = CameraMonitor::new(january_source());

    let by_infractions = monitor
        .compare_devices(&enero(), week(1), "infractions")
        .await
        .unwrap();
    assert_eq!(by_infractions.metric, Metric::Infractions);
    assert_eq!(by_infractions.rankings[0].device_id, "A");

    let by_frames = monitor
        .compare_devices(&enero(), week(1), "frames")
        .await
        .unwrap();
    assert_eq!(by_frames.rankings[0].device_id, "B");
    assert_eq!(by_frames.rankings[0].frames, 300);
}

/// Test an unknown metric is rejected before any lookup.
#[tokio::test]
async fn test_compare_devices_unknown_metric() {
    let source = january_source();
    let monitor = CameraMonitor::new(source.clone());

    let result = monitor.compare_devices(&enero(), week(1), "uptime").await;
    assert!(matches!(result, Err(MonitorError::InvalidFilter(_))));
    assert_eq!(source.lookup_count(), 0);
}

// ==================== Search Tests ====================

/// Test search scans every week of the month.
#[tokio::test]
async fn test_search_infractions_threshold() {
    let monitor = CameraMonitor::new(january_source());

    let criteria = SearchCriteria::new().with_min_infractions(5);
    let matches = monitor.search_infractions(&enero(), &criteria).await.unwrap();

    let found: Vec<(&str, &str, u64)> = matches
        .iter()
        .map(|m| (m.date.as_str(), m.device_id.as_str(), m.infractions))
        .collect();
    assert_eq!(found, vec![("2024-01-06", "A", 6), ("2024-01-15", "A", 20)]);
    assert_eq!(matches[1].period, week(3));
}

/// Test an exact date search orders cameras by infractions.
#[tokio::test]
async fn test_search_infractions_exact_date() {
    let monitor = CameraMonitor::new(january_source());

    let criteria = SearchCriteria::new().on_date(date("2024-01-05"));
    let matches = monitor.search_infractions(&enero(), &criteria).await.unwrap();

    let ids: Vec<&str> = matches.iter().map(|m| m.device_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(matches[1].frames, 300);
}

/// Test a search with no hits is empty, not an error.
#[tokio::test]
async fn test_search_infractions_no_match() {
    let monitor = CameraMonitor::new(january_source());

    let criteria = SearchCriteria::new().on_date(date("2024-01-31"));
    let matches = monitor.search_infractions(&enero(), &criteria).await.unwrap();
    assert!(matches.is_empty());
}

// ==================== Report Tests ====================

/// Test the monthly report totals and orderings.
#[tokio::test]
async fn test_monthly_report() {
    let monitor = CameraMonitor::new(january_source());

    let report = monitor.monthly_report(&enero()).await.unwrap();

    assert_eq!(report.month, "01-enero");
    assert_eq!(report.total_infractions, 33);
    assert_eq!(report.total_frames, 500);
    assert_eq!(report.efficiency, 6.6);
    assert_eq!(report.periods, vec![week(1), week(3)]);
    assert_eq!(report.active_devices, 2);
    assert_eq!(report.skipped_devices, 0);

    assert_eq!(report.period_summaries.len(), 2);
    assert_eq!(report.period_summaries[0].infractions, 13);
    assert_eq!(report.period_summaries[0].frames, 400);
    assert_eq!(report.period_summaries[0].efficiency, 3.25);
    assert_eq!(report.period_summaries[1].efficiency, 20.0);

    let top: Vec<(&str, u64)> = report
        .top_devices
        .iter()
        .map(|d| (d.device_id.as_str(), d.total_infractions))
        .collect();
    assert_eq!(top, vec![("A", 30), ("B", 3)]);
    assert_eq!(report.top_devices[0].periods_active, 2);
    assert_eq!(report.top_devices[0].total_frames, 200);
    assert_eq!(report.top_devices[0].efficiency, 15.0);
    assert_eq!(report.top_devices[1].total_frames, 300);
    assert_eq!(report.top_devices[1].efficiency, 1.0);

    let days: Vec<&str> = report.recent_days.iter().map(|d| d.date.as_str()).collect();
    assert_eq!(days, vec!["2024-01-05", "2024-01-06", "2024-01-15"]);
    assert_eq!(report.recent_days[0].infractions, 7);
    assert_eq!(report.recent_days[0].frames, 340);
}

/// Test the report caps the top cameras and recent days.
#[tokio::test]
async fn test_monthly_report_limits() {
    let cameras: Vec<DeviceObservation> = (1..=8)
        .map(|i| {
            let day = format!("2024-01-{i:02}");
            camera(&i.to_string(), &format!("Camera {i}"), i, &[(&day, i, 10)])
        })
        .collect();
    let source =
        MockPeriodSource::new().with_period(&enero(), week(1), PeriodRecordSet::new(cameras));
    let monitor = CameraMonitor::new(source);

    let report = monitor.monthly_report(&enero()).await.unwrap();

    let top: Vec<&str> = report.top_devices.iter().map(|d| d.device_id.as_str()).collect();
    assert_eq!(top, vec!["8", "7", "6", "5", "4"]);

    assert_eq!(report.recent_days.len(), 7);
    assert_eq!(report.recent_days[0].date.as_str(), "2024-01-02");
    assert_eq!(report.recent_days[6].date.as_str(), "2024-01-08");
}

/// Test tied cameras keep the order they were first seen in.
#[tokio::test]
async fn test_monthly_report_ties_keep_first_seen_order() {
    let set = PeriodRecordSet::from_json_str(
        r#"{
            "9": {"camera": "Nine", "uptime": "1d", "used_storage": "1%", "total": 5,
                  "frames": {"2024-01-05": 50}},
            "10": {"camera": "Ten", "uptime": "1d", "used_storage": "1%", "total": 5,
                   "frames": {"2024-01-05": 10}}
        }"#,
    )
    .unwrap();
    let source = MockPeriodSource::new().with_period(&enero(), week(1), set);
    let monitor = CameraMonitor::new(source);

    let report = monitor.monthly_report(&enero()).await.unwrap();

    let top: Vec<(&str, u64, f64)> = report
        .top_devices
        .iter()
        .map(|d| (d.device_id.as_str(), d.total_frames, d.efficiency))
        .collect();
    assert_eq!(top, vec![("9", 50, 10.0), ("10", 10, 50.0)]);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["top_devices"][0]["device_id"], "9");
    assert_eq!(json["top_devices"][0]["total_frames"], 50);
    assert_eq!(json["top_devices"][1]["efficiency"], 50.0);
}

/// Log sink that keeps everything written to it.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Test a malformed camera is warned about once, when it is ingested.
#[tokio::test]
async fn test_malformed_camera_is_logged_once() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let set = PeriodRecordSet::from_json_str(
        r#"{
            "1": {"camera": "Good", "uptime": "1d", "used_storage": "1%", "total": 2},
            "2": {"uptime": "1d", "used_storage": "1%", "total": 9}
        }"#,
    )
    .unwrap();
    let source = MockPeriodSource::new().with_period(&enero(), week(1), set);
    let monitor = CameraMonitor::new(source);

    monitor.monthly_report(&enero()).await.unwrap();
    monitor.analyze_performance(&enero(), None, None).await.unwrap();

    let output = logs.contents();
    assert_eq!(output.matches("Skipping malformed camera entry").count(), 1);
    assert!(output.contains("device_id=2"));
}

/// Test the report counts cameras rejected at ingestion.
#[tokio::test]
async fn test_monthly_report_counts_skipped_devices() {
    let set = PeriodRecordSet::from_json_str(
        r#"{
            "1": {"camera": "Good", "uptime": "1d", "used_storage": "1%", "total": 2,
                  "infractions": {"01-05": 2}, "frames": {"01-05": 20}},
            "2": {"uptime": "1d", "used_storage": "1%", "total": 9}
        }"#,
    )
    .unwrap();
    let source = MockPeriodSource::new().with_period(&enero(), week(2), set);
    let monitor = CameraMonitor::new(source);

    let report = monitor.monthly_report(&enero()).await.unwrap();
    assert_eq!(report.active_devices, 1);
    assert_eq!(report.skipped_devices, 1);
    assert_eq!(report.total_infractions, 2);
    assert_eq!(report.efficiency, 10.0);
}

/// Test a source failure aborts the report.
#[tokio::test]
async fn test_monthly_report_source_failure() {
    let source = january_source();
    source.fail_period(&enero(), week(2));
    let monitor = CameraMonitor::new(source);

    let result = monitor.monthly_report(&enero()).await;
    let err = result.unwrap_err();
    assert!(matches!(err, MonitorError::Status { status: 500, .. }));
    assert!(!err.is_not_found());
}
