//! Integration tests for configuration loading.

use std::collections::HashMap;

use media_task_scheduler::config::{PipelineConfig, SchedulerConfig, WorkerPoolConfig, ENV_PREFIX};
use media_task_scheduler::core::{TaskScheduler, DEFAULT_PRIORITY};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_json_partial_sections_keep_defaults() {
    let cfg = PipelineConfig::from_json_str(r#"{ "scheduler": { "scan_factor": 4 } }"#).unwrap();
    assert_eq!(cfg.scheduler.scan_factor, 4);
    assert_eq!(cfg.scheduler.batch_size, SchedulerConfig::default().batch_size);
    assert_eq!(cfg.worker_pool, WorkerPoolConfig::default());
}

#[test]
fn test_json_empty_object_is_default() {
    assert_eq!(PipelineConfig::from_json_str("{}").unwrap(), PipelineConfig::default());
}

#[test]
fn test_json_rejects_invalid_values() {
    let err = PipelineConfig::from_json_str(r#"{ "worker_pool": { "worker_count": 0 } }"#).unwrap_err();
    assert!(err.starts_with("worker_pool invalid"), "{err}");

    let err = PipelineConfig::from_json_str(r#"{ "scheduler": { "default_priority": -2 } }"#).unwrap_err();
    assert!(err.contains("default_priority"), "{err}");
}

#[test]
fn test_json_rejects_malformed_input() {
    let err = PipelineConfig::from_json_str("{ scheduler: ").unwrap_err();
    assert!(err.starts_with("parse error"), "{err}");
}

#[test]
fn test_json_round_trip_through_serde() {
    let mut cfg = PipelineConfig::default();
    cfg.scheduler.batch_size = 3;
    cfg.worker_pool.max_in_flight = 5;
    let text = serde_json::to_string(&cfg).unwrap();
    assert_eq!(PipelineConfig::from_json_str(&text).unwrap(), cfg);
}

#[test]
fn test_lookup_every_variable() {
    let cfg = PipelineConfig::from_lookup(env(&[
        ("BATCH_SIZE", "6"),
        ("DEFAULT_PRIORITY", "4"),
        ("SCAN_FACTOR", "3"),
        ("WORKERS", "2"),
        ("WORKER_BATCH_SIZE", "8"),
        ("POLL_INTERVAL_MS", "15"),
        ("MAX_IN_FLIGHT", "12"),
    ]))
    .unwrap();

    assert_eq!(cfg.scheduler.batch_size, 6);
    assert_eq!(cfg.scheduler.default_priority, 4);
    assert_eq!(cfg.scheduler.scan_factor, 3);
    assert_eq!(cfg.worker_pool.worker_count, 2);
    assert_eq!(cfg.worker_pool.batch_size, 8);
    assert_eq!(cfg.worker_pool.poll_interval_ms, 15);
    assert_eq!(cfg.worker_pool.max_in_flight, 12);
}

#[test]
fn test_lookup_without_variables_is_default() {
    let cfg = PipelineConfig::from_lookup(env(&[])).unwrap();
    assert_eq!(cfg, PipelineConfig::default());
    assert_eq!(cfg.scheduler.default_priority, DEFAULT_PRIORITY);
}

#[test]
fn test_lookup_negative_priority_rejected() {
    let err = PipelineConfig::from_lookup(env(&[("DEFAULT_PRIORITY", "-1")])).unwrap_err();
    assert!(err.starts_with("scheduler invalid"), "{err}");
}

#[test]
fn test_lookup_unparsable_number_names_variable() {
    let err = PipelineConfig::from_lookup(env(&[("MAX_IN_FLIGHT", "lots")])).unwrap_err();
    assert!(err.contains("MEDIA_SCHEDULER_MAX_IN_FLIGHT"), "{err}");
}

#[test]
fn test_scheduler_honours_config() {
    let cfg = SchedulerConfig {
        batch_size: 2,
        default_priority: 7,
        scan_factor: 2,
    };
    let scheduler = TaskScheduler::with_config(cfg).unwrap();
    let ids: Vec<_> = (0..3).map(|n| scheduler.submit_default(n).unwrap()).collect();

    assert_eq!(scheduler.get(ids[0]).unwrap().priority, 7);
    assert_eq!(scheduler.next_default_batch(), ids[..2].to_vec());
    assert_eq!(scheduler.next_default_batch(), ids[2..].to_vec());
}

#[test]
fn test_scheduler_rejects_zero_batch_size() {
    let cfg = SchedulerConfig {
        batch_size: 0,
        ..SchedulerConfig::default()
    };
    assert!(TaskScheduler::<u32>::with_config(cfg).is_err());
}
