// tests/launcher_fake_manager.rs

mod common;
use crate::common::{argv, init_tracing};

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use unitjob::errors::UnitJobError;
use unitjob::job::{JobLauncher, StartOptions};
use unitjob::unit::{DependencyKind, PropertyValue, UnitProperty};
use unitjob_test_utils::FakeServiceManager;

type TestResult = Result<(), Box<dyn Error>>;

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn start_submits_policy_properties_in_fail_mode() -> TestResult {
    init_tracing();

    let manager = FakeServiceManager::new();
    let launcher = JobLauncher::new(manager.clone());

    let job = launcher
        .start(
            "test-23",
            argv(&["/bin/sh", "-c", "while true; do echo lol; sleep 1; done"]),
            StartOptions::new().with_env(env(&[("A", "1"), ("B", "2")])),
        )
        .await?;

    assert_eq!(job.unit_name(), "test-23.service");
    assert_eq!(
        job.handle().as_str(),
        "/org/freedesktop/systemd1/unit/test_2d23_2eservice"
    );

    let requests = manager.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.unit, "test-23.service");
    assert_eq!(request.mode, "fail");

    let names: Vec<&str> = request.properties.iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["ExecStart", "RemainAfterExit", "Environment"]);

    assert_eq!(
        request.properties[0].value,
        PropertyValue::ExecCommandArray(vec![(
            "/bin/sh".to_string(),
            argv(&["/bin/sh", "-c", "while true; do echo lol; sleep 1; done"]),
            false
        )])
    );
    assert_eq!(request.properties[1].value, PropertyValue::Bool(true));
    assert_eq!(
        request.properties[2].value,
        PropertyValue::StringArray(vec!["A=1".into(), "B=2".into()])
    );

    assert_eq!(manager.get_unit_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_env_is_sent_as_empty_list() -> TestResult {
    let manager = FakeServiceManager::new();
    let launcher = JobLauncher::new(manager.clone());

    launcher
        .start("quiet", argv(&["/bin/true"]), StartOptions::default())
        .await?;

    let props = manager.properties_of("quiet.service").expect("unit created");
    assert_eq!(props[2].value, PropertyValue::StringArray(Vec::new()));
    Ok(())
}

#[tokio::test]
async fn second_start_with_same_name_conflicts_and_keeps_first() -> TestResult {
    init_tracing();

    let manager = FakeServiceManager::new();
    let launcher = JobLauncher::new(manager.clone());

    launcher
        .start("dup", argv(&["/bin/echo", "first"]), StartOptions::default())
        .await?;

    let second = launcher
        .start("dup", argv(&["/bin/echo", "second"]), StartOptions::default())
        .await;

    match second {
        Err(UnitJobError::JobCreation { unit, message }) => {
            assert_eq!(unit, "dup.service");
            assert!(message.contains("UnitExists"), "message: {message}");
        }
        Err(e) => panic!("Expected JobCreation, got: {:?}", e),
        Ok(job) => panic!("Expected conflict, got job {}", job.unit_name()),
    }

    // The first unit is untouched.
    assert_eq!(manager.units(), vec!["dup.service".to_string()]);
    let props = manager.properties_of("dup.service").unwrap();
    assert_eq!(
        props[0].value,
        PropertyValue::ExecCommandArray(vec![(
            "/bin/echo".to_string(),
            argv(&["/bin/echo", "first"]),
            false
        )])
    );
    // No handle lookup for the failed attempt.
    assert_eq!(manager.get_unit_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_requests_never_reach_the_manager() {
    let manager = FakeServiceManager::new();
    let launcher = JobLauncher::new(manager.clone());

    let cases = [
        ("", argv(&["/bin/true"]), StartOptions::default()),
        ("a/b", argv(&["/bin/true"]), StartOptions::default()),
        ("ok", Vec::new(), StartOptions::default()),
        (
            "ok",
            argv(&["/bin/true"]),
            StartOptions::new().with_env(env(&[("BAD=KEY", "1")])),
        ),
        (
            "ok",
            argv(&["/bin/true"]),
            StartOptions::new().with_property(UnitProperty::RemainAfterExit(false)),
        ),
    ];

    for (name, args, options) in cases {
        let result = launcher.start(name, args, options).await;
        assert!(
            matches!(result, Err(UnitJobError::InvalidJob(_))),
            "expected InvalidJob for job '{name}', got {result:?}"
        );
    }

    assert!(manager.requests().is_empty());
}

#[tokio::test]
async fn extra_properties_follow_policy_properties() -> TestResult {
    let manager = FakeServiceManager::new();
    let launcher = JobLauncher::new(manager.clone()).with_properties(vec![
        UnitProperty::Description("from config".into()),
    ]);

    launcher
        .start(
            "extra",
            argv(&["/bin/true"]),
            StartOptions::new().with_property(UnitProperty::Dependency(
                DependencyKind::After,
                vec!["network.target".into()],
            )),
        )
        .await?;

    let names: Vec<&str> = manager.requests()[0]
        .properties
        .iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(
        names,
        vec!["ExecStart", "RemainAfterExit", "Environment", "Description", "After"]
    );
    Ok(())
}

#[tokio::test]
async fn manager_rejection_is_surfaced_verbatim() {
    let manager = FakeServiceManager::new();
    manager.reject_with("org.freedesktop.DBus.Error.AccessDenied: Access denied");
    let launcher = JobLauncher::new(manager.clone());

    let err = launcher
        .start("denied", argv(&["/bin/true"]), StartOptions::default())
        .await
        .unwrap_err();

    match err {
        UnitJobError::JobCreation { message, .. } => {
            assert_eq!(message, "org.freedesktop.DBus.Error.AccessDenied: Access denied");
        }
        e => panic!("Expected JobCreation, got: {:?}", e),
    }
}

#[tokio::test]
async fn connection_failure_is_fatal() {
    let manager = FakeServiceManager::new();
    manager.disconnect();
    let launcher = JobLauncher::new(manager.clone());

    let err = launcher
        .start("offline", argv(&["/bin/true"]), StartOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, UnitJobError::Connection(_)), "got {err:?}");
    assert!(manager.units().is_empty());
}

#[tokio::test]
async fn concurrent_starts_share_one_manager() -> TestResult {
    init_tracing();

    let manager = FakeServiceManager::new();
    let launcher = Arc::new(JobLauncher::new(manager.clone()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let launcher = Arc::clone(&launcher);
        handles.push(tokio::spawn(async move {
            launcher
                .start(&format!("worker-{i}"), argv(&["/bin/true"]), StartOptions::default())
                .await
        }));
    }

    for handle in handles {
        handle.await??;
    }

    assert_eq!(manager.units().len(), 8);
    Ok(())
}

#[tokio::test]
async fn concurrent_starts_of_same_name_create_exactly_one_unit() {
    let manager = FakeServiceManager::new();
    let launcher = Arc::new(JobLauncher::new(manager.clone()));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let launcher = Arc::clone(&launcher);
        handles.push(tokio::spawn(async move {
            launcher
                .start("race", argv(&["/bin/true"]), StartOptions::default())
                .await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(UnitJobError::JobCreation { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 3);
}
