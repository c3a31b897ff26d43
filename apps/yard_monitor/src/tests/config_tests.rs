use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_match_coordinator_defaults() {
    assert_eq!(
        Settings::default().coordinator_config(),
        CoordinatorConfig::default()
    );
}

#[test]
fn file_values_override_defaults() {
    let file_cfg = parse_file(
        r#"
service_url = "http://yard.internal:5000"
api_key = "file-key"
yard_dimensions = "20x12x6"
containers_interval_secs = "30"
logs_interval_secs = "2"
log_stream = "optimizer"
"#,
    )
    .expect("toml");

    let mut settings = Settings::default();
    apply_file(&mut settings, &file_cfg);

    assert_eq!(settings.service_url, "http://yard.internal:5000");
    assert_eq!(settings.api_key.as_deref(), Some("file-key"));
    assert_eq!(settings.yard_dimensions, YardDimensions::new(20, 12, 6));
    assert_eq!(settings.containers_interval_secs, Some(30));
    assert_eq!(settings.logs_interval_secs, 2);
    assert_eq!(settings.training_interval_secs, 5);
    assert_eq!(settings.log_stream, "optimizer");
}

#[test]
fn app_prefixed_env_wins_over_plain_env() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("YARD_SERVICE_URL", "http://plain:5000"),
            ("APP__SERVICE_URL", "http://prefixed:5000"),
            ("YARD_API_KEY", "plain-key"),
            ("APP__TRAINING_INTERVAL_SECS", "9"),
            ("APP__YARD_DIMENSIONS", "8x8x3"),
        ]),
    );

    assert_eq!(settings.service_url, "http://prefixed:5000");
    assert_eq!(settings.api_key.as_deref(), Some("plain-key"));
    assert_eq!(settings.training_interval_secs, 9);
    assert_eq!(settings.yard_dimensions, YardDimensions::new(8, 8, 3));
}

#[test]
fn invalid_values_are_ignored() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("APP__YARD_DIMENSIONS", "8x8"),
            ("APP__LOGS_INTERVAL_SECS", "soon"),
            ("APP__CONTAINERS_INTERVAL_SECS", "-1"),
        ]),
    );

    assert_eq!(settings, Settings::default());
}

#[test]
fn zero_containers_interval_means_on_demand() {
    let mut settings = Settings {
        containers_interval_secs: Some(10),
        ..Settings::default()
    };
    apply_env(
        &mut settings,
        env_from(&[("APP__CONTAINERS_INTERVAL_SECS", "0")]),
    );

    assert_eq!(settings.containers_interval_secs, None);
    assert_eq!(
        settings.coordinator_config().containers_schedule(),
        yard_core::Schedule::OnDemand
    );
}

#[test]
fn loads_settings_file_from_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("yard_monitor_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("mkdir");
    let path = temp_root.join("yard.toml");
    fs::write(&path, "request_timeout_secs = \"3\"\n").expect("write");

    let settings = load_settings(&path);

    assert_eq!(settings.request_timeout_secs, 3);
    assert_eq!(
        settings.coordinator_config().request_timeout,
        Duration::from_secs(3)
    );
    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn missing_settings_file_keeps_defaults() {
    let settings = load_settings(Path::new("/nonexistent/yard.toml"));
    assert_eq!(settings.log_stream, DEFAULT_LOG_STREAM);
}

#[test]
fn unquoted_numbers_in_file_are_accepted() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("yard_monitor_numeric_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("mkdir");
    let path = temp_root.join("yard.toml");
    fs::write(
        &path,
        "service_url = \"http://yard.internal:5000\"\nlogs_interval_secs = 2\ncontainers_interval_secs = 15\n",
    )
    .expect("write");

    let settings = load_settings(&path);

    assert_eq!(settings.service_url, "http://yard.internal:5000");
    assert_eq!(settings.logs_interval_secs, 2);
    assert_eq!(settings.containers_interval_secs, Some(15));
    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn mixed_quoted_and_bare_values_parse_alike() {
    let file_cfg = parse_file("request_timeout_secs = 4\ntraining_interval_secs = \"6\"\n")
        .expect("toml");

    let mut settings = Settings::default();
    apply_file(&mut settings, &file_cfg);

    assert_eq!(settings.request_timeout_secs, 4);
    assert_eq!(settings.training_interval_secs, 6);
}
