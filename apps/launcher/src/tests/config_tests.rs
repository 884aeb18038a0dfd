use super::*;

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn temp_settings_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{name}-{}.toml", std::process::id()));
    fs::write(&path, contents).expect("write settings");
    path
}

#[test]
fn missing_file_yields_defaults() {
    let settings =
        load_settings(Path::new("/nonexistent/launcher-settings.toml")).expect("settings");
    assert_eq!(settings.poll_interval_ms, 2000);
    assert_eq!(settings.brightness, 70);
    assert_eq!(settings.fallback_slot_count, 15);
    assert!(settings.push_enabled);
    assert_eq!(settings.active_color, [40, 167, 69]);
    assert_eq!(settings.ready_color, [220, 53, 69]);
}

#[test]
fn file_values_fill_in_over_defaults() {
    let path = temp_settings_file(
        "launcher-file-values",
        r#"
server_url = "http://cues.local:8080"
document_id = "show-1"
brightness = 40
ready_color = [1, 2, 3]
"#,
    );

    let settings = load_settings(&path).expect("settings");
    let _ = fs::remove_file(&path);

    assert_eq!(settings.server_url.as_deref(), Some("http://cues.local:8080"));
    assert_eq!(settings.document_id.as_deref(), Some("show-1"));
    assert_eq!(settings.brightness, 40);
    assert_eq!(settings.ready_color, [1, 2, 3]);
    assert_eq!(settings.poll_interval_ms, 2000);
}

#[test]
fn invalid_file_is_a_startup_error() {
    let path = temp_settings_file("launcher-invalid", "brightness = \"bright\"");
    let result = load_settings(&path);
    let _ = fs::remove_file(&path);
    assert!(result.is_err());
}

#[test]
fn env_overrides_apply_and_other_vars_are_ignored() {
    let mut settings = Settings::default();
    settings
        .apply_env(vars(&[
            ("LAUNCHER__SERVER_URL", "http://env.local"),
            ("LAUNCHER__POLL_INTERVAL_MS", "500"),
            ("LAUNCHER__PUSH_ENABLED", "false"),
            ("LAUNCHER__ACTIVE_COLOR", "#0a0B0c"),
            ("LAUNCHER__READY_COLOR", "9, 8, 7"),
            ("LAUNCHER__UNKNOWN", "x"),
            ("PATH", "/usr/bin"),
        ]))
        .expect("env");

    assert_eq!(settings.server_url.as_deref(), Some("http://env.local"));
    assert_eq!(settings.poll_interval_ms, 500);
    assert!(!settings.push_enabled);
    assert_eq!(settings.active_color, [10, 11, 12]);
    assert_eq!(settings.ready_color, [9, 8, 7]);
}

#[test]
fn unparsable_env_value_is_reported() {
    let mut settings = Settings::default();
    let err = settings
        .apply_env(vars(&[("LAUNCHER__BRIGHTNESS", "loud")]))
        .expect_err("must fail");
    assert!(err.to_string().contains("LAUNCHER__BRIGHTNESS"));

    assert!(parse_color("1,2").is_err());
    assert!(parse_color("#12345").is_err());
    assert!(parse_color("300,0,0").is_err());
}

#[test]
fn args_override_file_and_env() {
    let mut settings = Settings {
        server_url: Some("http://file.local".to_string()),
        document_id: Some("file-doc".to_string()),
        ..Settings::default()
    };
    let args = Args::parse_from([
        "trigger-launcher",
        "--server-url",
        "http://cli.local",
        "--poll-interval-ms",
        "250",
        "--no-push",
    ]);

    settings.apply_args(&args);

    assert_eq!(args.config, PathBuf::from("launcher.toml"));
    assert_eq!(settings.server_url.as_deref(), Some("http://cli.local"));
    assert_eq!(settings.document_id.as_deref(), Some("file-doc"));
    assert_eq!(settings.poll_interval_ms, 250);
    assert!(!settings.push_enabled);
}

#[test]
fn plan_requires_server_and_document() {
    assert!(Settings::default().into_plan().is_err());

    let missing_document = Settings {
        server_url: Some("http://cues.local".to_string()),
        ..Settings::default()
    };
    let err = missing_document.into_plan().expect_err("must fail");
    assert!(err.to_string().contains("document_id"));

    let blank_server = Settings {
        server_url: Some("  ".to_string()),
        document_id: Some("doc".to_string()),
        ..Settings::default()
    };
    assert!(blank_server.into_plan().is_err());
}

#[test]
fn plan_carries_settings_into_components() {
    let settings = Settings {
        server_url: Some("http://cues.local".to_string()),
        document_id: Some("show-1".to_string()),
        poll_interval_ms: 750,
        brightness: 120,
        push_enabled: false,
        fallback_slot_count: 6,
        active_color: [1, 2, 3],
        ready_color: [4, 5, 6],
    };

    let plan = settings.into_plan().expect("plan");

    assert_eq!(plan.server_url, "http://cues.local");
    assert_eq!(plan.source.document_id.as_str(), "show-1");
    assert_eq!(plan.source.poll_interval, Duration::from_millis(750));
    assert!(!plan.source.push_enabled);
    assert_eq!(plan.launcher.brightness, 100);
    assert_eq!(plan.launcher.fallback_slot_count, 6);
    assert_eq!(plan.launcher.palette.active, Rgb::new(1, 2, 3));
    assert_eq!(plan.launcher.palette.ready, Rgb::new(4, 5, 6));
}
