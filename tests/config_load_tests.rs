use std::path::PathBuf;
use std::sync::Mutex;

use kite_dip_buyer::config::Config;

// Process environment is shared by every test in this binary.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const CREDENTIALS: [&str; 3] = ["API_KEY", "API_SECRET", "REFRESH_TOKEN"];

fn write_config(body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "kite-dip-config-{}.toml",
        uuid::Uuid::new_v4().simple()
    ));
    std::fs::write(&path, body).unwrap();
    path
}

fn set_env(config_path: &PathBuf, vars: &[(&str, Option<&str>)]) {
    std::env::set_var("KITE_DIP_CONFIG", config_path);
    for (name, value) in vars {
        match value {
            Some(v) => std::env::set_var(name, v),
            None => std::env::remove_var(name),
        }
    }
}

fn clear_env() {
    std::env::remove_var("KITE_DIP_CONFIG");
    for name in CREDENTIALS {
        std::env::remove_var(name);
    }
}

#[test]
/// Verifies credentials are read from the environment and trimmed, with the
/// file named by KITE_DIP_CONFIG supplying the rest.
fn load_reads_credentials_and_explicit_config_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = write_config("[strategy]\nthreshold_pct = -2.0\n");
    set_env(
        &path,
        &[
            ("API_KEY", Some(" key1 ")),
            ("API_SECRET", Some("secret1")),
            ("REFRESH_TOKEN", Some("refresh1")),
        ],
    );

    let config = Config::load().expect("complete environment should load");
    clear_env();
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.kite.api_key, "key1");
    assert_eq!(config.kite.api_secret, "secret1");
    assert_eq!(config.kite.refresh_token, "refresh1");
    assert!((config.strategy.threshold_pct + 2.0).abs() < f64::EPSILON);
}

#[test]
/// Verifies each missing credential is a startup failure naming the variable.
fn missing_credential_fails_with_variable_name() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = write_config("");
    for missing in CREDENTIALS {
        let vars: Vec<(&str, Option<&str>)> = CREDENTIALS
            .iter()
            .map(|name| (*name, (*name != missing).then_some("value")))
            .collect();
        set_env(&path, &vars);

        let err = Config::from_env().unwrap_err();
        assert!(
            format!("{:#}", err).contains(missing),
            "error for {} should name it: {:#}",
            missing,
            err
        );
    }
    clear_env();
    let _ = std::fs::remove_file(&path);
}

#[test]
/// Verifies a whitespace-only credential is rejected like a missing one.
fn whitespace_credential_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = write_config("");
    set_env(
        &path,
        &[
            ("API_KEY", Some("key1")),
            ("API_SECRET", Some("   ")),
            ("REFRESH_TOKEN", Some("refresh1")),
        ],
    );

    let err = Config::load().unwrap_err();
    clear_env();
    let _ = std::fs::remove_file(&path);

    let msg = format!("{:#}", err);
    assert!(msg.contains("API_SECRET"), "{}", msg);
}

#[test]
/// Verifies an explicitly named config file that does not exist is an error
/// rather than a silent fallback to defaults.
fn missing_explicit_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let path = std::env::temp_dir().join("kite-dip-config-does-not-exist.toml");
    set_env(
        &path,
        &[
            ("API_KEY", Some("key1")),
            ("API_SECRET", Some("secret1")),
            ("REFRESH_TOKEN", Some("refresh1")),
        ],
    );

    let err = Config::from_env().unwrap_err();
    clear_env();

    assert!(format!("{:#}", err).contains("failed to read"));
}
