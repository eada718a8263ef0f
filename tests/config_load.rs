// tests/config_load.rs
use event_pulse::config::{PipelineConfig, SourcesConfig, ENV_PIPELINE_CONFIG_PATH};
use event_pulse::ConfigError;
use std::{env, fs};

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_PIPELINE_CONFIG_PATH);
    env::remove_var("PULSE_RELEVANCE_CUTOFF");
    env::remove_var("PULSE_DATE_WINDOW_DAYS");

    // 1) Nothing on disk → defaults
    let cfg = PipelineConfig::load_default().unwrap();
    assert_eq!(cfg, PipelineConfig::default());

    // 2) Fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("pulse.toml"), "relevance_cutoff = 80\n").unwrap();
    assert_eq!(PipelineConfig::load_default().unwrap().relevance_cutoff, 80);

    // 3) ENV path wins over the fallback
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "relevance_cutoff = 70\ndate_window_days = 5\n").unwrap();
    env::set_var(ENV_PIPELINE_CONFIG_PATH, p_env.display().to_string());
    let cfg = PipelineConfig::load_default().unwrap();
    assert_eq!((cfg.relevance_cutoff, cfg.date_window_days), (70, 5));

    // 4) Value overrides apply on top of the file
    env::set_var("PULSE_DATE_WINDOW_DAYS", "1");
    assert_eq!(PipelineConfig::load_default().unwrap().date_window_days, 1);
    env::remove_var("PULSE_DATE_WINDOW_DAYS");

    // 5) ENV path to a missing file is an error, not a silent fallback
    env::set_var(ENV_PIPELINE_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
    assert!(matches!(
        PipelineConfig::load_default(),
        Err(ConfigError::Load { .. })
    ));
    env::remove_var(ENV_PIPELINE_CONFIG_PATH);

    env::set_current_dir(&old).unwrap();
}

#[test]
fn malformed_toml_reports_the_path() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("bad.toml");
    fs::write(&p, "relevance_cutoff = \"high\"\n").unwrap();
    let err = PipelineConfig::load_from(&p).unwrap_err();
    assert!(err.to_string().contains("bad.toml"), "{err}");
}

#[serial_test::serial]
#[test]
fn repo_example_config_is_valid() {
    let cfg = PipelineConfig::load_from(std::path::Path::new("config/pulse.toml")).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg, PipelineConfig::default());
}

#[serial_test::serial]
#[test]
fn trend_endpoint_is_optional() {
    env::remove_var("TREND_ENDPOINT");
    assert!(SourcesConfig::from_env().trend_endpoint.is_none());

    env::set_var("TREND_ENDPOINT", "  ");
    assert!(SourcesConfig::from_env().trend_endpoint.is_none());

    env::set_var("TREND_ENDPOINT", "http://localhost:9000/interest");
    assert_eq!(
        SourcesConfig::from_env().trend_endpoint.as_deref(),
        Some("http://localhost:9000/interest")
    );
    env::remove_var("TREND_ENDPOINT");
}
