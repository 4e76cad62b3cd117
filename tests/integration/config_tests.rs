use clap::Parser;
use dupefinder::cli::Cli;
use dupefinder::config::Config;
use dupefinder::duplicates::SortKey;
use dupefinder::mapfile::MapFormat;
use dupefinder::scanner::{DigestAlgorithm, VanishedPolicy};
use dupefinder::Settings;
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_defaults() {
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.workers, 1);
    assert_eq!(config.algorithm, DigestAlgorithm::Md5);
}

#[test]
fn test_config_env_layer() {
    // Only `workers` is touched so parallel tests that run the app are unaffected.
    std::env::set_var("DUPEFINDER_WORKERS", "16");
    let config: Config = Config::figment(None).extract().unwrap();
    std::env::remove_var("DUPEFINDER_WORKERS");

    assert_eq!(config.workers, 16);
}

#[test]
fn test_config_file_layer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dupefinder.toml");
    fs::write(
        &path,
        "algorithm = \"sha256\"\nsort = \"name\"\nreverse = true\nabsolute_paths = true\n",
    )
    .unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();

    assert_eq!(config.algorithm, DigestAlgorithm::Sha256);
    assert_eq!(config.sort, SortKey::Name);
    assert!(config.reverse);
    assert!(config.absolute_paths);
    assert_eq!(config.map_format, MapFormat::Object);
}

#[test]
fn test_config_invalid_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "this is [not valid toml").unwrap();

    assert!(Config::load(Some(&path)).is_err());
}

#[test]
fn test_cli_flags_override_config() {
    let config = Config {
        workers: 3,
        algorithm: DigestAlgorithm::Blake3,
        sort: SortKey::Size,
        reverse: false,
        absolute_paths: true,
        map_format: MapFormat::Array,
        vanished: VanishedPolicy::Ignore,
    };

    let cli = Cli::try_parse_from(["dupefinder", "/data"]).unwrap();
    let settings = Settings::resolve(&cli, &config);
    assert_eq!(settings.scan.workers(), 3);
    assert_eq!(settings.scan.algorithm(), DigestAlgorithm::Blake3);
    assert_eq!(settings.scan.order().key, SortKey::Size);
    assert!(settings.absolute);
    assert_eq!(settings.map_format, MapFormat::Array);
    assert_eq!(settings.scan.vanished(), VanishedPolicy::Ignore);

    let cli = Cli::try_parse_from([
        "dupefinder",
        "-j",
        "6",
        "--algorithm",
        "md5",
        "--sort",
        "mtime",
        "--reverse",
        "--map-format",
        "object",
        "/data",
    ])
    .unwrap();
    let settings = Settings::resolve(&cli, &config);
    assert_eq!(settings.scan.workers(), 6);
    assert_eq!(settings.scan.algorithm(), DigestAlgorithm::Md5);
    assert_eq!(settings.scan.order().key, SortKey::ModificationTime);
    assert!(settings.scan.order().reverse);
    assert_eq!(settings.map_format, MapFormat::Object);
}

#[test]
fn test_negated_flags_override_config() {
    let config = Config {
        reverse: true,
        absolute_paths: true,
        vanished: VanishedPolicy::Fatal,
        ..Config::default()
    };

    let cli = Cli::try_parse_from(["dupefinder", "/data"]).unwrap();
    let settings = Settings::resolve(&cli, &config);
    assert!(settings.scan.order().reverse);
    assert!(settings.absolute);
    assert_eq!(settings.scan.vanished(), VanishedPolicy::Fatal);

    let cli = Cli::try_parse_from([
        "dupefinder",
        "--no-reverse",
        "--no-absolute",
        "--ignore-vanished",
        "/data",
    ])
    .unwrap();
    let settings = Settings::resolve(&cli, &config);
    assert!(!settings.scan.order().reverse);
    assert!(!settings.absolute);
    assert_eq!(settings.scan.vanished(), VanishedPolicy::Ignore);
}
