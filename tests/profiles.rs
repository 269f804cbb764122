use dbaccess::profile::{DriverKind, ProfileValue, StaticExtensions};
use dbaccess::{ConnectionProfile, DbError, ParameterNormalizer};

fn from_json(json: &str) -> ConnectionProfile {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_json_profile_native_mysql() {
    let raw = from_json(
        r#"{
            "_name": "main",
            "Driver": "MySQLi",
            "host": "db.internal",
            "port": 3307,
            "user": "app",
            "password": "secret",
            "database": "shop",
            "persistent": true,
            "ssl_ca": "/etc/ca.pem"
        }"#,
    );
    let profile = ParameterNormalizer::new().normalize(&raw).unwrap();

    assert_eq!(profile.name.as_deref(), Some("main"));
    assert_eq!(profile.driver, DriverKind::MysqlNative);
    assert!(!profile.use_pdo);
    assert_eq!(profile.dsn, None);
    assert_eq!(profile.port, Some(3307));
    assert!(profile.persistent);
    assert_eq!(profile.charset, "UTF-8");
    assert_eq!(profile.table_prefix, "");
    assert_eq!(
        profile.extras.get("ssl_ca"),
        Some(&ProfileValue::Str("/etc/ca.pem".into()))
    );
}

#[test]
fn test_json_profile_usepdo_string_port() {
    let raw = from_json(
        r#"{
            "driver": "mysql",
            "usepdo": "yes",
            "host": "localhost",
            "port": "3306",
            "database": "shop",
            "charset": "latin1",
            "ssl_key": "/etc/key.pem",
            "compress": 1
        }"#,
    );
    let profile = ParameterNormalizer::new().normalize(&raw).unwrap();

    assert_eq!(profile.driver, DriverKind::MysqlPdo);
    assert_eq!(
        profile.dsn.as_deref(),
        Some("mysql:host=localhost;dbname=shop;port=3306;charset=latin1")
    );
    assert_eq!(profile.pdo_options, "ssl_key,compress");
}

#[test]
fn test_pdo_dsn_recovers_driver() {
    let raw = from_json(r#"{"driver": "pdo", "dsn": "pgsql:host=pg;dbname=app"}"#);
    let profile = ParameterNormalizer::new().normalize(&raw).unwrap();
    assert_eq!(profile.driver, DriverKind::GenericPdo);
    assert_eq!(profile.pdo_driver, "pgsql");
    assert_eq!(profile.dsn_body(), Some("host=pg;dbname=app"));
}

#[test]
fn test_missing_host_is_named() {
    let raw = from_json(r#"{"driver": "pdo_mysql", "database": "shop"}"#);
    match ParameterNormalizer::new().normalize(&raw) {
        Err(DbError::Configuration(message)) => assert!(message.contains("`host`")),
        other => panic!("Expected Configuration error, got {:?}", other),
    }
}

#[test]
fn test_extension_probe_is_injected() {
    let raw = from_json(r#"{"driver": "oci8", "host": "db", "database": "XE"}"#);
    let loaded = ParameterNormalizer::new().with_probe(StaticExtensions::new(["oci8"]));
    let missing = ParameterNormalizer::new().with_probe(StaticExtensions::new(["pdo_oci"]));

    let profile = loaded.normalize(&raw).unwrap();
    assert!(loaded.is_extension_activated(&profile));
    assert!(!missing.is_extension_activated(&profile));
}
