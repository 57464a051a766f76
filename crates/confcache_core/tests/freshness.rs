//! End-to-end behavior of `ConfigurationCache` against real files.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use confcache_core::{
    CacheError, CacheKey, CacheSettings, ConfigurationCache, DependencySet, Lookup, Namespace,
    PathResolver,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OrmConfiguration {
    connection: String,
    mappings: BTreeMap<String, Vec<String>>,
}

fn sample() -> OrmConfiguration {
    let mut mappings = BTreeMap::new();
    mappings.insert(
        "Orders.Mappings".to_string(),
        vec!["Order".to_string(), "OrderLine".to_string()],
    );
    mappings.insert(
        "Billing.Mappings".to_string(),
        vec!["Invoice".to_string()],
    );
    OrmConfiguration {
        connection: "Host=db;Database=shop".to_string(),
        mappings,
    }
}

struct App {
    root: tempfile::TempDir,
    cache: ConfigurationCache,
}

impl App {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let bin = root.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let cache = ConfigurationCache::new(CacheSettings {
            directory: root.path().join("tmp"),
            resolver: PathResolver::with_base_dir(&bin),
            ..CacheSettings::default()
        });
        let app = Self { root, cache };
        app.write("Orders.Mappings.dll", 1_700_000_000);
        app.write("Billing.Mappings.dll", 1_700_000_200);
        app.write("orm.cfg.xml", 1_700_000_100);
        app
    }

    fn bin(&self, name: &str) -> PathBuf {
        self.root.path().join("bin").join(name)
    }

    fn write(&self, name: &str, secs: u64) {
        std::fs::write(self.bin(name), name.as_bytes()).unwrap();
        touch(&self.bin(name), at(secs));
    }

    fn load(&self, key: &CacheKey) -> Result<Option<OrmConfiguration>, CacheError> {
        self.cache
            .load(key, "orm.cfg.xml", &["Orders.Mappings", "Billing.Mappings"])
    }

    fn deps(&self) -> DependencySet {
        self.cache
            .dependencies("orm.cfg.xml", &["Orders.Mappings", "Billing.Mappings"])
            .unwrap()
    }
}

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn touch(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

fn mtime(path: &Path) -> SystemTime {
    std::fs::metadata(path).unwrap().modified().unwrap()
}

fn key() -> CacheKey {
    CacheKey::new("orm", Namespace::new("/opt/shop/bin/shop")).unwrap()
}

#[test]
fn save_then_load_round_trips() {
    let app = App::new();
    assert!(app.load(&key()).unwrap().is_none());

    app.cache.save(&key(), &sample(), &app.deps()).unwrap();
    assert_eq!(app.load(&key()).unwrap(), Some(sample()));
}

#[test]
fn load_is_idempotent() {
    let app = App::new();
    app.cache.save(&key(), &sample(), &app.deps()).unwrap();

    let first = app.load(&key()).unwrap();
    let second = app.load(&key()).unwrap();
    assert_eq!(first, second);
    assert!(first.is_some());
}

#[test]
fn touching_a_mapping_after_save_invalidates() {
    let app = App::new();
    app.cache.save(&key(), &sample(), &app.deps()).unwrap();

    touch(&app.bin("Orders.Mappings.dll"), at(1_700_000_500));
    assert!(app.load(&key()).unwrap().is_none());
}

#[test]
fn touching_the_config_after_save_invalidates() {
    let app = App::new();
    app.cache.save(&key(), &sample(), &app.deps()).unwrap();

    touch(&app.bin("orm.cfg.xml"), SystemTime::now());
    assert!(app.load(&key()).unwrap().is_none());
}

#[test]
fn stamp_ignores_write_time() {
    let app = App::new();
    app.cache.save(&key(), &sample(), &app.deps()).unwrap();

    // The snapshot is stamped from the dependencies, long before "now".
    let stamp = mtime(&app.cache.cache_path(&key()));
    assert!(stamp < at(1_700_000_201));
    assert!(stamp > at(1_700_000_200));
}

#[test]
fn equal_timestamps_are_stale() {
    let app = App::new();
    app.cache.save(&key(), &sample(), &app.deps()).unwrap();
    let stamp = mtime(&app.cache.cache_path(&key()));

    touch(&app.bin("orm.cfg.xml"), stamp);
    assert!(app.load(&key()).unwrap().is_none());
}

#[test]
fn older_snapshot_is_stale() {
    let app = App::new();
    app.cache.save(&key(), &sample(), &app.deps()).unwrap();
    touch(&app.cache.cache_path(&key()), at(1_600_000_000));
    assert!(app.load(&key()).unwrap().is_none());
}

#[test]
fn corrupt_current_snapshot_is_a_miss() {
    let app = App::new();
    app.cache.save(&key(), &sample(), &app.deps()).unwrap();
    let path = app.cache.cache_path(&key());
    let stamp = mtime(&path);

    std::fs::write(&path, b"\xde\xad\xbe\xef not a snapshot").unwrap();
    touch(&path, stamp);

    assert!(app.load(&key()).unwrap().is_none());
    let lookup: Lookup<OrmConfiguration> = app.cache.lookup(&key(), &app.deps()).unwrap();
    assert!(matches!(lookup, Lookup::Corrupt(_)));
}

#[test]
fn unresolvable_mapping_fails_before_staleness_check() {
    let app = App::new();
    app.cache.save(&key(), &sample(), &app.deps()).unwrap();

    let err = app
        .cache
        .load::<OrmConfiguration, _>(&key(), "orm.cfg.xml", &["Orders.Mappings", "Ghost.Mappings"])
        .unwrap_err();
    match err {
        CacheError::NotFound { raw, .. } => assert_eq!(raw, "Ghost.Mappings"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn unresolvable_config_fails() {
    let app = App::new();
    let err = app
        .cache
        .load::<OrmConfiguration, _>(&key(), "hibernate.cfg.xml", &["Orders.Mappings"])
        .unwrap_err();
    assert!(matches!(err, CacheError::NotFound { .. }));
}

#[test]
fn empty_dependency_set_uses_sentinel() {
    let app = App::new();
    let none = DependencySet::new();

    let loaded: Option<OrmConfiguration> = app.cache.load_with(&key(), &none).unwrap();
    assert!(loaded.is_none());

    app.cache.save(&key(), &sample(), &none).unwrap();
    let loaded: Option<OrmConfiguration> = app.cache.load_with(&key(), &none).unwrap();
    assert_eq!(loaded, Some(sample()));
}

#[test]
fn namespaces_do_not_share_snapshots() {
    let app = App::new();
    let shop = key();
    let billing = CacheKey::new("orm", Namespace::new("/opt/billing/bin/billing")).unwrap();

    app.cache.save(&shop, &sample(), &app.deps()).unwrap();
    assert_ne!(app.cache.cache_path(&shop), app.cache.cache_path(&billing));
    assert!(app.load(&billing).unwrap().is_none());
}

#[test]
fn save_overwrites_previous_snapshot() {
    let app = App::new();
    app.cache.save(&key(), &sample(), &app.deps()).unwrap();

    let mut updated = sample();
    updated.connection = "Host=replica;Database=shop".to_string();
    app.cache.save(&key(), &updated, &app.deps()).unwrap();

    assert_eq!(app.load(&key()).unwrap(), Some(updated));
}

#[test]
fn save_into_unwritable_directory_errors() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("tmp");
    std::fs::write(&blocker, b"a file, not a directory").unwrap();
    let cache = ConfigurationCache::new(CacheSettings {
        directory: blocker,
        resolver: PathResolver::with_base_dir(root.path()),
        ..CacheSettings::default()
    });

    let err = cache
        .save(&key(), &sample(), &DependencySet::new())
        .unwrap_err();
    assert!(matches!(err, CacheError::Io { .. }));
}
