//! Subcommand implementations.
//!
//! Each command returns the process exit code: 0 on success, 1 when the
//! answer is "no" (unresolvable name, stale or missing snapshot).

use std::path::PathBuf;
use std::time::SystemTime;

use confcache_core::{CacheKey, CacheStatus, ConfigurationCache, Freshness};
use serde_json::json;

use crate::{GlobalArgs, ReportFormat, StatusArgs};

type CommandResult = Result<i32, Box<dyn std::error::Error>>;

fn open(global: &GlobalArgs) -> ConfigurationCache {
    ConfigurationCache::new(global.config.to_settings())
}

fn cache_key(key: &str, global: &GlobalArgs) -> Result<CacheKey, confcache_core::CacheError> {
    CacheKey::new(key, global.config.namespace())
}

/// Runs `confcache resolve`.
///
/// With `-v`, the probed locations are listed before each result.
pub fn resolve(names: &[String], global: &GlobalArgs) -> CommandResult {
    let cache = open(global);
    let show_candidates = global.verbose > 0 && !global.quiet;
    for name in names {
        if show_candidates {
            eprint!("{}", render_candidates(name, &cache.resolver().candidates(name)));
        }
        let resolved = cache.resolver().resolve(name)?;
        if !global.quiet {
            println!("{name}\t{}", resolved.display());
        }
    }
    Ok(0)
}

fn render_candidates(name: &str, candidates: &[PathBuf]) -> String {
    let mut out = format!("     Probing {name}\n");
    for (i, candidate) in candidates.iter().enumerate() {
        out.push_str(&format!("          {}. {}\n", i + 1, candidate.display()));
    }
    out
}

/// Runs `confcache path`.
pub fn path(key: &str, global: &GlobalArgs) -> CommandResult {
    let cache = open(global);
    let key = cache_key(key, global)?;
    println!("{}", cache.cache_path(&key).display());
    Ok(0)
}

/// Runs `confcache status`.
pub fn status(args: &StatusArgs, global: &GlobalArgs) -> CommandResult {
    let cache = open(global);
    let key = cache_key(&args.key, global)?;
    let deps = cache.dependencies(&args.config_path, args.mappings.as_slice())?;
    let status = cache.status(&key, &deps)?;

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                print!("{}", render_text(&status, deps.len()));
            }
        }
        ReportFormat::Json => {
            let report = json!({
                "key": key.name(),
                "namespace": key.namespace().label(),
                "path": status.path.display().to_string(),
                "freshness": freshness_label(status.freshness),
                "cache_timestamp": status.cache_timestamp.map(unix_seconds),
                "dependency_timestamp": unix_seconds(status.dependency_timestamp),
                "dependencies": deps.paths().iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(if status.freshness == Freshness::Current {
        0
    } else {
        1
    })
}

/// Runs `confcache clear`.
pub fn clear(key: &str, global: &GlobalArgs) -> CommandResult {
    let cache = open(global);
    let key = cache_key(key, global)?;
    let removed = cache.invalidate(&key)?;
    if !global.quiet {
        if removed {
            eprintln!("     Removed {}", cache.cache_path(&key).display());
        } else {
            eprintln!("     Nothing to remove for '{}'", key.name());
        }
    }
    Ok(0)
}

fn freshness_label(f: Freshness) -> &'static str {
    match f {
        Freshness::Missing => "missing",
        Freshness::Stale => "stale",
        Freshness::Current => "current",
    }
}

/// Seconds since the Unix epoch, with millisecond precision. Times before the
/// epoch clamp to zero.
fn unix_seconds(t: SystemTime) -> f64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| (d.as_millis() as f64) / 1000.0)
        .unwrap_or(0.0)
}

fn render_text(status: &CacheStatus, dependency_count: usize) -> String {
    let cache_time = status
        .cache_timestamp
        .map(|t| format!("{:.3}", unix_seconds(t)))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "    Snapshot {}\n      Status {}\n  Cache time {}\n   Dep. time {:.3} ({} files)\n",
        status.path.display(),
        freshness_label(status.freshness),
        cache_time,
        unix_seconds(status.dependency_timestamp),
        dependency_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn unix_seconds_millisecond_precision() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert!((unix_seconds(t) - 1_700_000_000.123).abs() < 1e-6);
        assert_eq!(unix_seconds(SystemTime::UNIX_EPOCH), 0.0);
    }

    #[test]
    fn render_missing_snapshot() {
        let status = CacheStatus {
            path: PathBuf::from("/tmp/orm-0123456789abcdef.cfgcache"),
            freshness: Freshness::Missing,
            cache_timestamp: None,
            dependency_timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(10),
        };
        let text = render_text(&status, 3);
        assert!(text.contains("orm-0123456789abcdef.cfgcache"));
        assert!(text.contains("Status missing"));
        assert!(text.contains("Cache time -"));
        assert!(text.contains("10.000 (3 files)"));
    }

    #[test]
    fn candidates_listed_in_probe_order() {
        let candidates = vec![
            PathBuf::from("Orders.Mappings"),
            PathBuf::from("/opt/shop/bin/Orders.Mappings"),
            PathBuf::from("Orders.Mappings.dll"),
            PathBuf::from("/opt/shop/bin/Orders.Mappings.dll"),
        ];
        let text = render_candidates("Orders.Mappings", &candidates);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("Probing Orders.Mappings"));
        assert!(lines[1].ends_with("1. Orders.Mappings"));
        assert!(lines[4].ends_with("4. /opt/shop/bin/Orders.Mappings.dll"));
    }

    #[test]
    fn verbose_resolve_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Orders.Mappings.dll"), b"x").unwrap();
        let settings = format!("[resolver]\nbase_dir = {:?}\n", dir.path());
        let global = GlobalArgs {
            quiet: false,
            verbose: 1,
            config: confcache_config::load_config_from_str(&settings).unwrap(),
        };
        assert_eq!(resolve(&["Orders.Mappings".to_string()], &global).unwrap(), 0);
        assert!(resolve(&["Ghost.Mappings".to_string()], &global).is_err());
    }

    #[test]
    fn freshness_labels() {
        assert_eq!(freshness_label(Freshness::Current), "current");
        assert_eq!(freshness_label(Freshness::Stale), "stale");
        assert_eq!(freshness_label(Freshness::Missing), "missing");
    }

    #[test]
    fn status_exit_code_tracks_freshness() {
        let dir = tempfile::tempdir().unwrap();
        let settings = format!(
            "[cache]\ndirectory = {:?}\n[resolver]\nbase_dir = {:?}\n[namespace]\nlabel = \"cli-test\"\n",
            dir.path().join("cache"),
            dir.path()
        );
        std::fs::write(dir.path().join("orm.cfg.xml"), b"<cfg/>").unwrap();
        let global = GlobalArgs {
            quiet: true,
            verbose: 0,
            config: confcache_config::load_config_from_str(&settings).unwrap(),
        };
        let args = StatusArgs {
            key: "orm".to_string(),
            config_path: "orm.cfg.xml".to_string(),
            mappings: vec![],
            format: ReportFormat::Text,
        };

        assert_eq!(status(&args, &global).unwrap(), 1);

        let cache = open(&global);
        let key = cache_key("orm", &global).unwrap();
        let deps = cache.dependencies("orm.cfg.xml", &[] as &[&str]).unwrap();
        cache.save(&key, &"snapshot".to_string(), &deps).unwrap();
        assert_eq!(status(&args, &global).unwrap(), 0);

        assert_eq!(clear("orm", &global).unwrap(), 0);
        assert_eq!(status(&args, &global).unwrap(), 1);
    }
}
