//! Integration tests for pkgcache

mod pipeline_tests {
    use pkgcache::cache::{CacheStore, Headers, KeyStrategy, CACHE_STATUS_HEADER};
    use pkgcache::proxy::{CacheAddon, Flow, FlowCacheState, RequestVerdict, Response};
    use std::cell::Cell;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn addon(temp: &TempDir) -> CacheAddon {
        CacheAddon::new(CacheStore::new(temp.path(), KeyStrategy::default()))
    }

    /// Counts how often the proxy had to go upstream
    struct Origin {
        calls: Cell<usize>,
    }

    impl Origin {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }

        fn fetch(&self, status: u16, body: &[u8]) -> Response {
            self.calls.set(self.calls.get() + 1);
            let headers: Headers = [
                ("Content-Type", "application/octet-stream"),
                ("Content-Length", body.len().to_string().as_str()),
                ("Transfer-Encoding", "identity"),
                ("Keep-Alive", "timeout=5"),
            ]
            .into_iter()
            .collect();
            Response::new(status, body, headers)
        }
    }

    fn get(addon: &CacheAddon, origin: &Origin, url: &str, status: u16, body: &[u8]) -> Flow {
        let mut flow = Flow::new("GET", url);
        if addon.on_request(&mut flow) == RequestVerdict::Forward {
            flow.response = Some(origin.fetch(status, body));
        }
        addon.on_response(&mut flow);
        flow
    }

    #[test]
    fn arch_database_reused_across_mirrors() {
        let temp = TempDir::new().unwrap();
        let addon = addon(&temp);
        let origin = Origin::new();

        let first = get(
            &addon,
            &origin,
            "https://mirror1.example/archlinux/core/os/x86_64/core.db",
            200,
            b"mirror1 database",
        );
        assert_eq!(first.cache_state, FlowCacheState::Missed);

        let second = get(
            &addon,
            &origin,
            "https://mirror2.example/archlinux/core/os/x86_64/core.db",
            200,
            b"mirror2 database",
        );

        assert_eq!(origin.calls.get(), 1, "mirror2 must not be contacted");
        assert!(second.served_from_cache());
        let response = second.response.unwrap();
        assert_eq!(response.content, b"mirror1 database");
        assert_eq!(response.headers.get(CACHE_STATUS_HEADER), Some("HIT"));
        assert!(temp
            .path()
            .join("arch/core/x86_64/core.db.cache")
            .is_file());
    }

    #[test]
    fn apt_indexes_for_different_arches_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let addon = addon(&temp);
        let origin = Origin::new();

        let amd64 = "https://deb.example/dists/stable/main/binary-amd64/Packages.gz";
        let arm64 = "https://deb.example/dists/stable/main/binary-arm64/Packages.gz";

        get(&addon, &origin, amd64, 200, b"amd64 index");
        let flow = get(&addon, &origin, arm64, 200, b"arm64 index");
        assert_eq!(flow.cache_state, FlowCacheState::Missed);
        assert_eq!(origin.calls.get(), 2);

        let amd64_hit = get(&addon, &origin, amd64, 200, b"unused");
        assert_eq!(amd64_hit.response.unwrap().content, b"amd64 index");
        let arm64_hit = get(&addon, &origin, arm64, 200, b"unused");
        assert_eq!(arm64_hit.response.unwrap().content, b"arm64 index");
        assert_eq!(origin.calls.get(), 2);

        assert!(temp
            .path()
            .join("apt/dists/stable/main/binary-amd64/Packages.gz.headers.json")
            .is_file());
        assert!(temp
            .path()
            .join("apt/dists/stable/main/binary-arm64/Packages.gz.cache")
            .is_file());
    }

    #[test]
    fn error_responses_stay_uncached() {
        let temp = TempDir::new().unwrap();
        let addon = addon(&temp);
        let origin = Origin::new();
        let url = "https://deb.example/pool/main/m/missing/missing_1.0_amd64.deb";

        get(&addon, &origin, url, 404, b"not found");
        let again = get(&addon, &origin, url, 404, b"not found");

        assert_eq!(origin.calls.get(), 2);
        assert_eq!(again.cache_state, FlowCacheState::Missed);
        assert!(!temp.path().join("pkg").exists());
    }

    #[test]
    fn replayed_headers_never_carry_hop_by_hop() {
        let temp = TempDir::new().unwrap();
        let addon = addon(&temp);
        let origin = Origin::new();
        let url = "https://example.com/some/page?x=1";

        get(&addon, &origin, url, 200, b"page");
        let hit = get(&addon, &origin, url, 200, b"page").response.unwrap();

        for name in ["content-length", "transfer-encoding", "keep-alive"] {
            assert!(!hit.headers.contains(name), "{name} replayed");
        }
        assert_eq!(hit.headers.get("content-type"), Some("application/octet-stream"));

        let stored = std::fs::read_dir(temp.path().join("misc"))
            .unwrap()
            .filter_map(|e| e.ok())
            .find(|e| e.file_name().to_string_lossy().ends_with(".headers.json"))
            .unwrap();
        let raw = std::fs::read_to_string(stored.path()).unwrap();
        assert!(!raw.to_ascii_lowercase().contains("content-length"));
        assert!(raw.contains("\"x-cache-status\":\"MISS\""));
    }

    #[test]
    fn served_from_cache_passes_through_on_response_untouched() {
        let temp = TempDir::new().unwrap();
        let addon = addon(&temp);
        let origin = Origin::new();
        let url = "https://deb.example/dists/bookworm/InRelease";

        get(&addon, &origin, url, 200, b"signed release");
        let body_path = temp.path().join("apt/dists/bookworm/InRelease.cache");
        let before = std::fs::metadata(&body_path).unwrap().modified().unwrap();

        let hit = get(&addon, &origin, url, 200, b"unused");
        assert!(hit.served_from_cache());

        let after = std::fs::metadata(&body_path).unwrap().modified().unwrap();
        assert_eq!(before, after);
        assert_eq!(hit.response.unwrap().headers.cache_status(), Some("HIT"));
    }

    #[test]
    fn concurrent_mirrors_leave_one_complete_entry() {
        let temp = TempDir::new().unwrap();
        let addon = Arc::new(addon(&temp));
        let payloads: Vec<Vec<u8>> = (0..12u8)
            .map(|i| vec![b'a' + i; 32 * 1024 + usize::from(i) * 131])
            .collect();

        thread::scope(|s| {
            for (i, payload) in payloads.iter().enumerate() {
                let addon = Arc::clone(&addon);
                s.spawn(move || {
                    let mut flow = Flow::new(
                        "GET",
                        format!("https://mirror-{i}.example/archlinux/core/os/x86_64/core.db"),
                    );
                    flow.response = Some(Response::new(200, payload.clone(), Headers::new()));
                    addon.on_response(&mut flow);
                    assert_eq!(
                        flow.response.unwrap().headers.cache_status(),
                        Some("MISS")
                    );
                });
            }
        });

        let body = std::fs::read(temp.path().join("arch/core/x86_64/core.db.cache")).unwrap();
        assert_eq!(payloads.iter().filter(|p| **p == body).count(), 1);

        let mut flow = Flow::new("GET", "https://any.example/archlinux/core/os/x86_64/core.db");
        assert_eq!(addon.on_request(&mut flow), RequestVerdict::Respond);
        assert_eq!(flow.response.unwrap().content, body);
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use pkgcache::cache::{CacheStore, Headers, KeyStrategy};
    use pkgcache::url_norm::normalize;
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn pkgcache(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("pkgcache");
        cmd.env("PKGCACHE_CONFIG", temp.path().join("config.toml"))
            .env_remove("CACHE_DIR")
            .env_remove("RUST_LOG");
        cmd
    }

    fn seeded_cache(temp: &TempDir) -> std::path::PathBuf {
        let root = temp.path().join("cache");
        let store = CacheStore::new(&root, KeyStrategy::default());
        store
            .persist(
                &normalize("https://m.example/archlinux/extra/os/x86_64/extra.db").unwrap(),
                b"extra db",
                &Headers::new(),
            )
            .unwrap();
        root
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("package mirrors"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pkgcache"));
    }

    #[test]
    fn key_prints_package_key() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .args(["key", "http://deb.debian.org/debian/pool/main/c/curl/curl_8.5.0-2_amd64.deb"])
            .assert()
            .success()
            .stdout("pkg/curl_8.5.0-2_amd64.deb\n");
    }

    #[test]
    fn key_prints_hashed_key_for_other_urls() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .args(["key", "https://example.com/"])
            .assert()
            .success()
            .stdout(predicate::str::is_match("^misc/[0-9a-f]{64}\n$").unwrap());
    }

    #[test]
    fn key_json_reports_rule() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .args([
                "key",
                "--format",
                "json",
                "https://deb.example/dists/stable/main/binary-amd64/Packages.gz",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"class\": \"apt-metadata\""))
            .stdout(predicate::str::contains(
                "\"key\": \"apt/dists/stable/main/binary-amd64/Packages.gz\"",
            ));
    }

    #[test]
    fn key_rejects_invalid_url() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .args(["key", "not a url"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid URL"));
    }

    #[test]
    fn key_paths_follow_cache_dir_env() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .env("CACHE_DIR", "/srv/pkgcache")
            .args(["key", "--paths", "https://m.example/a_1_all.deb"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/srv/pkgcache/pkg/a_1_all.deb.cache"))
            .stdout(predicate::str::contains("/srv/pkgcache/pkg/a_1_all.deb.headers.json"));
    }

    #[test]
    fn list_empty_cache() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .args(["list", "--cache-dir"])
            .arg(temp.path().join("empty"))
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries found"));
    }

    #[test]
    fn list_shows_entries() {
        let temp = TempDir::new().unwrap();
        let root = seeded_cache(&temp);
        pkgcache(&temp)
            .args(["list", "--format", "plain", "--cache-dir"])
            .arg(&root)
            .assert()
            .success()
            .stdout("arch/extra/x86_64/extra.db\n");
    }

    #[test]
    fn lookup_reports_cached_entry() {
        let temp = TempDir::new().unwrap();
        let root = seeded_cache(&temp);
        pkgcache(&temp)
            .args([
                "lookup",
                "--format",
                "plain",
                "https://other-mirror.example/extra/os/x86_64/extra.db",
                "--cache-dir",
            ])
            .arg(&root)
            .assert()
            .success()
            .stdout("cached\n");
    }

    #[test]
    fn config_path_uses_env() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("the_cache_dir"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        pkgcache(&temp)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(temp.path().join("config.toml").is_file());
    }
}
