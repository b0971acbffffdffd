//! Integration tests for precache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Nothing listens on the discard port
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn precache(config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("precache");
        cmd.arg("--config").arg(config).env_remove("PRECACHE_CONFIG");
        cmd
    }

    /// Write a config with a small manifest and a private state dir
    fn write_config(temp: &TempDir, base_url: &str, generation: &str) -> PathBuf {
        let path = temp.path().join("config.toml");
        let content = format!(
            r#"[origin]
base_url = "{base_url}"
timeout_secs = 5

[controller]
generation = "{generation}"

[manifest]
assets = ["/", "/index.html", "/js/app.js"]

[storage]
state_dir = '{}'
"#,
            temp.path().join("state").display()
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("precache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Offline cache controller"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("precache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("precache"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("custom.toml");
        precache(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        precache(&temp.path().join("missing.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[controller]"))
            .stdout(predicate::str::contains("csi-calculator-v3"))
            .stdout(predicate::str::contains("exclusion_marker = \"/api/\""));
    }

    #[test]
    fn config_init_and_set() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");

        precache(&config).args(["config", "init"]).assert().success();
        assert!(config.exists());

        precache(&config)
            .args(["config", "set", "controller.generation", "csi-calculator-v4"])
            .assert()
            .success();

        precache(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("csi-calculator-v4"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let temp = TempDir::new().unwrap();
        precache(&temp.path().join("config.toml"))
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn status_without_registration() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, UNREACHABLE, "test-v1");
        precache(&config)
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("test-v1"));
    }

    #[test]
    fn fetch_without_controller_goes_to_network() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, UNREACHABLE, "test-v1");
        precache(&config)
            .args(["fetch", "/index.html"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network request failed"));
    }

    #[test]
    fn fetch_rejects_bad_method() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, UNREACHABLE, "test-v1");
        precache(&config)
            .args(["fetch", "-X", "BREW", "/index.html"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unsupported method"));
    }

    #[test]
    fn push_requires_registration() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, UNREACHABLE, "test-v1");
        precache(&config)
            .arg("push")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Run: precache update"));
    }

    #[test]
    fn offline_update_activates_empty_generation() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, UNREACHABLE, "test-v1");

        precache(&config)
            .arg("update")
            .assert()
            .success()
            .stderr(predicate::str::contains("Precached 0/3 assets"));

        precache(&config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("test-v1"));

        precache(&config)
            .args(["push", "Crew rates changed"])
            .assert()
            .success()
            .stdout(predicate::str::contains("CSI Crew Calculator: Crew rates changed"));

        precache(&config)
            .args(["push", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"body\": \"New update available!\""))
            .stdout(predicate::str::contains("/assets/icon-192.png"));

        // Nothing cached and no network: a sub-resource has nothing to fall back on
        precache(&config)
            .args(["fetch", "/js/app.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Offline"));
    }

    #[test]
    fn cache_show_without_registration_fails() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, UNREACHABLE, "test-v1");
        precache(&config)
            .args(["cache", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No controller registered"));
    }

    mod origin {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;
        use std::thread;

        /// Serve `body of <path>` with status 200 for every GET, forever.
        /// Returns the base URL.
        pub fn spawn() -> String {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();

            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { continue };
                    let mut reader = BufReader::new(stream.try_clone().unwrap());

                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).is_err() {
                        continue;
                    }
                    // Drain headers
                    let mut line = String::new();
                    while reader.read_line(&mut line).map(|n| n > 2).unwrap_or(false) {
                        line.clear();
                    }

                    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                    let body = format!("body of {}", path);
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes());
                }
            });

            format!("http://{}", addr)
        }
    }

    #[test]
    fn serves_from_cache_once_origin_is_gone() {
        let temp = TempDir::new().unwrap();
        let base_url = origin::spawn();
        let config = write_config(&temp, &base_url, "test-v1");

        precache(&config)
            .arg("update")
            .assert()
            .success()
            .stderr(predicate::str::contains("Precached 3/3 assets"));

        // Online: fresh network response
        precache(&config)
            .args(["fetch", "/js/app.js"])
            .assert()
            .success()
            .stdout("body of /js/app.js")
            .stderr(predicate::str::contains("network"));

        // Deploy a new generation; activation removes the old one
        precache(&config)
            .args(["config", "set", "controller.generation", "test-v2"])
            .assert()
            .success();
        precache(&config).arg("update").assert().success();
        precache(&config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("test-v2"))
            .stdout(predicate::str::contains("test-v1").not());

        // Origin goes away
        precache(&config)
            .args(["config", "set", "origin.base_url", UNREACHABLE])
            .assert()
            .success();

        precache(&config)
            .args(["fetch", "/js/app.js"])
            .assert()
            .success()
            .stdout("body of /js/app.js")
            .stderr(predicate::str::contains("cache"));

        precache(&config)
            .args(["fetch", "--navigate", "/ai-planner.html"])
            .assert()
            .success()
            .stdout("body of /index.html")
            .stderr(predicate::str::contains("offline-shell"));

        // Excluded paths are never served from the cache
        precache(&config)
            .args(["fetch", "/api/crew"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network request failed"));

        precache(&config)
            .args(["cache", "clear", "--yes"])
            .assert()
            .success();
        precache(&config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }
}
