//! Scan registry.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::plugin::{self, DiscoveryOutcome};
use crate::scan::Scan;

/// Constructor for a registered scan.
pub type ScanConstructor = Arc<dyn Fn() -> Box<dyn Scan> + Send + Sync>;

/// Maps scan names to constructors.
///
/// An explicit value rather than process-global state: the entry point
/// builds one and threads it through, which keeps concurrent test runs
/// isolated. The executor never consults the registry; it exists to let
/// the entry point instantiate scans by name.
pub struct ScanRegistry {
    scans: HashMap<String, ScanConstructor>,
}

impl ScanRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { scans: HashMap::new() }
    }

    /// Register a scan constructor.
    ///
    /// The constructor is invoked once to read the scan's name. A
    /// constructor that panics, or a scan that reports an empty name, is
    /// logged and dropped; registration never fails the caller.
    /// Registering a name twice overwrites the earlier entry with a
    /// warning (last registration wins).
    pub fn register<F>(&mut self, ctor: F)
    where
        F: Fn() -> Box<dyn Scan> + Send + Sync + 'static,
    {
        let ctor: ScanConstructor = Arc::new(ctor);
        let name = match panic::catch_unwind(AssertUnwindSafe(|| ctor().name().to_string())) {
            Ok(name) => name,
            Err(_) => {
                warn!("scan constructor panicked during registration, ignoring");
                return;
            }
        };
        if name.is_empty() {
            warn!("scan reported an empty name, ignoring registration");
            return;
        }
        if self.scans.contains_key(&name) {
            warn!("scan '{name}' is already registered, overwriting");
        }
        debug!("registered scan: {name}");
        self.scans.insert(name, ctor);
    }

    /// Remove a scan by name.
    pub fn unregister(&mut self, name: &str) {
        if self.scans.remove(name).is_some() {
            debug!("unregistered scan: {name}");
        }
    }

    /// Constructor for a scan, if registered.
    pub fn get(&self, name: &str) -> Option<ScanConstructor> {
        self.scans.get(name).cloned()
    }

    /// Build a new instance of a registered scan.
    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Scan>> {
        self.scans.get(name).map(|ctor| ctor())
    }

    /// Snapshot of all registered constructors.
    ///
    /// Mutating the snapshot does not affect the registry.
    pub fn all(&self) -> HashMap<String, ScanConstructor> {
        self.scans.clone()
    }

    /// Sorted names of all registered scans.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scans.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered scans.
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    /// Whether the registry holds no scans.
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Remove every registered scan (test isolation).
    pub fn clear(&mut self) {
        self.scans.clear();
    }

    /// Load plugin units from a directory tree.
    ///
    /// Walks `dir` recursively for `.toml` scan definitions, skipping
    /// hidden and `_`-prefixed entries. Each unit is loaded inside its own
    /// failure boundary: a malformed unit is logged and reported in the
    /// outcome list without stopping the rest. Returns one `(unit name,
    /// outcome)` pair per unit found.
    pub fn discover(&mut self, dir: impl AsRef<Path>) -> Vec<(String, DiscoveryOutcome)> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!("plugin directory does not exist: {}", dir.display());
            return Vec::new();
        }
        info!("discovering plugins in {}", dir.display());

        let mut units = Vec::new();
        plugin::collect_units(dir, &mut units);
        units.sort();

        let mut outcomes = Vec::with_capacity(units.len());
        for path in units {
            let unit = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let outcome = match plugin::load_unit(&path, self) {
                Ok(names) => {
                    debug!("loaded plugin unit '{unit}' ({} scans)", names.len());
                    DiscoveryOutcome::Loaded(names)
                }
                Err(e) => {
                    warn!("failed to load plugin unit {}: {e}", path.display());
                    DiscoveryOutcome::Failed(e.to_string())
                }
            };
            outcomes.push((unit, outcome));
        }

        info!("discovery complete: {} scans registered", self.scans.len());
        outcomes
    }
}

impl Default for ScanRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ScanContext;
    use crate::result::ScanResult;
    use async_trait::async_trait;
    use chrono::Utc;

    struct StubScan {
        name: &'static str,
        description: &'static str,
    }

    #[async_trait]
    impl Scan for StubScan {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.description
        }

        async fn execute(&self, _ctx: &ScanContext) -> anyhow::Result<ScanResult> {
            let now = Utc::now();
            Ok(ScanResult::ok(self.name, now, now, "", serde_json::Value::Null))
        }
    }

    fn stub(name: &'static str, description: &'static str) -> impl Fn() -> Box<dyn Scan> {
        move || Box::new(StubScan { name, description }) as Box<dyn Scan>
    }

    #[test]
    fn register_and_instantiate() {
        let mut registry = ScanRegistry::new();
        registry.register(stub("ping", "ICMP reachability"));

        assert!(registry.get("ping").is_some());
        let scan = registry.instantiate("ping").unwrap();
        assert_eq!(scan.description(), "ICMP reachability");
        assert!(registry.instantiate("missing").is_none());
    }

    #[test]
    fn duplicate_registration_keeps_the_latest() {
        let mut registry = ScanRegistry::new();
        registry.register(stub("dup", "first"));
        registry.register(stub("dup", "second"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.instantiate("dup").unwrap().description(), "second");
    }

    #[test]
    fn empty_name_is_ignored() {
        let mut registry = ScanRegistry::new();
        registry.register(stub("", "nameless"));
        assert!(registry.is_empty());
    }

    #[test]
    fn panicking_constructor_is_ignored() {
        let mut registry = ScanRegistry::new();
        registry.register(|| -> Box<dyn Scan> { panic!("bad constructor") });
        assert!(registry.is_empty());
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = ScanRegistry::new();
        registry.register(stub("zeta", ""));
        registry.register(stub("alpha", ""));
        registry.register(stub("mid", ""));

        assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn unregister_and_clear() {
        let mut registry = ScanRegistry::new();
        registry.register(stub("a", ""));
        registry.register(stub("b", ""));

        registry.unregister("a");
        assert!(registry.get("a").is_none());
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_independent_of_the_registry() {
        let mut registry = ScanRegistry::new();
        registry.register(stub("a", ""));

        let mut snapshot = registry.all();
        snapshot.clear();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn discover_loads_good_units_and_reports_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("http.toml"),
            r#"
[[scan]]
name = "curl_headers"
description = "Fetch HTTP response headers"
timeout_secs = 60
command = ["curl", "-sI", "http://{target}/"]
requires_results = ["quick_nmap"]
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.toml"), "[[scan]\nname = oops").unwrap();
        std::fs::write(dir.path().join("_draft.toml"), "not even toml").unwrap();
        std::fs::write(dir.path().join(".hidden.toml"), "not even toml").unwrap();

        let nested = dir.path().join("extra");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            nested.join("dns.toml"),
            r#"
[[scan]]
name = "dig_any"
command = ["dig", "ANY", "{target}"]
"#,
        )
        .unwrap();

        let mut registry = ScanRegistry::new();
        let outcomes = registry.discover(dir.path());

        assert_eq!(outcomes.len(), 3);
        assert!(registry.get("curl_headers").is_some());
        assert!(registry.get("dig_any").is_some());

        let failed: Vec<&String> = outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, DiscoveryOutcome::Failed(_)))
            .map(|(unit, _)| unit)
            .collect();
        assert_eq!(failed, vec!["broken"]);
    }

    #[test]
    fn discover_on_missing_directory_is_a_no_op() {
        let mut registry = ScanRegistry::new();
        let outcomes = registry.discover("/no/such/autoscout/plugin/dir");
        assert!(outcomes.is_empty());
        assert!(registry.is_empty());
    }
}
