//! Visitor collection cycle.
//!
//! One cycle per mount:
//!
//! ```text
//! network ─┐
//! privacy ─┼─ join ─> device queries ─> read counter ─> snapshot ─> write counter ─> publish
//! id ──────┘
//! ```
//!
//! The three asynchronous detectors run concurrently and the cycle waits
//! for all of them. A soft detector failure becomes that detector's
//! default. Anything else (storage, a hard detector fault) ends the cycle
//! with no snapshot; the handle then reports [`CollectionStatus::Failed`].

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use serde::Serialize;

use crate::config::CollectorConfig;
use crate::detect::identifier::fingerprint_id;
use crate::detect::{
    DeviceDetector, FetchNetworkDetector, FingerprintIdGenerator, IdentifierGenerator,
    NetworkDetector, NetworkInfo, PrivacyDetector, StorageQuotaPrivacyDetector,
};
use crate::environment::{BrowserEnvironment, EnvironmentProbe};
use crate::error::{Result, VisitorError};
use crate::snapshot::{RiskLevel, VisitorSnapshot};
use crate::storage::{KeyValueStore, LocalStorageStore, VisitCounter};
use crate::timing::with_timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    /// Cycle still running
    Loading,
    /// Snapshot available
    Ready,
    /// Cycle finished without a snapshot
    Failed,
}

type SettledListener = Box<dyn FnOnce(CollectionStatus)>;

struct CollectionState {
    snapshot: Option<Rc<VisitorSnapshot>>,
    loading: bool,
    torn_down: bool,
    listeners: Vec<SettledListener>,
}

/// Observable output of one cycle: `{snapshot, loading}`.
///
/// Cheap to clone; all clones observe the same cycle.
#[derive(Clone)]
pub struct CollectionHandle {
    state: Rc<RefCell<CollectionState>>,
}

impl Default for CollectionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionHandle {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(CollectionState {
                snapshot: None,
                loading: true,
                torn_down: false,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn snapshot(&self) -> Option<Rc<VisitorSnapshot>> {
        self.state.borrow().snapshot.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn status(&self) -> CollectionStatus {
        let state = self.state.borrow();
        match (state.loading, state.snapshot.is_some()) {
            (true, _) => CollectionStatus::Loading,
            (false, true) => CollectionStatus::Ready,
            (false, false) => CollectionStatus::Failed,
        }
    }

    /// The consumer went away. A result arriving later is dropped.
    pub fn teardown(&self) {
        let mut state = self.state.borrow_mut();
        state.torn_down = true;
        state.listeners.clear();
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.borrow().torn_down
    }

    /// Run `listener` once when the cycle settles, or right away if it has.
    pub fn on_settled(&self, listener: impl FnOnce(CollectionStatus) + 'static) {
        let status = self.status();
        if status != CollectionStatus::Loading {
            listener(status);
            return;
        }
        let mut state = self.state.borrow_mut();
        if !state.torn_down {
            state.listeners.push(Box::new(listener));
        }
    }

    fn publish(&self, snapshot: Option<VisitorSnapshot>) {
        let listeners = {
            let mut state = self.state.borrow_mut();
            if state.torn_down {
                log::debug!("Collection finished after teardown, discarding result");
                return;
            }
            if !state.loading {
                log::warn!("Collection handle published twice, ignoring");
                return;
            }
            state.snapshot = snapshot.map(Rc::new);
            state.loading = false;
            std::mem::take(&mut state.listeners)
        };

        let status = self.status();
        for listener in listeners {
            listener(status);
        }
    }
}

/// Runs collection cycles against an environment and a counter store.
pub struct VisitorCollector {
    config: CollectorConfig,
    env: Box<dyn EnvironmentProbe>,
    store: Rc<dyn KeyValueStore>,
    device: DeviceDetector,
    network: Box<dyn NetworkDetector>,
    privacy: Box<dyn PrivacyDetector>,
    identifier: Box<dyn IdentifierGenerator>,
}

impl VisitorCollector {
    /// Collector wired to the live window, `localStorage` and `fetch`.
    pub fn browser(config: CollectorConfig) -> Result<Self> {
        config.validate()?;
        let env = BrowserEnvironment::new()?;
        let store = LocalStorageStore::new()?;
        Self::new(config, Box::new(env), Rc::new(store))
    }

    /// Collector over any environment and store, with the default detectors.
    pub fn new(
        config: CollectorConfig,
        env: Box<dyn EnvironmentProbe>,
        store: Rc<dyn KeyValueStore>,
    ) -> Result<Self> {
        let network = FetchNetworkDetector::new(&config.ip_info_url);
        Ok(Self {
            config,
            env,
            store,
            device: DeviceDetector::new(),
            network: Box::new(network),
            privacy: Box::new(StorageQuotaPrivacyDetector::new()),
            identifier: Box::new(FingerprintIdGenerator::new()),
        })
    }

    pub fn with_network(mut self, network: Box<dyn NetworkDetector>) -> Self {
        self.network = network;
        self
    }

    pub fn with_privacy(mut self, privacy: Box<dyn PrivacyDetector>) -> Self {
        self.privacy = privacy;
        self
    }

    pub fn with_identifier(mut self, identifier: Box<dyn IdentifierGenerator>) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn with_device(mut self, device: DeviceDetector) -> Self {
        self.device = device;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Start a cycle on the browser event loop and return its handle.
    pub fn start(self) -> CollectionHandle {
        let handle = CollectionHandle::new();
        let publisher = handle.clone();
        wasm_bindgen_futures::spawn_local(async move {
            self.run(&publisher).await;
        });
        handle
    }

    /// Run one cycle to completion and publish the outcome on `handle`.
    pub async fn run(&self, handle: &CollectionHandle) {
        let outcome = match self.collect().await {
            Ok(snapshot) => {
                log::info!(
                    "Collected visitor {} (visit {}, {} anomalies)",
                    snapshot.id,
                    snapshot.visit_count,
                    snapshot.anomalies.len()
                );
                Some(snapshot)
            }
            Err(e) => {
                log::error!("Error collecting visitor info: {}", e);
                None
            }
        };
        handle.publish(outcome);
    }

    /// One cycle: detectors, snapshot, counter write-back.
    pub async fn collect(&self) -> Result<VisitorSnapshot> {
        let env = self.env.as_ref();
        let timeout = self.config.detector_timeout_ms;

        let (network, is_private_mode, id) = futures::join!(
            settle(
                "network",
                with_timeout(self.network.detect(env), timeout),
                NetworkInfo::unavailable,
            ),
            settle(
                "privacy",
                with_timeout(self.privacy.detect(env), timeout),
                || false,
            ),
            settle(
                "identifier",
                with_timeout(non_empty_id(self.identifier.generate(env)), timeout),
                || fingerprint_id(env),
            )
        );
        let (network, is_private_mode, id) = (network?, is_private_mode?, id?);

        let browser = self.device.detect_browser(env);
        let device = self.device.detect_device(env);
        let anomalies = self.device.detect_device_anomalies(env);

        let counter = VisitCounter::new(self.store.as_ref(), &self.config.storage_key);
        let visit_count = counter.read()?;

        let snapshot = VisitorSnapshot {
            id,
            request_ip: network.source_ip.clone(),
            source_ip: network.source_ip,
            connection_type: network.connection_type,
            latency: network.latency,
            geolocation: network.geolocation,
            isp: network
                .isp
                .unwrap_or_else(|| self.config.fallback_isp.clone()),
            vpn_detected: network.vpn_detected,
            proxy_detected: network.proxy_detected,
            user_agent: env.user_agent(),
            browser_type: browser.browser_type,
            browser_version: browser.version,
            language: env.language(),
            plugins: env.plugins(),
            is_private_mode,
            is_suspicious_browser: browser.is_suspicious,
            device,
            screen: env.screen(),
            device_memory: env.device_memory(),
            hardware_concurrency: env.hardware_concurrency(),
            visit_count,
            last_visit: env.now_iso(),
            time_on_site: 0,
            pages_viewed: vec![env.page_path()],
            // Not derived from the anomalies
            risk_level: RiskLevel::Low,
            anomalies,
        };

        counter.advance(visit_count)?;
        Ok(snapshot)
    }
}

/// Soft failures become `fallback()`; hard ones are passed through.
async fn settle<T>(
    detector: &str,
    fut: impl Future<Output = Result<T>>,
    fallback: impl FnOnce() -> T,
) -> Result<T> {
    match fut.await {
        Ok(value) => Ok(value),
        Err(e) if e.is_soft() => {
            log::warn!("{} detector failed, using default: {}", detector, e);
            Ok(fallback())
        }
        Err(e) => Err(e),
    }
}

async fn non_empty_id(fut: impl Future<Output = Result<String>>) -> Result<String> {
    let id = fut.await?;
    if id.is_empty() {
        return Err(VisitorError::detector("identifier", "generated an empty id"));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::device::{ANOMALY_ASPECT_RATIO, ANOMALY_MOBILE_MOUSE, ANOMALY_SINGLE_CORE};
    use crate::environment::FixedEnvironment;
    use crate::snapshot::Geolocation;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use futures::executor::block_on;
    use futures::FutureExt;
    use std::cell::Cell;

    const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";

    struct StubNetwork(Result<NetworkInfo>);

    #[async_trait(?Send)]
    impl NetworkDetector for StubNetwork {
        async fn detect(&self, _env: &dyn EnvironmentProbe) -> Result<NetworkInfo> {
            self.0.clone()
        }
    }

    struct StalledNetwork;

    #[async_trait(?Send)]
    impl NetworkDetector for StalledNetwork {
        async fn detect(&self, _env: &dyn EnvironmentProbe) -> Result<NetworkInfo> {
            futures::future::pending().await
        }
    }

    struct StubPrivacy(Result<bool>);

    #[async_trait(?Send)]
    impl PrivacyDetector for StubPrivacy {
        async fn detect(&self, _env: &dyn EnvironmentProbe) -> Result<bool> {
            self.0.clone()
        }
    }

    struct StubIdentifier(Result<String>);

    #[async_trait(?Send)]
    impl IdentifierGenerator for StubIdentifier {
        async fn generate(&self, _env: &dyn EnvironmentProbe) -> Result<String> {
            self.0.clone()
        }
    }

    fn probe_result() -> NetworkInfo {
        NetworkInfo {
            source_ip: "203.0.113.7".into(),
            connection_type: "wifi".into(),
            latency: 38,
            geolocation: Geolocation {
                country: "France".into(),
                city: "Lyon".into(),
                timezone: "Europe/Paris".into(),
                latitude: 45.75,
                longitude: 4.85,
            },
            isp: None,
            vpn_detected: false,
            proxy_detected: false,
        }
    }

    fn collector_with(env: FixedEnvironment, store: Rc<MemoryStore>) -> VisitorCollector {
        VisitorCollector::new(CollectorConfig::default(), Box::new(env), store)
            .unwrap()
            .with_network(Box::new(StubNetwork(Ok(probe_result()))))
            .with_privacy(Box::new(StubPrivacy(Ok(false))))
            .with_identifier(Box::new(StubIdentifier(Ok("visitor-1".into()))))
    }

    fn collector(store: Rc<MemoryStore>) -> VisitorCollector {
        collector_with(FixedEnvironment::default(), store)
    }

    fn run_cycle(collector: &VisitorCollector) -> CollectionHandle {
        let handle = CollectionHandle::new();
        block_on(collector.run(&handle));
        handle
    }

    fn stored(store: &MemoryStore) -> Option<String> {
        store.get("visitCount").unwrap()
    }

    #[test]
    fn empty_store_reports_one_and_stores_two() {
        let store = Rc::new(MemoryStore::new());
        let handle = run_cycle(&collector(store.clone()));

        assert_eq!(handle.status(), CollectionStatus::Ready);
        assert!(!handle.is_loading());
        assert_eq!(handle.snapshot().unwrap().visit_count, 1);
        assert_eq!(stored(&store).as_deref(), Some("2"));
    }

    #[test]
    fn counter_shows_value_before_increment() {
        let store = Rc::new(MemoryStore::new());
        store.set("visitCount", "5").unwrap();
        let collector = collector(store.clone());

        for expected in 5..9u64 {
            let handle = run_cycle(&collector);
            assert_eq!(handle.snapshot().unwrap().visit_count, expected);
            assert_eq!(stored(&store), Some((expected + 1).to_string()));
        }
    }

    #[test]
    fn snapshot_fields() {
        let env = FixedEnvironment {
            page_path: "/dashboard".into(),
            ..Default::default()
        };
        let store = Rc::new(MemoryStore::new());
        let snapshot = run_cycle(&collector_with(env, store)).snapshot().unwrap();

        assert_eq!(snapshot.id, "visitor-1");
        assert_eq!(snapshot.source_ip, "203.0.113.7");
        assert_eq!(snapshot.request_ip, snapshot.source_ip);
        assert_eq!(snapshot.isp, "Local ISP");
        assert_eq!(snapshot.latency, 38);
        assert_eq!(snapshot.browser_type, "Chrome");
        assert_eq!(snapshot.device.device_type, "desktop");
        assert_eq!(snapshot.device.os.name, "Windows 10");
        assert_eq!(snapshot.time_on_site, 0);
        assert_eq!(snapshot.pages_viewed, vec!["/dashboard".to_string()]);
        assert_eq!(snapshot.last_visit, "2024-01-01T00:00:00.000Z");
        assert_eq!(snapshot.hardware_concurrency, Some(8));
        assert_eq!(snapshot.risk_level, RiskLevel::Low);
        assert!(snapshot.anomalies.is_empty());
    }

    #[test]
    fn risk_level_ignores_anomalies() {
        let env = FixedEnvironment {
            hardware_concurrency: Some(1),
            hover_capability: true,
            privacy_browser_marker: true,
            ..Default::default()
        }
        .with_user_agent(IPHONE_UA)
        .with_screen(3000, 900);
        let collector = collector_with(env, Rc::new(MemoryStore::new())).with_network(Box::new(
            StubNetwork(Ok(NetworkInfo {
                vpn_detected: true,
                proxy_detected: true,
                ..probe_result()
            })),
        ));

        let snapshot = run_cycle(&collector).snapshot().unwrap();
        assert_eq!(
            snapshot.anomalies,
            vec![ANOMALY_ASPECT_RATIO, ANOMALY_SINGLE_CORE, ANOMALY_MOBILE_MOUSE]
        );
        assert!(snapshot.is_suspicious_browser);
        assert_eq!(snapshot.risk_level, RiskLevel::Low);
    }

    #[test]
    fn stalled_detector_keeps_loading() {
        let store = Rc::new(MemoryStore::new());
        let collector = collector(store.clone()).with_network(Box::new(StalledNetwork));
        let handle = CollectionHandle::new();

        let mut cycle = Box::pin(collector.run(&handle));
        for _ in 0..3 {
            assert!((&mut cycle).now_or_never().is_none());
        }

        assert_eq!(handle.status(), CollectionStatus::Loading);
        assert!(handle.is_loading());
        assert!(handle.snapshot().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn soft_failures_use_defaults() {
        let store = Rc::new(MemoryStore::new());
        let collector = collector(store.clone())
            .with_network(Box::new(StubNetwork(Err(VisitorError::ProbeStatus(429)))))
            .with_privacy(Box::new(StubPrivacy(Err(VisitorError::Timeout(100)))))
            .with_identifier(Box::new(StubIdentifier(Ok(String::new()))));

        let snapshot = run_cycle(&collector).snapshot().unwrap();
        assert!(snapshot.source_ip.is_empty());
        assert!(snapshot.request_ip.is_empty());
        assert!(snapshot.geolocation.is_empty());
        assert_eq!(snapshot.connection_type, "unknown");
        assert!(!snapshot.is_private_mode);
        assert_eq!(snapshot.id, fingerprint_id(&FixedEnvironment::default()));
        assert_eq!(stored(&store).as_deref(), Some("2"));
    }

    #[test]
    fn windowless_detectors_fall_back() {
        let no_window = |name: &str| VisitorError::detector(name, "no window object");
        let store = Rc::new(MemoryStore::new());
        let collector = collector(store.clone())
            .with_network(Box::new(StubNetwork(Err(no_window("network")))))
            .with_privacy(Box::new(StubPrivacy(Err(no_window("privacy")))));

        let handle = run_cycle(&collector);
        assert_eq!(handle.status(), CollectionStatus::Ready);
        let snapshot = handle.snapshot().unwrap();
        assert_eq!(snapshot.connection_type, "unknown");
        assert!(!snapshot.is_private_mode);
        assert_eq!(stored(&store).as_deref(), Some("2"));
    }

    #[test]
    fn probe_isp_overrides_placeholder() {
        let collector = collector(Rc::new(MemoryStore::new())).with_network(Box::new(
            StubNetwork(Ok(NetworkInfo {
                isp: Some("Example Telecom".into()),
                ..probe_result()
            })),
        ));
        assert_eq!(run_cycle(&collector).snapshot().unwrap().isp, "Example Telecom");
    }

    #[test]
    fn storage_failure_ends_without_snapshot() {
        let store = Rc::new(MemoryStore::read_only());
        let handle = run_cycle(&collector(store));

        assert_eq!(handle.status(), CollectionStatus::Failed);
        assert!(!handle.is_loading());
        assert!(handle.snapshot().is_none());
    }

    #[test]
    fn hard_detector_fault_ends_without_snapshot() {
        let store = Rc::new(MemoryStore::new());
        let collector = collector(store.clone()).with_identifier(Box::new(StubIdentifier(Err(
            VisitorError::Internal("generator crashed".into()),
        ))));
        let handle = run_cycle(&collector);

        assert_eq!(handle.status(), CollectionStatus::Failed);
        // Counter untouched
        assert!(store.is_empty());
    }

    #[test]
    fn teardown_discards_late_result() {
        let store = Rc::new(MemoryStore::new());
        let collector = collector(store.clone());
        let handle = CollectionHandle::new();
        let notified = Rc::new(Cell::new(false));
        let flag = notified.clone();
        handle.on_settled(move |_| flag.set(true));

        handle.teardown();
        block_on(collector.run(&handle));

        assert!(handle.is_torn_down());
        assert!(handle.snapshot().is_none());
        assert!(handle.is_loading());
        assert!(!notified.get());
        // The cycle itself still ran
        assert_eq!(stored(&store).as_deref(), Some("2"));
    }

    #[test]
    fn listeners_fire_once_with_status() {
        let handle = CollectionHandle::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let early = seen.clone();
        handle.on_settled(move |s| early.borrow_mut().push(s));

        block_on(collector(Rc::new(MemoryStore::new())).run(&handle));
        // A second publish is ignored
        handle.publish(None);

        let late = seen.clone();
        handle.on_settled(move |s| late.borrow_mut().push(s));

        assert_eq!(
            *seen.borrow(),
            vec![CollectionStatus::Ready, CollectionStatus::Ready]
        );
        assert_eq!(handle.status(), CollectionStatus::Ready);
    }
}
