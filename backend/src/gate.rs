//! Tenant/license gate.
//!
//! Every portal request first asks the gate whether the site may run and, in
//! multi-tenant mode, which tenant's data subtree it should see. The answer
//! is recomputed per request from the store, so license edits, activation
//! and imports take effect without a restart.

use crate::config::Tenancy;
use crate::handlers::{ApiError, AppState};
use crate::local_state::LocalState;
use crate::store::Store;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use portal_core::license::{
    self, tenant_data_prefix, ActivationError, GateDecision, SUPER_ADMIN_ROOT,
};
use portal_core::{AdminCredential, BrandingSettings, License, Restrictions, Screen};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store path of the global restrictions record.
pub fn global_restrictions_path() -> String {
    format!("{SUPER_ADMIN_ROOT}/restrictions")
}

/// The tenant a request runs against. Inserted as a request extension by
/// [`require_open`].
#[derive(Clone)]
pub struct Tenant {
    /// Store scoped to the tenant's data
    pub store: Store,
    /// Restrictions in force
    pub restrictions: Restrictions,
    /// Activation code, `None` in single-tenant mode
    pub license_code: Option<String>,
}

/// Current gate state
#[derive(Clone)]
pub enum GateState {
    Open(Tenant),
    ActivationRequired,
    Closed { code: &'static str, screen: Screen },
}

impl GateState {
    /// Short name for responses and logs
    pub fn label(&self) -> &'static str {
        match self {
            GateState::Open(_) => "open",
            GateState::ActivationRequired => "activationRequired",
            GateState::Closed { .. } => "closed",
        }
    }
}

pub struct Gate {
    root: Store,
    local: Arc<LocalState>,
    tenancy: Tenancy,
}

impl Gate {
    pub fn new(root: Store, local: Arc<LocalState>, tenancy: Tenancy) -> Self {
        Self {
            root,
            local,
            tenancy,
        }
    }

    pub fn tenancy(&self) -> Tenancy {
        self.tenancy
    }

    /// Evaluate the gate against the store as it is now.
    pub async fn resolve(&self) -> GateState {
        match self.tenancy {
            Tenancy::Single => {
                let restrictions = self
                    .root
                    .get_as::<Restrictions>(&global_restrictions_path())
                    .await
                    .unwrap_or_default();
                self.state_for(license::evaluate_global(&restrictions), None)
            }
            Tenancy::Multi => {
                let Some(code) = self.local.active_license().await else {
                    return GateState::ActivationRequired;
                };
                let record = load_license(&self.root, &code).await;
                match license::evaluate(record.as_ref(), Utc::now()) {
                    GateDecision::NotFound => {
                        info!(license = %code, "Cached license no longer exists, clearing");
                        self.local.set_active_license(None).await;
                        GateState::ActivationRequired
                    }
                    decision => self.state_for(decision, Some(code)),
                }
            }
        }
    }

    fn state_for(&self, decision: GateDecision, code: Option<String>) -> GateState {
        match decision {
            GateDecision::Open(restrictions) => {
                let store = match &code {
                    Some(code) => self.root.scoped(&tenant_data_prefix(code)),
                    None => self.root.clone(),
                };
                GateState::Open(Tenant {
                    store,
                    restrictions,
                    license_code: code,
                })
            }
            GateDecision::NotFound => GateState::ActivationRequired,
            GateDecision::Suspended(screen) | GateDecision::Maintenance(screen) => {
                GateState::Closed {
                    code: "MAINTENANCE",
                    screen,
                }
            }
            GateDecision::Expired(screen) => GateState::Closed {
                code: "LICENSE_EXPIRED",
                screen,
            },
        }
    }

    /// Validate and cache an activation code, then seed the tenant's
    /// first-run records.
    pub async fn activate(&self, raw: &str) -> Result<GateState, ActivationError> {
        let code = license::normalize_code(raw);
        if !is_valid_code(&code) {
            return Err(ActivationError::Unknown);
        }

        let record = load_license(&self.root, &code).await;
        if let Err(e) = license::validate_activation(record.as_ref(), Utc::now()) {
            warn!(license = %code, reason = ?e, "Activation refused");
            return Err(e);
        }

        self.local.set_active_license(Some(code.clone())).await;
        seed_tenant(&self.root.scoped(&tenant_data_prefix(&code))).await;
        info!(license = %code, "License activated");
        Ok(self.resolve().await)
    }

    /// Seed defaults for whichever tenant is currently open.
    pub async fn seed_current(&self) {
        if let GateState::Open(tenant) = self.resolve().await {
            seed_tenant(&tenant.store).await;
        }
    }
}

/// Fields of a license record the gate reads. The record's `data` and
/// notice subtrees sit beside them and are never loaded here.
const LICENSE_FIELDS: [&str; 4] = ["name", "status", "expiry", "restrictions"];

/// Read a license record field by field. `None` when none of its fields
/// exist.
pub async fn load_license(root: &Store, code: &str) -> Option<License> {
    let path = license::license_path(code);
    let mut record = Map::new();
    for field in LICENSE_FIELDS {
        if let Some(value) = root.get(&format!("{path}/{field}")).await {
            record.insert(field.to_string(), value);
        }
    }
    if record.is_empty() {
        return None;
    }
    match serde_json::from_value(Value::Object(record)) {
        Ok(license) => Some(license),
        Err(e) => {
            warn!(license = %code, error = %e, "Malformed license record");
            None
        }
    }
}

fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Write the default admin credential and branding if they are missing.
pub async fn seed_tenant(store: &Store) {
    if store.get("admin").await.is_none() {
        store.set_as("admin", &AdminCredential::default()).await;
        debug!(prefix = ?store.prefix(), "Seeded default admin credential");
    }
    if store.get("branding").await.is_none() {
        store.set_as("branding", &BrandingSettings::default()).await;
        debug!(prefix = ?store.prefix(), "Seeded default branding");
    }
}

/// Middleware: reject portal routes while the gate is not open, otherwise
/// attach the [`Tenant`] to the request.
pub async fn require_open(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match state.gate.resolve().await {
        GateState::Open(tenant) => {
            request.extensions_mut().insert(tenant);
            Ok(next.run(request).await)
        }
        GateState::ActivationRequired => Err(ApiError::ActivationRequired),
        GateState::Closed { code, screen } => Err(ApiError::GateClosed { code, screen }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvBackend, KvError, MemoryBackend};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that remembers the largest value it handed out.
    #[derive(Default)]
    struct Measured {
        inner: MemoryBackend,
        largest: AtomicUsize,
    }

    impl Measured {
        fn note(&self, value: &Option<Value>) {
            let size = value.as_ref().map_or(0, |v| v.to_string().len());
            self.largest.fetch_max(size, Ordering::SeqCst);
        }
    }

    impl KvBackend for Measured {
        fn read(&self, root: &str) -> Result<Option<Value>, KvError> {
            let value = self.inner.read(root)?;
            self.note(&value);
            Ok(value)
        }

        fn read_at(&self, root: &str, path: &[String]) -> Result<Option<Value>, KvError> {
            let value = self.inner.read_at(root, path)?;
            self.note(&value);
            Ok(value)
        }

        fn write(&self, root: &str, value: Value) -> Result<(), KvError> {
            self.inner.write(root, value)
        }

        fn remove(&self, root: &str) -> Result<(), KvError> {
            self.inner.remove(root)
        }

        fn roots(&self) -> Result<Vec<String>, KvError> {
            self.inner.roots()
        }
    }

    fn gate(tenancy: Tenancy) -> (Gate, Store, Arc<LocalState>) {
        let root = Store::new(Arc::new(MemoryBackend::new()));
        let local = Arc::new(LocalState::in_memory());
        (Gate::new(root.clone(), local.clone(), tenancy), root, local)
    }

    #[tokio::test]
    async fn single_tenant_open_by_default() {
        let (gate, _, _) = gate(Tenancy::Single);
        match gate.resolve().await {
            GateState::Open(tenant) => {
                assert!(tenant.license_code.is_none());
                assert!(tenant.store.prefix().is_none());
            }
            other => panic!("expected open, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn single_tenant_site_switch() {
        let (gate, root, _) = gate(Tenancy::Single);
        root.set(
            "superAdmin/restrictions",
            json!({ "siteEnabled": false, "maintenanceTitle": "Back soon" }),
        )
        .await;
        match gate.resolve().await {
            GateState::Closed { code, screen } => {
                assert_eq!(code, "MAINTENANCE");
                assert_eq!(screen.title, "Back soon");
            }
            other => panic!("expected closed, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn multi_tenant_requires_activation() {
        let (gate, _, _) = gate(Tenancy::Multi);
        assert!(matches!(gate.resolve().await, GateState::ActivationRequired));
    }

    #[tokio::test]
    async fn activation_scopes_and_seeds_tenant() {
        let (gate, root, local) = gate(Tenancy::Multi);
        root.set("superAdmin/licenses/ABC123", json!({ "status": "active" }))
            .await;

        let state = gate.activate("  abc123 ").await.unwrap();
        let GateState::Open(tenant) = state else {
            panic!("expected open");
        };
        assert_eq!(tenant.license_code.as_deref(), Some("ABC123"));
        assert_eq!(local.active_license().await.as_deref(), Some("ABC123"));
        assert_eq!(
            root.get("superAdmin/licenses/ABC123/data/admin/email").await,
            Some(json!("admin@admin.com"))
        );
    }

    #[tokio::test]
    async fn activation_refusals() {
        let (gate, root, local) = gate(Tenancy::Multi);
        root.set("superAdmin/licenses/SUS", json!({ "status": "suspended" }))
            .await;
        root.set("superAdmin/licenses/OLD", json!({ "expiry": "2000-01-01" }))
            .await;

        assert_eq!(gate.activate("nope").await.err(), Some(ActivationError::Unknown));
        assert_eq!(gate.activate("sus").await.err(), Some(ActivationError::Suspended));
        assert_eq!(gate.activate("old").await.err(), Some(ActivationError::Expired));
        assert_eq!(gate.activate("../x").await.err(), Some(ActivationError::Unknown));
        assert!(local.active_license().await.is_none());
    }

    #[tokio::test]
    async fn vanished_license_clears_cache() {
        let (gate, root, local) = gate(Tenancy::Multi);
        root.set("superAdmin/licenses/ABC", json!({ "status": "active" }))
            .await;
        gate.activate("ABC").await.unwrap();

        root.delete("superAdmin/licenses/ABC").await;
        assert!(matches!(gate.resolve().await, GateState::ActivationRequired));
        assert!(local.active_license().await.is_none());
    }

    #[tokio::test]
    async fn suspension_after_activation_closes_site() {
        let (gate, root, _) = gate(Tenancy::Multi);
        root.set("superAdmin/licenses/ABC", json!({ "status": "active" }))
            .await;
        gate.activate("ABC").await.unwrap();

        root.set("superAdmin/licenses/ABC/status", json!("suspended"))
            .await;
        match gate.resolve().await {
            GateState::Closed { screen, .. } => assert_eq!(screen.title, "Access Suspended"),
            other => panic!("expected closed, got {}", other.label()),
        }
    }

    #[tokio::test]
    async fn resolve_reads_license_fields_without_tenant_data() {
        let backend = Arc::new(Measured::default());
        let root = Store::new(backend.clone());
        let local = Arc::new(LocalState::in_memory());
        let gate = Gate::new(root.clone(), local, Tenancy::Multi);

        let payload = "A".repeat(100_000);
        for code in ["ABC", "XYZ"] {
            root.set(
                &license::license_path(code),
                json!({
                    "status": "active",
                    "expiry": "2999-12-31",
                    "data": { "videos": { "v1": { "file": payload } } }
                }),
            )
            .await;
        }
        gate.activate("ABC").await.unwrap();

        backend.largest.store(0, Ordering::SeqCst);
        let GateState::Open(tenant) = gate.resolve().await else {
            panic!("expected open");
        };
        assert_eq!(tenant.license_code.as_deref(), Some("ABC"));
        assert!(backend.largest.load(Ordering::SeqCst) < 1_000);
    }

    #[tokio::test]
    async fn load_license_ignores_data_subtree() {
        let (_, root, _) = gate(Tenancy::Multi);
        root.set(
            "superAdmin/licenses/ABC",
            json!({ "name": "Physics", "status": "suspended", "data": { "notes": { "n": {} } } }),
        )
        .await;
        let license = load_license(&root, "ABC").await.unwrap();
        assert_eq!(license.name.as_deref(), Some("Physics"));
        assert!(load_license(&root, "NONE").await.is_none());
    }
}
