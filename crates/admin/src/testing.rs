//! Router fixtures over in-memory tenant stores.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use bankdesk_core::{RelationKind, RoleFlags, TenantKey};

use crate::config::SupportConfig;
use crate::db::{MemoryStore, SupportStore};
use crate::middleware::{STAFF_ID_HEADER, STAFF_TENANT_HEADER};
use crate::models::{NewHierarchyEdge, UserRecord};
use crate::routes;
use crate::state::AppState;
use crate::tenancy::TenantPools;

pub const ADMIN: RoleFlags = RoleFlags {
    is_admin: true,
    is_manager: false,
    is_superior_manager: false,
};

pub const MANAGER: RoleFlags = RoleFlags {
    is_admin: false,
    is_manager: true,
    is_superior_manager: false,
};

pub struct TestDesk {
    pub stores: Vec<Arc<MemoryStore>>,
    pub state: AppState,
}

impl TestDesk {
    pub fn new() -> Self {
        let stores: Vec<Arc<MemoryStore>> = TenantKey::ALL
            .iter()
            .map(|key| Arc::new(MemoryStore::new(*key)))
            .collect();
        let pools = TenantPools::from_stores(
            stores
                .iter()
                .map(|s| Arc::clone(s) as Arc<dyn SupportStore>),
        );
        let state = AppState::new(pools, &SupportConfig::default());
        Self { stores, state }
    }

    pub fn store(&self, key: TenantKey) -> &MemoryStore {
        &self.stores[key.index()]
    }

    pub fn user(&self, key: TenantKey, name: &str, roles: RoleFlags) -> UserRecord {
        self.store(key).add_user(name, None, roles).expect("user")
    }

    pub async fn supervise(&self, key: TenantKey, manager: &UserRecord, user: &UserRecord) {
        self.store(key)
            .insert_edge(&NewHierarchyEdge {
                superior_id: manager.id,
                subordinate_id: user.id,
                kind: RelationKind::ManagerToUser,
            })
            .await
            .expect("edge");
    }

    pub fn router(&self) -> Router {
        routes::routes().with_state(self.state.clone())
    }

    /// Run one request and decode the body as JSON (or a JSON string).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }
}

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, minute, 0)
        .single()
        .expect("timestamp")
}

pub fn request(
    method: Method,
    uri: &str,
    staff: Option<&UserRecord>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(staff) = staff {
        builder = builder
            .header(STAFF_ID_HEADER, staff.id.to_string())
            .header(STAFF_TENANT_HEADER, staff.tenant.as_str());
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}
