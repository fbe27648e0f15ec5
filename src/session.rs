//! Process-wide state handed to every map view at startup

use crate::core::config::PipelineOptions;
use crate::model::response::MapDataResponse;
use crate::query::cache::QueryCache;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Buyer,
    Agent,
    Admin,
    SuperAdmin,
}

impl UserRole {
    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

#[derive(Debug, Default, Clone)]
struct RoleState {
    signed_in: Option<UserRole>,
    view_as: Option<UserRole>,
}

/// Signed-in role plus the admin "view as" override
#[derive(Debug, Default, Clone)]
pub struct RoleView {
    state: Arc<Mutex<RoleState>>,
}

impl RoleView {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RoleState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn write<R>(&self, f: impl FnOnce(&mut RoleState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn sign_in(&self, role: UserRole) {
        self.write(|s| {
            s.signed_in = Some(role);
            s.view_as = None;
        });
    }

    pub fn sign_out(&self) {
        self.write(|s| *s = RoleState::default());
    }

    pub fn signed_in_role(&self) -> Option<UserRole> {
        self.read().signed_in
    }

    /// Impersonates `role` for UI purposes. Only admins may do this.
    pub fn view_as(&self, role: UserRole) -> Result<()> {
        self.write(|s| match s.signed_in {
            Some(actual) if actual.is_admin() => {
                log::info!("{:?} viewing as {:?}", actual, role);
                s.view_as = Some(role);
                Ok(())
            }
            _ => Err(MapError::Unauthorized(
                "only admins can view as another role".to_string(),
            )),
        })
    }

    pub fn clear_view_as(&self) {
        self.write(|s| s.view_as = None);
    }

    pub fn is_impersonating(&self) -> bool {
        self.read().view_as.is_some()
    }

    /// Role the UI should render for
    pub fn effective_role(&self) -> Option<UserRole> {
        let state = self.read();
        state.signed_in.map(|actual| state.view_as.unwrap_or(actual))
    }
}

/// Shared dependencies created once and injected into each pipeline
#[derive(Debug, Clone)]
pub struct AppContext {
    map_cache: QueryCache<Arc<MapDataResponse>>,
    role_view: RoleView,
    options: PipelineOptions,
}

impl AppContext {
    pub fn new(options: &PipelineOptions) -> Self {
        Self {
            map_cache: QueryCache::from_config(&options.fetch, &options.cache),
            role_view: RoleView::new(),
            options: options.clone(),
        }
    }

    pub fn map_cache(&self) -> &QueryCache<Arc<MapDataResponse>> {
        &self.map_cache
    }

    pub fn role_view(&self) -> &RoleView {
        &self.role_view
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Drops every cached result and any impersonation
    pub fn sign_out(&self) {
        self.map_cache.clear();
        self.role_view.sign_out();
        log::info!("signed out, query cache cleared");
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(&PipelineOptions::default())
    }
}
