//! User and role administration (`/auth/users/`, `/auth/roles/`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ListParams, Resource, paths};
use crate::error::GatewayResult;
use crate::gateway::Gateway;
use crate::models::{Identity, Page};

/// Body for creating a user. `rol_id` is the primary key of a [`RoleRecord`].
#[derive(Debug, Clone, Serialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub rol_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Partial update; only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rol_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: String,
}

pub struct UserAdmin {
    users: Resource<Identity>,
    roles: Resource<RoleRecord>,
}

impl UserAdmin {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            users: Resource::new(Arc::clone(&gateway), paths::USERS),
            roles: Resource::new(gateway, paths::ROLES),
        }
    }

    pub async fn list(&self, params: &ListParams) -> GatewayResult<Page<Identity>> {
        self.users.list(params).await
    }

    pub async fn get(&self, id: i64) -> GatewayResult<Identity> {
        self.users.get(id).await
    }

    pub async fn create(&self, user: &CreateUser) -> GatewayResult<Identity> {
        self.users.create(user).await
    }

    pub async fn update(&self, id: i64, changes: &UpdateUser) -> GatewayResult<Identity> {
        self.users.update(id, changes).await
    }

    pub async fn delete(&self, id: i64) -> GatewayResult<()> {
        self.users.delete(id).await
    }

    pub async fn roles(&self) -> GatewayResult<Page<RoleRecord>> {
        self.roles.list(&ListParams::new()).await
    }
}
