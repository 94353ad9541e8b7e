//! Identity collaborator: who is acting and whether they may.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    Customer,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub role: UserRole,
    pub is_active: bool,
}

impl UserIdentity {
    pub fn customer(id: Uuid) -> Self {
        Self {
            id,
            role: UserRole::Customer,
            is_active: true,
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self {
            id,
            role: UserRole::Admin,
            is_active: true,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Owners and admins may act on an order.
    pub fn may_act_on(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.id == owner_id
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserIdentity>, ServiceError>;
}

/// Looks up a user and insists the account is usable.
pub async fn require_active_user(
    identity: &dyn IdentityProvider,
    id: Uuid,
) -> Result<UserIdentity, ServiceError> {
    let user = identity
        .get_user(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;
    if !user.is_active {
        return Err(ServiceError::Unauthorized(format!(
            "User {} is deactivated",
            id
        )));
    }
    Ok(user)
}

/// Identity directory held in memory. Used by tests and single-process setups.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    users: DashMap<Uuid, UserIdentity>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserIdentity) {
        self.users.insert(user.id, user);
    }

    pub fn deactivate(&self, id: Uuid) {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.is_active = false;
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserIdentity>, ServiceError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }
}
