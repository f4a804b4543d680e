//! API handlers

pub mod auth;
pub mod health;
pub mod tenants;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// `{id}` body returned by create, update and delete endpoints
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdResponse {
    pub id: Uuid,
}

impl IdResponse {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}
