//! REST API
//!
//! Thin translation layer over the core services: handlers deserialize the
//! request, run it through the authorizer, call one service operation and
//! serialize the result. Identity arrives as headers set by the external
//! session layer; the core trusts the tuple as given.

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::shared::error::CoreError;

pub mod finance;
pub mod ledger;
pub mod org;
pub mod pipeline;

pub const ORGANIZATION_HEADER: &str = "x-organization-id";
pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Debug, Clone, Copy)]
pub struct RequestIdentity {
    pub organization_id: Uuid,
    pub actor_id: Uuid,
}

/// Extracts the `(organization, actor)` tuple the session layer supplies.
/// Missing or malformed headers fail closed as unauthenticated.
pub fn identity(headers: &HeaderMap) -> Result<RequestIdentity, CoreError> {
    let organization_id = header_uuid(headers, ORGANIZATION_HEADER)?;
    let actor_id = header_uuid(headers, ACTOR_HEADER)?;
    Ok(RequestIdentity {
        organization_id,
        actor_id,
    })
}

fn header_uuid(headers: &HeaderMap, name: &str) -> Result<Uuid, CoreError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| CoreError::Unauthenticated(format!("missing or invalid {name} header")))
}
