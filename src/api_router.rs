//! API Router
//!
//! Combines the endpoints from every area module into a unified router.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::shared::state::AppState;

/// Configure all API routes from all modules.
pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // ===== Organization & membership (api/org module) =====
        .route("/organizations", post(crate::api::org::create_organization))
        .route(
            "/profiles",
            post(crate::api::org::invite_user).get(crate::api::org::list_profiles),
        )
        .route(
            "/profiles/:id/deactivate",
            post(crate::api::org::deactivate_profile),
        )
        .route(
            "/profiles/:id/supervision",
            put(crate::api::org::set_supervision).delete(crate::api::org::clear_supervision),
        )
        .route("/business-units", post(crate::api::org::create_business_unit))
        .route("/teams", post(crate::api::org::create_team))
        .route("/teams/:id/leader", put(crate::api::org::set_team_leader))
        .route("/teams/:id/members", post(crate::api::org::join_team))
        .route("/scope", get(crate::api::org::resolve_scope))
        // ===== Sales pipeline (api/pipeline module) =====
        .route(
            "/leads",
            post(crate::api::pipeline::create_lead).get(crate::api::pipeline::list_leads),
        )
        .route(
            "/leads/:id",
            get(crate::api::pipeline::get_lead).patch(crate::api::pipeline::update_lead),
        )
        .route("/leads/:id/status", post(crate::api::pipeline::transition_lead))
        .route("/leads/:id/convert", post(crate::api::pipeline::convert_lead))
        .route(
            "/requests",
            post(crate::api::pipeline::create_request).get(crate::api::pipeline::list_requests),
        )
        .route("/requests/inbox", get(crate::api::pipeline::request_inbox))
        .route(
            "/requests/:id/decision",
            post(crate::api::pipeline::decide_request),
        )
        .route(
            "/requests/:id/convert",
            post(crate::api::pipeline::convert_request),
        )
        .route(
            "/deals",
            post(crate::api::pipeline::create_deal).get(crate::api::pipeline::list_deals),
        )
        .route(
            "/deals/:id",
            patch(crate::api::pipeline::update_deal).delete(crate::api::pipeline::delete_deal),
        )
        // ===== Finance (api/finance module) =====
        .route(
            "/commission-rates/:role",
            put(crate::api::finance::set_commission_rate)
                .get(crate::api::finance::get_commission_rate),
        )
        .route(
            "/commission-rates/:role/history",
            get(crate::api::finance::commission_rate_history),
        )
        .route(
            "/salaries/:employee_id",
            put(crate::api::finance::set_salary).get(crate::api::finance::get_salary),
        )
        .route(
            "/salaries/:employee_id/history",
            get(crate::api::finance::salary_history),
        )
        .route(
            "/costs",
            post(crate::api::finance::add_cost_entry).get(crate::api::finance::list_costs),
        )
        // ===== Audit (api/ledger module) =====
        .route("/activity", get(crate::api::ledger::list_activity))
}
