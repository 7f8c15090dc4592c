pub mod api;
pub mod api_router;
pub mod authz;
pub mod config;
pub mod finance;
pub mod ledger;
pub mod org;
pub mod pipeline;
pub mod shared;
pub mod temporal;
