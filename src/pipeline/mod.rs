//! Workflow Engine
//!
//! State machines for leads, client requests and deals, plus the convert
//! operations that create a deal from a qualified lead or an approved
//! request. All three record sets live behind one `RwLock` so conversion
//! (source update + deal insert) runs as a single transaction: two actors
//! can never convert the same source into two deals.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ledger::ActivityLedger;
use crate::org::OrganizationDirectory;
use crate::temporal::CommissionService;

pub mod convert;
pub mod deal;
pub mod lead;
pub mod request;

pub use deal::{Deal, DealPatch, DealSource, DealStage, NewDeal};
pub use lead::{Lead, LeadPatch, LeadStatus, NewLead};
pub use request::{ClientRequest, NewClientRequest, RequestDecision, RequestStatus};

#[derive(Default)]
pub(crate) struct PipelineState {
    pub(crate) leads: HashMap<Uuid, Lead>,
    pub(crate) requests: HashMap<Uuid, ClientRequest>,
    pub(crate) deals: HashMap<Uuid, Deal>,
}

#[derive(Clone)]
pub struct PipelineService {
    pub(crate) state: Arc<RwLock<PipelineState>>,
    pub(crate) directory: Arc<OrganizationDirectory>,
    pub(crate) commission: Arc<CommissionService>,
    pub(crate) ledger: Arc<ActivityLedger>,
}

impl PipelineService {
    pub fn new(
        directory: Arc<OrganizationDirectory>,
        commission: Arc<CommissionService>,
        ledger: Arc<ActivityLedger>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(PipelineState::default())),
            directory,
            commission,
            ledger,
        }
    }
}
