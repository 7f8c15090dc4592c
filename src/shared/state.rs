use std::sync::Arc;

use crate::authz::Authorizer;
use crate::config::AppConfig;
use crate::finance::CostService;
use crate::ledger::ActivityLedger;
use crate::org::OrganizationDirectory;
use crate::pipeline::PipelineService;
use crate::temporal::{CommissionService, SalaryService};

/// Shared application state handed to every handler. Services are cheap to
/// clone; they share their underlying stores.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub directory: Arc<OrganizationDirectory>,
    pub authorizer: Arc<Authorizer>,
    pub pipeline: Arc<PipelineService>,
    pub commission: Arc<CommissionService>,
    pub salaries: Arc<SalaryService>,
    pub costs: Arc<CostService>,
    pub ledger: Arc<ActivityLedger>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let directory = Arc::new(OrganizationDirectory::new());
        let authorizer = Arc::new(Authorizer::new(Arc::clone(&directory)));
        let commission = Arc::new(CommissionService::new());
        let salaries = Arc::new(SalaryService::new());
        let ledger = Arc::new(ActivityLedger::in_memory(config.ledger.max_entries));
        let pipeline = Arc::new(PipelineService::new(
            Arc::clone(&directory),
            Arc::clone(&commission),
            Arc::clone(&ledger),
        ));
        let costs = Arc::new(CostService::new(Arc::clone(&ledger)));

        Self {
            config,
            directory,
            authorizer,
            pipeline,
            commission,
            salaries,
            costs,
            ledger,
        }
    }
}
