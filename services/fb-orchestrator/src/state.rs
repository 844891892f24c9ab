use fb_config::ServiceConfig;
use fb_response::Orchestrator;

pub struct AppState {
    pub config: ServiceConfig,
    pub orchestrator: Orchestrator,
}
