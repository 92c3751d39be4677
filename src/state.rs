use crate::gateway::QueryGateway;
use std::sync::Arc;

/// State shared by every handler. Holds no per-request data.
#[derive(Clone)]
pub struct ServerState {
    pub gateway: Arc<QueryGateway>,
}

impl ServerState {
    pub fn new(gateway: QueryGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}
