/// linkflow server entry point
///
/// Serves:
/// - Integration catalog API at /api/integration-types/* and /api/integrations/*
/// - Workflow management and execution at /api/workflows/*
/// - Execution history at /api/executions/*
/// - Webhook triggers at /webhook/{workflow_id}
/// - Health check at /healthz

use linkflow::{config::Config, server::start_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment overrides via LINKFLOW_* variables
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
