//! Binario demo: wiring completo del motor de cadenas.
//!
//! Registra los adapters concretos, somete una cadena de dos stages contra el
//! store in-memory y hace polling del resultado ensamblado. Con el feature
//! `pg_demo` repite la cadena contra Postgres (requiere `DATABASE_URL`).

use std::sync::Arc;
use std::time::Duration;

use indexmap::{indexmap, IndexMap};
use serde_json::json;

use chain_adapters::{DryerAdapter, ExampleAdapter};
use chain_core::{AdapterRegistry, ChainOrchestrator, ChainReader, ChainedRunResponse, InMemorySimulationStore,
                 RunRequest, RunStatus, SimulationStore, StageRequest};

fn build_registry() -> Result<Arc<AdapterRegistry>, Box<dyn std::error::Error>> {
    let mut registry = AdapterRegistry::new();
    registry.register(ExampleAdapter::new()?)?;
    registry.register(DryerAdapter::new()?)?;
    Ok(Arc::new(registry))
}

fn demo_request() -> RunRequest {
    let mut dryer_params = IndexMap::new();
    dryer_params.insert("efficiency".to_string(), json!(75.0));
    RunRequest { stages: vec![StageRequest { model_id: "example".into(),
                                             concentrations: indexmap! { "H2O".to_string() => 30.0 },
                                             parameters: IndexMap::new() },
                              StageRequest { model_id: "dryer".into(),
                                             concentrations: IndexMap::new(),
                                             parameters: dryer_params }] }
}

async fn run_and_poll(orchestrator: &ChainOrchestrator,
                      reader: &ChainReader)
                      -> Result<ChainedRunResponse, Box<dyn std::error::Error>> {
    let node_id = orchestrator.submit(demo_request(), None).await?;
    println!("submitted chain, polling node {node_id}");
    loop {
        let response = reader.read(node_id)?;
        if response.status != RunStatus::Pending {
            return Ok(response);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_registry()?;

    for info in registry.model_infos(None) {
        println!("model '{}' ({:?}): {}", info.model_id, info.category, info.description);
    }

    let store: Arc<dyn SimulationStore> = Arc::new(InMemorySimulationStore::new());
    let orchestrator = ChainOrchestrator::new(registry.clone(), store.clone());
    let reader = ChainReader::new(store);

    let response = run_and_poll(&orchestrator, &reader).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    #[cfg(feature = "pg_demo")]
    {
        let pool = chain_persistence::build_pool_from_env()?;
        let store: Arc<dyn SimulationStore> = Arc::new(chain_persistence::PgSimulationStore::from_pool(pool));
        let orchestrator = ChainOrchestrator::new(registry.clone(), store.clone());
        let reader = ChainReader::new(store);
        let response = run_and_poll(&orchestrator, &reader).await?;
        println!("pg_demo: chain finished with status {:?}", response.status);
    }

    Ok(())
}
