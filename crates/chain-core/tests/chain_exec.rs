//! Tests de integración del orquestador: validación upfront, propagación
//! encadenada y halt-on-failure, contra el store in-memory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::{indexmap, IndexMap};
use serde_json::json;
use uuid::Uuid;

use chain_core::adapter::{AdapterDescriptor, AdapterError, ModelAdapter, ModelCategory, StageInput, StageOutput};
use chain_core::assembler::{ChainReader, ReadError};
use chain_core::dto::{RunRequest, RunStatus, StageRequest};
use chain_core::orchestrator::{ChainOrchestrator, SubmitError};
use chain_core::registry::AdapterRegistry;
use chain_core::store::InMemorySimulationStore;
use chain_domain::{Concentrations, ParameterSchema, ParameterSpec};

// Adapter que divide todas las concentraciones entre dos.
struct HalveAdapter {
    descriptor: AdapterDescriptor,
}

impl HalveAdapter {
    fn new() -> Arc<dyn ModelAdapter> {
        Arc::new(Self { descriptor: AdapterDescriptor::new("halve", "Halve", "halves every concentration", ModelCategory::Primary)
                            .substances(["H2"]) })
    }
}

#[async_trait]
impl ModelAdapter for HalveAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }
    async fn run(&self, input: StageInput) -> Result<StageOutput, AdapterError> {
        Ok(StageOutput::concentrations(input.concentrations.iter().map(|(k, v)| (k.clone(), v / 2.0)).collect()))
    }
}

// Adapter que suma 10 a todas las concentraciones.
struct PlusTenAdapter {
    descriptor: AdapterDescriptor,
}

impl PlusTenAdapter {
    fn new() -> Arc<dyn ModelAdapter> {
        Arc::new(Self { descriptor: AdapterDescriptor::new("plus_ten", "Plus ten", "adds 10 to every concentration", ModelCategory::Secondary)
                            .substances(["H2"]) })
    }
}

#[async_trait]
impl ModelAdapter for PlusTenAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }
    async fn run(&self, input: StageInput) -> Result<StageOutput, AdapterError> {
        Ok(StageOutput::concentrations(input.concentrations.iter().map(|(k, v)| (k.clone(), v + 10.0)).collect()))
    }
}

// Primario ancho: duplica H2/O2/H2O.
struct DoublingAdapter {
    descriptor: AdapterDescriptor,
}

impl DoublingAdapter {
    fn new() -> Arc<dyn ModelAdapter> {
        Arc::new(Self { descriptor: AdapterDescriptor::new("doubling", "Doubling", "doubles input concentrations", ModelCategory::Primary)
                            .substances(["H2", "O2", "H2O"]) })
    }
}

#[async_trait]
impl ModelAdapter for DoublingAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }
    async fn run(&self, input: StageInput) -> Result<StageOutput, AdapterError> {
        Ok(StageOutput::concentrations(input.concentrations.iter().map(|(k, v)| (k.clone(), v * 2.0)).collect()))
    }
}

// Secundario estrecho: entiende H2 y O2, no H2O.
struct AddTenNarrowAdapter {
    descriptor: AdapterDescriptor,
}

impl AddTenNarrowAdapter {
    fn new() -> Arc<dyn ModelAdapter> {
        Arc::new(Self { descriptor: AdapterDescriptor::new("add_ten_narrow", "Add ten (narrow)", "adds 10, narrow whitelist", ModelCategory::Secondary)
                            .substances(["H2", "O2"]) })
    }
}

#[async_trait]
impl ModelAdapter for AddTenNarrowAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }
    async fn run(&self, input: StageInput) -> Result<StageOutput, AdapterError> {
        Ok(StageOutput::concentrations(input.concentrations.iter().map(|(k, v)| (k.clone(), v + 10.0)).collect()))
    }
}

// Adapter que siempre falla.
struct FailingAdapter {
    descriptor: AdapterDescriptor,
}

impl FailingAdapter {
    fn new() -> Arc<dyn ModelAdapter> {
        Arc::new(Self { descriptor: AdapterDescriptor::new("failing", "Failing", "always fails", ModelCategory::Secondary)
                            .substances(["H2"]) })
    }
}

#[async_trait]
impl ModelAdapter for FailingAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }
    async fn run(&self, _input: StageInput) -> Result<StageOutput, AdapterError> {
        Err(AdapterError::Model("model execution failed".into()))
    }
}

// Adapter que hace panic dentro del run.
struct PanickingAdapter {
    descriptor: AdapterDescriptor,
}

impl PanickingAdapter {
    fn new() -> Arc<dyn ModelAdapter> {
        Arc::new(Self { descriptor: AdapterDescriptor::new("panicking", "Panicking", "panics inside run", ModelCategory::Secondary)
                            .substances(["H2"]) })
    }
}

#[async_trait]
impl ModelAdapter for PanickingAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }
    async fn run(&self, _input: StageInput) -> Result<StageOutput, AdapterError> {
        panic!("solver matrix is singular");
    }
}

// Adapter identidad que espera una señal antes de terminar, para observar el
// estado pending a mitad de ejecución.
struct GatedAdapter {
    descriptor: AdapterDescriptor,
    release: Arc<tokio::sync::Notify>,
}

impl GatedAdapter {
    fn new(release: Arc<tokio::sync::Notify>) -> Arc<dyn ModelAdapter> {
        Arc::new(Self { descriptor: AdapterDescriptor::new("gated", "Gated", "identity, waits for a release signal", ModelCategory::Primary)
                            .substances(["H2"]),
                        release })
    }
}

#[async_trait]
impl ModelAdapter for GatedAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }
    async fn run(&self, input: StageInput) -> Result<StageOutput, AdapterError> {
        self.release.notified().await;
        Ok(StageOutput::concentrations(input.concentrations))
    }
}

// Adapter con schema de parámetros, para validación de submission.
struct ParamAdapter {
    descriptor: AdapterDescriptor,
}

impl ParamAdapter {
    fn new() -> Arc<dyn ModelAdapter> {
        let schema = ParameterSchema::new(vec![ParameterSpec::int("temperature", 300).min(200.0).max(400.0)])
            .expect("well-formed schema");
        Arc::new(Self { descriptor: AdapterDescriptor::new("parametrized", "Parametrized", "identity with temperature", ModelCategory::Primary)
                            .substances(["H2"])
                            .parameters(schema) })
    }
}

#[async_trait]
impl ModelAdapter for ParamAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }
    async fn run(&self, input: StageInput) -> Result<StageOutput, AdapterError> {
        Ok(StageOutput::concentrations(input.concentrations))
    }
}

struct Harness {
    orchestrator: ChainOrchestrator,
    reader: ChainReader,
    store: Arc<InMemorySimulationStore>,
}

fn harness(adapters: Vec<Arc<dyn ModelAdapter>>) -> Harness {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(adapter).expect("registration");
    }
    let registry = Arc::new(registry);
    let store = Arc::new(InMemorySimulationStore::new());
    Harness { orchestrator: ChainOrchestrator::new(registry, store.clone()),
              reader: ChainReader::new(store.clone()),
              store }
}

fn stage(model_id: &str, concentrations: Concentrations) -> StageRequest {
    StageRequest { model_id: model_id.to_string(),
                   concentrations,
                   parameters: IndexMap::new() }
}

async fn wait_settled(reader: &ChainReader, id: Uuid) -> chain_core::dto::ChainedRunResponse {
    for _ in 0..500 {
        let response = reader.read(id).expect("poll read");
        if response.status != RunStatus::Pending {
            return response;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("chain did not settle in time");
}

#[tokio::test]
async fn two_stage_chain_propagates_filtered_output() {
    let h = harness(vec![HalveAdapter::new(), PlusTenAdapter::new()]);
    let request = RunRequest { stages: vec![stage("halve", indexmap! { "H2".to_string() => 10.0 }),
                                            stage("plus_ten", Concentrations::new())] };

    let id = h.orchestrator.submit(request, None).await.expect("submission");
    let response = wait_settled(&h.reader, id).await;

    assert_eq!(response.status, RunStatus::Done);
    assert_eq!(response.stages.len(), 2);

    let first = &response.stages[0];
    assert_eq!(first.status, RunStatus::Done);
    assert_eq!(first.model_input.concentrations["H2"], 10.0);
    assert_eq!(first.final_concentrations.as_ref().unwrap()["H2"], 5.0);

    let second = &response.stages[1];
    assert_eq!(second.status, RunStatus::Done);
    // El input del stage 2 es el output filtrado del stage 1, nunca el crudo.
    assert_eq!(second.model_input.concentrations["H2"], 5.0);
    assert_eq!(second.final_concentrations.as_ref().unwrap()["H2"], 15.0);
}

#[tokio::test]
async fn chain_filters_concentrations_to_downstream_whitelist() {
    let h = harness(vec![DoublingAdapter::new(), AddTenNarrowAdapter::new()]);
    let request = RunRequest { stages: vec![stage("doubling",
                                                  indexmap! { "H2".to_string() => 5.0,
                                                              "O2".to_string() => 10.0,
                                                              "H2O".to_string() => 2.0 }),
                                            stage("add_ten_narrow", Concentrations::new())] };

    let id = h.orchestrator.submit(request, None).await.expect("submission");
    let response = wait_settled(&h.reader, id).await;
    assert_eq!(response.status, RunStatus::Done);

    let primary = response.stages[0].final_concentrations.as_ref().unwrap();
    assert_eq!(primary["H2"], 10.0);
    assert_eq!(primary["O2"], 20.0);
    assert_eq!(primary["H2O"], 4.0);

    let secondary = &response.stages[1];
    // H2O no pasa al secundario: no está en su whitelist.
    assert!(secondary.model_input.concentrations.get("H2O").is_none());
    let finals = secondary.final_concentrations.as_ref().unwrap();
    assert_eq!(finals["H2"], 20.0);
    assert_eq!(finals["O2"], 30.0);
    assert!(finals.get("H2O").is_none());
}

#[tokio::test]
async fn failure_halts_chain_and_later_stages_stay_pending() {
    let h = harness(vec![HalveAdapter::new(), FailingAdapter::new(), PlusTenAdapter::new()]);
    let request = RunRequest { stages: vec![stage("halve", indexmap! { "H2".to_string() => 10.0 }),
                                            stage("failing", Concentrations::new()),
                                            stage("plus_ten", Concentrations::new())] };

    let id = h.orchestrator.submit(request, None).await.expect("submission");
    let response = wait_settled(&h.reader, id).await;

    assert_eq!(response.status, RunStatus::Failed);
    assert_eq!(response.stages[0].status, RunStatus::Done);
    assert_eq!(response.stages[0].final_concentrations.as_ref().unwrap()["H2"], 5.0);

    let failed = &response.stages[1];
    assert_eq!(failed.status, RunStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("model execution failed"));
    assert!(failed.final_concentrations.is_none());

    // El stage posterior al fallo queda pendiente para siempre.
    let trailing = &response.stages[2];
    assert_eq!(trailing.status, RunStatus::Pending);
    assert!(trailing.error.is_none());
    assert!(trailing.final_concentrations.is_none());
}

#[tokio::test]
async fn panic_inside_run_is_contained_as_stage_failure() {
    let h = harness(vec![HalveAdapter::new(), PanickingAdapter::new()]);
    let request = RunRequest { stages: vec![stage("halve", indexmap! { "H2".to_string() => 10.0 }),
                                            stage("panicking", Concentrations::new())] };

    let id = h.orchestrator.submit(request, None).await.expect("submission");
    let response = wait_settled(&h.reader, id).await;

    assert_eq!(response.status, RunStatus::Failed);
    assert_eq!(response.stages[0].status, RunStatus::Done);
    let failed = &response.stages[1];
    assert_eq!(failed.status, RunStatus::Failed);
    let error = failed.error.as_deref().unwrap();
    assert!(error.starts_with("Model failed to calculate the change:"), "got: {error}");
    assert!(error.contains("singular"), "got: {error}");
}

#[tokio::test]
async fn unknown_model_aborts_submission_before_persisting() {
    let h = harness(vec![HalveAdapter::new()]);
    let request = RunRequest { stages: vec![stage("halve", indexmap! { "H2".to_string() => 10.0 }),
                                            stage("nonexistent", Concentrations::new())] };

    let err = h.orchestrator.submit(request, None).await.unwrap_err();
    assert!(matches!(err, SubmitError::UnknownModel(ref id) if id == "nonexistent"));
    assert!(h.store.is_empty(), "no node may be persisted for a rejected submission");

    // Cualquier id no usado sigue reportando not-found.
    assert!(matches!(h.reader.read(Uuid::new_v4()), Err(ReadError::NotFound)));
}

#[tokio::test]
async fn unknown_compound_rejects_submission_naming_the_key() {
    let h = harness(vec![HalveAdapter::new()]);
    let request = RunRequest { stages: vec![stage("halve",
                                                  indexmap! { "H2".to_string() => 10.0,
                                                              "XYZ".to_string() => 1.0 })] };

    let err = h.orchestrator.submit(request, None).await.unwrap_err();
    match err {
        SubmitError::Validation { stage: 0, detail } => {
            assert_eq!(detail.concentrations["XYZ"], vec!["Extra inputs are not permitted".to_string()]);
            assert!(detail.parameters.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn parameters_without_schema_are_extra_inputs() {
    let h = harness(vec![HalveAdapter::new()]);
    let mut parameters = IndexMap::new();
    parameters.insert("temperature".to_string(), json!(300));
    let request = RunRequest { stages: vec![StageRequest { model_id: "halve".into(),
                                                           concentrations: indexmap! { "H2".to_string() => 1.0 },
                                                           parameters }] };

    let err = h.orchestrator.submit(request, None).await.unwrap_err();
    match err {
        SubmitError::Validation { stage: 0, detail } => {
            assert_eq!(detail.parameters["temperature"], vec!["Extra inputs are not permitted".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn concentration_and_parameter_errors_are_reported_together() {
    let h = harness(vec![ParamAdapter::new()]);
    let mut parameters = IndexMap::new();
    parameters.insert("temperature".to_string(), json!(500));
    let request = RunRequest { stages: vec![StageRequest { model_id: "parametrized".into(),
                                                           concentrations: indexmap! { "XYZ".to_string() => 1.0 },
                                                           parameters }] };

    let err = h.orchestrator.submit(request, None).await.unwrap_err();
    match err {
        SubmitError::Validation { stage: 0, detail } => {
            assert_eq!(detail.concentrations["XYZ"], vec!["Extra inputs are not permitted".to_string()]);
            assert_eq!(detail.parameters["temperature"],
                       vec!["Input should be less than or equal to 400".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn invalid_parameter_in_later_stage_aborts_whole_chain() {
    let h = harness(vec![HalveAdapter::new(), ParamAdapter::new()]);
    let mut parameters = IndexMap::new();
    parameters.insert("temperature".to_string(), json!("cold"));
    let request = RunRequest { stages: vec![stage("halve", indexmap! { "H2".to_string() => 10.0 }),
                                            StageRequest { model_id: "parametrized".into(),
                                                           concentrations: Concentrations::new(),
                                                           parameters }] };

    let err = h.orchestrator.submit(request, None).await.unwrap_err();
    match err {
        SubmitError::Validation { stage: 1, detail } => {
            assert_eq!(detail.parameters["temperature"], vec!["Input should be a valid integer".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.store.is_empty(), "upfront validation failure may not persist any stage");
}

#[tokio::test]
async fn empty_stage_list_is_rejected() {
    let h = harness(vec![HalveAdapter::new()]);
    let err = h.orchestrator.submit(RunRequest { stages: vec![] }, None).await.unwrap_err();
    assert!(matches!(err, SubmitError::EmptyChain));
}

#[tokio::test]
async fn polling_is_idempotent_and_only_trailing_state_changes() {
    let release = Arc::new(tokio::sync::Notify::new());
    let h = harness(vec![HalveAdapter::new(), GatedAdapter::new(release.clone())]);
    let request = RunRequest { stages: vec![stage("halve", indexmap! { "H2".to_string() => 10.0 }),
                                            stage("gated", Concentrations::new())] };

    let id = h.orchestrator.submit(request, None).await.expect("submission");

    // Espera a que el primer stage termine; el segundo queda retenido.
    let mut first_done = None;
    for _ in 0..500 {
        let r = h.reader.read(id).expect("poll");
        if r.stages[0].status == RunStatus::Done {
            first_done = Some(r);
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let mid = first_done.expect("first stage should finish");
    assert_eq!(mid.status, RunStatus::Pending);
    assert_eq!(mid.stages[1].status, RunStatus::Pending);

    release.notify_one();
    let done = wait_settled(&h.reader, id).await;
    assert_eq!(done.status, RunStatus::Done);

    // El stage ya completado no cambió entre polls.
    let mid_first = serde_json::to_value(&mid.stages[0]).unwrap();
    let done_first = serde_json::to_value(&done.stages[0]).unwrap();
    assert_eq!(mid_first, done_first);

    // Y dos lecturas finales son idénticas.
    let again = h.reader.read(id).expect("read again");
    assert_eq!(serde_json::to_value(&done).unwrap(), serde_json::to_value(&again).unwrap());
}

#[tokio::test]
async fn single_model_run_is_a_chain_of_one() {
    let h = harness(vec![DoublingAdapter::new()]);
    let request = RunRequest::single("doubling",
                                     indexmap! { "H2".to_string() => 5.0, "O2".to_string() => 10.0 },
                                     IndexMap::new());

    let id = h.orchestrator.submit(request, None).await.expect("submission");
    let response = wait_settled(&h.reader, id).await;

    assert_eq!(response.status, RunStatus::Done);
    assert_eq!(response.stages.len(), 1);
    let stage = &response.stages[0];
    // El input normalizado rellena H2O con 0.0 y el modelo lo duplica a 0.0.
    let finals = stage.final_concentrations.as_ref().unwrap();
    assert_eq!(finals["H2"], 10.0);
    assert_eq!(finals["O2"], 20.0);
    assert_eq!(finals["H2O"], 0.0);
}
