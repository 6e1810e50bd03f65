//! Implementación Postgres (Diesel) del `SimulationStore` del core.
//!
//! Objetivo del módulo:
//! - Persistencia durable de cadenas con paridad 1:1 respecto al backend en
//!   memoria: misma atomicidad de `create_chain`, misma regla
//!   exactamente-una-vez de `attach_result` (PK de `stage_results` sobre el
//!   id del nodo), mismo orden raíz→hoja en `get_chain`.
//! - Aislar el mapeo dominio ↔ filas de DB fuera de `chain-core`.
//! - Manejo básico de errores transitorios: reintento con backoff en
//!   escrituras y lecturas.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use log::{debug, warn};
use serde_json::Value;
use uuid::Uuid;

use chain_core::store::{NewNode, SimulationNode, SimulationStore, StageResult, StoreError};

use crate::config::DbConfig;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{simulation_nodes, stage_results};

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
///
/// Al construirlo se corre automáticamente el set de migraciones pendientes
/// (una sola vez).
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Permite inyectar un pool real (producción/tests de integración) o
/// simularlo en tests unitarios sin acoplar a r2d2.
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Obtiene una conexión lista para ejecutar consultas Diesel.
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<r2d2::PooledConnection<ConnectionManager<PgConnection>>, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Construye un pool y corre las migraciones pendientes.
pub fn build_pool(url: &str, min_connections: u32, max_connections: u32) -> Result<PgPool, PersistenceError> {
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = r2d2::Pool::builder().min_idle(Some(min_connections))
                                    .max_size(max_connections)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build error: {e}")))?;
    let mut conn = pool.get()
                       .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))?;
    run_pending_migrations(&mut conn)?;
    Ok(pool)
}

/// Pool a partir de `DATABASE_URL` y parámetros de `.env`.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = DbConfig::from_env();
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

/// Fila mapeada de `simulation_nodes` para lecturas.
#[derive(Queryable, Debug)]
pub struct NodeRow {
    pub id: Uuid,
    pub model_id: String,
    pub parameters: Value,
    pub input_concentrations: Value,
    pub previous_node_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fila para insertar en `simulation_nodes`. Se inserta siempre dentro de una
/// transacción Diesel: la cadena completa o nada.
#[derive(Insertable, Debug)]
#[diesel(table_name = simulation_nodes)]
pub struct NewNodeRow<'a> {
    pub id: Uuid,
    pub model_id: &'a str,
    pub parameters: &'a Value,
    pub input_concentrations: &'a Value,
    pub previous_node_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fila mapeada de `stage_results` para lecturas.
#[derive(Queryable, Debug)]
pub struct ResultRow {
    pub node_id: Uuid,
    pub input_concentrations: Value,
    pub output_concentrations: Value,
    pub panels: Value,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fila para insertar en `stage_results`.
///
/// La PK sobre `node_id` convierte el segundo intento de escritura en
/// `UniqueViolation`, que el store traduce a `StoreError::Conflict`.
#[derive(Insertable, Debug)]
#[diesel(table_name = stage_results)]
pub struct NewResultRow<'a> {
    pub node_id: Uuid,
    pub input_concentrations: &'a Value,
    pub output_concentrations: &'a Value,
    pub panels: &'a Value,
    pub error: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        // Algunos mensajes (dependen de driver/pg) llegan como Unknown con
        // texto. Best-effort string match sin acoplar a SQLSTATE.
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected")
            || m.contains("could not serialize access due to concurrent update")
            || m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Retry simple con backoff lineal pequeño (hasta 3 intentos).
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

fn to_jsonb<T: serde::Serialize>(value: &T) -> Result<Value, PersistenceError> {
    serde_json::to_value(value).map_err(|e| PersistenceError::Unknown(format!("serialize: {e}")))
}

fn from_jsonb<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, PersistenceError> {
    serde_json::from_value(value).map_err(|e| PersistenceError::Unknown(format!("deserialize: {e}")))
}

fn store_error(err: PersistenceError) -> StoreError {
    match err {
        PersistenceError::NotFound => StoreError::NotFound,
        other => StoreError::Backend(other.to_string()),
    }
}

fn node_from_rows(row: NodeRow, result: Option<ResultRow>) -> Result<SimulationNode, PersistenceError> {
    let result = match result {
        None => None,
        Some(r) => Some(StageResult { input_concentrations: from_jsonb(r.input_concentrations)?,
                                      output_concentrations: from_jsonb(r.output_concentrations)?,
                                      panels: from_jsonb(r.panels)?,
                                      error: r.error,
                                      created_at: r.created_at }),
    };
    Ok(SimulationNode { id: row.id,
                        model_id: row.model_id,
                        parameters: from_jsonb(row.parameters)?,
                        input_concentrations: from_jsonb(row.input_concentrations)?,
                        previous_node_id: row.previous_node_id,
                        created_at: row.created_at,
                        result })
}

/// `SimulationStore` sobre Postgres.
pub struct PgSimulationStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgSimulationStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl PgSimulationStore<PoolProvider> {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { provider: PoolProvider { pool } }
    }
}

impl<P: ConnectionProvider> PgSimulationStore<P> {
    fn load_node(&self, node_id: Uuid) -> Result<SimulationNode, PersistenceError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            let row: NodeRow = simulation_nodes::table.find(node_id)
                                                      .first(&mut conn)
                                                      .map_err(PersistenceError::from)?;
            let result: Option<ResultRow> = stage_results::table.find(node_id)
                                                                .first(&mut conn)
                                                                .optional()
                                                                .map_err(PersistenceError::from)?;
            node_from_rows(row, result)
        })
    }
}

impl<P: ConnectionProvider> SimulationStore for PgSimulationStore<P> {
    fn create_chain(&self, stages: Vec<NewNode>) -> Result<Vec<SimulationNode>, StoreError> {
        if stages.is_empty() {
            return Err(StoreError::InvalidChain("chain must contain at least one stage".into()));
        }

        // Ids, enlaces y payloads JSONB se preparan fuera de la transacción;
        // un retry reutiliza los mismos ids sobre una transacción revertida.
        struct Prepared {
            id: Uuid,
            previous: Option<Uuid>,
            parameters: Value,
            input: Value,
        }

        let created_at = Utc::now();
        let mut prepared: Vec<Prepared> = Vec::with_capacity(stages.len());
        let mut previous: Option<Uuid> = None;
        for stage in &stages {
            let id = Uuid::new_v4();
            prepared.push(Prepared { id,
                                     previous,
                                     parameters: to_jsonb(&stage.parameters).map_err(store_error)?,
                                     input: to_jsonb(&stage.input_concentrations).map_err(store_error)? });
            previous = Some(id);
        }

        with_retry(|| {
            let mut conn = self.provider.connection()?;
            conn.build_transaction()
                .read_write()
                .run(|tx_conn| {
                    for (stage, p) in stages.iter().zip(&prepared) {
                        diesel::insert_into(simulation_nodes::table)
                            .values(NewNodeRow { id: p.id,
                                                 model_id: &stage.model_id,
                                                 parameters: &p.parameters,
                                                 input_concentrations: &p.input,
                                                 previous_node_id: p.previous,
                                                 created_at })
                            .execute(tx_conn)?;
                    }
                    Ok::<(), diesel::result::Error>(())
                })
                .map_err(PersistenceError::from)
        }).map_err(store_error)?;

        debug!("create_chain: persisted {} node(s)", prepared.len());

        let nodes = stages.into_iter()
                          .zip(prepared)
                          .map(|(stage, p)| SimulationNode { id: p.id,
                                                             model_id: stage.model_id,
                                                             parameters: stage.parameters,
                                                             input_concentrations: stage.input_concentrations,
                                                             previous_node_id: p.previous,
                                                             created_at,
                                                             result: None })
                          .collect();
        Ok(nodes)
    }

    fn attach_result(&self, node_id: Uuid, result: StageResult) -> Result<(), StoreError> {
        let input = to_jsonb(&result.input_concentrations).map_err(store_error)?;
        let output = to_jsonb(&result.output_concentrations).map_err(store_error)?;
        let panels = to_jsonb(&result.panels).map_err(store_error)?;

        let inserted = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(stage_results::table)
                .values(NewResultRow { node_id,
                                       input_concentrations: &input,
                                       output_concentrations: &output,
                                       panels: &panels,
                                       error: result.error.as_deref(),
                                       created_at: result.created_at })
                .execute(&mut conn)
                .map_err(PersistenceError::from)
        });

        match inserted {
            Ok(_) => Ok(()),
            Err(PersistenceError::UniqueViolation(_)) => Err(StoreError::Conflict(node_id)),
            Err(PersistenceError::ForeignKeyViolation(_)) => Err(StoreError::NotFound),
            Err(e) => Err(store_error(e)),
        }
    }

    fn get_node(&self, node_id: Uuid) -> Result<SimulationNode, StoreError> {
        self.load_node(node_id).map_err(store_error)
    }

    fn get_chain(&self, node_id: Uuid) -> Result<Vec<SimulationNode>, StoreError> {
        let mut chain: Vec<SimulationNode> = Vec::new();
        let mut cursor = Some(node_id);
        while let Some(id) = cursor {
            if chain.iter().any(|n| n.id == id) {
                return Err(StoreError::InvalidChain(format!("cycle detected at node {id}")));
            }
            let node = self.load_node(id).map_err(store_error)?;
            cursor = node.previous_node_id;
            chain.push(node);
        }
        chain.reverse();
        Ok(chain)
    }
}
