//! chain-persistence
//!
//! Implementación Postgres (Diesel) del `SimulationStore` del core, con
//! paridad 1:1 respecto al backend in-memory: mismas reglas de atomicidad,
//! conflicto exactamente-una-vez y orden de lectura raíz→hoja.
//!
//! Módulos:
//! - `pg`: el store sobre Postgres (tablas `simulation_nodes` y
//!   `stage_results`).
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_pool, build_pool_from_env, ConnectionProvider, PgPool, PgSimulationStore, PoolProvider};
