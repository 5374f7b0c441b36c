pub mod ast;
pub mod config;
pub mod field;
pub mod generator;
pub mod infer;
pub mod naming;
pub mod relation;
pub mod report;
pub mod schema;
pub mod sql;

use wasm_bindgen::prelude::*;

use config::GeneratorConfig;
use generator::Generator;
use sql::{Dialect, SqlDump};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Describe `table` from a SQL dump as a JSON model descriptor
#[wasm_bindgen(js_name = "inferRelationships")]
pub fn infer_relationships(
    sql: &str,
    table: &str,
    dialect: Option<String>,
) -> Result<String, String> {
    let dialect = match dialect.as_deref() {
        Some(name) => name.parse::<Dialect>()?,
        None => Dialect::Auto,
    };

    let dump = SqlDump::new(sql, dialect);
    let descriptor = Generator::from_table(&dump, &GeneratorConfig::default(), table, None)
        .map_err(|e| e.to_string())?;

    serde_json::to_string(&descriptor).map_err(|e| e.to_string())
}
