//! Compile command implementation
//!
//! Prints the SQL and parameters a query description compiles to.

use relq_core::{Config, Dialect, Query, SelectBuilder};
use serde_json::json;

use crate::error::CliError;
use crate::output;

pub struct CompileOptions {
    pub entity: String,
    pub query: Query,
    /// Overrides the configured dialect
    pub dialect: Option<Dialect>,
    /// Print `{"sql", "params", "count"}` as JSON instead of text
    pub json: bool,
}

/// Run the compile command
pub fn run(config: &Config, opts: CompileOptions) -> Result<(), CliError> {
    let registry = config.registry();
    let dialect = opts.dialect.unwrap_or(config.dialect);
    let compiler = config.compiler(&registry);

    let handle = SelectBuilder::new(dialect, compiler.table(&opts.entity)?);
    let handle = compiler.apply(&opts.query, &opts.entity, Some(handle))?;
    let statement = handle.to_statement();
    let count = handle.to_count_statement();

    tracing::info!(entity = %opts.entity, %dialect, params = statement.params.len(), "compiled query");

    if opts.json {
        let preloads: Vec<&str> = handle.preloads().iter().map(|p| p.name.as_str()).collect();
        let value = json!({
            "sql": statement.sql,
            "params": statement.params,
            "count": count,
            "preloads": preloads,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", output::heading("SQL"));
    println!("  {}", statement.sql);
    println!();
    println!("{}", output::heading("Params"));
    println!("  {}", serde_json::Value::Array(statement.params));

    if !handle.preloads().is_empty() {
        println!();
        println!("{}", output::heading("Eager-loads"));
        for preload in handle.preloads() {
            let scope = if preload.scope.is_some() { "scoped" } else { "all rows" };
            println!(
                "  {} {} {} ({scope})",
                output::label(&preload.name),
                output::muted("->"),
                preload.relation.target()
            );
        }
    }
    Ok(())
}
