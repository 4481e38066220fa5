//! Relations command implementation
//!
//! Lists the relation registry declared in the config file.

use colored::Colorize;
use relq_core::{Config, Relation};

use crate::error::CliError;
use crate::output;

/// Run the relations command
pub fn run(config: &Config, entity: Option<&str>) -> Result<(), CliError> {
    let registry = config.registry();

    if registry.is_empty() {
        println!("  {}", "No entities declared.".yellow());
        return Ok(());
    }

    for name in registry.entities().filter(|name| entity.is_none_or(|e| e == *name)) {
        println!("{}", output::heading(name));
        let mut empty = true;
        for (relation_name, relation) in registry.relations(name) {
            empty = false;
            println!("  {} {}", output::label(relation_name), describe(name, relation));
        }
        if empty {
            println!("  {}", output::muted("(no relations)"));
        }
    }
    Ok(())
}

fn describe(entity: &str, relation: &Relation) -> String {
    match relation {
        Relation::Direct {
            target,
            local_column,
            target_column,
            cardinality,
        } => format!("{entity}.{local_column} = {target}.{target_column} ({cardinality:?})"),
        Relation::ManyToMany {
            target,
            key_column,
            junction,
            junction_origin_column,
            junction_target_column,
            ..
        } => format!(
            "{entity}.{key_column} = {junction}.{junction_origin_column}, \
             {target}.{key_column} = {junction}.{junction_target_column}"
        ),
    }
}
