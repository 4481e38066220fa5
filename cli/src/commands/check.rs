//! Check command implementation
//!
//! Validates the config file and reports what it declares.

use relq_core::Config;

use crate::error::CliError;
use crate::output;

/// Run the check command. Loading already validated the config.
pub fn run(config: &Config, config_path: &str) -> Result<(), CliError> {
    let registry = config.registry();
    let entities = registry.entities().count();
    let relations: usize = registry
        .entities()
        .map(|entity| registry.relations(entity).count())
        .sum();

    println!("{} {}", output::success("OK"), config_path);
    println!(
        "  {} {}, {} {}, {} {}",
        output::label("dialect"),
        config.dialect,
        output::label("entities"),
        entities,
        output::label("relations"),
        relations
    );
    Ok(())
}
