//! Config command implementation

use crate::config_loader::load_config;
use crate::output::OutputWriter;
use crate::output_types::{ConfigOutput, ConfigValue};
use anyhow::Result;
use std::path::Path;

pub fn execute(output: &OutputWriter, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let mut values: Vec<ConfigValue> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigValue { key, value, source: format!("{:?}", source) })
        .collect();
    values.sort_by(|a, b| a.key.cmp(&b.key));

    if output.is_json() {
        output.result(ConfigOutput { values })?;
    } else {
        output.section("Configuration Values");
        output.table(values);
    }
    Ok(())
}
