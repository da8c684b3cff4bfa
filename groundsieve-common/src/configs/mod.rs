use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Error;

/// Persisted defaults for the ground-filter CLI, backed by a `groundsieve_settings.json`
/// file kept alongside the executable. A conforming run may ignore this entirely and
/// rely solely on CLI flags; values found here are only ever used to seed defaults
/// before flags are applied.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Configs {
    pub n: usize,
    pub step: f64,
    pub k_value: f64,
    pub n_vm: usize,
    pub max_v: f64,
    pub verbose_mode: bool,
}

impl Configs {
    pub fn new() -> Configs {
        Configs {
            n: 10,
            step: 5.0,
            k_value: 4.0,
            n_vm: 4,
            max_v: 1.0,
            verbose_mode: true,
        }
    }
}

impl Default for Configs {
    fn default() -> Configs {
        Configs::new()
    }
}

/// Reads `settings_file` if present, falling back to `Configs::new()` defaults
/// when the file is absent or unparsable.
pub fn get_configs(settings_file: &str) -> Result<Configs, Error> {
    let configs: Configs = match fs::read_to_string(settings_file) {
        Ok(contents) => {
            serde_json::from_str(&contents).unwrap_or_else(|_| Configs::new())
        }
        Err(_) => Configs::new(),
    };
    Ok(configs)
}

/// Writes `configs` to `settings_file` as pretty-printed JSON.
pub fn save_configs(configs: &Configs, settings_file: &str) -> Result<(), Error> {
    let configs_json = serde_json::to_string_pretty(configs)
        .expect("Error converting Configs object to JSON.");
    fs::write(settings_file, configs_json)
}
