//! Named report configurations.

use std::collections::BTreeMap;

use crate::config::ReportConfig;
use crate::error::ReportError;

const BUILTIN: &[(&str, &str)] = &[
    ("restocking", include_str!("../configs/restocking.toml")),
    ("sku_reconcile", include_str!("../configs/sku_reconcile.toml")),
];

/// Lookup table from config name to a validated `ReportConfig`.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    configs: BTreeMap<String, ReportConfig>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the configs shipped with the engine.
    pub fn builtin() -> Result<Self, ReportError> {
        let mut registry = Self::new();
        for (name, source) in BUILTIN {
            let config = ReportConfig::from_toml(source)
                .map_err(|e| ReportError::Config(format!("built-in '{name}': {e}")))?;
            registry.register(config)?;
        }
        Ok(registry)
    }

    /// Add a config. Names are unique; registering one twice is an error.
    pub fn register(&mut self, config: ReportConfig) -> Result<(), ReportError> {
        if self.configs.contains_key(&config.name) {
            return Err(ReportError::Config(format!(
                "config '{}' is already registered",
                config.name
            )));
        }
        self.configs.insert(config.name.clone(), config);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ReportConfig, ReportError> {
        self.configs.get(name).ok_or_else(|| {
            ReportError::Config(format!(
                "unknown config '{name}' (available: {})",
                self.names().join(", ")
            ))
        })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.configs.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldKind, Strategy};

    #[test]
    fn builtin_configs_parse_and_validate() {
        let registry = ConfigRegistry::builtin().unwrap();
        assert_eq!(registry.names(), vec!["restocking", "sku_reconcile"]);
    }

    #[test]
    fn restocking_matches_product_sales_layout() {
        let registry = ConfigRegistry::builtin().unwrap();
        let config = registry.get("restocking").unwrap();
        assert_eq!(config.output_name, "product_sales_report");
        assert_eq!(config.input_column("tea_id").unwrap().kind, FieldKind::NumericKey);
        assert_eq!(config.input_column("weight_g").unwrap().source, "Option 1");

        let Strategy::JoinClassify(jc) = &config.strategy else {
            panic!("restocking should be join_classify");
        };
        assert_eq!(jc.matched_sheet.name, "Whole Packages");
        assert_eq!(jc.remainder_sheet.name, "Sold by grams");
        let labels: Vec<&str> = jc
            .remainder_sheet
            .columns
            .iter()
            .map(|c| config.label_for(c).unwrap())
            .collect();
        assert_eq!(
            labels,
            vec!["Tea ID", "Tea Name", "Category", "Package Type", "Total Sold (g)", "Jar Capacity (g)"]
        );
    }

    #[test]
    fn unknown_name_lists_available() {
        let registry = ConfigRegistry::builtin().unwrap();
        let err = registry.get("nope").unwrap_err();
        assert!(err.to_string().contains("restocking, sku_reconcile"));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = ConfigRegistry::builtin().unwrap();
        let again = registry.get("restocking").unwrap().clone();
        assert!(registry.register(again).is_err());
    }
}
