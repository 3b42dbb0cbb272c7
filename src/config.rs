use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Column conventions and storage locations for one deployment.
///
/// The pipeline itself is schema-agnostic; these names tell it which
/// columns act as the grouping key, the numeric aggregate, the asset
/// code, and the two derived columns it writes into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Column every uploaded sheet must carry; also the default
    /// classification grouping key.
    #[serde(default = "default_group_column")]
    pub group_column: String,

    /// Numeric column summed into subtotal rows.
    #[serde(default = "default_aggregate_column")]
    pub aggregate_column: String,

    /// Column holding asset codes; blank cells get generated codes.
    #[serde(default = "default_code_column")]
    pub code_column: String,

    /// Derived column receiving batched classification values.
    #[serde(default = "default_classification_column")]
    pub classification_column: String,

    /// Derived column receiving the propagated group lead code.
    #[serde(default = "default_lead_column")]
    pub lead_column: String,

    /// Directory uploaded files are saved under, one subdirectory per user.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
}

fn default_group_column() -> String {
    "Site".to_string()
}

fn default_aggregate_column() -> String {
    "Quantity".to_string()
}

fn default_code_column() -> String {
    "Asset Code".to_string()
}

fn default_classification_column() -> String {
    "Group.1".to_string()
}

fn default_lead_column() -> String {
    "Group Lead?".to_string()
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

impl Default for SheetConfig {
    fn default() -> Self {
        SheetConfig {
            group_column: default_group_column(),
            aggregate_column: default_aggregate_column(),
            code_column: default_code_column(),
            classification_column: default_classification_column(),
            lead_column: default_lead_column(),
            upload_dir: default_upload_dir(),
        }
    }
}

impl SheetConfig {
    /// Load configuration from a JSON file, falling back to the defaults
    /// when the file is missing or unreadable.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return SheetConfig::default();
        }

        let mut contents = String::new();
        match File::open(path) {
            Ok(mut file) => {
                if file.read_to_string(&mut contents).is_err() {
                    log::warn!("failed to read config file {}", path.display());
                    return SheetConfig::default();
                }
            }
            Err(_) => return SheetConfig::default(),
        }

        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("failed to parse config file {}: {}", path.display(), e);
                SheetConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_sheet_conventions() {
        let config = SheetConfig::default();
        assert_eq!(config.group_column, "Site");
        assert_eq!(config.aggregate_column, "Quantity");
        assert_eq!(config.code_column, "Asset Code");
        assert_eq!(config.classification_column, "Group.1");
        assert_eq!(config.lead_column, "Group Lead?");
        assert_eq!(config.upload_dir, "uploads");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = SheetConfig::load("no/such/config.json");
        assert_eq!(config.group_column, "Site");
    }

    #[test]
    fn partial_file_keeps_defaults_for_absent_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(br#"{"group_column": "Location"}"#).unwrap();

        let config = SheetConfig::load(&path);
        assert_eq!(config.group_column, "Location");
        assert_eq!(config.aggregate_column, "Quantity");
    }
}
