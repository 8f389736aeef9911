use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::err::{CdcError, CdcResult, ErrorKind};

const PKG: &str = "common::config";

/// One `[[source]]` block: a schema plus the table names/patterns to follow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub schema: String,
    pub tables: Vec<String>,
}

/// `[database]` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbConfig {
    pub addr: String,
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub charset: String,
    #[serde(default)]
    pub flavor: String,
}

/// `[dump]` block. Absent unless an initial backfill is wanted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpConfig {
    #[serde(rename = "mysqldump_path", default)]
    pub dump_exec_path: String,
}

/// Top-level TOML document as read from disk (see spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(rename = "database")]
    pub db: DbConfig,
    #[serde(default)]
    pub dump: DumpConfig,
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceConfig>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> CdcResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            CdcError::wrap(
                ErrorKind::NotFound,
                PKG,
                format!("fail to read config file {}", path.display()),
                e,
            )
        })?;

        toml::from_str(&data).map_err(|e| {
            CdcError::wrap(ErrorKind::Config, PKG, "fail to parse config file", e)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loads_well_formed_toml() {
        let dir = std::env::temp_dir().join(format!("cdc-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
            [database]
            addr = "127.0.0.1:3306"
            user = "root"
            charset = "utf8mb4"
            flavor = "mysql"

            [dump]
            mysqldump_path = "/usr/bin/mysqldump"

            [[source]]
            schema = "orders"
            tables = ["t_*"]
            "#,
        )
        .unwrap();

        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.db.addr, "127.0.0.1:3306");
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].schema, "orders");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = AppConfig::load("/nonexistent/path/config.toml").unwrap_err();
        assert!(err.is_kind(ErrorKind::NotFound));
    }
}
