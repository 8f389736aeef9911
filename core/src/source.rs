//! Source Resolver (C2): expands configured schema/table patterns into a
//! concrete dump set plus the decoder's include-table filter regexes
//! (spec.md §4.2). Grounded on
//! `original_source/domain/entity/syncmanager/syncmanager.go`'s
//! `parseSource`/`isValidTable` — validate, then per table either
//! register a literal or run the wildcard metadata query and register
//! every returned name.

use std::collections::HashSet;

use async_trait::async_trait;

use common::config::SourceConfig;
use common::err::{CdcError, CdcResult, ErrorKind};

const PKG: &str = "core::source";
const WILDCARD: &str = "*";
const ANY_TABLE_PATTERN: &str = ".*";

/// Metadata query boundary against the source MySQL instance (spec.md
/// §4.2 step: `SELECT table_name FROM information_schema.tables WHERE
/// table_name RLIKE "<pattern>" AND table_schema = "<schema>"`). A real
/// implementation runs that query over a live connection; this trait lets
/// `core` stay free of a MySQL client dependency, matching the decoder's
/// own collaborator-boundary treatment (spec.md §1).
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    async fn tables_matching(&self, schema: &str, pattern: &str) -> CdcResult<Vec<String>>;
}

/// Output of resolution: the concrete `(schema, table)` pairs to register
/// for dump, and the decoder's include-table filter regex list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPlan {
    pub dump_tables: Vec<(String, String)>,
    pub filters: Vec<String>,
}

/// Resolves `sources` against `inspector`, enforcing invariants C3.a
/// (mixed literal+wildcard within one entry is rejected) and C3.b
/// (duplicate `(schema, pattern)` pairs across the plan are rejected).
pub async fn resolve(
    sources: &[SourceConfig],
    inspector: &dyn SchemaInspector,
) -> CdcResult<ResolvedPlan> {
    let mut plan = ResolvedPlan::default();
    let mut seen_patterns: HashSet<(String, String)> = HashSet::new();

    for source in sources {
        validate_not_mixed(&source.tables)?;

        for table in &source.tables {
            if is_literal(table) {
                plan.dump_tables.push((source.schema.clone(), table.clone()));
                plan.filters.push(format!("{}\\.{}", source.schema, table));
                continue;
            }

            let key = (source.schema.clone(), table.clone());
            if !seen_patterns.insert(key) {
                return Err(CdcError::new(
                    ErrorKind::Config,
                    PKG,
                    format!(
                        "duplicate wildcard table {}.{}",
                        source.schema, table
                    ),
                ));
            }

            let query_pattern = if table == WILDCARD {
                ANY_TABLE_PATTERN
            } else {
                table.as_str()
            };

            let tables = inspector
                .tables_matching(&source.schema, query_pattern)
                .await
                .map_err(|e| {
                    CdcError::wrap(
                        ErrorKind::Query,
                        PKG,
                        format!("fail to query tables for {}.{}", source.schema, table),
                        e,
                    )
                })?;

            for matched in tables {
                plan.dump_tables.push((source.schema.clone(), matched));
            }
            plan.filters.push(format!("{}\\.{}", source.schema, table));
        }
    }

    Ok(plan)
}

/// Invariant C3.a: within one source entry, the wildcard shorthand `"*"`
/// must be the only element if present at all.
fn validate_not_mixed(tables: &[String]) -> CdcResult<()> {
    if tables.len() > 1 && tables.iter().any(|t| t == WILDCARD) {
        return Err(CdcError::new(
            ErrorKind::Config,
            PKG,
            "wildcard shorthand \"*\" must be the only table in its source entry",
        ));
    }
    Ok(())
}

/// A table string is a literal if escaping it as a regex doesn't change
/// it, i.e. it contains no regex metacharacters (mirrors
/// `regexp.QuoteMeta(table) != table` in `original_source`).
fn is_literal(table: &str) -> bool {
    regex::escape(table) == table
}

/// A [`SchemaInspector`] backed by a fixed map, used by tests and by the
/// workspace's in-process demo wiring where no live MySQL connection is
/// available.
pub struct FakeSchemaInspector {
    tables: std::collections::HashMap<(String, String), Vec<String>>,
}

impl FakeSchemaInspector {
    pub fn new() -> Self {
        FakeSchemaInspector {
            tables: std::collections::HashMap::new(),
        }
    }

    pub fn with_result(
        mut self,
        schema: impl Into<String>,
        pattern: impl Into<String>,
        tables: Vec<String>,
    ) -> Self {
        self.tables.insert((schema.into(), pattern.into()), tables);
        self
    }
}

impl Default for FakeSchemaInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaInspector for FakeSchemaInspector {
    async fn tables_matching(&self, schema: &str, pattern: &str) -> CdcResult<Vec<String>> {
        Ok(self
            .tables
            .get(&(schema.to_string(), pattern.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn source(schema: &str, tables: &[&str]) -> SourceConfig {
        SourceConfig {
            schema: schema.to_string(),
            tables: tables.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn s1_wildcard_expansion() {
        let sources = vec![source("db", &["t_*"])];
        let inspector = FakeSchemaInspector::new().with_result(
            "db",
            "t_*",
            vec!["t_a".to_string(), "t_b".to_string()],
        );

        let plan = resolve(&sources, &inspector).await.unwrap();
        assert_eq!(
            plan.dump_tables,
            vec![
                ("db".to_string(), "t_a".to_string()),
                ("db".to_string(), "t_b".to_string()),
            ]
        );
        assert_eq!(plan.filters, vec!["db\\.t_*".to_string()]);
    }

    #[tokio::test]
    async fn s2_duplicate_pattern_rejected() {
        let sources = vec![source("db", &["t_*"]), source("db", &["t_*"])];
        let inspector = FakeSchemaInspector::new().with_result("db", "t_*", vec![]);

        let err = resolve(&sources, &inspector).await.unwrap_err();
        assert!(err.is_kind(ErrorKind::Config));
    }

    #[tokio::test]
    async fn mixed_wildcard_and_literal_rejected() {
        let sources = vec![source("db", &["*", "t_a"])];
        let inspector = FakeSchemaInspector::new();

        let err = resolve(&sources, &inspector).await.unwrap_err();
        assert!(err.is_kind(ErrorKind::Config));
    }

    #[tokio::test]
    async fn reserved_wildcard_queries_any_table() {
        let sources = vec![source("db", &["*"])];
        let inspector =
            FakeSchemaInspector::new().with_result("db", ".*", vec!["a".to_string()]);

        let plan = resolve(&sources, &inspector).await.unwrap();
        assert_eq!(plan.dump_tables, vec![("db".to_string(), "a".to_string())]);
        assert_eq!(plan.filters, vec!["db\\.*".to_string()]);
    }

    #[tokio::test]
    async fn literal_tables_register_directly() {
        let sources = vec![source("db", &["orders"])];
        let inspector = FakeSchemaInspector::new();

        let plan = resolve(&sources, &inspector).await.unwrap();
        assert_eq!(
            plan.dump_tables,
            vec![("db".to_string(), "orders".to_string())]
        );
        assert_eq!(plan.filters, vec!["db\\.orders".to_string()]);
    }
}
