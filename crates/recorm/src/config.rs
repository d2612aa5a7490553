//! Logging and storage configuration.

use crate::statement::StatementKind;
use tracing::Level;

/// How built statements are reported on the `recorm.sql` tracing target.
#[derive(Debug, Clone)]
pub struct SqlLogConfig {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes, on a char boundary). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogConfig {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn with_max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql<'s>(&self, sql: &'s str) -> std::borrow::Cow<'s, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => {
                format!("{}...", truncate_sql_bytes(sql, max)).into()
            }
            _ => sql.into(),
        }
    }

    pub(crate) fn emit(&self, kind: StatementKind, table: &str, sql: &str, binding_count: usize) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "recorm.sql",
            statement = ?kind,
            table,
            binding_count,
            sql = %sql,
        );
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// In-memory store tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Number of consecutive ids sharing one bucket lock.
    pub bucket_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { bucket_size: 100 }
    }
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bucket size; zero is treated as one.
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        let cfg = SqlLogConfig::new().with_max_sql_length(2);
        assert_eq!(cfg.truncate_sql("héllo"), "h...");
        assert_eq!(cfg.truncate_sql("hi"), "hi");
        assert_eq!(SqlLogConfig::new().no_truncate().truncate_sql("héllo"), "héllo");
    }

    #[test]
    fn defaults() {
        let cfg = SqlLogConfig::default();
        assert_eq!(cfg.level, Level::DEBUG);
        assert_eq!(cfg.max_sql_length, Some(200));
        assert_eq!(MemoryConfig::default().bucket_size, 100);
        assert_eq!(MemoryConfig::new().with_bucket_size(0).bucket_size, 1);
    }
}
