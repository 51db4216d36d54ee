use crate::entity::IngestError;

pub const CRYPTO_PRICES_TABLE: &str = "crypto_prices";

/// DDL needed for a destination table, all statements idempotent
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub create_table: String,
    pub indexes: Vec<String>,
}

impl TableSchema {
    /// Statements in execution order: table first, then its indexes
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.create_table.as_str()).chain(self.indexes.iter().map(String::as_str))
    }
}

/// Schema of a price snapshot table named `table`, indexed on `(symbol, fetch_time)`
pub fn price_table_schema(table: &str, index_name: &str) -> Result<TableSchema, IngestError> {
    let table = validate_table_name(table)?;
    let index_name = validate_table_name(index_name)?;

    Ok(build_price_table_schema(table, index_name))
}

pub fn crypto_prices_schema() -> TableSchema {
    build_price_table_schema(CRYPTO_PRICES_TABLE, "idx_symbol_time")
}

fn build_price_table_schema(table: &str, index_name: &str) -> TableSchema {
    TableSchema {
        create_table: format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id SERIAL PRIMARY KEY,
                symbol VARCHAR(20) NOT NULL,
                price NUMERIC(18,8) NOT NULL,
                fetch_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            table
        ),
        indexes: vec![format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} (symbol, fetch_time)",
            index_name, table
        )],
    }
}

/// Accepts plain unquoted SQL identifiers only, since table names are interpolated
pub fn validate_table_name(name: &str) -> Result<&str, IngestError> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= 63 {
        Ok(name)
    } else {
        Err(IngestError::InvalidTableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_prices_schema_is_idempotent_ddl() {
        let schema = crypto_prices_schema();
        let statements: Vec<&str> = schema.statements().collect();

        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS crypto_prices"));
        assert!(statements[0].contains("price NUMERIC(18,8) NOT NULL"));
        assert!(statements[0].contains("symbol VARCHAR(20) NOT NULL"));
        assert_eq!(
            statements[1],
            "CREATE INDEX IF NOT EXISTS idx_symbol_time ON crypto_prices (symbol, fetch_time)"
        );
    }

    #[test]
    fn test_price_table_schema_uses_given_names() {
        let schema = price_table_schema("prices_archive", "idx_archive_symbol_time").unwrap();

        assert!(schema.create_table.contains("IF NOT EXISTS prices_archive ("));
        assert_eq!(
            schema.indexes,
            vec!["CREATE INDEX IF NOT EXISTS idx_archive_symbol_time ON prices_archive (symbol, fetch_time)"]
        );
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("crypto_prices").is_ok());
        assert!(validate_table_name("_tmp1").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1prices").is_err());
        assert!(validate_table_name("prices; DROP TABLE users").is_err());
        assert!(validate_table_name("public.prices").is_err());
        assert!(validate_table_name(&"a".repeat(64)).is_err());
    }
}
