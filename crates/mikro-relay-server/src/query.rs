use crate::error::RelayError;

/// A SQL string sent to Mikro, optionally with one `@param@` placeholder
/// (which may appear several times).
#[derive(Debug, Clone, Copy)]
pub struct QueryTemplate {
    pub name: &'static str,
    sql: &'static str,
    param: Option<&'static str>,
}

/// Per-barcode stock and price rows across all warehouses.
pub const PRODUCT_LOOKUP: QueryTemplate = QueryTemplate::with_param(
    "product_lookup",
    include_str!("../sql/product_lookup.sql"),
    "barcode",
);

/// Full catalog for initial sync. Takes no input.
pub const ALL_PRODUCTS: QueryTemplate =
    QueryTemplate::fixed("all_products", include_str!("../sql/all_products.sql"));

impl QueryTemplate {
    pub const fn fixed(name: &'static str, sql: &'static str) -> Self {
        Self {
            name,
            sql,
            param: None,
        }
    }

    pub const fn with_param(name: &'static str, sql: &'static str, param: &'static str) -> Self {
        Self {
            name,
            sql,
            param: Some(param),
        }
    }

    /// Builds the final query. A parameterised template requires a non-empty
    /// input; a fixed one ignores it.
    pub fn render(&self, input: Option<&str>) -> Result<String, RelayError> {
        let Some(param) = self.param else {
            return Ok(self.sql.to_owned());
        };
        match input {
            Some(value) if !value.is_empty() => {
                let placeholder = format!("@{param}@");
                Ok(self.sql.replace(&placeholder, &escape_literal(value)))
            }
            _ => Err(RelayError::Validation(format!("{param} is required"))),
        }
    }
}

/// Doubles single quotes so the value stays inside a SQL string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: QueryTemplate = QueryTemplate::with_param(
        "sample",
        "SELECT * FROM T WHERE a='@code@' OR b LIKE '%@code@%'",
        "code",
    );

    #[test]
    fn substitutes_every_placeholder() {
        let sql = SAMPLE.render(Some("8690000000017")).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM T WHERE a='8690000000017' OR b LIKE '%8690000000017%'"
        );
    }

    #[test]
    fn doubles_single_quotes() {
        let sql = SAMPLE.render(Some("O'Brien123")).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM T WHERE a='O''Brien123' OR b LIKE '%O''Brien123%'"
        );
    }

    #[test]
    fn quote_only_input_cannot_close_the_literal() {
        let sql = SAMPLE.render(Some("' OR 1=1 --")).unwrap();
        assert!(sql.contains("a=''' OR 1=1 --'"));
        // Every quote run inside the literal is even, so the literal never ends early.
        assert_eq!(sql.matches('\'').count() % 2, 0);
    }

    #[test]
    fn missing_or_empty_input_is_a_validation_error() {
        for input in [None, Some("")] {
            match SAMPLE.render(input) {
                Err(RelayError::Validation(msg)) => assert_eq!(msg, "code is required"),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn fixed_template_ignores_input() {
        let t = QueryTemplate::fixed("fixed", "SELECT 1");
        assert_eq!(t.render(None).unwrap(), "SELECT 1");
        assert_eq!(t.render(Some("x'y")).unwrap(), "SELECT 1");
    }

    #[test]
    fn product_lookup_embeds_escaped_barcode() {
        let sql = PRODUCT_LOOKUP.render(Some("O'Brien123")).unwrap();
        assert!(!sql.contains("@barcode@"));
        assert!(sql.contains("='O''Brien123'"));
        assert!(sql.contains("LIKE '%O''Brien123%'"));
        assert!(!sql.contains("'O'Brien123"));
    }

    #[test]
    fn all_products_has_no_placeholder() {
        let sql = ALL_PRODUCTS.render(None).unwrap();
        assert!(!sql.contains('@'));
        assert!(sql.contains("FROM"));
    }
}
