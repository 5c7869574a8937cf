use deunicode::deunicode;
use polars::prelude::{DataType, NamedFrom, Series};
use serde::Serialize;
use tracing::info;

use crate::domain::Table;
use crate::error::Result;
use crate::observability::metrics;

/// What a normalization pass touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeReport {
    /// Text columns that were rewritten
    pub columns: Vec<String>,
    /// Cells whose value actually changed
    pub values_changed: usize,
}

/// Canonicalizes every text column: transliterated to ASCII, lower-cased, first
/// character capitalized. Numeric columns and nulls are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Rewrite every `String` column in place and report what changed.
    pub fn normalize(&self, table: &mut Table) -> Result<NormalizeReport> {
        let text_columns: Vec<String> = table
            .frame()
            .get_columns()
            .iter()
            .filter(|s| s.dtype() == &DataType::String)
            .map(|s| s.name().to_string())
            .collect();

        let mut values_changed = 0;
        for name in &text_columns {
            let normalized: Vec<Option<String>> = table
                .require_column(name)?
                .str()?
                .into_iter()
                .map(|cell| {
                    cell.map(|raw| {
                        let out = normalize_text(raw);
                        if out != raw {
                            values_changed += 1;
                        }
                        out
                    })
                })
                .collect();
            table
                .frame_mut()
                .with_column(Series::new(name, normalized))?;
        }

        let report = NormalizeReport {
            columns: text_columns,
            values_changed,
        };
        metrics::normalize::columns_processed(report.columns.len());
        metrics::normalize::values_changed(values_changed);
        info!(
            columns = report.columns.len(),
            values_changed, "Text columns normalized"
        );
        Ok(report)
    }
}

/// `capitalize(lower(transliterate(text)))` for a single value. Any script is
/// transliterated to its closest ASCII spelling.
pub fn normalize_text(text: &str) -> String {
    capitalize(&deunicode(text).to_lowercase())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("BOGOTÁ"), "Bogota");
        assert_eq!(normalize_text("CUNDINAMARCA"), "Cundinamarca");
        assert_eq!(normalize_text("san andrés de TUMACO"), "San andres de tumaco");
        assert_eq!(normalize_text("BOGOTÁ, D.C."), "Bogota, d.c.");
        assert_eq!(normalize_text("ÑARIÑO"), "Narino");
        assert_eq!(normalize_text("Straße"), "Strasse");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_output_has_no_accents() {
        for input in ["ÁÉÍÓÚ", "àèìòù", "ÇãõÜ", "Łódź", "Ærø"] {
            let out = normalize_text(input);
            assert!(out.is_ascii(), "{} -> {}", input, out);
            assert_eq!(out, capitalize(&out.to_lowercase()));
        }
    }

    #[test]
    fn test_letters_without_decomposition_are_transliterated() {
        assert_eq!(normalize_text("ĦATILLO"), "Hatillo");
        assert_eq!(normalize_text("ŦUNJA"), "Tunja");
        assert_eq!(normalize_text("Москва"), "Moskva");
        assert_eq!(normalize_text("Café–Bar"), "Cafe-bar");
        let out = normalize_text("ŀLEIDA");
        assert!(out.is_ascii(), "{}", out);
        assert!(out.ends_with("leida"), "{}", out);
    }

    #[test]
    fn test_table_shape_preserved_and_numbers_untouched() {
        let mut table = Table::from_rows(
            ["municipio", "producci_n_t", "vacio"],
            vec![
                vec![Value::from("MEDELLÍN"), Value::from(4.0), Value::Null],
                vec![Value::Null, Value::from(0.0), Value::Null],
                vec![Value::from("Cali"), Value::from(1.5), Value::Null],
            ],
        )
        .unwrap();

        let report = TextNormalizer::new().normalize(&mut table).unwrap();

        assert_eq!(table.shape(), (3, 3));
        assert_eq!(report.columns, vec!["municipio".to_string()]);
        assert_eq!(report.values_changed, 1);
        let rows = table.rows().unwrap();
        assert_eq!(rows[0][0], Value::from("Medellin"));
        assert_eq!(rows[1][0], Value::Null);
        assert_eq!(rows[0][1], Value::Number(4.0));
        assert_eq!(rows[2][0], Value::from("Cali"));
        assert_eq!(table.column_values("vacio").unwrap(), vec![Value::Null; 3]);
    }
}
