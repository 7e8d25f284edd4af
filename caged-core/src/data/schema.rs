use polars::prelude::*;

use crate::domain::CanonicalRecord;

/// Columnar schema of a canonical dataset
pub struct CanonicalSchema;

impl CanonicalSchema {
    /// Get the canonical schema
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("reference_month".into(), DataType::String),
            Field::new("year".into(), DataType::Int32),
            Field::new("month".into(), DataType::Int32),
            Field::new("balance".into(), DataType::Int64),
            Field::new("wage".into(), DataType::Float64),
            Field::new("municipality_code".into(), DataType::String),
            Field::new("municipality".into(), DataType::String),
            Field::new("industry_section_code".into(), DataType::String),
            Field::new("sector".into(), DataType::String),
            Field::new("gender_code".into(), DataType::String),
            Field::new("gender".into(), DataType::String),
        ])
    }

    /// Build a DataFrame with the canonical schema from records
    pub fn to_dataframe(records: &[CanonicalRecord]) -> PolarsResult<DataFrame> {
        let months: Vec<String> = records.iter().map(|r| r.reference_month.to_string()).collect();
        let years: Vec<i32> = records.iter().map(|r| r.reference_month.year()).collect();
        let month_numbers: Vec<i32> = records
            .iter()
            .map(|r| r.reference_month.month() as i32)
            .collect();
        let balances: Vec<i64> = records.iter().map(|r| r.balance).collect();
        let wages: Vec<f64> = records.iter().map(|r| r.wage).collect();
        let text = |f: fn(&CanonicalRecord) -> &Option<String>| {
            records
                .iter()
                .map(|r| f(r).as_deref())
                .collect::<Vec<Option<&str>>>()
        };

        DataFrame::new(vec![
            Column::new("reference_month".into(), months),
            Column::new("year".into(), years),
            Column::new("month".into(), month_numbers),
            Column::new("balance".into(), balances),
            Column::new("wage".into(), wages),
            Column::new("municipality_code".into(), text(|r| &r.municipality_code)),
            Column::new("municipality".into(), text(|r| &r.municipality)),
            Column::new("industry_section_code".into(), text(|r| &r.industry_section_code)),
            Column::new("sector".into(), text(|r| &r.sector)),
            Column::new("gender_code".into(), text(|r| &r.gender_code)),
            Column::new("gender".into(), text(|r| &r.gender)),
        ])
    }

    /// Validate DataFrame against schema
    pub fn validate(df: &DataFrame) -> Result<(), ColumnarSchemaError> {
        let expected = Self::schema();
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| ColumnarSchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(ColumnarSchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ColumnarSchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}
