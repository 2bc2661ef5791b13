use polars::prelude::*;

/// Renamed opening price.
pub const ABERTURA: &str = "abertura";
/// Renamed closing price.
pub const FECHAMENTO: &str = "fechamento";
/// Derived daily variation, in percent.
pub const VARIACAO_DIARIA: &str = "variacao_diaria";

fn partition_fields() -> [Field; 4] {
    [
        Field::new("ticker".into(), DataType::String),
        Field::new("year".into(), DataType::Int32),
        Field::new("month".into(), DataType::Int32),
        Field::new("day".into(), DataType::Int32),
    ]
}

/// Schema of a raw-zone record as written by the extractor.
pub struct RawSchema;

impl RawSchema {
    pub fn schema() -> Schema {
        let mut fields = vec![
            Field::new("date".into(), DataType::Date),
            Field::new("open".into(), DataType::Float64),
            Field::new("high".into(), DataType::Float64),
            Field::new("low".into(), DataType::Float64),
            Field::new("close".into(), DataType::Float64),
            Field::new("volume".into(), DataType::UInt64),
        ];
        fields.extend(partition_fields());
        Schema::from_iter(fields)
    }

    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        validate_against(&Self::schema(), df)
    }
}

/// Schema of a refined-zone record as written by the transform.
pub struct RefinedSchema;

impl RefinedSchema {
    pub fn schema() -> Schema {
        let mut fields = vec![
            Field::new("date".into(), DataType::Date),
            Field::new(ABERTURA.into(), DataType::Float64),
            Field::new("high".into(), DataType::Float64),
            Field::new("low".into(), DataType::Float64),
            Field::new(FECHAMENTO.into(), DataType::Float64),
            Field::new("volume".into(), DataType::UInt64),
        ];
        fields.extend(partition_fields());
        fields.push(Field::new(VARIACAO_DIARIA.into(), DataType::Float64));
        Schema::from_iter(fields)
    }

    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        validate_against(&Self::schema(), df)
    }
}

fn validate_against(expected: &Schema, df: &DataFrame) -> Result<(), SchemaError> {
    let actual = df.schema();

    for field in expected.iter_fields() {
        let actual_dtype = actual
            .get(field.name())
            .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
        if actual_dtype != field.dtype() {
            return Err(SchemaError::TypeMismatch {
                column: field.name().to_string(),
                expected: field.dtype().clone(),
                actual: actual_dtype.clone(),
            });
        }
    }

    Ok(())
}

/// Hive-style type name used when publishing a column to the catalog.
pub fn catalog_type(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Float64 => "double",
        DataType::Float32 => "float",
        DataType::Int64 | DataType::UInt64 | DataType::UInt32 => "bigint",
        DataType::Int32 | DataType::Int16 | DataType::UInt16 => "int",
        DataType::Int8 | DataType::UInt8 => "tinyint",
        DataType::Boolean => "boolean",
        DataType::Date => "date",
        DataType::Datetime(_, _) => "timestamp",
        DataType::String => "string",
        _ => "binary",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refined_schema_replaces_open_and_close() {
        let schema = RefinedSchema::schema();
        assert!(schema.contains(ABERTURA));
        assert!(schema.contains(FECHAMENTO));
        assert!(schema.contains(VARIACAO_DIARIA));
        assert!(!schema.contains("open"));
        assert!(!schema.contains("close"));
    }

    #[test]
    fn validate_rejects_missing_column() {
        let df = DataFrame::new(vec![Column::new("open".into(), &[30.0])]).unwrap();
        let result = RawSchema::validate(&df);
        assert!(matches!(result, Err(SchemaError::MissingColumn(_))));
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let mut columns: Vec<Column> = RawSchema::schema()
            .iter_fields()
            .map(|f| Column::full_null(f.name().clone(), 1, f.dtype()))
            .collect();
        columns[1] = Column::new("open".into(), &["not_a_number"]);
        let df = DataFrame::new(columns).unwrap();

        let result = RawSchema::validate(&df);
        assert!(matches!(result, Err(SchemaError::TypeMismatch { .. })));
    }

    #[test]
    fn catalog_types_follow_hive_names() {
        assert_eq!(catalog_type(&DataType::Float64), "double");
        assert_eq!(catalog_type(&DataType::UInt64), "bigint");
        assert_eq!(catalog_type(&DataType::Int32), "int");
        assert_eq!(catalog_type(&DataType::String), "string");
        assert_eq!(catalog_type(&DataType::Date), "date");
    }
}
