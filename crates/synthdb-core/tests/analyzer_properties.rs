use synthdb_core::{
    ColumnMetadata, DataPattern, StandardType, ValueRange, analyze_table_schema,
    get_data_generation_hints,
};

fn column(position: i64, name: &str, declared: &str) -> ColumnMetadata {
    ColumnMetadata::from((position, name.to_string(), declared.to_string(), false, None, false))
}

#[test]
fn name_overrides_win_over_declared_types() {
    let info = analyze_table_schema(&[
        column(0, "unit_price", "INTEGER"),
        column(1, "created_at", "TEXT"),
        column(2, "ship_date", "VARCHAR(10)"),
    ]);

    let types: Vec<StandardType> = info.columns.iter().map(|c| c.standard_type).collect();
    assert_eq!(
        types,
        vec![StandardType::Decimal, StandardType::DateTime, StandardType::DateTime]
    );
}

#[test]
fn analysis_is_pure() {
    let metadata = vec![
        column(0, "id", "INTEGER"),
        column(1, "email", "VARCHAR(255)"),
        column(2, "balance", "NUMERIC(12,2)"),
        column(3, "profile", "JSONB"),
        column(4, "customerId", "BIGINT"),
    ];

    let first = analyze_table_schema(&metadata);
    let second = analyze_table_schema(&metadata);
    assert_eq!(first, second);
    assert_eq!(get_data_generation_hints(&first), get_data_generation_hints(&second));
}

#[test]
fn hints_serialize_with_snake_case_patterns() {
    let info = analyze_table_schema(&[column(0, "price", "TEXT")]);
    let hints = get_data_generation_hints(&info);

    assert_eq!(hints.data_patterns["price"], DataPattern::Currency);
    assert_eq!(
        hints.realistic_ranges["price"],
        ValueRange::Decimal {
            min: 1.0,
            max: 10_000.0
        }
    );

    let json = serde_json::to_value(&hints).expect("serialize hints");
    assert_eq!(json["data_patterns"]["price"], "currency");
    assert_eq!(json["realistic_ranges"]["price"]["min"], 1.0);
}
