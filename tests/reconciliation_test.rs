use etl_recon::prelude::*;
use polars::prelude::{df, NamedFrom, ParquetWriter};
use rust_xlsxwriter::Workbook;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::fs;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn write_mapping(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_customer_key_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_mapping(
        &dir,
        "customers.csv",
        "source_column,target_column,transformation,is_key\ncustomer_id,cust_id,customers.customer_id,TRUE\n",
    );

    let mut orchestrator = ValidationOrchestrator::new();
    let mappings = orchestrator.load(&path).unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings.source_columns(), &["customer_id"]);
    assert_eq!(mappings.detected_source_tables(), &["customers"]);

    let queries = orchestrator
        .generate_validation_queries(&TableRef::new("customers"), &TableRef::new("dim_customer"), QueryMode::Both)
        .unwrap();
    assert!(queries
        .get("source_minus_target")
        .unwrap()
        .contains("customers.customer_id AS cust_id"));
    assert_eq!(queries.join_keys.origin, KeyOrigin::Flagged);
}

#[test]
fn test_orders_fixture_summary() {
    let mut orchestrator = ValidationOrchestrator::new();
    orchestrator.load(fixture("orders_mapping.csv")).unwrap();

    let summary = orchestrator.get_summary();
    assert_eq!(summary.total_mappings, 6);
    assert_eq!(summary.detected_source_tables, vec!["customers", "orders"]);
    assert_eq!(
        summary.source_columns,
        vec!["customer_id", "first_name", "order_date", "order_id", "order_total", "status"]
    );
    assert_eq!(
        summary.transformations.get("order_amount").map(String::as_str),
        Some("ROUND(orders.order_total, 2)")
    );
    assert_eq!(orchestrator.default_source_table(), "customers");
}

#[test]
fn test_multiline_transformation_is_collapsed() {
    let mut orchestrator = ValidationOrchestrator::new();
    orchestrator.load(fixture("orders_mapping.csv")).unwrap();

    let sql = orchestrator
        .generate_validation_queries(&TableRef::new("orders"), &TableRef::new("fact_orders"), QueryMode::SourceMinusTarget)
        .unwrap();
    assert!(sql.source_minus_target().unwrap().contains(
        "    CASE WHEN orders.status = 'SHIPPED' THEN 'S' WHEN orders.status = 'PENDING' THEN 'P' ELSE 'X' END AS status_code,"
    ));
}

#[test]
fn test_missing_transformation_header() {
    let err = MappingLoader::load(fixture("missing_transformation.csv")).unwrap_err();
    assert!(err.is_format());
    let message = err.to_string();
    assert!(message.contains("Missing required columns: transformation"));
    assert!(message.contains("Found columns: is_key, source_column, target_column"));
}

#[test]
fn test_one_incomplete_row() {
    let err = MappingLoader::load(fixture("incomplete_mapping.csv")).unwrap_err();
    assert!(err.is_format());
    assert!(err.to_string().contains("Found 1 row(s) with missing required data"));
}

#[test]
fn test_row_count_matches_input() {
    let dir = tempfile::tempdir().unwrap();
    for rows in [1usize, 7, 250] {
        let mut text = String::from("source_column,target_column,transformation,is_key\n");
        for i in 0..rows {
            text.push_str(&format!("col_{i},out_{i},src.col_{i},{}\n", i == 0));
        }
        let path = write_mapping(&dir, &format!("mapping_{}.csv", rows), &text);

        let mut orchestrator = ValidationOrchestrator::new();
        let mappings = orchestrator.load(&path).unwrap();
        assert_eq!(mappings.len(), rows);
        assert_eq!(orchestrator.get_summary().total_mappings, rows);
    }
}

#[test]
fn test_tab_delimited_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_mapping(
        &dir,
        "mapping.tsv",
        "source_column\ttarget_column\ttransformation\nid\torder_id\torders.id\n",
    );
    let mappings = MappingLoader::load(&path).unwrap();
    assert_eq!(mappings.target_columns(), &["order_id"]);
}

#[test]
fn test_excel_workbook_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapping.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = ["Source_Column", "Target_Column", "Transformation", "is_key"];
    for (col, name) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    let rows = [
        ("customer_id", "cust_id", "customers.customer_id", true),
        ("name", "full_name", "UPPER(customers.name)", false),
    ];
    for (idx, (source, target, transformation, key)) in rows.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, *source).unwrap();
        sheet.write_string(row, 1, *target).unwrap();
        sheet.write_string(row, 2, *transformation).unwrap();
        sheet.write_boolean(row, 3, *key).unwrap();
    }
    workbook.save(&path).unwrap();

    let mut orchestrator = ValidationOrchestrator::new();
    let mappings = orchestrator.load(&path).unwrap();
    assert_eq!(mappings.len(), 2);
    assert!(mappings.entries()[0].is_key);
    assert!(!mappings.entries()[1].is_key);
    assert_eq!(mappings.detected_source_tables(), &["customers"]);

    let queries = orchestrator
        .generate_validation_queries(&TableRef::new("customers"), &TableRef::new("dim_customer"), QueryMode::Both)
        .unwrap();
    assert!(queries.complete().unwrap().contains("UPPER(customers.name) AS full_name"));
    assert_eq!(queries.join_keys.keys, vec!["cust_id"]);
}

#[test]
fn test_excel_workbook_with_incomplete_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapping.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in ["source_column", "target_column", "transformation"].iter().enumerate() {
        sheet.write_string(0, col as u16, *name).unwrap();
    }
    sheet.write_string(1, 0, "id").unwrap();
    sheet.write_string(1, 1, "order_id").unwrap();
    sheet.write_string(1, 2, "orders.id").unwrap();
    sheet.write_string(2, 0, "amount").unwrap();
    sheet.write_string(2, 2, "orders.amount").unwrap();
    workbook.save(&path).unwrap();

    let err = MappingLoader::load(&path).unwrap_err();
    assert!(err.is_format());
    assert!(err.to_string().ends_with("Check line(s): 3"));
}

#[test]
fn test_unknown_extension_read_as_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_mapping(
        &dir,
        "mapping.dat",
        "source_column,target_column,transformation\nid,order_id,orders.id\n",
    );
    let mappings = MappingLoader::load(&path).unwrap();
    assert_eq!(mappings.target_columns(), &["order_id"]);
}

#[test]
fn test_parquet_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapping.parquet");

    let mut frame = df![
        "source_column" => ["id", "amount"],
        "target_column" => ["order_id", "total"],
        "transformation" => ["orders.id", "ROUND(orders.amount, 2)"],
        "is_key" => [true, false]
    ]
    .unwrap();
    let mut file = fs::File::create(&path).unwrap();
    ParquetWriter::new(&mut file).finish(&mut frame).unwrap();

    let mappings = MappingLoader::load(&path).unwrap();
    assert_eq!(mappings.len(), 2);
    assert_eq!(mappings.target_columns(), &["order_id", "total"]);
    assert_eq!(mappings.entries()[1].transformation, "ROUND(orders.amount, 2)");
    assert!(mappings.entries()[0].is_key);
    assert!(!mappings.entries()[1].is_key);
}

#[test]
fn test_parquet_null_transformation_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapping.parquet");

    let mut frame = df![
        "source_column" => ["id", "amount"],
        "target_column" => ["order_id", "total"],
        "transformation" => [Some("orders.id"), None::<&str>]
    ]
    .unwrap();
    let mut file = fs::File::create(&path).unwrap();
    ParquetWriter::new(&mut file).finish(&mut frame).unwrap();

    let err = MappingLoader::load(&path).unwrap_err();
    assert!(err.to_string().starts_with("Found 1 row(s) with missing required data"));
    assert!(err.to_string().ends_with("Check line(s): 3"));
}

#[test]
fn test_json_array_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_mapping(
        &dir,
        "mapping.json",
        r#"[
  {"source_column": "id", "target_column": "order_id", "transformation": "orders.id", "is_key": true},
  {"source_column": "status", "target_column": "status_code", "transformation": "UPPER(orders.status)", "is_key": false}
]"#,
    );

    let mappings = MappingLoader::load(&path).unwrap();
    assert_eq!(mappings.len(), 2);
    assert!(mappings.entries()[0].is_key);
    assert!(!mappings.entries()[1].is_key);
    assert_eq!(mappings.entries()[1].transformation, "UPPER(orders.status)");
}

#[test]
fn test_json_array_null_transformation_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_mapping(
        &dir,
        "mapping.json",
        r#"[
  {"source_column": "id", "target_column": "order_id", "transformation": "orders.id"},
  {"source_column": "status", "target_column": "status_code", "transformation": null}
]"#,
    );

    let err = MappingLoader::load(&path).unwrap_err();
    assert!(err.is_format());
    assert!(err.to_string().starts_with("Found 1 row(s) with missing required data"));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = MappingLoader::load("/definitely/not/here.csv").unwrap_err();
    assert!(matches!(err, ReconError::Io(_)));
}

#[test]
fn test_schema_qualification_only_where_given() {
    let mut orchestrator = ValidationOrchestrator::new();
    orchestrator.load(fixture("orders_mapping.csv")).unwrap();

    let queries = orchestrator
        .generate_validation_queries(
            &TableRef::qualified("orders", Some("s1")),
            &TableRef::qualified("fact_orders", None),
            QueryMode::Both,
        )
        .unwrap();

    for sql in queries.queries.values() {
        assert!(sql.contains("s1.orders"));
        assert!(!sql.contains(".fact_orders"));
    }
}

#[test]
fn test_generation_is_idempotent() {
    let mut orchestrator = ValidationOrchestrator::new();
    orchestrator.load(fixture("orders_mapping.csv")).unwrap();
    let source = TableRef::new("orders").with_schema("staging");
    let target = TableRef::new("fact_orders").with_schema("dw");

    let first = orchestrator.generate_validation_queries(&source, &target, QueryMode::Both).unwrap();
    let second = orchestrator.generate_validation_queries(&source, &target, QueryMode::Both).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_directions_swap_except_operands() {
    let mut orchestrator = ValidationOrchestrator::new();
    orchestrator.load(fixture("orders_mapping.csv")).unwrap();
    let queries = orchestrator
        .generate_validation_queries(&TableRef::new("orders"), &TableRef::new("fact_orders"), QueryMode::Both)
        .unwrap();

    let smt = queries.source_minus_target().unwrap();
    let tms = queries.target_minus_source().unwrap();
    for sql in [smt, tms] {
        assert!(sql.contains("source_transformed"));
        assert!(sql.contains("target_data"));
    }
    assert!(smt.contains("SOURCE_MINUS_TARGET"));
    assert!(smt.contains("SELECT * FROM source_transformed\n  EXCEPT\n  SELECT * FROM target_data"));
    assert!(tms.contains("TARGET_MINUS_SOURCE"));
    assert!(tms.contains("SELECT * FROM target_data\n  EXCEPT\n  SELECT * FROM source_transformed"));
}

#[test]
fn test_generated_sql_parses() {
    let mut orchestrator = ValidationOrchestrator::new();
    orchestrator.load(fixture("orders_mapping.csv")).unwrap();
    let queries = orchestrator
        .generate_validation_queries(
            &TableRef::new("orders").with_schema("staging"),
            &TableRef::new("fact_orders"),
            QueryMode::Both,
        )
        .unwrap();

    let dialect = PostgreSqlDialect {};
    let statements = Parser::parse_sql(&dialect, queries.source_minus_target().unwrap()).unwrap();
    assert_eq!(statements.len(), 1);
    let statements = Parser::parse_sql(&dialect, queries.complete().unwrap()).unwrap();
    assert_eq!(statements.len(), 2);
}

#[test]
fn test_programmatic_mapping_without_transformation() {
    let set = MappingSet::new(vec![
        MappingEntry::new("id", "order_id", ""),
        MappingEntry::new("", "batch_id", ""),
    ])
    .unwrap();
    let synthesizer = QuerySynthesizer::new(std::sync::Arc::new(set));

    let select = synthesizer.select_clause("orders");
    assert_eq!(select, "    orders.id AS order_id,\n    NULL AS batch_id");
    assert_eq!(synthesizer.join_keys().origin, KeyOrigin::FirstColumnDefault);
    assert_eq!(synthesizer.join_keys().keys, vec!["order_id"]);
}
