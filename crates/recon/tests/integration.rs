use std::cell::RefCell;
use std::path::PathBuf;

use steep_recon::model::ReportWarning;
use steep_recon::{ConfigRegistry, DataSource, ReportConfig, ReportError, Scalar, Table};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_config(name: &str) -> ReportConfig {
    let path = fixtures_dir().join(name);
    let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    ReportConfig::from_toml(&text).unwrap()
}

/// Store that answers every statement with the same table and records what
/// it was asked.
struct Recording {
    table: Table,
    statements: RefCell<Vec<String>>,
}

impl Recording {
    fn new(table: Table) -> Self {
        Self {
            table,
            statements: RefCell::new(Vec::new()),
        }
    }
}

impl DataSource for Recording {
    fn fetch(&self, statement: &str) -> Result<Table, ReportError> {
        self.statements.borrow_mut().push(statement.to_string());
        Ok(self.table.clone())
    }
}

fn boxes() -> Recording {
    Recording::new(Table::from_rows(
        ["box_id", "size", "status", "supplier"],
        vec![
            vec![Scalar::Int(1), Scalar::Int(6), "active".into(), "North".into()],
            vec![Scalar::Int(2), Scalar::Int(12), "retired".into(), "North".into()],
            vec![Scalar::Int(3), Scalar::Int(0), "active".into(), "South".into()],
            vec![Scalar::Int(4), Scalar::Int(24), "active".into(), "South".into()],
        ],
    ))
}

fn gift_box_sales() -> Table {
    Table::from_rows(
        ["SKU", "Title", "Pieces", "Sold", "Channel"],
        vec![
            vec!["1/red".into(), "Tasting Six".into(), Scalar::number(6.0), Scalar::Int(4), "web".into()],
            vec!["1/blue".into(), "Tasting Six".into(), Scalar::Int(3), Scalar::Int(2), "web".into()],
            vec!["2".into(), "Dozen".into(), Scalar::Int(12), Scalar::Int(1), "shop".into()],
            vec!["3".into(), "Any Mix".into(), Scalar::Int(9), Scalar::Int(5), "web".into()],
            vec!["4".into(), "Big Box".into(), Scalar::Int(10), Scalar::Int(1), "web".into()],
            vec!["4".into(), "Big Box".into(), Scalar::Int(14), Scalar::Int(3), "web".into()],
            vec!["4".into(), "Big Box".into(), "lots".into(), Scalar::Int(3), "web".into()],
            vec!["5".into(), "Ghost".into(), Scalar::Int(6), Scalar::Int(1), "web".into()],
        ],
    )
}

// -------------------------------------------------------------------------
// Config-driven join/classify
// -------------------------------------------------------------------------

#[test]
fn custom_config_splits_and_aggregates() {
    let config = load_config("gift_boxes.toml");
    let source = boxes();
    let book = steep_recon::run(&config, &gift_box_sales(), &source).unwrap();

    assert_eq!(
        source.statements.borrow().as_slice(),
        ["select id as box_id, size, status from boxes"]
    );

    let names: Vec<&str> = book.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Stocked", "Loose"]);

    let stocked = book.sheet("Stocked").unwrap();
    assert_eq!(stocked.headers, ["Box", "Title", "Sold"]);
    assert_eq!(
        stocked.rows,
        vec![
            vec![Scalar::Int(3), "Any Mix".into(), Scalar::Int(5)],
            vec![Scalar::Int(1), "Tasting Six".into(), Scalar::Int(4)],
        ]
    );

    // Sorted by title before grouping, so groups appear alphabetically
    let loose = book.sheet("Loose").unwrap();
    assert_eq!(loose.headers, ["Title", "Status", "Pieces Sold", "Lines"]);
    assert_eq!(
        loose.rows,
        vec![
            vec!["Big Box".into(), "active".into(), Scalar::Int(10 + 14 * 3), Scalar::Int(2)],
            vec!["Dozen".into(), "retired".into(), Scalar::Int(12), Scalar::Int(1)],
            vec!["Tasting Six".into(), "active".into(), Scalar::Int(6), Scalar::Int(1)],
        ]
    );

    assert_eq!(book.stats.input_rows, 7);
    assert_eq!(book.stats.store_rows, 4);
    assert_eq!(book.stats.matched_rows, 6);
    assert_eq!(book.warnings, vec![ReportWarning::MalformedRows { dropped: 1 }]);
    assert_eq!(book.meta.output_name, "gift_box_sales");
}

#[test]
fn missing_store_column_is_schema_error() {
    let config = load_config("gift_boxes.toml");
    let source = Recording::new(Table::from_rows(["box_id", "size"], vec![]));
    let err = steep_recon::run(&config, &gift_box_sales(), &source).unwrap_err();
    match err {
        ReportError::Schema { source, columns } => {
            assert_eq!(source, "store");
            assert_eq!(columns, ["status"]);
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn missing_input_columns_are_all_reported() {
    let config = load_config("gift_boxes.toml");
    let input = Table::from_rows(["SKU", "Title"], vec![]);
    let err = steep_recon::run(&config, &input, &boxes()).unwrap_err();
    assert_eq!(err.to_string(), "input: missing column(s) 'Pieces', 'Sold'");
}

#[test]
fn malformed_key_aborts_run() {
    let config = load_config("gift_boxes.toml");
    let input = Table::from_rows(
        ["SKU", "Title", "Pieces", "Sold"],
        vec![vec!["abc/1".into(), "Odd".into(), Scalar::Int(1), Scalar::Int(1)]],
    );
    let err = steep_recon::run(&config, &input, &boxes()).unwrap_err();
    assert!(matches!(err, ReportError::KeyParse { ref field, ref value } if field == "box_id" && value == "abc/1"));
}

// -------------------------------------------------------------------------
// Registry
// -------------------------------------------------------------------------

#[test]
fn registry_accepts_custom_config_next_to_builtins() {
    let mut registry = ConfigRegistry::builtin().unwrap();
    registry.register(load_config("gift_boxes.toml")).unwrap();
    assert_eq!(registry.names(), ["gift_boxes", "restocking", "sku_reconcile"]);

    let err = registry.register(load_config("gift_boxes.toml")).unwrap_err();
    assert!(matches!(err, ReportError::Config(_)));
}

#[test]
fn set_reconcile_queries_key_and_label_columns() {
    let registry = ConfigRegistry::builtin().unwrap();
    let config = registry.get("sku_reconcile").unwrap();
    let source = Recording::new(Table::from_rows(
        ["code", "tea_name"],
        vec![vec![" A1 ".into(), "Assam".into()], vec![Scalar::Int(42), "Numbered".into()]],
    ));
    let input = Table::from_rows(["Code"], vec![vec!["A1".into()], vec![Scalar::number(42.0)]]);

    let book = steep_recon::run(config, &input, &source).unwrap();
    assert_eq!(
        source.statements.borrow().as_slice(),
        [r#"SELECT "code", "tea_name" FROM "tea_catalog""#]
    );

    let matched = book.sheet("matched").unwrap();
    assert_eq!(
        matched.rows,
        vec![
            vec![Scalar::text("42"), Scalar::text("Numbered")],
            vec![Scalar::text("A1"), Scalar::text("Assam")],
        ]
    );
    assert!(book.sheet("missing_in_db").unwrap().rows.is_empty());
    assert!(book.warnings.is_empty());

    let summary = book.stats.reconciliation.unwrap();
    assert_eq!((summary.input_keys, summary.store_keys, summary.matched), (2, 2, 2));
}
