use report_portal::cell::CellDescriptor;
use report_portal::daterange::DateRange;
use report_portal::export::{SheetPlan, export_report, write_workbook};
use report_portal::grid::{Grid, MAX_GRID_COLS, build_grid, check_extent};
use report_portal::payload::ReportRecords;

fn range() -> DateRange {
    DateRange::new("01-04-2024", "30-04-2024")
}

// Helper: a report with a two-row header, data rows and a totals footer
fn sales_report() -> Grid {
    let records: ReportRecords = serde_json::from_str(
        r#"{
            "headers": [
                {"row": 0, "col": 0, "rowspan": 2, "value": "Branch", "bgColor": "0xFF1E3A8A", "fontColor": "0xFFFFFFFF", "fontStyle": "bold"},
                {"row": 0, "col": 1, "colspan": 2, "value": "Sales", "bgColor": "0xFF1E3A8A", "fontColor": "0xFFFFFFFF", "fontStyle": "bold"},
                {"row": 1, "col": 1, "value": "Units"},
                {"row": 1, "col": 2, "value": "Amount"}
            ],
            "records": [
                [{"row": 2, "col": 0, "value": "Pune"}, {"row": 2, "col": 1, "value": 14}, {"row": 2, "col": 2, "value": 2310.5}],
                [{"row": 3, "col": 0, "value": "Nagpur"}, {"row": 3, "col": 1, "value": 9}, {"row": 3, "col": 2, "value": 1200}]
            ],
            "footer": [{"row": 4, "col": 0, "value": "Total", "fontStyle": "bold", "bgColor": "0x80FFFF00"},
                       {"row": 4, "col": 1, "value": 23}, {"row": 4, "col": 2, "value": 3510.5}]
        }"#,
    )
    .unwrap();
    build_grid(&records.candidates())
}

#[test]
fn exports_a_readable_workbook() {
    let grid = sales_report();
    let outcome = export_report(&grid, "Branch Sales", &range()).unwrap();

    assert_eq!(outcome.file_name, "branch_sales.xlsx");
    assert!(outcome.warnings.is_empty());
    // xlsx files are zip archives
    assert_eq!(&outcome.bytes[..2], b"PK");
    println!("✓ workbook generated: {} bytes", outcome.bytes.len());
}

#[test]
fn header_merges_are_planned() {
    let plan = SheetPlan::build(&sales_report(), "Branch Sales", &range());
    let merges: Vec<String> = plan.merges().map(|m| m.to_string()).collect();
    assert_eq!(merges, vec!["A4:A5", "B4:C4"]);
    assert_eq!(plan.width, 3);
    println!("✓ merges: {:?}", merges);
}

#[test]
fn rejected_merge_is_a_warning_not_a_failure() {
    // "late" lands on a row already used by "early", keeps its colspan and
    // ends up with a merge range that overlaps "early"'s.
    let grid = build_grid(&[
        CellDescriptor::create(0, 1).with_span(1, 2).with_value("early"),
        CellDescriptor::create(0, 0).with_span(1, 2).with_value("late"),
    ]);

    let plan = SheetPlan::build(&grid, "Overlap", &range());
    assert_eq!(plan.merges().count(), 2);

    let (bytes, warnings) = write_workbook(&plan).unwrap();
    assert!(!bytes.is_empty());
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].range.to_string(), "B4:C4");
    println!("✓ {}", warnings[0]);
}

#[test]
fn exporting_twice_builds_the_same_workbook() {
    let grid = sales_report();
    let first = SheetPlan::build(&grid, "Branch Sales", &range());
    let second = SheetPlan::build(&grid, "Branch Sales", &range());
    assert_eq!(first, second);

    let a = export_report(&grid, "Branch Sales", &range()).unwrap();
    let b = export_report(&grid, "Branch Sales", &range()).unwrap();
    assert_eq!(a.file_name, b.file_name);
    assert_eq!(a.warnings, b.warnings);
}

#[test]
fn single_column_report_skips_title_merge() {
    let grid = build_grid(&[CellDescriptor::create(0, 0).with_value("only")]);
    let outcome = export_report(&grid, "Narrow", &range()).unwrap();
    assert!(outcome.warnings.is_empty());
    assert!(!outcome.bytes.is_empty());
}

#[test]
fn widest_accepted_report_still_merges_the_title() {
    let cells = vec![
        CellDescriptor::create(0, 0).with_value("first"),
        CellDescriptor::create(0, (MAX_GRID_COLS - 1) as u32).with_value("last"),
    ];
    check_extent(&cells).unwrap();
    let grid = build_grid(&cells);

    let plan = SheetPlan::build(&grid, "Wide", &range());
    assert_eq!(plan.width as usize, MAX_GRID_COLS);

    // Title and date merges span A:XFD, the last column a worksheet has.
    let (bytes, warnings) = write_workbook(&plan).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(&bytes[..2], b"PK");
    println!("✓ {} columns exported", plan.width);
}

#[test]
fn saves_under_download_name() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = export_report(&sales_report(), "Monthly Branch  Sales", &range()).unwrap();

    let path = outcome.save_to(dir.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), "monthly_branch_sales.xlsx");
    assert_eq!(std::fs::read(&path).unwrap(), outcome.bytes);
}
