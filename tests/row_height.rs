mod common;

use cmvr_render::model::{
    Cell, ColumnKind, ColumnSpec, ColumnWidth, ImageCell, LabelColumn, MIN_IMAGE_ROW_HEIGHT,
    MIN_ROW_HEIGHT, PageGeometry, TABLE_TEXT,
};
use cmvr_render::pdf::{
    CELL_PADDING_X, CELL_PADDING_Y, HEADER_MIN_HEIGHT, header_height, row_height,
    split_parenthetical, table_geometry,
};
use cmvr_render::{Error, TextMetrics};

fn two_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::text("Requirement", ColumnWidth::Percent(60.0)),
        ColumnSpec::text("Remarks", ColumnWidth::Percent(40.0)),
    ]
}

#[test]
fn short_rows_use_the_floor() {
    let metrics = TextMetrics::standard();
    let row = vec![Cell::text("Yes"), Cell::text("-")];
    let h = row_height(&metrics, &two_columns(), &[300.0, 200.0], &row, MIN_ROW_HEIGHT);
    assert!(common::approx(h, MIN_ROW_HEIGHT), "got {h}");
}

#[test]
fn height_never_shrinks_as_text_grows() {
    let metrics = TextMetrics::standard();
    let columns = two_columns();
    let widths = [300.0, 200.0];
    let mut previous = 0.0;
    for words in [1, 5, 20, 60, 120, 300] {
        let text = vec!["compliance"; words].join(" ");
        let h = row_height(&metrics, &columns, &widths, &[Cell::text(text), Cell::text("ok")], MIN_ROW_HEIGHT);
        assert!(h >= MIN_ROW_HEIGHT);
        assert!(h >= previous, "{words} words gave {h}, shorter than {previous}");
        previous = h;
    }
    assert!(previous > MIN_ROW_HEIGHT * 3.0);
}

#[test]
fn wrapped_text_matches_metrics() {
    let metrics = TextMetrics::standard();
    let text = "The proponent has complied with the monitoring requirements and submitted all quarterly reports on time.";
    let width = 120.0;
    let h = row_height(
        &metrics,
        &[ColumnSpec::text("Remarks", ColumnWidth::Points(width))],
        &[width],
        &[Cell::text(text)],
        0.0,
    );
    let expected = metrics.height_of_wrapped(text, width - 2.0 * CELL_PADDING_X, TABLE_TEXT)
        + 2.0 * CELL_PADDING_Y;
    assert!(common::approx(h, expected), "{h} vs {expected}");
    assert!(h > metrics.line_height(TABLE_TEXT) * 3.0);
}

#[test]
fn explicit_newlines_add_lines() {
    let metrics = TextMetrics::standard();
    let one = metrics.height_of_wrapped("Sludge", 200.0, TABLE_TEXT);
    let three = metrics.height_of_wrapped("Sludge: 2 t\nOil: 40 L\nBatteries: 3", 200.0, TABLE_TEXT);
    assert!(common::approx(three, one * 3.0), "{three} vs 3 × {one}");
}

#[test]
fn image_rows_use_the_slot_height() {
    let metrics = TextMetrics::standard();
    let columns = vec![
        ColumnSpec::text("Name", ColumnWidth::Points(150.0)).kind(ColumnKind::Name),
        ColumnSpec::text("Signature", ColumnWidth::Points(80.0)).kind(ColumnKind::Image {
            width: 60.0,
            height: 19.0,
        }),
    ];
    let row = vec![
        Cell::text("Ana Reyes"),
        Cell::Image(ImageCell::Url("https://example.test/sig.png".into())),
    ];
    let h = row_height(&metrics, &columns, &[150.0, 80.0], &row, MIN_IMAGE_ROW_HEIGHT);
    assert!(common::approx(h, MIN_IMAGE_ROW_HEIGHT.max(19.0 + 2.0 * CELL_PADDING_Y)));

    let absent = vec![Cell::text("Ana Reyes"), Cell::Image(ImageCell::Absent)];
    let h_absent = row_height(&metrics, &columns, &[150.0, 80.0], &absent, 0.0);
    assert!(h_absent > 2.0 * CELL_PADDING_Y);
}

#[test]
fn parenthetical_suffix_is_split_from_name() {
    assert_eq!(
        split_parenthetical("Juan Dela Cruz (MGB Representative)"),
        Some(("Juan Dela Cruz", " (MGB Representative)"))
    );
    assert_eq!(
        split_parenthetical("Maria Santos  (Rep. of LGU) "),
        Some(("Maria Santos", "  (Rep. of LGU) "))
    );
    assert_eq!(split_parenthetical("Juan(MGB)"), Some(("Juan", "(MGB)")));
    assert_eq!(split_parenthetical("Pedro Penduko"), None);
    assert_eq!(split_parenthetical("(Vacant)"), None);
    assert_eq!(split_parenthetical("Ana (MMT) Reyes"), None);
}

#[test]
fn empty_parentheses_are_not_a_suffix() {
    assert_eq!(split_parenthetical("Name ()"), None);
    assert_eq!(split_parenthetical("Name ( )"), Some(("Name", " ( )")));
}

#[test]
fn header_grows_for_long_labels() {
    let metrics = TextMetrics::standard();
    let short = header_height(&metrics, &two_columns(), &[300.0, 200.0]);
    assert!(common::approx(short, HEADER_MIN_HEIGHT));

    let narrow = vec![ColumnSpec::text(
        "Final Mine Rehabilitation and Decommissioning Fund Balance",
        ColumnWidth::Points(50.0),
    )];
    let tall = header_height(&metrics, &narrow, &[50.0]);
    assert!(tall > HEADER_MIN_HEIGHT, "got {tall}");
}

#[test]
fn label_and_colon_share_the_table_width() {
    let page = PageGeometry::cmvr();
    let label = LabelColumn {
        text: "ECC".into(),
        width: ColumnWidth::Percent(20.0),
        colon: Some(ColumnWidth::Percent(3.0)),
    };
    let columns = vec![
        ColumnSpec::text("Name of Permit Holder", ColumnWidth::Percent(31.0)),
        ColumnSpec::text("ECC Number", ColumnWidth::Percent(23.0)),
        ColumnSpec::text("Date of Issuance", ColumnWidth::Percent(23.0)),
    ];
    let geo = table_geometry(&page, Some(&label), &columns).expect("geometry");
    assert!(common::approx(geo.total_width(), page.usable_width()));
    assert!(common::approx(geo.data_x, page.margins.left + page.usable_width() * 0.23));
}

#[test]
fn overflowing_columns_are_rejected() {
    let page = PageGeometry::attendance();
    let columns = vec![
        ColumnSpec::text("A", ColumnWidth::Percent(70.0)),
        ColumnSpec::text("B", ColumnWidth::Percent(50.0)),
    ];
    match table_geometry(&page, None, &columns) {
        Err(Error::InvalidGeometry(msg)) => assert!(msg.contains("usable"), "{msg}"),
        other => panic!("expected InvalidGeometry, got {other:?}"),
    }
}
