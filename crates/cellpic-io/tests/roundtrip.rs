use std::io::{Cursor, Read as _};

use base64::Engine as _;
use cellpic_io::{open_workbook, save_edited, save_workbook, Error};
use cellpic_model::{CellRef, CellValue, EmbeddedImage, Workbook};
use pretty_assertions::assert_eq;
use rust_xlsxwriter::Format;
use zip::ZipArchive;

// 1x1 transparent PNG.
const PNG_1X1_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mP8/x8AAwMB/6XgdAAAAABJRU5ErkJggg==";

fn png_1x1() -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(PNG_1X1_B64)
        .expect("valid base64 png")
}

fn zip_part_to_string(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("open zip");
    let mut file = archive.by_name(name).expect("part exists");
    let mut out = String::new();
    file.read_to_string(&mut out).expect("read xml");
    out
}

fn zip_part_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).expect("open zip");
    archive.file_names().map(str::to_string).collect()
}

fn child_text<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
}

#[test]
fn opens_values_and_formulas_from_every_sheet() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("input.xlsx");

    let mut fixture = rust_xlsxwriter::Workbook::new();
    let first = fixture.add_worksheet();
    first.set_name("商品")?;
    first.write_string(0, 0, "商品主图")?;
    first.write_string(0, 1, "价格")?;
    first.write_string(1, 0, "http://x/a.png")?;
    first.write_number(1, 1, 12.5)?;
    first.write_boolean(2, 1, true)?;
    first.write_formula(3, 1, "=B2*2")?;
    let second = fixture.add_worksheet();
    second.set_name("Empty")?;
    fixture.save(&path)?;

    let workbook = open_workbook(&path)?;
    assert_eq!(workbook.sheet_names(), vec!["商品", "Empty"]);

    let sheet = workbook.sheet("商品").expect("first sheet");
    assert_eq!(sheet.value(CellRef::new(0, 0)), &CellValue::from("商品主图"));
    assert_eq!(sheet.value(CellRef::new(1, 0)), &CellValue::from("http://x/a.png"));
    assert_eq!(sheet.value(CellRef::new(1, 1)), &CellValue::Number(12.5));
    assert_eq!(sheet.value(CellRef::new(2, 1)), &CellValue::Boolean(true));
    assert_eq!(
        sheet.cell(CellRef::new(3, 1)).and_then(|c| c.formula.as_deref()),
        Some("=B2*2")
    );
    assert_eq!(sheet.last_row(), Some(3));

    assert_eq!(workbook.sheet("Empty").expect("second sheet").cell_count(), 0);
    Ok(())
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = open_workbook(dir.path().join("nope.xlsx")).unwrap_err();
    assert!(matches!(err, Error::OpenIo { .. }), "unexpected error: {err}");
    assert!(err.to_string().contains("nope.xlsx"));
}

#[test]
fn unparseable_input_is_a_format_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("garbage.xlsx");
    std::fs::write(&path, b"definitely not a zip package").expect("write garbage");

    let err = open_workbook(&path).unwrap_err();
    assert!(matches!(err, Error::Open { .. }), "unexpected error: {err}");
}

#[test]
fn saves_layout_and_images_anchored_at_their_cells() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("out.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_sheet("Sheet1")?;
    sheet.set_value(CellRef::new(0, 0), "商品主图");
    sheet.set_value(CellRef::new(0, 1), "图片预览");
    sheet.set_value(CellRef::new(1, 0), "http://x/a.png");
    sheet.set_value(CellRef::new(1, 2), CellValue::DateTime(45_000.5));
    sheet.set_col_width(1, 150.0 / 7.0);
    sheet.set_row_height(1, 112.5);
    sheet.add_image(EmbeddedImage::new(CellRef::new(1, 1), 150, 150, png_1x1()).with_alt_text("http://x/a.png"));

    save_workbook(&workbook, &path)?;

    let bytes = std::fs::read(&path)?;
    let parts = zip_part_names(&bytes);
    assert!(
        parts.iter().any(|p| p.starts_with("xl/media/")),
        "expected an embedded media part, got {parts:?}"
    );

    let drawing_xml = zip_part_to_string(&bytes, "xl/drawings/drawing1.xml");
    let doc = roxmltree::Document::parse(&drawing_xml)?;
    let from = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "from")
        .expect("anchor <from> element");
    assert_eq!(child_text(from, "col"), Some("1"));
    assert_eq!(child_text(from, "row"), Some("1"));

    let sheet_xml = zip_part_to_string(&bytes, "xl/worksheets/sheet1.xml");
    let doc = roxmltree::Document::parse(&sheet_xml)?;
    assert!(
        doc.descendants().any(|n| n.is_element()
            && n.tag_name().name() == "col"
            && n.attribute("min") == Some("2")),
        "expected a width override for column B"
    );
    let row2 = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "row" && n.attribute("r") == Some("2"))
        .expect("row 2");
    assert_eq!(row2.attribute("ht"), Some("112.5"));

    // Cell values survive the round trip.
    let reopened = open_workbook(&path)?;
    let sheet = reopened.sheet("Sheet1").expect("sheet");
    assert_eq!(sheet.value(CellRef::new(0, 1)), &CellValue::from("图片预览"));
    assert_eq!(sheet.value(CellRef::new(1, 2)), &CellValue::DateTime(45_000.5));
    Ok(())
}

#[test]
fn unwritable_destination_is_a_save_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut workbook = Workbook::new();
    workbook.add_sheet("Sheet1").expect("sheet");

    // The destination is an existing directory, so the final rename fails.
    let err = save_workbook(&workbook, dir.path()).unwrap_err();
    assert!(matches!(err, Error::SaveIo { .. }), "unexpected error: {err}");
}

fn element<'a>(doc: &'a roxmltree::Document<'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

#[test]
fn editing_an_xlsx_source_keeps_what_the_model_does_not_carry(
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("products.xlsx");
    let output = dir.path().join("products-out.xlsx");

    let mut fixture = rust_xlsxwriter::Workbook::new();
    let sheet = fixture.add_worksheet();
    let bold = Format::new().set_bold();
    let date = Format::new().set_num_format("yyyy-mm-dd");
    sheet.write_string_with_format(0, 0, "商品主图", &bold)?;
    sheet.write_string_with_format(0, 1, "价格", &bold)?;
    sheet.set_column_width(1, 40)?;
    sheet.write_string(1, 0, "http://x/a.png")?;
    sheet.write_number(1, 1, 9.9)?;
    sheet.write_formula(1, 2, "=B2*2")?;
    sheet.write_number_with_format(2, 1, 45_000.0, &date)?;
    sheet.merge_range(3, 2, 3, 4, "merged", &Format::new())?;
    sheet.write_url(1, 5, "https://example.com/item")?;
    fixture.save(&input)?;
    let input_before = std::fs::read(&input)?;

    let mut workbook = open_workbook(&input)?;
    let sheet = &mut workbook.sheets[0];
    sheet.insert_cols(1, 1)?;
    sheet.set_value(CellRef::new(0, 1), "图片预览");
    sheet.set_col_width(1, 150.0 / 7.0);
    sheet.set_row_height(1, 112.5);
    sheet.add_image(EmbeddedImage::new(CellRef::new(1, 1), 1, 1, png_1x1()));

    save_edited(&input, &workbook, &output)?;
    assert_eq!(std::fs::read(&input)?, input_before);

    let bytes = std::fs::read(&output)?;
    let sheet_xml = zip_part_to_string(&bytes, "xl/worksheets/sheet1.xml");
    let doc = roxmltree::Document::parse(&sheet_xml)?;
    assert!(element(&doc, "cols").is_some(), "column widths were dropped");
    assert!(element(&doc, "mergeCell").is_some(), "merged range was dropped");
    assert!(element(&doc, "hyperlink").is_some(), "hyperlink was dropped");
    assert!(
        doc.descendants().any(|n| n.is_element()
            && n.tag_name().name() == "col"
            && n.attribute("min") == Some("2")),
        "expected a width override for the inserted column"
    );
    // The formula followed its operand from B2 to C2.
    let formula = element(&doc, "f").and_then(|f| f.text());
    assert_eq!(formula, Some("C2*2"));

    let styles_xml = zip_part_to_string(&bytes, "xl/styles.xml");
    assert!(styles_xml.contains("yyyy-mm-dd"), "number format was dropped");

    let parts = zip_part_names(&bytes);
    let drawing = parts
        .iter()
        .find(|p| p.starts_with("xl/drawings/drawing") && p.ends_with(".xml"))
        .expect("a drawing part");
    let drawing_xml = zip_part_to_string(&bytes, drawing);
    let drawing_doc = roxmltree::Document::parse(&drawing_xml)?;
    let from = element(&drawing_doc, "from").expect("anchor <from> element");
    assert_eq!(child_text(from, "col"), Some("1"));
    assert_eq!(child_text(from, "row"), Some("1"));

    let reopened = open_workbook(&output)?;
    let sheet = &reopened.sheets[0];
    assert_eq!(sheet.value(CellRef::new(0, 1)), &CellValue::from("图片预览"));
    assert_eq!(sheet.value(CellRef::new(0, 2)), &CellValue::from("价格"));
    assert_eq!(sheet.value(CellRef::new(1, 2)), &CellValue::Number(9.9));
    assert_eq!(sheet.value(CellRef::new(2, 2)), &CellValue::DateTime(45_000.0));
    assert_eq!(sheet.value(CellRef::new(1, 0)), &CellValue::from("http://x/a.png"));
    Ok(())
}

#[test]
fn other_source_formats_are_rebuilt_from_the_model() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("legacy-out.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_sheet("Sheet1")?;
    sheet.set_value(CellRef::new(0, 0), "商品主图");

    // The source is not reopened when it cannot be edited in place.
    save_edited(dir.path().join("legacy.xls"), &workbook, &output)?;

    let reopened = open_workbook(&output)?;
    assert_eq!(
        reopened.sheet("Sheet1").expect("sheet").value(CellRef::new(0, 0)),
        &CellValue::from("商品主图")
    );
    Ok(())
}

#[test]
fn unreadable_xlsx_source_is_a_reopen_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = dir.path().join("broken.xlsx");
    std::fs::write(&source, b"not a package").expect("write source");

    let err = save_edited(&source, &Workbook::new(), dir.path().join("out.xlsx")).unwrap_err();
    assert!(matches!(err, Error::Reopen { .. }), "unexpected error: {err}");
}
