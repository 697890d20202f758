//! Small PDFs built in memory for tests.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// Column x positions for `table_cells`, in points.
const CELL_X: [i64; 5] = [40, 70, 300, 360, 440];

/// One page per entry; each line of a page is a single `Tj` string.
pub fn text_lines(pages: &[&[&str]]) -> Vec<u8> {
    let pages = pages
        .iter()
        .map(|lines| {
            lines
                .iter()
                .enumerate()
                .flat_map(|(i, line)| show_text(40, 780 - 14 * i as i64, line))
                .collect::<Vec<_>>()
        })
        .collect();
    build(pages)
}

/// A one-page table where every cell is its own text object at its own x
/// position, the way invoice generators lay out rows.
pub fn table_cells(rows: &[[&str; 5]]) -> Vec<u8> {
    let operations = rows
        .iter()
        .enumerate()
        .flat_map(|(i, row)| {
            let y = 700 - 18 * i as i64;
            row.iter()
                .zip(CELL_X)
                .flat_map(move |(cell, x)| show_text(x, y, cell))
                .collect::<Vec<_>>()
        })
        .collect();
    build(vec![operations])
}

fn show_text(x: i64, y: i64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 10.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn build(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = pages
        .into_iter()
        .map(|operations| {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            page_id.into()
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
