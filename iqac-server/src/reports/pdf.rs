//! Plain-text PDF tables
//!
//! A4 portrait pages with a title line, a header line and one monospace
//! text line per row. Columns are sized to their widest cell and shrunk
//! proportionally when the table is wider than the page.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::ReportTable;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;
const TITLE_SIZE: i64 = 14;
const BODY_SIZE: i64 = 8;
const LINE_HEIGHT: i64 = 11;
/// Courier glyphs are 0.6 em wide, so 8pt text fits 107 chars in 515pt
const LINE_CHARS: usize = 107;
const COLUMN_GAP: usize = 2;

pub fn render_pdf(table: &ReportTable) -> Result<Vec<u8>, lopdf::Error> {
    let widths = column_widths(table);
    let header = format_line(&table.headers, &widths);
    let rule = "-".repeat(header.chars().count());
    let body: Vec<String> = table.rows.iter().map(|row| format_line(row, &widths)).collect();

    let first_line_y = PAGE_HEIGHT - MARGIN - TITLE_SIZE - 2 * LINE_HEIGHT;
    let lines_per_page = ((first_line_y - MARGIN) / LINE_HEIGHT - 2).max(1) as usize;

    let mut chunks: Vec<&[String]> = body.chunks(lines_per_page).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }
    let total_pages = chunks.len();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let body_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let title_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => body_font,
            "F2" => title_font,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(total_pages);
    for (index, lines) in chunks.into_iter().enumerate() {
        let mut ops = vec![Operation::new("BT", vec![])];

        ops.extend(text_at("F2", TITLE_SIZE, MARGIN, PAGE_HEIGHT - MARGIN - TITLE_SIZE, &table.title));
        let mut y = first_line_y;
        ops.extend(text_at("F1", BODY_SIZE, MARGIN, y, &header));
        y -= LINE_HEIGHT;
        ops.extend(text_at("F1", BODY_SIZE, MARGIN, y, &rule));
        for line in lines {
            y -= LINE_HEIGHT;
            ops.extend(text_at("F1", BODY_SIZE, MARGIN, y, line));
        }
        let footer = format!("Page {} of {}", index + 1, total_pages);
        ops.extend(text_at("F1", BODY_SIZE, MARGIN, MARGIN / 2, &footer));
        ops.push(Operation::new("ET", vec![]));

        let content = Content { operations: ops };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<Object>>(),
        "Count" => Object::Integer(total_pages as i64),
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Absolute-positioned text inside a BT/ET block
fn text_at(font: &str, size: i64, x: i64, y: i64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), Object::Integer(size)]),
        Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(x),
                Object::Integer(y),
            ],
        ),
        Operation::new("Tj", vec![Object::string_literal(to_latin(text))]),
    ]
}

/// The standard Type1 fonts only cover Latin-1; anything else becomes '?'
fn to_latin(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 && !c.is_control() { c as u8 } else { b'?' })
        .collect()
}

/// Width per column: widest cell, shrunk proportionally to fit the line
fn column_widths(table: &ReportTable) -> Vec<usize> {
    let mut widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(col, heading)| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(heading.chars().count()))
                .max()
                .unwrap_or(0)
                .max(1)
        })
        .collect();

    let gaps = COLUMN_GAP * widths.len().saturating_sub(1);
    let available = LINE_CHARS.saturating_sub(gaps).max(widths.len());
    let total: usize = widths.iter().sum();
    if total > available {
        for w in widths.iter_mut() {
            *w = (*w * available / total).max(1);
        }
    }
    widths
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(col, &width)| {
            let cell = cells.get(col).map(String::as_str).unwrap_or("");
            fit(cell, width)
        })
        .collect::<Vec<_>>()
        .join(&" ".repeat(COLUMN_GAP))
        .trim_end()
        .to_string()
}

/// Pad or truncate to exactly `width` characters
fn fit(cell: &str, width: usize) -> String {
    let count = cell.chars().count();
    if count <= width {
        format!("{:<width$}", cell, width = width)
    } else if width > 1 {
        let mut s: String = cell.chars().take(width - 1).collect();
        s.push('~');
        s
    } else {
        cell.chars().take(width).collect()
    }
}
