use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::ReportTable;

/// Widest column, in characters
const MAX_COLUMN_WIDTH: usize = 60;

/// One worksheet: title in A1, bold header row below it, then the rows
pub fn render_xlsx(table: &ReportTable) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let title_format = Format::new().set_bold().set_font_size(14);
    let header_format = Format::new().set_bold().set_border_bottom(rust_xlsxwriter::FormatBorder::Thin);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(&table.title))?;
    worksheet.write_string_with_format(0, 0, &table.title, &title_format)?;

    for (col, heading) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(2, col as u16, heading, &header_format)?;
    }
    for (i, row) in table.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            worksheet.write_string(3 + i as u32, col as u16, cell)?;
        }
    }

    for (col, heading) in table.headers.iter().enumerate() {
        let widest = table
            .rows
            .iter()
            .filter_map(|row| row.get(col))
            .map(|cell| cell.chars().count())
            .chain(std::iter::once(heading.chars().count()))
            .max()
            .unwrap_or(10);
        worksheet.set_column_width(col as u16, (widest.min(MAX_COLUMN_WIDTH) + 2) as f64)?;
    }
    worksheet.set_freeze_panes(3, 0)?;

    workbook.save_to_buffer()
}

/// Worksheet names are limited to 31 characters and exclude `[]:*?/\`
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Report".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_produces_zip_container() {
        let mut table = ReportTable::new("Courses Taught", &["Title", "Semester"]);
        table.push_row(vec!["Data Structures".into(), "3".into()]);
        table.push_row(vec!["Operating Systems".into(), "5".into()]);

        let bytes = render_xlsx(&table).unwrap();
        // XLSX files are ZIP archives
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_table_still_renders() {
        let table = ReportTable::new("Documents", &["Title"]);
        assert!(render_xlsx(&table).is_ok());
    }

    #[test]
    fn test_sheet_name_rules() {
        assert_eq!(sheet_name("Feedback: 2024/25"), "Feedback 202425");
        assert_eq!(sheet_name("???"), "Report");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }
}
