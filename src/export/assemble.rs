//! Document assembly: prepared sections → paginated docx tree.
//!
//! Layout contract (what the printed worksheet looks like):
//!
//! * centered bold title on the first page;
//! * one section per row, numbered `문제 1`, `문제 2`, … by **position in
//!   the sequence**, not by the stored `seq` value — gaps in `seq` must not
//!   show up in the visible numbering;
//! * a page break before every section except the first;
//! * a bordered two-cell table per section: `[문제]` left, `[해설]` right,
//!   each cell holding the prepared image centered at its pixel size, or a
//!   text placeholder;
//! * landscape A4 with uniform half-inch margins for the whole document.
//!
//! Given the same sections the produced tree is fully deterministic: no
//! timestamps or generated ids are placed in the content.

use docx_rs::{
    AlignmentType, Docx, PageMargin, PageOrientationType, Paragraph, Pic, Run, Table, TableCell,
    TableRow, WidthType,
};

use super::{CellContent, SectionImages};

/// EMU per pixel at the 96-dpi Word baseline.
const EMU_PER_PIXEL: u32 = 9525;

/// A4 landscape, in twentieths of a point.
const PAGE_WIDTH_DXA: u32 = 16838;
const PAGE_HEIGHT_DXA: u32 = 11906;

/// Uniform half-inch margin.
const MARGIN_DXA: i32 = 720;

/// Two equal columns across the printable width.
const CELL_WIDTH_DXA: usize = ((PAGE_WIDTH_DXA as i32 - 2 * MARGIN_DXA) / 2) as usize;

/// Build the complete worksheet document.
pub fn assemble(title: &str, sections: &[SectionImages]) -> Docx {
    let mut docx = Docx::new()
        .page_size(PAGE_WIDTH_DXA, PAGE_HEIGHT_DXA)
        .page_orient(PageOrientationType::Landscape)
        .page_margin(
            PageMargin::new()
                .top(MARGIN_DXA)
                .bottom(MARGIN_DXA)
                .left(MARGIN_DXA)
                .right(MARGIN_DXA),
        );

    docx = docx
        .add_paragraph(
            Paragraph::new()
                .align(AlignmentType::Center)
                .add_run(Run::new().add_text(title).bold().size(32)),
        )
        .add_paragraph(spacer());

    for (position, section) in sections.iter().enumerate() {
        let heading = Paragraph::new()
            .add_run(Run::new().add_text(format!("문제 {}", position + 1)).bold().size(24));
        let heading = if position > 0 { heading.page_break_before(true) } else { heading };

        docx = docx
            .add_paragraph(heading)
            .add_paragraph(spacer())
            .add_table(
                Table::new(vec![TableRow::new(vec![
                    cell("[문제]", &section.problem, position * 2),
                    cell("[해설]", &section.solution, position * 2 + 1),
                ])])
                .set_grid(vec![CELL_WIDTH_DXA, CELL_WIDTH_DXA])
                .width(CELL_WIDTH_DXA * 2, WidthType::Dxa),
            )
            .add_paragraph(spacer());
    }

    docx
}

fn spacer() -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(""))
}

/// One side of a section: label paragraph plus image or placeholder.
///
/// `slot` is the cell's position in the document and becomes the image
/// relationship id. `Pic::new` draws its id from a process-global counter,
/// which would make repeated exports of the same worksheet differ
/// byte-for-byte; overriding it keeps the packed output reproducible.
fn cell(label: &str, content: &CellContent, slot: usize) -> TableCell {
    let cell = TableCell::new()
        .width(CELL_WIDTH_DXA, WidthType::Dxa)
        .add_paragraph(
            Paragraph::new()
                .align(AlignmentType::Center)
                .add_run(Run::new().add_text(label).bold().size(18)),
        );

    match content {
        CellContent::Image(image) => {
            let mut pic = Pic::new(&image.bytes)
                .size(image.width * EMU_PER_PIXEL, image.height * EMU_PER_PIXEL);
            pic.id = format!("rIdImage{}", slot + 1);
            cell.add_paragraph(
                Paragraph::new()
                    .align(AlignmentType::Center)
                    .add_run(Run::new().add_image(pic)),
            )
        }
        CellContent::Missing => cell.add_paragraph(
            Paragraph::new()
                .align(AlignmentType::Center)
                .add_run(Run::new().add_text(format!("{label} 이미지 없음"))),
        ),
        CellContent::Failed => cell.add_paragraph(
            Paragraph::new()
                .align(AlignmentType::Center)
                .add_run(Run::new().add_text(format!("{label} 이미지 로드 실패")).color("FF0000")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::normalize::PreparedImage;
    use docx_rs::DocumentChild;
    use std::io::Cursor;

    fn tiny_png() -> PreparedImage {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            8,
            6,
            image::Rgb([1, 2, 3]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png).unwrap();
        PreparedImage { bytes, width: 8, height: 6 }
    }

    fn sections(n: usize) -> Vec<SectionImages> {
        (0..n)
            .map(|_| SectionImages {
                problem: CellContent::Image(tiny_png()),
                solution: CellContent::Image(tiny_png()),
            })
            .collect()
    }

    #[test]
    fn one_table_per_section() {
        let docx = assemble("중간고사", &sections(3));
        let tables = docx
            .document
            .children
            .iter()
            .filter(|c| matches!(c, DocumentChild::Table(_)))
            .count();
        assert_eq!(tables, 3);
        // title + spacer + 3 * (heading + spacer + table + spacer)
        assert_eq!(docx.document.children.len(), 2 + 3 * 4);
    }

    #[test]
    fn empty_sections_still_yield_title_page() {
        let docx = assemble("빈 학습지", &[]);
        assert_eq!(docx.document.children.len(), 2);
    }

    #[test]
    fn packed_output_is_deterministic() {
        // Packing the same sections twice in one process must produce the
        // same bytes; position-derived image ids keep the relationship
        // parts stable across builds.
        let pack = || {
            let mut buf = Vec::new();
            assemble("결정적 문서", &sections(2))
                .build()
                .pack(&mut Cursor::new(&mut buf))
                .expect("pack");
            buf
        };
        let first = pack();
        let second = pack();
        assert!(!first.is_empty());
        assert_eq!(first, second);
        // docx files are zip archives.
        assert_eq!(&first[..2], b"PK");
    }
}
