//! WordprocessingML container writer.
//!
//! Builds the minimal set of parts Word and LibreOffice need: content types,
//! package and document relationships, document body, styles, numbering,
//! one footer and core properties. Every zip entry carries the same fixed
//! timestamp, so identical blocks produce identical bytes.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::RenderError;
use crate::layout::Block;
use crate::metadata::{Labels, RenderMetadata};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// English Metric Units per inch.
const EMU_PER_INCH: u64 = 914_400;
/// Embedded image width: 5.5 inches.
pub const IMAGE_WIDTH_EMU: u64 = EMU_PER_INCH * 11 / 2;

/// A4 portrait in twentieths of a point.
const PAGE_WIDTH_TWIPS: u32 = 11_906;
const PAGE_HEIGHT_TWIPS: u32 = 16_838;
const MARGIN_TWIPS: u32 = 1_440;
const TEXT_WIDTH_TWIPS: u32 = PAGE_WIDTH_TWIPS - 2 * MARGIN_TWIPS;

const FONT: &str = "Times New Roman";
/// Body size in half-points (12 pt).
const BODY_SIZE_HALF_PT: u32 = 24;

/// An image accepted for embedding.
struct Media {
    file_name: String,
    rel_id: String,
    bytes: Vec<u8>,
}

/// Accumulates the document body and embedded media.
struct DocumentBuilder<'a> {
    asset_dir: Option<&'a Path>,
    body: String,
    media: Vec<Media>,
}

impl<'a> DocumentBuilder<'a> {
    fn new(asset_dir: Option<&'a Path>) -> Self {
        Self {
            asset_dir,
            body: String::new(),
            media: Vec::new(),
        }
    }

    fn push(&mut self, block: &Block) {
        let xml = match block {
            Block::Heading { level, text } => paragraph(
                &format!(r#"<w:pStyle w:val="Heading{level}"/><w:jc w:val="center"/>"#),
                &run(text, "<w:b/>"),
            ),
            Block::SectionTitle(text) => {
                paragraph(r#"<w:pStyle w:val="Heading1"/>"#, &run(text, ""))
            }
            Block::Centered { text, size_pt, bold } => {
                let mut props = String::new();
                if *bold {
                    props.push_str("<w:b/>");
                }
                let half_points = size_pt * 2;
                props.push_str(&format!(
                    r#"<w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/>"#
                ));
                paragraph(r#"<w:jc w:val="center"/>"#, &run(text, &props))
            }
            Block::Caption(text) => paragraph(r#"<w:jc w:val="center"/>"#, &run(text, "<w:i/>")),
            Block::Table(rows) => table(rows),
            Block::Image { path } => match self.embed(path) {
                Some(xml) => xml,
                None => return,
            },
            Block::ListItem { ordered, text } => {
                let style = if *ordered { "ListNumber" } else { "ListBullet" };
                paragraph(&format!(r#"<w:pStyle w:val="{style}"/>"#), &run(text, ""))
            }
            Block::Paragraph(text) if text.is_empty() => "<w:p/>".to_string(),
            Block::Paragraph(text) => paragraph("", &run(text, "")),
            Block::PageBreak => r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#.to_string(),
        };
        self.body.push_str(&xml);
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match self.asset_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Drawing paragraph for `path`, or `None` when the image cannot be used.
    fn embed(&mut self, path: &str) -> Option<String> {
        let resolved = self.resolve(path);
        let bytes = match std::fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %resolved.display(), error = %e, "image not found, keeping caption only");
                return None;
            }
        };

        let extension = match imagesize::image_type(&bytes) {
            Ok(imagesize::ImageType::Png) => "png",
            Ok(imagesize::ImageType::Jpeg) => "jpeg",
            Ok(imagesize::ImageType::Gif) => "gif",
            Ok(imagesize::ImageType::Bmp) => "bmp",
            other => {
                tracing::warn!(path = %resolved.display(), kind = ?other, "unsupported image format, keeping caption only");
                return None;
            }
        };
        let size = match imagesize::blob_size(&bytes) {
            Ok(size) if size.width > 0 && size.height > 0 => size,
            _ => {
                tracing::warn!(path = %resolved.display(), "cannot read image dimensions, keeping caption only");
                return None;
            }
        };

        let index = self.media.len() + 1;
        let cx = IMAGE_WIDTH_EMU;
        let cy = cx * size.height as u64 / size.width as u64;
        let rel_id = format!("rIdImage{index}");
        let file_name = format!("image{index}.{extension}");
        let xml = format!(
            concat!(
                r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:drawing>"#,
                r#"<wp:inline distT="0" distB="0" distL="0" distR="0">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{index}" name="Picture {index}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="{a}" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
                r#"<a:graphic xmlns:a="{a}"><a:graphicData uri="{pic}"><pic:pic xmlns:pic="{pic}">"#,
                r#"<pic:nvPicPr><pic:cNvPr id="{index}" name="{file}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
                r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
            ),
            cx = cx,
            cy = cy,
            index = index,
            a = NS_A,
            pic = NS_PIC,
            file = file_name,
            rel = rel_id,
        );

        self.media.push(Media {
            file_name,
            rel_id,
            bytes,
        });
        Some(xml)
    }

    fn document_xml(&self) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="{w}" xmlns:r="{r}" xmlns:wp="{wp}"><w:body>{body}"#,
                r#"<w:sectPr><w:footerReference w:type="default" r:id="rIdFooter"/>"#,
                r#"<w:pgSz w:w="{pw}" w:h="{ph}"/>"#,
                r#"<w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}" w:header="720" w:footer="720" w:gutter="0"/>"#,
                r#"</w:sectPr></w:body></w:document>"#,
            ),
            w = NS_W,
            r = NS_R,
            wp = NS_WP,
            body = self.body,
            pw = PAGE_WIDTH_TWIPS,
            ph = PAGE_HEIGHT_TWIPS,
            m = MARGIN_TWIPS,
        )
    }

    fn document_rels(&self) -> String {
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        rels.push_str(&format!(
            r#"<Relationship Id="rIdStyles" Type="{REL_BASE}/styles" Target="styles.xml"/>"#
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rIdNumbering" Type="{REL_BASE}/numbering" Target="numbering.xml"/>"#
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rIdFooter" Type="{REL_BASE}/footer" Target="footer1.xml"/>"#
        ));
        for media in &self.media {
            rels.push_str(&format!(
                r#"<Relationship Id="{}" Type="{REL_BASE}/image" Target="media/{}"/>"#,
                media.rel_id, media.file_name
            ));
        }
        rels.push_str("</Relationships>");
        rels
    }
}

fn run(text: &str, props: &str) -> String {
    let props = if props.is_empty() {
        String::new()
    } else {
        format!("<w:rPr>{props}</w:rPr>")
    };
    format!(
        r#"<w:r>{props}<w:t xml:space="preserve">{}</w:t></w:r>"#,
        escape(text)
    )
}

fn paragraph(props: &str, runs: &str) -> String {
    if props.is_empty() {
        format!("<w:p>{runs}</w:p>")
    } else {
        format!("<w:p><w:pPr>{props}</w:pPr>{runs}</w:p>")
    }
}

/// Bordered table; rows are padded or cut to the header's width.
fn table(rows: &[Vec<String>]) -> String {
    let columns = rows.first().map_or(1, |r| r.len().max(1));
    let width = TEXT_WIDTH_TWIPS / columns as u32;

    let mut xml = String::from(
        r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid>"#,
    );
    for _ in 0..columns {
        xml.push_str(&format!(r#"<w:gridCol w:w="{width}"/>"#));
    }
    xml.push_str("</w:tblGrid>");

    for row in rows {
        xml.push_str("<w:tr>");
        for col in 0..columns {
            let text = row.get(col).map_or("", String::as_str);
            xml.push_str(&format!(
                r#"<w:tc><w:tcPr><w:tcW w:w="{width}" w:type="dxa"/></w:tcPr>{}</w:tc>"#,
                paragraph("", &run(text, ""))
            ));
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

fn content_types() -> String {
    let main = "application/vnd.openxmlformats-officedocument.wordprocessingml";
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Default Extension="png" ContentType="image/png"/>"#,
            r#"<Default Extension="jpeg" ContentType="image/jpeg"/>"#,
            r#"<Default Extension="gif" ContentType="image/gif"/>"#,
            r#"<Default Extension="bmp" ContentType="image/bmp"/>"#,
            r#"<Override PartName="/word/document.xml" ContentType="{m}.document.main+xml"/>"#,
            r#"<Override PartName="/word/styles.xml" ContentType="{m}.styles+xml"/>"#,
            r#"<Override PartName="/word/numbering.xml" ContentType="{m}.numbering+xml"/>"#,
            r#"<Override PartName="/word/footer1.xml" ContentType="{m}.footer+xml"/>"#,
            r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
            r#"</Types>"#,
        ),
        m = main
    )
}

fn package_rels() -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="{base}/officeDocument" Target="word/document.xml"/>"#,
            r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
            r#"</Relationships>"#,
        ),
        base = REL_BASE
    )
}

fn core_properties(title: &str, author: &str, date: NaiveDate) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            r#"<dc:title>{title}</dc:title><dc:creator>{author}</dc:creator>"#,
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{date}T00:00:00Z</dcterms:created>"#,
            r#"</cp:coreProperties>"#,
        ),
        title = escape(title),
        author = escape(author),
        date = date.format("%Y-%m-%d"),
    )
}

fn styles() -> String {
    let heading = |level: u32, size: u32| {
        format!(
            concat!(
                r#"<w:style w:type="paragraph" w:styleId="Heading{l}"><w:name w:val="heading {l}"/>"#,
                r#"<w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/>"#,
                r#"<w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="{o}"/></w:pPr>"#,
                r#"<w:rPr><w:b/><w:sz w:val="{s}"/><w:szCs w:val="{s}"/></w:rPr></w:style>"#,
            ),
            l = level,
            o = level - 1,
            s = size
        )
    };
    let list = |id: &str, name: &str, num: u32| {
        format!(
            concat!(
                r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="{name}"/>"#,
                r#"<w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:numId w:val="{num}"/></w:numPr></w:pPr></w:style>"#,
            ),
            id = id,
            name = name,
            num = num
        )
    };

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{w}">"#,
            r#"<w:docDefaults><w:rPrDefault><w:rPr>"#,
            r#"<w:rFonts w:ascii="{f}" w:hAnsi="{f}" w:eastAsia="{f}" w:cs="{f}"/>"#,
            r#"<w:sz w:val="{sz}"/><w:szCs w:val="{sz}"/><w:lang w:val="ru-RU"/>"#,
            r#"</w:rPr></w:rPrDefault><w:pPrDefault/></w:docDefaults>"#,
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#,
            "{h1}{h2}{h3}{bullet}{number}",
            r#"<w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders>"#,
            r#"<w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"<w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
            r#"</w:tblBorders></w:tblPr></w:style>"#,
            r#"</w:styles>"#,
        ),
        w = NS_W,
        f = FONT,
        sz = BODY_SIZE_HALF_PT,
        h1 = heading(1, 32),
        h2 = heading(2, 28),
        h3 = heading(3, 26),
        bullet = list("ListBullet", "List Bullet", 1),
        number = list("ListNumber", "List Number", 2),
    )
}

fn numbering() -> String {
    let abstract_num = |id: u32, format: &str, text: &str| {
        format!(
            concat!(
                r#"<w:abstractNum w:abstractNumId="{id}"><w:multiLevelType w:val="singleLevel"/>"#,
                r#"<w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="{fmt}"/><w:lvlText w:val="{text}"/>"#,
                r#"<w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum>"#,
            ),
            id = id,
            fmt = format,
            text = text
        )
    };
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:numbering xmlns:w="{w}">"#,
            "{bullet}{decimal}",
            r#"<w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>"#,
            r#"<w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>"#,
            r#"</w:numbering>"#,
        ),
        w = NS_W,
        bullet = abstract_num(0, "bullet", "\u{2022}"),
        decimal = abstract_num(1, "decimal", "%1."),
    )
}

/// Centred `Page {PAGE} of {NUMPAGES}` with live field codes.
fn footer(labels: &Labels) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:ftr xmlns:w="{w}" xmlns:r="{r}">"#,
            r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr>"#,
            "{page}",
            r#"<w:fldSimple w:instr=" PAGE "><w:r><w:t>1</w:t></w:r></w:fldSimple>"#,
            "{of}",
            r#"<w:fldSimple w:instr=" NUMPAGES "><w:r><w:t>1</w:t></w:r></w:fldSimple>"#,
            r#"</w:p></w:ftr>"#,
        ),
        w = NS_W,
        r = NS_R,
        page = run(&format!("{} ", labels.page), ""),
        of = run(&format!(" {} ", labels.of), ""),
    )
}

fn part_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
}

/// Write `blocks` as a DOCX package.
pub fn write_docx(
    blocks: &[Block],
    meta: &RenderMetadata,
    date: NaiveDate,
) -> Result<Vec<u8>, RenderError> {
    let mut builder = DocumentBuilder::new(meta.asset_dir.as_deref());
    for block in blocks {
        builder.push(block);
    }

    let labels = meta.labels();
    let author = meta.author.as_deref().unwrap_or(labels.default_author);
    let parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".into(), content_types().into_bytes()),
        ("_rels/.rels".into(), package_rels().into_bytes()),
        (
            "docProps/core.xml".into(),
            core_properties(meta.display_title(), author, date).into_bytes(),
        ),
        ("word/document.xml".into(), builder.document_xml().into_bytes()),
        ("word/_rels/document.xml.rels".into(), builder.document_rels().into_bytes()),
        ("word/styles.xml".into(), styles().into_bytes()),
        ("word/numbering.xml".into(), numbering().into_bytes()),
        ("word/footer1.xml".into(), footer(labels).into_bytes()),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in &parts {
        zip.start_file(name.as_str(), part_options())?;
        zip.write_all(data)?;
    }
    for media in &builder.media {
        zip.start_file(format!("word/media/{}", media.file_name), part_options())?;
        zip.write_all(&media.bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_escapes_markup() {
        let xml = run("a < b & \"c\"", "");
        assert!(xml.contains("a &lt; b &amp; &quot;c&quot;"));
    }

    #[test]
    fn test_table_rows_padded_to_header() {
        let rows = vec![
            vec!["A".to_string(), "B".to_string()],
            vec!["only".to_string()],
        ];
        let xml = table(&rows);
        assert_eq!(xml.matches("<w:tc>").count(), 4);
        assert_eq!(xml.matches("<w:gridCol").count(), 2);
    }

    #[test]
    fn test_footer_has_live_fields() {
        let xml = footer(&Labels::EN);
        assert!(xml.contains(r#"w:instr=" PAGE ""#));
        assert!(xml.contains(r#"w:instr=" NUMPAGES ""#));
        assert!(xml.contains(">Page </w:t>"));
        assert!(xml.contains("> of </w:t>"));
    }

    #[test]
    fn test_missing_image_is_skipped() {
        let mut builder = DocumentBuilder::new(None);
        builder.push(&Block::Image {
            path: "/nonexistent/figure.png".into(),
        });
        assert!(builder.body.is_empty());
        assert!(builder.media.is_empty());
    }

    #[test]
    fn test_non_image_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.png"), b"plain text, not an image").unwrap();
        let mut builder = DocumentBuilder::new(Some(dir.path()));
        builder.push(&Block::Image {
            path: "notes.png".into(),
        });
        assert!(builder.media.is_empty());
    }
}
