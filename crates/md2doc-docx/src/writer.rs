//! WordprocessingML package writer.
//!
//! Serializes a [`Document`] into the parts of a `.docx` ZIP package:
//! `[Content_Types].xml`, `_rels/.rels`, `word/document.xml`,
//! `word/styles.xml`, `word/_rels/document.xml.rels` and `word/media/*`.

use std::fmt::{self, Write as _};
use std::fs::{self, File};
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use quick_xml::escape::{escape, partial_escape};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::WriteError;
use crate::model::{Align, Block, Document, Inline, Paragraph, Picture, Run, Table};
use crate::settings::{DocumentSettings, cm_to_twips, inches_to_twips};

const EMU_PER_INCH: f64 = 914_400.0;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

impl Document {
    /// Write the document as a `.docx` file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), WriteError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        write_docx(self, file)?.flush()?;
        tracing::debug!(path = %path.display(), "document written");
        Ok(())
    }

    /// Serialize the document into an in-memory `.docx` package.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        Ok(write_docx(self, Cursor::new(Vec::new()))?.into_inner())
    }
}

/// Write `document` as a `.docx` package into `writer`.
pub fn write_docx<W: Write + Seek>(document: &Document, writer: W) -> Result<W, WriteError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", content_types_xml(document)?),
        ("_rels/.rels", package_rels_xml()?),
        ("word/document.xml", document_xml(document)?),
        ("word/styles.xml", styles_xml(&document.settings)?),
        ("word/_rels/document.xml.rels", document_rels_xml(document)?),
    ];
    for (name, xml) in parts {
        zip.start_file(name, options)?;
        zip.write_all(xml.as_bytes())?;
    }

    // Media is already compressed
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (i, media) in document.media.iter().enumerate() {
        zip.start_file(format!("word/media/{}", media.file_name(i)), stored)?;
        zip.write_all(&media.data)?;
    }

    Ok(zip.finish()?)
}

fn content_types_xml(document: &Document) -> Result<String, fmt::Error> {
    let mut out = String::from(XML_DECL);
    out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    out.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    out.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);

    let mut extensions: Vec<_> = document
        .media
        .iter()
        .map(|m| (m.extension, m.content_type()))
        .collect();
    extensions.sort_unstable();
    extensions.dedup();
    for (extension, content_type) in extensions {
        write!(out, r#"<Default Extension="{extension}" ContentType="{content_type}"/>"#)?;
    }

    out.push_str(r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
    out.push_str(r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
    out.push_str("</Types>");
    Ok(out)
}

fn package_rels_xml() -> Result<String, fmt::Error> {
    let mut out = String::from(XML_DECL);
    write!(
        out,
        r#"<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{NS_REL}/officeDocument" Target="word/document.xml"/></Relationships>"#
    )?;
    Ok(out)
}

fn document_rels_xml(document: &Document) -> Result<String, fmt::Error> {
    let mut out = String::from(XML_DECL);
    write!(out, r#"<Relationships xmlns="{NS_PKG_REL}">"#)?;
    write!(
        out,
        r#"<Relationship Id="rId1" Type="{NS_REL}/styles" Target="styles.xml"/>"#
    )?;
    for (i, media) in document.media.iter().enumerate() {
        write!(
            out,
            r#"<Relationship Id="{}" Type="{NS_REL}/image" Target="media/{}"/>"#,
            image_rel_id(i),
            media.file_name(i)
        )?;
    }
    out.push_str("</Relationships>");
    Ok(out)
}

fn image_rel_id(media: usize) -> String {
    format!("rIdImage{}", media + 1)
}

/// Serializer state for `word/document.xml`.
struct BodyWriter<'a> {
    out: String,
    document: &'a Document,
    /// Next drawing id; unique per document.
    next_drawing: usize,
}

fn document_xml(document: &Document) -> Result<String, fmt::Error> {
    let mut writer = BodyWriter {
        out: String::with_capacity(4096),
        document,
        next_drawing: 1,
    };
    writer.write_document()?;
    Ok(writer.out)
}

impl BodyWriter<'_> {
    fn write_document(&mut self) -> fmt::Result {
        self.out.push_str(XML_DECL);
        write!(
            self.out,
            r#"<w:document xmlns:w="{NS_MAIN}" xmlns:r="{NS_REL}" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>"#
        )?;

        let document = self.document;
        for block in &document.blocks {
            match block {
                Block::Paragraph(paragraph) => self.write_paragraph(paragraph)?,
                Block::Table(table) => self.write_table(table)?,
            }
        }
        // The body must not end with a table
        if matches!(document.blocks.last(), Some(Block::Table(_))) {
            self.out.push_str("<w:p/>");
        }

        self.write_section(&document.settings)?;
        self.out.push_str("</w:body></w:document>");
        Ok(())
    }

    fn write_section(&mut self, settings: &DocumentSettings) -> fmt::Result {
        write!(
            self.out,
            r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#,
            cm_to_twips(settings.page_width_cm),
            cm_to_twips(settings.page_height_cm),
            cm_to_twips(settings.margin_top_cm),
            cm_to_twips(settings.margin_right_cm),
            cm_to_twips(settings.margin_bottom_cm),
            cm_to_twips(settings.margin_left_cm),
        )
    }

    fn write_paragraph(&mut self, paragraph: &Paragraph) -> fmt::Result {
        self.out.push_str("<w:p>");

        let style = paragraph.style.style_id();
        let has_props = style.is_some()
            || paragraph.compact
            || paragraph.indent > 0
            || paragraph.align != Align::Left;
        if has_props {
            self.out.push_str("<w:pPr>");
            if let Some(style) = style {
                write!(self.out, r#"<w:pStyle w:val="{style}"/>"#)?;
            }
            if paragraph.compact {
                self.out.push_str(r#"<w:spacing w:before="0" w:after="0"/>"#);
            }
            if paragraph.indent > 0 {
                write!(self.out, r#"<w:ind w:left="{}"/>"#, paragraph.indent)?;
            }
            if paragraph.align != Align::Left {
                write!(self.out, r#"<w:jc w:val="{}"/>"#, paragraph.align.as_str())?;
            }
            self.out.push_str("</w:pPr>");
        }

        for inline in &paragraph.content {
            match inline {
                Inline::Text(run) => self.write_run(run)?,
                Inline::Picture(picture) => self.write_picture(picture)?,
            }
        }
        self.out.push_str("</w:p>");
        Ok(())
    }

    fn write_run(&mut self, run: &Run) -> fmt::Result {
        self.out.push_str("<w:r>");

        let mut props = String::new();
        if let Some(font) = &run.font {
            let font = escape(font.as_str());
            write!(
                props,
                r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/>"#
            )?;
        }
        if run.bold {
            props.push_str("<w:b/>");
        }
        if run.italic {
            props.push_str("<w:i/>");
        }
        if let Some(color) = run.color {
            write!(props, r#"<w:color w:val="{color}"/>"#)?;
        }
        if let Some(size) = run.size {
            let half_points = half_points(size);
            write!(props, r#"<w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/>"#)?;
        }
        if run.underline {
            props.push_str(r#"<w:u w:val="single"/>"#);
        }
        if !props.is_empty() {
            write!(self.out, "<w:rPr>{props}</w:rPr>")?;
        }

        let text = xml_safe(&run.text);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.out.push_str("<w:br/>");
            }
            for (j, part) in line.split('\t').enumerate() {
                if j > 0 {
                    self.out.push_str("<w:tab/>");
                }
                if !part.is_empty() {
                    write!(
                        self.out,
                        r#"<w:t xml:space="preserve">{}</w:t>"#,
                        partial_escape(part)
                    )?;
                }
            }
        }

        self.out.push_str("</w:r>");
        Ok(())
    }

    fn write_picture(&mut self, picture: &Picture) -> fmt::Result {
        let Some(media) = self.document.media.get(picture.media) else {
            tracing::warn!(media = picture.media, "picture references missing media, skipped");
            return Ok(());
        };
        let id = self.next_drawing;
        self.next_drawing += 1;

        let cx = emu(picture.width_inches);
        let cy = emu(picture.height_inches);
        let name = media.file_name(picture.media);
        let description = escape(xml_safe(&picture.description).as_str()).into_owned();
        let rel = image_rel_id(picture.media);

        write!(
            self.out,
            concat!(
                r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
                r#"<wp:docPr id="{id}" name="Picture {id}" descr="{description}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
                r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
                r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#,
            ),
            cx = cx,
            cy = cy,
            id = id,
            description = description,
            name = name,
            rel = rel,
        )
    }

    fn write_table(&mut self, table: &Table) -> fmt::Result {
        if table.columns == 0 {
            return Ok(());
        }
        let printable = inches_to_twips(self.document.settings.printable_width_inches());
        let column_width = printable / u32::try_from(table.columns).unwrap_or(u32::MAX).max(1);

        self.out.push_str(r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="0" w:type="auto"/><w:tblLook w:val="04A0" w:firstRow="1" w:lastRow="0" w:firstColumn="1" w:lastColumn="0" w:noHBand="0" w:noVBand="1"/></w:tblPr><w:tblGrid>"#);
        for _ in 0..table.columns {
            write!(self.out, r#"<w:gridCol w:w="{column_width}"/>"#)?;
        }
        self.out.push_str("</w:tblGrid>");

        for row in &table.rows {
            self.out.push_str("<w:tr>");
            if row.header {
                self.out.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            for cell in &row.cells {
                write!(
                    self.out,
                    r#"<w:tc><w:tcPr><w:tcW w:w="{column_width}" w:type="dxa"/>"#
                )?;
                if let Some(fill) = cell.shading {
                    write!(self.out, r#"<w:shd w:val="clear" w:color="auto" w:fill="{fill}"/>"#)?;
                }
                self.out.push_str("</w:tcPr>");
                self.write_paragraph(&cell.paragraph)?;
                self.out.push_str("</w:tc>");
            }
            self.out.push_str("</w:tr>");
        }
        self.out.push_str("</w:tbl>");
        Ok(())
    }
}

fn styles_xml(settings: &DocumentSettings) -> Result<String, fmt::Error> {
    let mut out = String::from(XML_DECL);
    let font = escape(settings.font_name.as_str());
    let size = half_points(settings.font_size);

    write!(out, r#"<w:styles xmlns:w="{NS_MAIN}">"#)?;
    write!(
        out,
        concat!(
            r#"<w:docDefaults><w:rPrDefault><w:rPr>"#,
            r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/>"#,
            r#"<w:sz w:val="{size}"/><w:szCs w:val="{size}"/><w:lang w:val="en-US" w:eastAsia="zh-CN"/>"#,
            r#"</w:rPr></w:rPrDefault><w:pPrDefault><w:pPr>"#,
            r#"<w:spacing w:after="120" w:line="276" w:lineRule="auto"/>"#,
            r#"</w:pPr></w:pPrDefault></w:docDefaults>"#,
        ),
        font = font,
        size = size,
    )?;
    out.push_str(r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#);

    for (i, heading_size) in settings.heading_sizes.iter().enumerate() {
        let level = i + 1;
        let size = half_points(*heading_size);
        write!(
            out,
            concat!(
                r#"<w:style w:type="paragraph" w:styleId="Heading{level}">"#,
                r#"<w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/>"#,
                r#"<w:uiPriority w:val="9"/><w:qFormat/>"#,
                r#"<w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="{outline}"/></w:pPr>"#,
                r#"<w:rPr><w:b/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr></w:style>"#,
            ),
            level = level,
            outline = i,
            size = size,
        )?;
    }

    out.push_str(concat!(
        r#"<w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/>"#,
        r#"<w:uiPriority w:val="99"/><w:semiHidden/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/>"#,
        r#"<w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/>"#,
        r#"<w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style>"#,
        r#"<w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/>"#,
        r#"<w:basedOn w:val="TableNormal"/><w:uiPriority w:val="59"/>"#,
        r#"<w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr>"#,
        r#"<w:tblPr><w:tblBorders>"#,
        r#"<w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"<w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#,
        r#"</w:tblBorders></w:tblPr></w:style>"#,
    ));
    out.push_str("</w:styles>");
    Ok(out)
}

/// Font size in half-points.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn half_points(points: f32) -> u32 {
    (points * 2.0).round().max(1.0) as u32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn emu(inches: f64) -> u64 {
    (inches * EMU_PER_INCH).round().max(0.0) as u64
}

/// Drop characters that XML 1.0 does not allow.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|c| {
            matches!(c, '\t' | '\n')
                || (*c >= ' ' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
        })
        .collect()
}
