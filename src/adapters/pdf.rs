//! PDF output for a [`TranscriptBundle`].
//!
//! Base-14 fonts only, WinAnsi encoding, fixed-width course tables. Logo and
//! signature images are embedded when `lopdf` can decode them; anything else
//! is skipped with a warning.

use crate::config::TranscriptConfig;
use crate::domain::model::{CourseRow, TranscriptBundle};
use crate::domain::ports::DocumentRenderer;
use crate::utils::error::{Result, TranscriptError};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use std::path::{Path, PathBuf};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN_LEFT: f32 = 56.0;
const MARGIN_TOP: f32 = 60.0;
const MARGIN_BOTTOM: f32 = 64.0;
const TABLE_WIDTHS: [usize; 7] = [30, 10, 16, 5, 6, 4, 3];

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
    Mono,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Mono => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Mono => "Courier",
        }
    }
}

#[derive(Debug, Clone)]
struct TextLine {
    font: Font,
    size: f32,
    text: String,
}

impl TextLine {
    fn new(font: Font, size: f32, text: impl Into<String>) -> Self {
        Self {
            font,
            size,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::new(Font::Regular, 6.0, "")
    }

    fn height(&self) -> f32 {
        self.size * 1.4
    }
}

/// An image XObject plus its pixel size.
#[derive(Debug, Clone)]
struct Picture {
    stream: Stream,
    width: f32,
    height: f32,
}

/// School block printed on every transcript.
#[derive(Debug, Clone, Default)]
pub struct SchoolInfo {
    pub name: String,
    pub address_lines: Vec<String>,
    pub logo_path: Option<PathBuf>,
    pub signature_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PdfRenderer {
    school: SchoolInfo,
}

impl PdfRenderer {
    pub fn new(school: SchoolInfo) -> Self {
        Self { school }
    }

    pub fn from_config(config: &TranscriptConfig) -> Self {
        Self::new(SchoolInfo {
            name: config.school_name.clone(),
            address_lines: config.address_lines.clone(),
            logo_path: config.logo_path.as_ref().map(PathBuf::from),
            signature_path: config.signature_path.as_ref().map(PathBuf::from),
        })
    }

    fn body_lines(&self, bundle: &TranscriptBundle) -> Vec<TextLine> {
        let header = &bundle.header;
        let mut lines = vec![TextLine::new(Font::Bold, 16.0, &self.school.name)];
        lines.extend(
            self.school
                .address_lines
                .iter()
                .map(|l| TextLine::new(Font::Regular, 10.0, l)),
        );
        lines.push(TextLine::blank());
        lines.push(TextLine::new(Font::Bold, 14.0, "OFFICIAL TRANSCRIPT"));
        lines.push(TextLine::blank());
        for (label, value) in [
            ("Student", &header.name),
            ("Student ID", &header.external_id),
            ("Grade Level", &header.grade_level),
            ("School Year", &header.school_year),
        ] {
            lines.push(TextLine::new(Font::Regular, 11.0, format!("{}: {}", label, value)));
        }

        let first: Vec<&CourseRow> = bundle.first_half().collect();
        let second: Vec<&CourseRow> = bundle.second_half().collect();
        for (title, rows) in [("First Semester", first), ("Second Semester", second)] {
            lines.push(TextLine::blank());
            lines.push(TextLine::new(Font::Bold, 12.0, title));
            lines.push(TextLine::new(
                Font::Mono,
                9.0,
                table_row(["Course", "Code", "Teacher", "Grade", "%", "QP", "Sem"]),
            ));
            lines.push(TextLine::new(
                Font::Mono,
                9.0,
                "-".repeat(TABLE_WIDTHS.iter().sum::<usize>() + TABLE_WIDTHS.len() - 1),
            ));
            if rows.is_empty() {
                lines.push(TextLine::new(Font::Mono, 9.0, "(none)"));
            }
            for row in rows {
                lines.push(TextLine::new(
                    Font::Mono,
                    9.0,
                    table_row([
                        row.course_name.as_str(),
                        row.course_code.as_str(),
                        row.teacher.as_str(),
                        row.letter_grade.as_str(),
                        row.percent.as_str(),
                        row.quality_points.as_str(),
                        row.semester.as_str(),
                    ]),
                ));
            }
        }
        lines
    }
}

fn fit(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

fn table_row<S: AsRef<str>>(cells: [S; 7]) -> String {
    cells
        .iter()
        .zip(TABLE_WIDTHS)
        .map(|(cell, width)| fit(cell.as_ref(), width))
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

/// WinAnsi bytes for the Latin-1 range; anything wider prints as `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn show_text(font: Font, size: f32, x: f32, y: f32, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.resource().into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(win_ansi(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]
}

fn draw_image(name: &str, width: f32, height: f32, x: f32, y: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![width.into(), 0_i64.into(), 0_i64.into(), height.into(), x.into(), y.into()],
        ),
        Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        Operation::new("Q", vec![]),
    ]
}

fn pixel_size(dict: &Dictionary, key: &[u8]) -> f32 {
    dict.get(key)
        .and_then(|v| v.as_i64())
        .map(|v| v as f32)
        .unwrap_or(0.0)
}

fn load_image(label: &str, path: Option<&Path>) -> Option<Picture> {
    let path = path?;
    match lopdf::xobject::image(path) {
        Ok(stream) => {
            let width = pixel_size(&stream.dict, b"Width");
            let height = pixel_size(&stream.dict, b"Height");
            Some(Picture {
                stream,
                width,
                height,
            })
        }
        Err(e) => {
            tracing::warn!("⚠️ Cannot embed {} '{}': {}; skipping it", label, path.display(), e);
            None
        }
    }
}

/// Scales `picture` to fit a `max_w` x `max_h` box, keeping the aspect ratio.
fn fit_box(picture: &Picture, max_w: f32, max_h: f32) -> (f32, f32) {
    if picture.width <= 0.0 || picture.height <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / picture.width).min(max_h / picture.height);
    (picture.width * scale, picture.height * scale)
}

fn render_error(e: lopdf::Error) -> TranscriptError {
    TranscriptError::RenderError {
        message: e.to_string(),
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, bundle: &TranscriptBundle) -> Result<Vec<u8>> {
        if bundle.header.name.trim().is_empty() {
            return Err(TranscriptError::RenderError {
                message: "transcript has no student name".to_string(),
            });
        }

        let logo = load_image("logo", self.school.logo_path.as_deref());
        let signature = load_image("signature", self.school.signature_path.as_deref());

        // 分頁：逐行往下排，超出底部就換頁
        let mut pages: Vec<Vec<Operation>> = Vec::new();
        let mut ops = Vec::new();
        let mut y = PAGE_HEIGHT - MARGIN_TOP;
        for line in self.body_lines(bundle) {
            if y - line.height() < MARGIN_BOTTOM {
                pages.push(std::mem::take(&mut ops));
                y = PAGE_HEIGHT - MARGIN_TOP;
            }
            y -= line.height();
            if !line.text.is_empty() {
                ops.extend(show_text(line.font, line.size, MARGIN_LEFT, y, &line.text));
            }
        }

        // 簽名區需要約 90pt
        if y - 90.0 < MARGIN_BOTTOM {
            pages.push(std::mem::take(&mut ops));
            y = PAGE_HEIGHT - MARGIN_TOP;
        }
        let line_y = y - 70.0;
        if let Some(picture) = &signature {
            let (w, h) = fit_box(picture, 180.0, 50.0);
            ops.extend(draw_image("Im2", w, h, MARGIN_LEFT, line_y + 4.0));
        }
        ops.extend([
            Operation::new("w", vec![0.5_f32.into()]),
            Operation::new("m", vec![MARGIN_LEFT.into(), line_y.into()]),
            Operation::new("l", vec![(MARGIN_LEFT + 200.0).into(), line_y.into()]),
            Operation::new("S", vec![]),
        ]);
        ops.extend(show_text(
            Font::Regular,
            9.0,
            MARGIN_LEFT,
            line_y - 12.0,
            "Authorized Signature",
        ));
        pages.push(ops);

        if let Some(picture) = &logo {
            let (w, h) = fit_box(picture, 72.0, 72.0);
            let placement = draw_image(
                "Im1",
                w,
                h,
                PAGE_WIDTH - MARGIN_LEFT - w,
                PAGE_HEIGHT - MARGIN_TOP + 16.0 - h,
            );
            pages[0].splice(0..0, placement);
        }

        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in [Font::Regular, Font::Bold, Font::Mono] {
            let id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource(), id);
        }
        let mut resources = dictionary! { "Font" => fonts };
        let mut xobjects = Dictionary::new();
        for (name, picture) in [("Im1", &logo), ("Im2", &signature)] {
            if let Some(picture) = picture {
                let id = doc.add_object(picture.stream.clone());
                xobjects.set(name, id);
            }
        }
        if logo.is_some() || signature.is_some() {
            resources.set("XObject", xobjects);
        }
        let resources_id = doc.add_object(resources);

        let total = pages.len();
        let mut kids: Vec<Object> = Vec::with_capacity(total);
        for (index, mut operations) in pages.into_iter().enumerate() {
            operations.extend(show_text(
                Font::Regular,
                8.0,
                PAGE_WIDTH - MARGIN_LEFT - 60.0,
                MARGIN_BOTTOM - 30.0,
                &format!("Page {} of {}", index + 1, total),
            ));
            let content = Content { operations }.encode().map_err(render_error)?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let media_box: Vec<Object> = vec![0_i64.into(), 0_i64.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()];
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => total as i64,
                "Resources" => resources_id,
                "MediaBox" => media_box,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        tracing::debug!("Rendered {} page(s) for '{}'", total, bundle.header.name);
        Ok(out)
    }
}
