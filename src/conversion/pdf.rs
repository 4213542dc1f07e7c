//! Minimal PDF assembly for the self-contained converters.
//!
//! Two shapes are produced: a single page holding one full-bleed RGB image,
//! and A4 pages of monospaced text laid out line by line. Everything uses the
//! base-14 Courier font so no font program is embedded.

use anyhow::{Context, Result, anyhow};
use lopdf::{
    Document, Object, ObjectId, Stream,
    content::{Content, Operation},
    dictionary,
};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 11;
const LEADING: i64 = 14;
/// Courier glyphs are 600/1000 em wide, so one char spans this many
/// thousandths of a point.
const CHAR_WIDTH_MILLIPT: i64 = 600 * FONT_SIZE;
const TAB_WIDTH: usize = 4;
/// Largest page side viewers accept (200 inches).
const MAX_PAGE_SIDE: i64 = 14_400;

/// Characters per line that fit between the margins.
pub const LINE_WIDTH_CHARS: usize =
    ((PAGE_WIDTH - 2 * MARGIN) * 1000 / CHAR_WIDTH_MILLIPT) as usize;
/// Lines per page that fit between the margins.
pub const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

/// WinAnsiEncoding code points outside Latin-1.
pub(crate) const WIN_ANSI_EXTRAS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Builds a one-page PDF showing `rgb` (packed 8-bit RGB) at 72 dpi, scaled
/// down when a side would exceed the maximum page size.
pub fn image_page_pdf(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(anyhow!("image has no pixels ({width}x{height})"));
    }
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        return Err(anyhow!(
            "RGB buffer holds {} bytes but {}x{} needs {}",
            rgb.len(),
            width,
            height,
            expected
        ));
    }

    let (w, h) = (i64::from(width), i64::from(height));
    let (page_w, page_h) = fit_page(w, h);
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w,
            "Height" => h,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.to_vec(),
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![page_w.into(), 0.into(), 0.into(), page_h.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let resources = dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    };
    let page_id = add_page(&mut doc, pages_id, resources, content, [page_w, page_h])?;

    finish(doc, pages_id, vec![page_id])
}

/// Page size in points for a `w`x`h` pixel image, keeping the aspect ratio.
fn fit_page(w: i64, h: i64) -> (i64, i64) {
    let longest = w.max(h);
    if longest <= MAX_PAGE_SIDE {
        return (w, h);
    }
    let scale = |side: i64| ((side * MAX_PAGE_SIDE + longest / 2) / longest).max(1);
    (scale(w), scale(h))
}

/// Lays out `lines` top to bottom on as many A4 pages as needed. Lines are
/// expected to be pre-wrapped to [`LINE_WIDTH_CHARS`].
pub fn text_pdf(lines: &[String]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut page_ids = Vec::new();
    let mut chunks: Vec<&[String]> = lines.chunks(LINES_PER_PAGE).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }

    for chunk in chunks {
        let mut operations = Vec::new();
        let top = PAGE_HEIGHT - MARGIN - FONT_SIZE;
        for (row, line) in chunk.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let y = top - row as i64 * LEADING;
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
                Operation::new("Td", vec![MARGIN.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(line))]),
                Operation::new("ET", vec![]),
            ]);
        }
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        let page_id = add_page(
            &mut doc,
            pages_id,
            resources,
            Content { operations },
            [PAGE_WIDTH, PAGE_HEIGHT],
        )?;
        page_ids.push(page_id);
    }

    finish(doc, pages_id, page_ids)
}

/// Greedy word wrap of one paragraph into lines of at most `width` chars.
///
/// Embedded newlines force a break, tabs expand to spaces, and words longer
/// than a line are split. An empty paragraph yields one blank line.
pub fn wrap_paragraph(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for segment in text.split('\n') {
        let expanded = segment.replace('\t', &" ".repeat(TAB_WIDTH));
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in expanded.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            if current_len > 0 && current_len + 1 + word.len() <= width {
                current.push(' ');
                current.extend(word.iter());
                current_len += 1 + word.len();
                continue;
            }

            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }

            while word.len() > width {
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            current.extend(word.iter());
            current_len = word.len();
        }

        lines.push(current);
    }

    lines
}

/// Maps text onto WinAnsiEncoding bytes; unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch as u32 {
            0x20..=0x7E | 0xA0..=0xFF => ch as u32 as u8,
            _ => WIN_ANSI_EXTRAS
                .iter()
                .find(|(extra, _)| *extra == ch)
                .map(|(_, code)| *code)
                .unwrap_or(b'?'),
        })
        .collect()
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources: lopdf::Dictionary,
    content: Content,
    [width, height]: [i64; 2],
) -> Result<ObjectId> {
    let encoded = content.encode().context("failed to encode page content")?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Resources" => resources,
        "Contents" => content_id,
    }))
}

fn finish(mut doc: Document, pages_id: ObjectId, page_ids: Vec<ObjectId>) -> Result<Vec<u8>> {
    let count = page_ids.len() as i64;
    let kids: Vec<Object> = page_ids.into_iter().map(Object::Reference).collect();
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
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).context("failed to serialize PDF")?;
    Ok(bytes)
}
