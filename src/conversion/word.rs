use std::{fs, io::Read, path::Path};

use anyhow::{Context, Result, anyhow};
use quick_xml::{Reader as XmlReader, events::Event};
use zip::ZipArchive;

use super::pdf;

/// Reflows the paragraph text of the DOCX at `input` into a PDF at `output`.
pub fn docx_to_pdf(input: &Path, output: &Path) -> Result<()> {
    let paragraphs = extract_docx_paragraphs(input)?;
    let lines: Vec<String> = paragraphs
        .iter()
        .flat_map(|paragraph| pdf::wrap_paragraph(paragraph, pdf::LINE_WIDTH_CHARS))
        .collect();

    let bytes = pdf::text_pdf(&lines)?;
    fs::write(output, bytes)
        .with_context(|| format!("failed to write PDF to {}", output.display()))?;
    Ok(())
}

/// Reads `word/document.xml` and returns each `w:p` as one string, in document
/// order. Line breaks become `\n` and tabs `\t`.
pub fn extract_docx_paragraphs(path: &Path) -> Result<Vec<String>> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open DOCX file {}", path.display()))?;
    let mut archive = ZipArchive::new(file).context("uploaded file is not a DOCX archive")?;

    let mut document = archive
        .by_name("word/document.xml")
        .context("DOCX archive has no word/document.xml")?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .context("failed to read DOCX document XML")?;

    let mut reader = XmlReader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text_node = false;
    let mut in_paragraph = false;
    // `w:tab` inside `w:tabs` is a tab stop definition, not a tab character.
    let mut in_tab_stops = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:p" => {
                    if in_paragraph {
                        paragraphs.push(current.trim_end().to_string());
                        current.clear();
                    }
                    in_paragraph = true;
                }
                b"w:br" | b"w:cr" => current.push('\n'),
                b"w:tab" if !in_tab_stops => current.push('\t'),
                b"w:tabs" => in_tab_stops = true,
                b"w:t" => in_text_node = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:p" => {
                    if in_paragraph {
                        paragraphs.push(current.trim_end().to_string());
                        current.clear();
                    }
                    paragraphs.push(String::new());
                    in_paragraph = false;
                }
                b"w:br" | b"w:cr" => current.push('\n'),
                b"w:tab" if !in_tab_stops => current.push('\t'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_node {
                    let value = e.unescape().map_err(|err| anyhow!(err))?;
                    current.push_str(&value);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_node = false,
                b"w:tabs" => in_tab_stops = false,
                b"w:p" => {
                    paragraphs.push(current.trim_end().to_string());
                    current.clear();
                    in_paragraph = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!("failed to parse DOCX XML: {}", err)),
            _ => {}
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.trim_end().to_string());
    }

    Ok(paragraphs)
}
