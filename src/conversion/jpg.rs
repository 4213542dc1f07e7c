use std::path::Path;

use anyhow::{Context, Result};

use super::pdf;

/// Decodes the image at `input`, flattens it to 8-bit RGB, and writes a
/// single-page PDF to `output`.
pub fn image_to_pdf(input: &Path, output: &Path) -> Result<()> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("failed to read image {}", input.display()))?;
    let decoded = image::load_from_memory(&bytes).context("failed to decode image")?;
    let rgb = decoded.to_rgb8();

    let pdf = pdf::image_page_pdf(rgb.as_raw(), rgb.width(), rgb.height())?;
    std::fs::write(output, pdf)
        .with_context(|| format!("failed to write PDF to {}", output.display()))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use lopdf::{Document, Object, Stream};

    use super::*;

    pub(crate) fn sample_jpeg() -> Vec<u8> {
        let img = RgbImage::from_fn(16, 9, |x, y| Rgb([(x * 15) as u8, (y * 28) as u8, 128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    fn image_streams(doc: &Document) -> Vec<&Stream> {
        doc.objects
            .values()
            .filter_map(|obj| match obj {
                Object::Stream(stream) => Some(stream),
                _ => None,
            })
            .filter(|stream| {
                matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image")
            })
            .collect()
    }

    fn int_entry(stream: &Stream, key: &[u8]) -> i64 {
        match stream.dict.get(key) {
            Ok(Object::Integer(value)) => *value,
            other => panic!("expected integer entry, got {other:?}"),
        }
    }

    /// Asserts `pdf` is one page embedding exactly the pixels of `source`.
    pub(crate) fn assert_pdf_matches_image(pdf: &[u8], source: &[u8]) {
        let expected = image::load_from_memory(source).unwrap().to_rgb8();
        let doc = Document::load_mem(pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let streams = image_streams(&doc);
        assert_eq!(streams.len(), 1);
        let stream = streams[0];
        assert_eq!(int_entry(stream, b"Width"), i64::from(expected.width()));
        assert_eq!(int_entry(stream, b"Height"), i64::from(expected.height()));
        let pixels = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        assert_eq!(pixels, expected.into_raw());
    }

    #[test]
    fn jpeg_becomes_single_page_pdf_with_same_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.jpg");
        let output = dir.path().join("photo.pdf");
        let jpeg = sample_jpeg();
        std::fs::write(&input, &jpeg).unwrap();

        image_to_pdf(&input, &output).unwrap();

        assert_pdf_matches_image(&std::fs::read(&output).unwrap(), &jpeg);
    }

    #[test]
    fn png_with_alpha_is_flattened_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("icon.png");
        let output = dir.path().join("icon.pdf");
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 40]));
        img.save(&input).unwrap();

        image_to_pdf(&input, &output).unwrap();

        let doc = Document::load_mem(&std::fs::read(&output).unwrap()).unwrap();
        let stream = image_streams(&doc)[0];
        assert!(matches!(
            stream.dict.get(b"ColorSpace"),
            Ok(Object::Name(name)) if name == b"DeviceRGB"
        ));
        let pixels = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        assert_eq!(pixels, [10u8, 20, 30].repeat(6));
    }

    #[test]
    fn garbage_input_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.jpg");
        let output = dir.path().join("broken.pdf");
        std::fs::write(&input, b"definitely not an image").unwrap();

        assert!(image_to_pdf(&input, &output).is_err());
        assert!(!output.exists());
    }
}
