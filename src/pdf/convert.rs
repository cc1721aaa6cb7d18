//! Image to PDF conversion
//!
//! The image is decoded, flattened to 8-bit RGB and embedded as a JPEG
//! (`DCTDecode`) XObject filling a single page. One pixel maps to one point.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, ImageReader, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

use crate::error::{Error, Result};

/// JPEG quality used when re-encoding the flattened image
const JPEG_QUALITY: u8 = 95;

/// Resource name of the page image
const IMAGE_NAME: &[u8] = b"Im0";

/// Convert an image file into a single-page PDF at `destination`
///
/// The format is detected from the file content. Alpha channels and palettes
/// are discarded. An existing file at `destination` is overwritten.
///
/// # Example
///
/// ```no_run
/// use pdf_combine::pdf::image_to_pdf;
/// use std::path::Path;
///
/// image_to_pdf(Path::new("scan.jpg"), Path::new("scan.pdf")).expect("Failed to convert");
/// ```
pub fn image_to_pdf(source: &Path, destination: &Path) -> Result<()> {
    if !source.exists() {
        return Err(Error::FileNotFound(source.to_path_buf()));
    }

    let conversion_error = |source_err: ImageError| Error::Conversion {
        path: source.to_path_buf(),
        source: source_err,
    };

    let rgb = ImageReader::open(source)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| conversion_error(ImageError::IoError(e)))?
        .decode()
        .map_err(conversion_error)?
        .to_rgb8();

    let jpeg = encode_jpeg(&rgb).map_err(conversion_error)?;

    debug!(
        "Converting {} ({}x{}) to {}",
        source.display(),
        rgb.width(),
        rgb.height(),
        destination.display()
    );

    let mut doc = single_image_document(rgb.width(), rgb.height(), jpeg)?;
    doc.save(destination)?;

    Ok(())
}

fn encode_jpeg(image: &RgbImage) -> std::result::Result<Vec<u8>, ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder.encode_image(image)?;
    Ok(buffer.into_inner())
}

/// Build a one-page document showing the given JPEG data at full page size
fn single_image_document(width: u32, height: u32, jpeg: Vec<u8>) -> Result<Document> {
    let width = i64::from(width);
    let height = i64::from(height);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    // Already DCT-compressed, so keep lopdf from flate-compressing it again
    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    )
    .with_compression(false);
    let image_id = doc.add_object(image_stream);

    // Scale the unit-square image to the page
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}
