//! Image XObject decoding.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Object, Stream};

use crate::error::{Error, Result};
use crate::model::ImageRef;

/// Turn an image XObject stream into encoded image bytes.
///
/// JPEG and JPEG 2000 data is passed through untouched. 8-bit Gray and RGB
/// samples are re-encoded as PNG; anything else keeps its decoded bytes as
/// `application/octet-stream`.
pub fn decode_image_stream(stream: &Stream, id: impl Into<String>) -> Result<ImageRef> {
    let dict = &stream.dict;

    let subtype = dict.get(b"Subtype").ok().and_then(|s| s.as_name().ok());
    if subtype.is_some_and(|s| s != b"Image") {
        return Err(Error::ImageEncode("Not an image XObject".to_string()));
    }

    let width = dict_u32(stream, b"Width");
    let height = dict_u32(stream, b"Height");
    let bits = dict_u32(stream, b"BitsPerComponent").unwrap_or(8);

    let id = id.into();
    let image = match last_filter(dict.get(b"Filter").ok()).as_deref() {
        Some("DCTDecode") => ImageRef::new(id, "image/jpeg", stream.content.clone()),
        Some("JPXDecode") => ImageRef::new(id, "image/jp2", stream.content.clone()),
        Some("CCITTFaxDecode") | Some("JBIG2Decode") => {
            ImageRef::new(id, "application/octet-stream", stream.content.clone())
        }
        _ => {
            let samples = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            match (width, height) {
                (Some(w), Some(h)) if bits == 8 => {
                    let components = color_components(dict.get(b"ColorSpace").ok(), samples.len(), w, h);
                    match encode_png(&samples, w, h, components) {
                        Ok(png) => ImageRef::new(id, "image/png", png),
                        Err(e) => {
                            log::debug!("Keeping raw samples for {}: {}", id, e);
                            ImageRef::new(id, "application/octet-stream", samples)
                        }
                    }
                }
                _ => ImageRef::new(id, "application/octet-stream", samples),
            }
        }
    };

    Ok(match (width, height) {
        (Some(w), Some(h)) => image.with_dimensions(w, h),
        _ => image,
    })
}

/// Encode raw 8-bit samples as PNG.
pub fn encode_png(samples: &[u8], width: u32, height: u32, components: u8) -> Result<Vec<u8>> {
    let mismatch = || {
        Error::ImageEncode(format!(
            "{} bytes do not hold {}x{} samples with {} components",
            samples.len(),
            width,
            height,
            components
        ))
    };
    let pixels = (width as usize).checked_mul(height as usize).ok_or_else(mismatch)?;
    let needed = pixels.checked_mul(usize::from(components)).ok_or_else(mismatch)?;
    if samples.len() < needed {
        return Err(mismatch());
    }

    let image = match components {
        1 => GrayImage::from_raw(width, height, samples[..needed].to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples[..needed].to_vec()).map(DynamicImage::ImageRgb8),
        _ => None,
    }
    .ok_or_else(mismatch)?;

    let mut buffer = Vec::new();
    image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}

/// Components per pixel, from the color space name or else from the sample count.
fn color_components(color_space: Option<&Object>, len: usize, width: u32, height: u32) -> u8 {
    let name = match color_space {
        Some(Object::Name(n)) => Some(n.as_slice()),
        Some(Object::Array(arr)) => arr.first().and_then(|o| o.as_name().ok()),
        _ => None,
    };
    match name {
        Some(b"DeviceGray") | Some(b"CalGray") => 1,
        Some(b"DeviceRGB") | Some(b"CalRGB") => 3,
        Some(b"DeviceCMYK") => 4,
        _ => {
            let pixels = (width as usize).saturating_mul(height as usize).max(1);
            match len / pixels {
                0 | 1 => 1,
                2 | 3 => 3,
                n => n.min(4) as u8,
            }
        }
    }
}

fn last_filter(filter: Option<&Object>) -> Option<String> {
    let name = match filter? {
        Object::Name(n) => n.as_slice(),
        Object::Array(arr) => arr.last()?.as_name().ok()?,
        _ => return None,
    };
    Some(String::from_utf8_lossy(name).to_string())
}

fn dict_u32(stream: &Stream, key: &[u8]) -> Option<u32> {
    stream
        .dict
        .get(key)
        .ok()
        .and_then(|v| v.as_i64().ok())
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}
