use super::pending::PendingImage;
use crate::error::ConvertError;
use image::{DynamicImage, ImageDecoder, ImageEncoder, ImageReader, Rgb, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl TargetFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Png => "PNG",
            TargetFormat::Jpeg => "JPEG",
            TargetFormat::Webp => "WEBP",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Webp => "webp",
        }
    }

    pub fn all() -> [TargetFormat; 3] {
        [TargetFormat::Png, TargetFormat::Jpeg, TargetFormat::Webp]
    }
}

#[derive(Debug, Clone)]
pub struct ConvertedImage {
    pub bytes: Vec<u8>,
    pub format: TargetFormat,
}

pub type ConversionResult = Result<ConvertedImage, ConvertError>;

/// Converts every item concurrently. Slot `i` of the result always belongs to
/// `items[i]`; items still running once `timeout` has elapsed come back as
/// [`ConvertError::Timeout`].
pub fn convert_all(items: &[PendingImage], format: TargetFormat, timeout: Duration) -> Vec<ConversionResult> {
    convert_all_with(items, timeout, Arc::new(move |item: &PendingImage| convert_image(item, format)))
}

pub(crate) fn convert_all_with(
    items: &[PendingImage],
    timeout: Duration,
    convert: Arc<dyn Fn(&PendingImage) -> ConversionResult + Send + Sync>,
) -> Vec<ConversionResult> {
    let (tx, rx) = mpsc::channel::<(usize, ConversionResult)>();

    for (idx, item) in items.iter().enumerate() {
        let tx = tx.clone();
        let item = item.clone();
        let convert = Arc::clone(&convert);
        thread::spawn(move || {
            let result = convert(&item);
            let _ = tx.send((idx, result));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<ConversionResult>> = (0..items.len()).map(|_| None).collect();
    let deadline = Instant::now() + timeout;
    let mut remaining = items.len();
    let mut timed_out = false;

    while remaining > 0 {
        let wait = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok((idx, result)) => {
                if let Err(e) = &result {
                    tracing::warn!(name = %items[idx].name, error = %e, "conversion failed");
                }
                slots[idx] = Some(result);
                remaining -= 1;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                timed_out = true;
                break;
            }
            // A worker panicked before sending.
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    slots
        .into_iter()
        .zip(items)
        .map(|(slot, item)| {
            slot.unwrap_or_else(|| {
                if timed_out {
                    tracing::warn!(name = %item.name, "conversion timed out");
                    Err(ConvertError::Timeout { name: item.name.clone(), secs: timeout.as_secs() })
                } else {
                    Err(ConvertError::WorkerLost { name: item.name.clone() })
                }
            })
        })
        .collect()
}

/// Decodes one payload, turns it upright, lays it out as an RGBA surface of
/// the same pixel size, then encodes that surface with the target encoder's
/// defaults.
pub fn convert_image(item: &PendingImage, format: TargetFormat) -> ConversionResult {
    let decoded = decode_upright(&item.bytes).map_err(|source| ConvertError::Decode {
        name: item.name.clone(),
        source,
    })?;

    let surface = decoded.to_rgba8();
    let (width, height) = surface.dimensions();
    tracing::debug!(name = %item.name, width, height, format = format.as_str(), "encoding");

    let mut bytes = Vec::new();
    let encoded = match format {
        TargetFormat::Png => image::codecs::png::PngEncoder::new(&mut bytes).write_image(
            surface.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgba8,
        ),
        TargetFormat::Jpeg => {
            let opaque = flatten_onto_black(&surface);
            image::codecs::jpeg::JpegEncoder::new(&mut bytes).write_image(
                opaque.as_raw(),
                width,
                height,
                image::ExtendedColorType::Rgb8,
            )
        }
        TargetFormat::Webp => image::codecs::webp::WebPEncoder::new_lossless(&mut bytes).write_image(
            surface.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgba8,
        ),
    };

    encoded.map_err(|source| ConvertError::Encode {
        name: item.name.clone(),
        format: format.as_str(),
        source,
    })?;

    Ok(ConvertedImage { bytes, format })
}

/// Decodes with the format sniffed from the payload and applies the EXIF
/// orientation, so camera photos come out the way they are displayed.
fn decode_upright(bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;

    let mut decoded = DynamicImage::from_decoder(decoder)?;
    decoded.apply_orientation(orientation);
    Ok(decoded)
}

/// Composites the surface onto opaque black. Fully transparent pixels become
/// black, partly transparent ones are darkened by their coverage.
fn flatten_onto_black(surface: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(surface.width(), surface.height(), |x, y| {
        let Rgba([r, g, b, a]) = *surface.get_pixel(x, y);
        let cover = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
        Rgb([cover(r), cover(g), cover(b)])
    })
}
