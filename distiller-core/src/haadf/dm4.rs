//! Minimal reader for Digital Micrograph 4 files.
//!
//! Only what the preview renderer needs: the 2-D image data array and its
//! dimensions. The DM4 tag tree is walked generically; every tag carries its
//! own byte length, so anything we do not understand is skipped, not
//! rejected. Where a file holds several images (thumbnails first), the
//! largest one wins.

use crate::error::{CoreError, Result};

const TAG_DIRECTORY: u8 = 20;
const TAG_DATA: u8 = 21;
const TYPE_ARRAY: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Dm4Image {
    pub width: usize,
    pub height: usize,
    /// Row-major intensities, converted to f32.
    pub data: Vec<f32>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        let Some(end) = end else {
            return Err(CoreError::InvalidDm4("truncated file".to_string()));
        };
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16_be(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32_be(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64_be(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }
}

fn element_size(type_id: u64) -> Option<usize> {
    match type_id {
        2 | 4 => Some(2),       // i16 / u16
        3 | 5 | 6 => Some(4),   // i32 / u32 / f32
        7 | 11 | 12 => Some(8), // f64 / i64 / u64
        8 | 9 | 10 => Some(1),  // bool / i8 / u8
        _ => None,
    }
}

fn decode_element(bytes: &[u8], type_id: u64, little_endian: bool) -> f32 {
    macro_rules! decode {
        ($ty:ty) => {{
            let mut raw = [0u8; size_of::<$ty>()];
            raw.copy_from_slice(bytes);
            if little_endian {
                <$ty>::from_le_bytes(raw) as f32
            } else {
                <$ty>::from_be_bytes(raw) as f32
            }
        }};
    }
    match type_id {
        2 => decode!(i16),
        3 => decode!(i32),
        4 => decode!(u16),
        5 => decode!(u32),
        6 => decode!(f32),
        7 => decode!(f64),
        8 | 10 => bytes[0] as f32,
        9 => bytes[0] as i8 as f32,
        11 => decode!(i64),
        12 => decode!(u64),
        _ => 0.0,
    }
}

#[derive(Debug, Default)]
struct ImageCandidate {
    dims: Vec<usize>,
    /// (element type, element count, offset of the raw array data)
    array: Option<(u64, usize, usize)>,
}

#[derive(Debug)]
struct Walker {
    little_endian: bool,
    images: Vec<ImageCandidate>,
    image_stack: Vec<usize>,
    in_dimensions: bool,
}

impl Walker {
    fn new(little_endian: bool) -> Self {
        Self {
            little_endian,
            images: Vec::new(),
            image_stack: Vec::new(),
            in_dimensions: false,
        }
    }

    fn walk_directory(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let _sorted = cursor.read_u8()?;
        let _closed = cursor.read_u8()?;
        let tag_count = cursor.read_u64_be()?;

        for _ in 0..tag_count {
            let kind = cursor.read_u8()?;
            let name_length = cursor.read_u16_be()? as usize;
            let name = String::from_utf8_lossy(cursor.take(name_length)?).to_string();
            let tag_length = cursor.read_u64_be()?;
            let tag_end = cursor.pos.saturating_add(tag_length as usize);

            match kind {
                TAG_DIRECTORY => {
                    let entering_image_data = name == "ImageData";
                    if entering_image_data {
                        self.images.push(ImageCandidate::default());
                        self.image_stack.push(self.images.len() - 1);
                    }
                    let was_in_dimensions = self.in_dimensions;
                    if name == "Dimensions" {
                        self.in_dimensions = true;
                    }

                    self.walk_directory(cursor)?;

                    self.in_dimensions = was_in_dimensions;
                    if entering_image_data {
                        self.image_stack.pop();
                    }
                }
                TAG_DATA => {
                    self.visit_tag(&name, cursor)?;
                }
                other => {
                    return Err(CoreError::InvalidDm4(format!(
                        "unknown tag kind {other}"
                    )));
                }
            }

            // Each tag records its own length; trust it over our parse.
            if cursor.pos != tag_end {
                cursor.pos = tag_end.min(cursor.bytes.len());
            }
        }
        Ok(())
    }

    fn visit_tag(&mut self, name: &str, cursor: &mut Cursor<'_>) -> Result<()> {
        let seal = cursor.take(4)?;
        if seal != b"%%%%" {
            return Err(CoreError::InvalidDm4("missing tag seal".to_string()));
        }
        let info_count = cursor.read_u64_be()?;
        if info_count == 0 || info_count > 64 {
            return Ok(());
        }
        let mut info = Vec::with_capacity(info_count as usize);
        for _ in 0..info_count {
            info.push(cursor.read_u64_be()?);
        }

        let Some(&image_index) = self.image_stack.last() else {
            return Ok(());
        };

        // A dimension entry: a single unnamed integer tag inside the
        // Dimensions group.
        if self.in_dimensions
            && info.len() == 1
            && let Some(size) = element_size(info[0])
        {
            let raw = cursor.take(size)?;
            let value = decode_element(raw, info[0], self.little_endian);
            self.images[image_index].dims.push(value as usize);
            return Ok(());
        }

        // The image payload: a flat array of a simple numeric type.
        if name == "Data"
            && info.len() == 3
            && info[0] == TYPE_ARRAY
            && element_size(info[1]).is_some()
        {
            let count = info[2] as usize;
            self.images[image_index].array = Some((info[1], count, cursor.pos));
        }
        Ok(())
    }
}

/// Parse a DM4 byte buffer and return the largest 2-D image it contains.
pub fn read_dm4(bytes: &[u8]) -> Result<Dm4Image> {
    let mut cursor = Cursor::new(bytes);

    let version = cursor.read_u32_be()?;
    if version != 4 {
        return Err(CoreError::InvalidDm4(format!(
            "unsupported version {version}"
        )));
    }
    let _root_length = cursor.read_u64_be()?;
    let little_endian = cursor.read_u32_be()? == 1;

    let mut walker = Walker::new(little_endian);
    walker.walk_directory(&mut cursor)?;

    let best = walker
        .images
        .iter()
        .filter(|image| {
            image.dims.len() >= 2
                && image
                    .array
                    .is_some_and(|(_, count, _)| count == image.dims[0] * image.dims[1])
        })
        .max_by_key(|image| image.array.map(|(_, count, _)| count).unwrap_or(0))
        .ok_or_else(|| CoreError::InvalidDm4("no 2-D image data found".to_string()))?;

    let (type_id, count, offset) = best
        .array
        .ok_or_else(|| CoreError::InvalidDm4("no image array".to_string()))?;
    let size = element_size(type_id).ok_or_else(|| {
        CoreError::InvalidDm4(format!("unsupported element type {type_id}"))
    })?;
    let end = offset + count * size;
    if end > bytes.len() {
        return Err(CoreError::InvalidDm4("truncated image data".to_string()));
    }

    let data = bytes[offset..end]
        .chunks_exact(size)
        .map(|chunk| decode_element(chunk, type_id, little_endian))
        .collect();

    Ok(Dm4Image {
        width: best.dims[0],
        height: best.dims[1],
        data,
    })
}
