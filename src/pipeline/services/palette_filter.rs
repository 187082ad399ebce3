use crate::config::FilterSettings;
use crate::error::{AppError, DecodeError, WriteError};
use std::fmt;
use std::io::Cursor;
use tracing::{debug, info};

/// A deterministic transformation from radar image bytes to filtered image bytes.
pub trait ImageFilter: Send + Sync {
    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, AppError>;
    fn name(&self) -> &'static str;
}

/// Recolors the radar legend by rewriting palette entries. Pixel indices are
/// never touched, so the output has exactly the input's geometry and frames.
#[derive(Debug, Clone)]
pub struct PaletteFilter {
    key_row: u32,
    key_columns: Vec<u32>,
    key_colors: Vec<[u8; 3]>,
}

impl PaletteFilter {
    pub fn new(settings: &FilterSettings) -> Self {
        Self {
            key_row: settings.key_row,
            key_columns: settings.key_columns.clone(),
            key_colors: settings.key_colors.clone(),
        }
    }

    /// Reads the palette and legend indices without producing an output image.
    pub fn inspect(&self, input: &[u8]) -> Result<PaletteReport, DecodeError> {
        let decoded = DecodedGif::decode(input)?;
        let palette = decoded.first_palette()?;
        let key_indices = self.sample_key_indices(&decoded);

        Ok(PaletteReport {
            key_indices,
            palette: palette
                .chunks_exact(3)
                .map(|rgb| [rgb[0], rgb[1], rgb[2]])
                .collect(),
        })
    }

    fn sample_key_indices(&self, decoded: &DecodedGif) -> Vec<u8> {
        let mut indices = Vec::with_capacity(self.key_columns.len());
        for &column in &self.key_columns {
            if let Some(index) = decoded.pixel_index(column, self.key_row) {
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
        }
        indices
    }

    fn remap(&self, palette: &mut [u8], key_indices: &[u8]) {
        for (index, color) in key_indices.iter().zip(&self.key_colors) {
            let start = usize::from(*index) * 3;
            if let Some(entry) = palette.get_mut(start..start + 3) {
                entry.copy_from_slice(color);
            }
        }
    }
}

impl ImageFilter for PaletteFilter {
    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, AppError> {
        let mut decoded = DecodedGif::decode(input)?;
        decoded.first_palette()?;

        let key_indices = self.sample_key_indices(&decoded);
        if key_indices.is_empty() {
            info!("No radar key found at row {}, palette left as is", self.key_row);
        } else {
            debug!("Detected radar key colors at indices: {:?}", key_indices);
        }

        if let Some(palette) = decoded.global_palette.as_mut() {
            self.remap(palette, &key_indices);
        }
        for frame in &mut decoded.frames {
            if let Some(palette) = frame.palette.as_mut() {
                self.remap(palette, &key_indices);
            }
        }

        Ok(decoded.encode()?)
    }

    fn name(&self) -> &'static str {
        "PaletteFilter"
    }
}

struct DecodedGif {
    width: u16,
    height: u16,
    global_palette: Option<Vec<u8>>,
    background: Option<u8>,
    repeat: gif::Repeat,
    frames: Vec<gif::Frame<'static>>,
}

impl DecodedGif {
    fn decode(input: &[u8]) -> Result<Self, DecodeError> {
        if let Ok(format) = image::guess_format(input) {
            if format != image::ImageFormat::Gif {
                return Err(DecodeError::UnsupportedFormat(format!("{format:?}")));
            }
        }

        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(Cursor::new(input))?;

        let global_palette = decoder.global_palette().map(<[u8]>::to_vec);
        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame()? {
            frames.push(frame.clone());
        }
        if frames.is_empty() {
            return Err(DecodeError::NoFrames);
        }

        Ok(Self {
            width: decoder.width(),
            height: decoder.height(),
            global_palette,
            background: decoder.bg_color().and_then(|index| u8::try_from(index).ok()),
            repeat: decoder.repeat(),
            frames,
        })
    }

    /// Palette index shown at screen position (x, y) once the first frame is
    /// drawn. Screen pixels the frame does not cover show the background color.
    fn pixel_index(&self, x: u32, y: u32) -> Option<u8> {
        if x >= u32::from(self.width) || y >= u32::from(self.height) {
            return None;
        }

        let frame = &self.frames[0];
        let (left, top) = (u32::from(frame.left), u32::from(frame.top));
        let (width, height) = (u32::from(frame.width), u32::from(frame.height));
        if x < left || y < top || x - left >= width || y - top >= height {
            return self.background;
        }
        frame
            .buffer
            .get(((y - top) * width + (x - left)) as usize)
            .copied()
    }

    /// The palette the first frame is drawn with.
    fn first_palette(&self) -> Result<&[u8], DecodeError> {
        self.frames[0]
            .palette
            .as_deref()
            .or(self.global_palette.as_deref())
            .ok_or(DecodeError::MissingPalette)
    }

    fn encode(mut self) -> Result<Vec<u8>, WriteError> {
        let mut output = Vec::new();
        {
            let global_palette = self.global_palette.as_deref().unwrap_or(&[]);
            let mut encoder =
                gif::Encoder::new(&mut output, self.width, self.height, global_palette)?;
            if self.frames.len() > 1 {
                encoder.set_repeat(self.repeat)?;
            }
            for frame in &mut self.frames {
                // The decoder hands back rows in display order.
                frame.interlaced = false;
                encoder.write_frame(frame)?;
            }
        }
        Ok(output)
    }
}

/// Legend indices and the full palette of a radar image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteReport {
    pub key_indices: Vec<u8>,
    pub palette: Vec<[u8; 3]>,
}

impl PaletteReport {
    fn write_section(
        f: &mut fmt::Formatter<'_>,
        title: &str,
        indices: &[u8],
        palette: &[[u8; 3]],
    ) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}\n{title}\n{rule}")?;
        if indices.is_empty() {
            writeln!(f, "  (No indices found for this group)")?;
        }
        for &index in indices {
            if let Some([r, g, b]) = palette.get(usize::from(index)) {
                writeln!(
                    f,
                    "  Index {index:3}: ({r:3}, {g:3}, {b:3}) \x1b[48;2;{r};{g};{b}m  \x1b[0m"
                )?;
            }
        }
        writeln!(f, "{rule}")
    }
}

impl fmt::Display for PaletteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all: Vec<u8> = (0..self.palette.len()).filter_map(|i| u8::try_from(i).ok()).collect();
        Self::write_section(
            f,
            "RADAR KEY PALETTE (Left to Right)",
            &self.key_indices,
            &self.palette,
        )?;
        writeln!(f)?;
        Self::write_section(f, "FULL IMAGE PALETTE", &all, &self.palette)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    const PALETTE: [u8; 24] = [
        10, 10, 10, // 0
        20, 20, 20, // 1
        30, 30, 30, // 2
        200, 0, 0, // 3
        0, 200, 0, // 4
        0, 0, 200, // 5
        90, 90, 90, // 6
        99, 99, 99, // 7
    ];

    // Row 1 holds the legend: 3, 4, 3, 5.
    const PIXELS: [u8; 18] = [
        0, 1, 2, 6, 7, 0, //
        3, 4, 3, 5, 0, 0, //
        1, 1, 1, 1, 1, 1, //
    ];

    fn radar_gif(pixels: &[u8]) -> Vec<u8> {
        let mut output = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut output, 6, 3, &PALETTE).unwrap();
            let frame = gif::Frame {
                width: 6,
                height: 3,
                buffer: Cow::Borrowed(pixels),
                ..gif::Frame::default()
            };
            encoder.write_frame(&frame).unwrap();
        }
        output
    }

    fn filter() -> PaletteFilter {
        PaletteFilter::new(&FilterSettings {
            key_row: 1,
            key_columns: vec![0, 1, 2, 3, 40],
            key_colors: vec![[0, 0, 0], [255, 255, 255]],
        })
    }

    fn decode(bytes: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(Cursor::new(bytes)).unwrap();
        let palette = decoder.global_palette().unwrap().to_vec();
        let frame = decoder.read_next_frame().unwrap().unwrap();
        (palette, frame.buffer.to_vec())
    }

    #[test]
    fn remaps_key_entries_in_legend_order() {
        let output = filter().apply(&radar_gif(&PIXELS)).unwrap();
        let (palette, pixels) = decode(&output);

        assert_eq!(&palette[9..12], &[0, 0, 0]);
        assert_eq!(&palette[12..15], &[255, 255, 255]);
        // Third key index has no configured color.
        assert_eq!(&palette[15..18], &[0, 0, 200]);
        assert_eq!(&palette[0..9], &PALETTE[0..9]);
        assert_eq!(pixels, PIXELS.to_vec());
    }

    #[test]
    fn output_is_deterministic() {
        let input = radar_gif(&PIXELS);
        let first = filter().apply(&input).unwrap();
        let second = filter().apply(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn different_inputs_give_different_outputs() {
        let mut other = PIXELS;
        other[0] = 7;
        let a = filter().apply(&radar_gif(&PIXELS)).unwrap();
        let b = filter().apply(&radar_gif(&other)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn inspect_reports_deduplicated_key() {
        let report = filter().inspect(&radar_gif(&PIXELS)).unwrap();
        assert_eq!(report.key_indices, vec![3, 4, 5]);
        assert_eq!(report.palette.len(), 8);
        assert_eq!(report.palette[3], [200, 0, 0]);

        let rendered = report.to_string();
        assert!(rendered.contains("Index   3: (200,   0,   0)"));
        assert!(rendered.contains("FULL IMAGE PALETTE"));
    }

    #[test]
    fn key_outside_image_leaves_palette_alone() {
        let outside = PaletteFilter::new(&FilterSettings {
            key_row: 428,
            ..FilterSettings::default()
        });
        let output = outside.apply(&radar_gif(&PIXELS)).unwrap();
        let (palette, _) = decode(&output);
        assert_eq!(palette, PALETTE.to_vec());
    }

    #[test]
    fn rejects_other_image_formats() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        let error = filter().apply(png).unwrap_err();
        assert!(matches!(
            error,
            AppError::Decode(DecodeError::UnsupportedFormat(ref format)) if format == "Png"
        ));
    }

    #[test]
    fn legend_outside_first_frame_reads_background() {
        // 6x3 screen, first frame covers columns 2..6 only.
        let mut input = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut input, 6, 3, &PALETTE).unwrap();
            let frame = gif::Frame {
                left: 2,
                width: 4,
                height: 3,
                buffer: Cow::Borrowed(&[
                    1, 1, 1, 1, //
                    4, 5, 4, 6, //
                    1, 1, 1, 1, //
                ][..]),
                ..gif::Frame::default()
            };
            encoder.write_frame(&frame).unwrap();
        }

        let report = filter().inspect(&input).unwrap();
        // Column 0 is background (index 0), columns 2 and 3 are 4 and 5.
        assert_eq!(report.key_indices, vec![0, 4, 5]);
    }

    #[test]
    fn rejects_garbage() {
        let error = filter().apply(b"not an image at all").unwrap_err();
        assert!(matches!(error, AppError::Decode(DecodeError::Gif(_))));
    }
}
