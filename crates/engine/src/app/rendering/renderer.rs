use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use tracing::warn;
use winit::window::Window;

use super::{DrawList, SrcRect, CANVAS_HEIGHT, CANVAS_WIDTH};

struct LoadedSheet {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Software blitter over a fixed-size logical canvas. Sprite sheets load
/// lazily from the assets directory; a sheet that is missing or fails to
/// decode draws nothing (warned once), it never crashes the frame.
pub struct Renderer {
    pixels: Pixels<'static>,
    assets_dir: PathBuf,
    sheet_cache: HashMap<&'static str, Option<LoadedSheet>>,
    warned_missing_sheets: HashSet<&'static str>,
}

impl Renderer {
    pub fn new(window: &'static Window, assets_dir: PathBuf) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width.max(1), size.height.max(1), window);
        let pixels = Pixels::new(CANVAS_WIDTH, CANVAS_HEIGHT, surface)?;
        Ok(Self {
            pixels,
            assets_dir,
            sheet_cache: HashMap::new(),
            warned_missing_sheets: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    pub fn render(&mut self, frame: &DrawList) -> Result<(), Error> {
        let clear = frame.clear_color();
        for pixel in self.pixels.frame_mut().chunks_exact_mut(4) {
            pixel.copy_from_slice(&clear);
        }

        for command in frame.commands() {
            self.ensure_sheet_loaded(command.sheet);
            let Some(Some(sheet)) = self.sheet_cache.get(command.sheet) else {
                continue;
            };
            blit_rgba(
                self.pixels.frame_mut(),
                CANVAS_WIDTH,
                CANVAS_HEIGHT,
                &sheet.rgba,
                sheet.width,
                sheet.height,
                command.src,
                command.dest.x.round() as i32,
                command.dest.y.round() as i32,
            );
        }

        self.pixels.render()
    }

    fn ensure_sheet_loaded(&mut self, key: &'static str) {
        if self.sheet_cache.contains_key(key) {
            return;
        }
        let path = self.assets_dir.join("images").join(format!("{key}.png"));
        let loaded = ImageReader::open(&path)
            .map_err(|error| format!("open '{}': {error}", path.display()))
            .and_then(|reader| {
                reader
                    .decode()
                    .map_err(|error| format!("decode '{}': {error}", path.display()))
            })
            .map(|decoded| {
                let rgba = decoded.to_rgba8();
                LoadedSheet {
                    width: rgba.width(),
                    height: rgba.height(),
                    rgba: rgba.into_raw(),
                }
            });

        match loaded {
            Ok(sheet) => {
                self.sheet_cache.insert(key, Some(sheet));
            }
            Err(error) => {
                if self.warned_missing_sheets.insert(key) {
                    warn!(sheet = key, error = %error, "sprite_sheet_unavailable");
                }
                self.sheet_cache.insert(key, None);
            }
        }
    }
}

/// Alpha-over blit of `src` from the sheet into the destination buffer,
/// clipped against both the sheet and the canvas.
#[allow(clippy::too_many_arguments)]
fn blit_rgba(
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
    sheet: &[u8],
    sheet_width: u32,
    sheet_height: u32,
    src: SrcRect,
    dest_x: i32,
    dest_y: i32,
) {
    if src.x >= sheet_width || src.y >= sheet_height {
        return;
    }
    let src_width = src.width.min(sheet_width - src.x);
    let src_height = src.height.min(sheet_height - src.y);

    for row in 0..src_height {
        let canvas_y = dest_y + row as i32;
        if canvas_y < 0 || canvas_y >= dst_height as i32 {
            continue;
        }
        for column in 0..src_width {
            let canvas_x = dest_x + column as i32;
            if canvas_x < 0 || canvas_x >= dst_width as i32 {
                continue;
            }

            let src_index = (((src.y + row) * sheet_width + src.x + column) * 4) as usize;
            let alpha = sheet[src_index + 3] as u32;
            if alpha == 0 {
                continue;
            }
            let dst_index = ((canvas_y as u32 * dst_width + canvas_x as u32) * 4) as usize;
            if alpha == 255 {
                dst[dst_index..dst_index + 4].copy_from_slice(&sheet[src_index..src_index + 4]);
                continue;
            }
            for channel in 0..3 {
                let src_value = sheet[src_index + channel] as u32;
                let dst_value = dst[dst_index + channel] as u32;
                dst[dst_index + channel] =
                    ((src_value * alpha + dst_value * (255 - alpha)) / 255) as u8;
            }
            dst[dst_index + 3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_sheet(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let mut sheet = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            sheet.extend_from_slice(&color);
        }
        sheet
    }

    fn pixel(dst: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let index = ((y * width + x) * 4) as usize;
        [dst[index], dst[index + 1], dst[index + 2], dst[index + 3]]
    }

    #[test]
    fn blit_copies_opaque_pixels_inside_bounds() {
        let mut dst = vec![0u8; 8 * 8 * 4];
        let sheet = solid_sheet(4, 4, [10, 20, 30, 255]);

        blit_rgba(
            &mut dst,
            8,
            8,
            &sheet,
            4,
            4,
            SrcRect {
                x: 0,
                y: 0,
                width: 2,
                height: 2,
            },
            3,
            3,
        );

        assert_eq!(pixel(&dst, 8, 3, 3), [10, 20, 30, 255]);
        assert_eq!(pixel(&dst, 8, 4, 4), [10, 20, 30, 255]);
        assert_eq!(pixel(&dst, 8, 5, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn blit_clips_against_the_canvas_edges() {
        let mut dst = vec![0u8; 4 * 4 * 4];
        let sheet = solid_sheet(4, 4, [255, 0, 0, 255]);

        blit_rgba(
            &mut dst,
            4,
            4,
            &sheet,
            4,
            4,
            SrcRect {
                x: 0,
                y: 0,
                width: 4,
                height: 4,
            },
            -2,
            -2,
        );

        assert_eq!(pixel(&dst, 4, 0, 0), [255, 0, 0, 255]);
        assert_eq!(pixel(&dst, 4, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&dst, 4, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn blit_clips_source_rect_against_the_sheet() {
        let mut dst = vec![0u8; 4 * 4 * 4];
        let sheet = solid_sheet(2, 2, [0, 255, 0, 255]);

        blit_rgba(
            &mut dst,
            4,
            4,
            &sheet,
            2,
            2,
            SrcRect {
                x: 1,
                y: 1,
                width: 16,
                height: 16,
            },
            0,
            0,
        );

        assert_eq!(pixel(&dst, 4, 0, 0), [0, 255, 0, 255]);
        assert_eq!(pixel(&dst, 4, 1, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&dst, 4, 0, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn transparent_pixels_leave_the_destination_alone() {
        let mut dst = solid_sheet(2, 2, [9, 9, 9, 255]);
        let sheet = solid_sheet(2, 2, [255, 255, 255, 0]);

        blit_rgba(
            &mut dst,
            2,
            2,
            &sheet,
            2,
            2,
            SrcRect {
                x: 0,
                y: 0,
                width: 2,
                height: 2,
            },
            0,
            0,
        );

        assert_eq!(pixel(&dst, 2, 0, 0), [9, 9, 9, 255]);
    }

    #[test]
    fn semi_transparent_pixels_blend_over_the_destination() {
        let mut dst = solid_sheet(1, 1, [0, 0, 0, 255]);
        let sheet = solid_sheet(1, 1, [255, 255, 255, 128]);

        blit_rgba(
            &mut dst,
            1,
            1,
            &sheet,
            1,
            1,
            SrcRect {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            },
            0,
            0,
        );

        let blended = pixel(&dst, 1, 0, 0);
        assert!(blended[0] > 100 && blended[0] < 160);
        assert_eq!(blended[3], 255);
    }
}
