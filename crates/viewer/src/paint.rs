//! GDI rendering of scene frames.
//!
//! Frames are drawn into an off-screen bitmap and copied to the window in
//! one BitBlt, so the canvas does not flicker while zooming.

use desktopblocks_core::RectF;

/// Round a view rectangle to device pixels, keeping at least one pixel in
/// each direction so thin windows stay visible.
pub fn pixel_rect(rect: &RectF) -> (i32, i32, i32, i32) {
    let left = rect.left.round() as i32;
    let top = rect.top.round() as i32;
    let right = (rect.right.round() as i32).max(left.saturating_add(1));
    let bottom = (rect.bottom.round() as i32).max(top.saturating_add(1));
    (left, top, right, bottom)
}

/// Box behind a label of the given text extent, grown by `padding`.
pub fn label_box(x: i32, y: i32, width: i32, height: i32, padding: f64) -> (i32, i32, i32, i32) {
    let pad = padding.round() as i32;
    (x - pad, y - pad, x + width + pad, y + height + pad)
}

#[cfg(windows)]
pub use gdi::paint_frame;

#[cfg(windows)]
mod gdi {
    use super::{label_box, pixel_rect};
    use desktopblocks_core::{Frame, PixelBuffer, PixelFormat, Primitive, Rgb, Stroke};
    use std::ffi::c_void;
    use windows::Win32::Foundation::{COLORREF, RECT, SIZE};
    use windows::Win32::Graphics::Gdi::{
        BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, CreateFontIndirectW, CreatePen,
        CreateSolidBrush, DeleteDC, DeleteObject, FillRect, GetStockObject, GetTextExtentPoint32W,
        Rectangle, SelectObject, SetBkMode, SetStretchBltMode, SetTextColor, StretchDIBits,
        TextOutW, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DEFAULT_GUI_FONT, DIB_RGB_COLORS, HALFTONE,
        HDC, HGDIOBJ, LOGFONTW, NULL_BRUSH, PS_SOLID, SRCCOPY, TRANSPARENT,
    };

    const FONT_FACE: &str = "Segoe UI";

    fn colorref(color: Rgb) -> COLORREF {
        COLORREF(color.to_colorref())
    }

    fn wide(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    /// Draw `frame` onto `hdc`, covering `width` x `height` pixels from the
    /// origin. `image` backs any [`Primitive::Image`].
    pub fn paint_frame(
        hdc: HDC,
        frame: &Frame,
        image: Option<&PixelBuffer>,
        width: i32,
        height: i32,
    ) {
        if width <= 0 || height <= 0 {
            return;
        }

        unsafe {
            let memory = CreateCompatibleDC(Some(hdc));
            let bitmap = CreateCompatibleBitmap(hdc, width, height);
            let previous = SelectObject(memory, bitmap.into());
            SetBkMode(memory, TRANSPARENT);

            for primitive in &frame.primitives {
                match primitive {
                    Primitive::Clear { color } => clear(memory, *color, width, height),
                    Primitive::Image { dest } => {
                        if let Some(image) = image {
                            draw_image(memory, image, pixel_rect(dest));
                        }
                    }
                    Primitive::Outline { rect, stroke, .. } => {
                        draw_outline(memory, pixel_rect(rect), *stroke)
                    }
                    Primitive::Label {
                        text,
                        origin,
                        color,
                        size,
                        background,
                    } => {
                        let x = origin.x.round() as i32;
                        let y = origin.y.round() as i32;
                        let background = background.map(|b| (b.color, b.padding));
                        draw_label(memory, text, x, y, *color, *size, background);
                    }
                }
            }

            if let Err(e) = BitBlt(hdc, 0, 0, width, height, Some(memory), 0, 0, SRCCOPY) {
                tracing::warn!("BitBlt to window failed: {}", e);
            }

            SelectObject(memory, previous);
            let _ = DeleteObject(bitmap.into());
            let _ = DeleteDC(memory);
        }
    }

    unsafe fn clear(hdc: HDC, color: Rgb, width: i32, height: i32) {
        let brush = CreateSolidBrush(colorref(color));
        let rect = RECT {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        };
        FillRect(hdc, &rect, brush);
        let _ = DeleteObject(brush.into());
    }

    unsafe fn draw_image(
        hdc: HDC,
        image: &PixelBuffer,
        (left, top, right, bottom): (i32, i32, i32, i32),
    ) {
        if image.format() != PixelFormat::Bgra8 {
            tracing::warn!("Skipping image in {:?} format", image.format());
            return;
        }
        let info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: image.width() as i32,
                biHeight: -(image.height() as i32),
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };

        SetStretchBltMode(hdc, HALFTONE);
        StretchDIBits(
            hdc,
            left,
            top,
            right - left,
            bottom - top,
            0,
            0,
            image.width() as i32,
            image.height() as i32,
            Some(image.as_bytes().as_ptr() as *const c_void),
            &info,
            DIB_RGB_COLORS,
            SRCCOPY,
        );
    }

    unsafe fn draw_outline(
        hdc: HDC,
        (left, top, right, bottom): (i32, i32, i32, i32),
        stroke: Stroke,
    ) {
        let width = stroke.width.round().max(1.0) as i32;
        let pen = CreatePen(PS_SOLID, width, colorref(stroke.color));
        let old_pen = SelectObject(hdc, pen.into());
        let old_brush = SelectObject(hdc, GetStockObject(NULL_BRUSH));

        let _ = Rectangle(hdc, left, top, right, bottom);

        SelectObject(hdc, old_brush);
        SelectObject(hdc, old_pen);
        let _ = DeleteObject(pen.into());
    }

    unsafe fn draw_label(
        hdc: HDC,
        text: &str,
        x: i32,
        y: i32,
        color: Rgb,
        size: Option<f64>,
        background: Option<(Rgb, f64)>,
    ) {
        let font: Option<HGDIOBJ> = size.map(|size| {
            let mut logfont = LOGFONTW {
                lfHeight: -(size.round().max(1.0) as i32),
                ..Default::default()
            };
            for (dst, src) in logfont.lfFaceName.iter_mut().zip(FONT_FACE.encode_utf16()) {
                *dst = src;
            }
            CreateFontIndirectW(&logfont).into()
        });
        let old_font = SelectObject(hdc, font.unwrap_or_else(|| GetStockObject(DEFAULT_GUI_FONT)));

        let text = wide(text);
        if let Some((fill, padding)) = background {
            let mut extent = SIZE::default();
            let _ = GetTextExtentPoint32W(hdc, &text, &mut extent);
            let (left, top, right, bottom) = label_box(x, y, extent.cx, extent.cy, padding);
            let brush = CreateSolidBrush(colorref(fill));
            FillRect(
                hdc,
                &RECT {
                    left,
                    top,
                    right,
                    bottom,
                },
                brush,
            );
            let _ = DeleteObject(brush.into());
        }

        SetTextColor(hdc, colorref(color));
        let _ = TextOutW(hdc, x, y, &text);

        SelectObject(hdc, old_font);
        if let Some(font) = font {
            let _ = DeleteObject(font);
        }
    }
}
