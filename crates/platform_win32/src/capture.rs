//! Screen capture for the overlay variant.
//!
//! Copies a desktop rectangle from the screen DC into a 32-bit top-down DIB
//! and hands the raw BGRA bytes to the core.

use crate::Win32Error;
use desktopblocks_core::{PixelBuffer, Rect};

#[cfg(windows)]
use desktopblocks_core::PixelFormat;
#[cfg(windows)]
use std::ffi::c_void;
#[cfg(windows)]
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, CAPTUREBLT, DIB_RGB_COLORS,
    HBITMAP, HDC, SRCCOPY,
};

/// Width and height of a capture, rejecting empty regions.
fn capture_size(bounds: Rect) -> Result<(i32, i32), Win32Error> {
    if bounds.is_degenerate() {
        return Err(Win32Error::CaptureFailed(format!(
            "empty region {}x{}",
            bounds.width(),
            bounds.height()
        )));
    }
    Ok((bounds.width(), bounds.height()))
}

/// GDI leaves the alpha byte at zero; make every pixel opaque.
#[cfg_attr(not(windows), allow(dead_code))]
fn make_opaque(bgra: &mut [u8]) {
    for px in bgra.chunks_exact_mut(4) {
        px[3] = 0xFF;
    }
}

#[cfg(windows)]
unsafe fn read_bits(
    dc: HDC,
    bitmap: HBITMAP,
    width: i32,
    height: i32,
) -> Result<Vec<u8>, Win32Error> {
    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            // Negative height: rows top-down.
            biHeight: -height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut data = vec![0u8; width as usize * height as usize * 4];
    let lines = GetDIBits(
        dc,
        bitmap,
        0,
        height as u32,
        Some(data.as_mut_ptr() as *mut c_void),
        &mut info,
        DIB_RGB_COLORS,
    );
    if lines != height {
        return Err(Win32Error::CaptureFailed(format!(
            "GetDIBits copied {} of {} lines",
            lines, height
        )));
    }
    Ok(data)
}

/// Capture the pixels of a desktop rectangle.
#[cfg(windows)]
pub fn capture_screen(bounds: Rect) -> Result<PixelBuffer, Win32Error> {
    let (width, height) = capture_size(bounds)?;

    let mut data = unsafe {
        let screen = GetDC(None);
        if screen.is_invalid() {
            return Err(Win32Error::CaptureFailed("GetDC returned null".to_string()));
        }
        let memory = CreateCompatibleDC(Some(screen));
        let bitmap = CreateCompatibleBitmap(screen, width, height);

        let previous = SelectObject(memory, bitmap.into());
        let copied = BitBlt(
            memory,
            0,
            0,
            width,
            height,
            Some(screen),
            bounds.left,
            bounds.top,
            SRCCOPY | CAPTUREBLT,
        );
        SelectObject(memory, previous);

        let result = copied
            .map_err(|e| Win32Error::CaptureFailed(format!("BitBlt: {}", e)))
            .and_then(|()| read_bits(memory, bitmap, width, height));

        let _ = DeleteObject(bitmap.into());
        let _ = DeleteDC(memory);
        ReleaseDC(None, screen);
        result?
    };

    make_opaque(&mut data);
    tracing::debug!(
        "Captured {}x{} at ({}, {})",
        width,
        height,
        bounds.left,
        bounds.top
    );

    PixelBuffer::new(width as u32, height as u32, PixelFormat::Bgra8, data)
        .map_err(|e| Win32Error::CaptureFailed(e.to_string()))
}

#[cfg(not(windows))]
pub fn capture_screen(bounds: Rect) -> Result<PixelBuffer, Win32Error> {
    capture_size(bounds)?;
    Err(Win32Error::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_size() {
        assert_eq!(capture_size(Rect::new(-1920, 0, 0, 1080)).unwrap(), (1920, 1080));
        assert!(matches!(
            capture_size(Rect::new(0, 0, 100, 0)),
            Err(Win32Error::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_make_opaque() {
        let mut px = vec![1, 2, 3, 0, 4, 5, 6, 0];
        make_opaque(&mut px);
        assert_eq!(px, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }
}
