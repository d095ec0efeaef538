//! Page layout calculations

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }
}

/// Page canvas size in PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// Build a page size from physical dimensions
    pub fn from_lengths(width: Length, height: Length) -> Self {
        Self {
            width: width.pt() as f32,
            height: height.pt() as f32,
        }
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self::from_lengths(Length::from_mm(210.0), Length::from_mm(297.0))
    }

    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self::from_lengths(Length::from_inches(8.5), Length::from_inches(11.0))
    }

    /// MediaBox array for a page of this size
    pub fn media_box(&self) -> [f32; 4] {
        [0.0, 0.0, self.width, self.height]
    }

    /// Whether another size matches this one within `tolerance` points
    pub fn approx_eq(&self, width: f32, height: f32, tolerance: f32) -> bool {
        (self.width - width).abs() <= tolerance && (self.height - height).abs() <= tolerance
    }
}

/// Uniform scale and lower-left position of a box placed on a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
}

impl Placement {
    /// Size of the placed box after scaling
    pub fn scaled(&self, width: f32, height: f32) -> (f32, f32) {
        (width * self.scale, height * self.scale)
    }
}

/// Uniform scale that fits `width × height` inside `max_width × max_height`
///
/// The result never exceeds `max_scale`; pass `f32::INFINITY` to allow
/// unbounded upscaling.
pub fn fit_scale(width: f32, height: f32, max_width: f32, max_height: f32, max_scale: f32) -> f32 {
    (max_width / width).min(max_height / height).min(max_scale)
}

/// Scale a page to fit the canvas without distortion and center it
///
/// The translation is `((W - w*s) / 2, (H - h*s) / 2)`.
pub fn fit_and_center(width: f32, height: f32, canvas: PageSize) -> Placement {
    let scale = fit_scale(width, height, canvas.width, canvas.height, f32::INFINITY);
    Placement {
        scale,
        x: (canvas.width - width * scale) / 2.0,
        y: (canvas.height - height * scale) / 2.0,
    }
}

/// Place artwork inside a margin-bounded region, centered, never upscaled,
/// then pushed down by `shift` while keeping at least `min_bottom` clear
pub fn place_artwork(
    width: f32,
    height: f32,
    canvas: PageSize,
    margin: f32,
    shift: f32,
    min_bottom: f32,
) -> Placement {
    let scale = fit_scale(
        width,
        height,
        canvas.width - 2.0 * margin,
        canvas.height - 2.0 * margin,
        1.0,
    );
    let (draw_w, draw_h) = (width * scale, height * scale);
    let x = (canvas.width - draw_w) / 2.0;
    let y = (canvas.height - draw_h) / 2.0;

    Placement {
        scale,
        x,
        y: (y - shift).max(min_bottom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversions() {
        let len = Length::from_inches(1.0);
        assert!((len.mm() - 25.4).abs() < 0.01);
        assert!((len.pt() - 72.0).abs() < 0.01);
    }

    #[test]
    fn test_a4_size() {
        let a4 = PageSize::a4();
        assert!((a4.width - 595.2756).abs() < 0.01);
        assert!((a4.height - 841.8898).abs() < 0.01);
    }

    #[test]
    fn test_letter_size() {
        let letter = PageSize::letter();
        assert!(letter.approx_eq(612.0, 792.0, 0.01));
    }

    #[test]
    fn test_fit_and_center_tall_page() {
        let canvas = PageSize::a4();
        // Narrower than tall, taller aspect than A4: height limits the scale
        let placement = fit_and_center(300.0, 900.0, canvas);

        assert!((placement.scale - canvas.height / 900.0).abs() < 1e-5);
        let (w, h) = placement.scaled(300.0, 900.0);
        assert!((placement.x - (canvas.width - w) / 2.0).abs() < 1e-3);
        assert!((placement.y - (canvas.height - h) / 2.0).abs() < 1e-3);
        assert!(placement.y.abs() < 1e-3);
    }

    #[test]
    fn test_fit_and_center_upscales_small_page() {
        let canvas = PageSize::a4();
        let placement = fit_and_center(100.0, 100.0, canvas);
        assert!(placement.scale > 5.0);
        assert!(placement.x.abs() < 1e-3);
    }

    #[test]
    fn test_place_artwork_never_upscales() {
        let canvas = PageSize::a4();
        let placement = place_artwork(100.0, 50.0, canvas, 70.0, 100.0, 20.0);
        assert_eq!(placement.scale, 1.0);
        assert!((placement.x - (canvas.width - 100.0) / 2.0).abs() < 1e-3);
        assert!((placement.y - ((canvas.height - 50.0) / 2.0 - 100.0)).abs() < 1e-3);
    }

    #[test]
    fn test_place_artwork_clamps_to_bottom() {
        let canvas = PageSize::a4();
        // Fills the whole margin box, so the shift would push it below min_bottom
        let placement = place_artwork(2000.0, 4000.0, canvas, 70.0, 100.0, 20.0);
        assert!(placement.scale < 1.0);
        assert_eq!(placement.y, 20.0);
    }
}
