//! Page and font settings of generated documents.

/// Twips (1/20 pt) per inch.
pub const TWIPS_PER_INCH: f64 = 1440.0;

const CM_PER_INCH: f64 = 2.54;

/// Fonts, page geometry and heading sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSettings {
    pub font_name: String,
    /// Body font size in points.
    pub font_size: f32,
    pub code_font: String,
    pub code_font_size: f32,
    /// Font sizes in points for heading levels 1 through 6.
    pub heading_sizes: [f32; 6],
    pub page_width_cm: f64,
    pub page_height_cm: f64,
    pub margin_top_cm: f64,
    pub margin_bottom_cm: f64,
    pub margin_left_cm: f64,
    pub margin_right_cm: f64,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            font_name: "Microsoft YaHei".to_owned(),
            font_size: 12.0,
            code_font: "Consolas".to_owned(),
            code_font_size: 10.0,
            heading_sizes: [18.0, 16.0, 14.0, 13.0, 12.0, 11.0],
            // US Letter
            page_width_cm: 21.59,
            page_height_cm: 27.94,
            margin_top_cm: 2.54,
            margin_bottom_cm: 2.54,
            margin_left_cm: 3.17,
            margin_right_cm: 3.17,
        }
    }
}

impl DocumentSettings {
    /// Font size for a heading level, or `None` outside 1..=6.
    #[must_use]
    pub fn heading_size(&self, level: u8) -> Option<f32> {
        let index = usize::from(level).checked_sub(1)?;
        self.heading_sizes.get(index).copied()
    }

    /// Width between the left and right margins, in inches.
    #[must_use]
    pub fn printable_width_inches(&self) -> f64 {
        let width = self.page_width_cm - self.margin_left_cm - self.margin_right_cm;
        (width / CM_PER_INCH).max(0.0)
    }

    /// Height between the top and bottom margins, in inches.
    #[must_use]
    pub fn printable_height_inches(&self) -> f64 {
        let height = self.page_height_cm - self.margin_top_cm - self.margin_bottom_cm;
        (height / CM_PER_INCH).max(0.0)
    }
}

/// Convert centimeters to twips.
#[must_use]
pub fn cm_to_twips(cm: f64) -> u32 {
    inches_to_twips(cm / CM_PER_INCH)
}

/// Convert inches to twips.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn inches_to_twips(inches: f64) -> u32 {
    (inches * TWIPS_PER_INCH).round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_sizes() {
        let settings = DocumentSettings::default();
        assert_eq!(settings.heading_size(1), Some(18.0));
        assert_eq!(settings.heading_size(6), Some(11.0));
        assert_eq!(settings.heading_size(0), None);
        assert_eq!(settings.heading_size(7), None);
    }

    #[test]
    fn test_printable_width() {
        let settings = DocumentSettings::default();
        let width = settings.printable_width_inches();
        assert!((width - 6.0).abs() < 0.01, "width was {width}");
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(inches_to_twips(0.5), 720);
        assert_eq!(cm_to_twips(2.54), 1440);
    }
}
