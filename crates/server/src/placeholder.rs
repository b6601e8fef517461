//! Generated stand-in images.

use bytes::Bytes;

pub const DEFAULT_DIMENSION: u32 = 300;
pub const DEFAULT_COLOR: &str = "f0f0f0";

/// Size and background of a placeholder image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpec {
    width: u32,
    height: u32,
    color: String,
}

impl Default for PlaceholderSpec {
    fn default() -> Self {
        Self {
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            color: DEFAULT_COLOR.to_owned(),
        }
    }
}

impl PlaceholderSpec {
    /// Build from raw query values.
    ///
    /// Missing, non-numeric or zero dimensions fall back to the default and
    /// larger ones are clamped to `max_dimension`. A color that is not six
    /// hex digits falls back to the default.
    pub fn from_query(
        width: Option<&str>,
        height: Option<&str>,
        color: Option<&str>,
        max_dimension: u32,
    ) -> Self {
        let max_dimension = max_dimension.max(1);
        Self {
            width: dimension(width).min(max_dimension),
            height: dimension(height).min(max_dimension),
            color: color
                .map(str::trim)
                .filter(|c| is_hex_color(c))
                .map_or_else(|| DEFAULT_COLOR.to_owned(), str::to_ascii_lowercase),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// Render as SVG. Equal specs render to identical bytes.
    pub fn render(&self) -> Bytes {
        let Self {
            width,
            height,
            color,
        } = self;
        Bytes::from(format!(
            "<svg width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" \
             xmlns=\"http://www.w3.org/2000/svg\">\
             <rect width=\"100%\" height=\"100%\" fill=\"#{color}\"/>\
             <text x=\"50%\" y=\"50%\" font-family=\"Arial, sans-serif\" font-size=\"16\" \
             fill=\"#666\" text-anchor=\"middle\" dominant-baseline=\"middle\">No Image</text>\
             </svg>"
        ))
    }
}

fn dimension(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_DIMENSION)
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 6 && value.bytes().all(|b| b.is_ascii_hexdigit())
}
