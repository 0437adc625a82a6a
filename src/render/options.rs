//! Rendering options and configuration.

use super::JsonFormat;
use serde::{Deserialize, Serialize};

/// Options for rendering document content.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Prepend YAML front matter to Markdown output (skipped when metadata is empty)
    pub include_frontmatter: bool,

    /// Character to use for unordered list markers
    pub list_marker: char,

    /// Embed the default stylesheet in HTML output
    pub include_stylesheet: bool,

    /// Page size for paginated output
    pub page_size: PageSize,

    /// Page margins for paginated output, in points
    pub margins: Margins,

    /// Bounding box images are scaled into in flow output, in points
    pub image_fit: FitBox,

    /// JSON output layout
    pub json_format: JsonFormat,

    /// Generator name written to HTML footer and instruction properties
    pub generator: String,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable frontmatter.
    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// Set the list marker character.
    pub fn with_list_marker(mut self, marker: char) -> Self {
        self.list_marker = marker;
        self
    }

    /// Enable or disable the embedded HTML stylesheet.
    pub fn with_stylesheet(mut self, include: bool) -> Self {
        self.include_stylesheet = include;
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, size: PageSize) -> Self {
        self.page_size = size;
        self
    }

    /// Set the page margins.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Set the flow image fit box.
    pub fn with_image_fit(mut self, fit: FitBox) -> Self {
        self.image_fit = fit;
        self
    }

    /// Set the JSON layout.
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_frontmatter: true,
            list_marker: '-',
            include_stylesheet: true,
            page_size: PageSize::A4,
            margins: Margins::uniform(72.0),
            // 6 x 8 inches
            image_fit: FitBox::new(432.0, 576.0),
            json_format: JsonFormat::Pretty,
            generator: concat!("docport ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Paper size for paginated output.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// ISO A4 (210 x 297 mm)
    #[default]
    A4,
    /// US Letter (8.5 x 11 inches)
    Letter,
    /// Custom size in points
    Custom {
        /// Width in points
        width: f32,
        /// Height in points
        height: f32,
    },
}

impl PageSize {
    /// Width and height in points (1 point = 1/72 inch).
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }

    /// Parse a page size string (e.g., "a4", "letter", "500x700").
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            custom => {
                let (w, h) = custom
                    .split_once('x')
                    .ok_or_else(|| format!("Invalid page size: {}", custom))?;
                let width: f32 = w.trim().parse().map_err(|_| "Invalid page width")?;
                let height: f32 = h.trim().parse().map_err(|_| "Invalid page height")?;
                if width <= 0.0 || height <= 0.0 {
                    return Err("Page dimensions must be positive".to_string());
                }
                Ok(PageSize::Custom { width, height })
            }
        }
    }
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    /// Top margin
    pub top: f32,
    /// Right margin
    pub right: f32,
    /// Bottom margin
    pub bottom: f32,
    /// Left margin
    pub left: f32,
}

impl Margins {
    /// Same margin on every side.
    pub fn uniform(points: f32) -> Self {
        Self {
            top: points,
            right: points,
            bottom: points,
            left: points,
        }
    }
}

/// Box an image is scaled into, preserving aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitBox {
    /// Maximum width in points
    pub max_width: f32,
    /// Maximum height in points
    pub max_height: f32,
}

impl FitBox {
    /// Create a fit box.
    pub fn new(max_width: f32, max_height: f32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_builder() {
        let options = RenderOptions::new()
            .with_frontmatter(false)
            .with_list_marker('*')
            .with_page_size(PageSize::Letter);

        assert!(!options.include_frontmatter);
        assert_eq!(options.list_marker, '*');
        assert_eq!(options.page_size, PageSize::Letter);
    }

    #[test]
    fn test_render_options_defaults() {
        let options = RenderOptions::default();
        assert!(options.include_frontmatter);
        assert_eq!(options.page_size.dimensions(), (595.0, 842.0));
        assert!(options.generator.starts_with("docport "));
    }

    #[test]
    fn test_page_size_parse() {
        assert_eq!(PageSize::parse("A4").unwrap(), PageSize::A4);
        assert_eq!(PageSize::parse("letter").unwrap(), PageSize::Letter);
        assert_eq!(
            PageSize::parse("500x700").unwrap(),
            PageSize::Custom {
                width: 500.0,
                height: 700.0
            }
        );
        assert!(PageSize::parse("tabloid").is_err());
        assert!(PageSize::parse("0x700").is_err());
    }
}
