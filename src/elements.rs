//! `genpdf` elements that draw the layout plan.
//!
//! [`GridRowElement`] draws one fixed-height [`GridRow`] and [`TableListElement`] draws a
//! [`TableList`], continuing on the next page when it runs out of space.  Both measure and wrap
//! their text themselves so that row backgrounds can be painted before the text on top of them.

use std::collections::HashMap;
use std::path::Path;

use genpdf::elements::Image;
use genpdf::error::{Context as _, Error};
use genpdf::fonts::{Font, FontFamily};
use genpdf::style::{Color, Style, StyledString};
use genpdf::{render, Element, Mm, Position, RenderResult, Scale, Size};
use image::GenericImageView;
use log::warn;

use crate::model::{
    column_widths, Content, FontRole, GridRow, HorizontalAlignment, ImageSource, RectProps, Rgb,
    TableList, TableListContent, TextProps,
};
use crate::symbols;

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const FILL_STROKE_STEP_MM: f64 = 0.25;
const TABLE_CELL_PADDING_MM: f64 = 1.0;
const SIGNATURE_LINE_INSET: f64 = 0.05;
const SIGNATURE_LABEL_GAP_MM: f64 = 1.0;
const FIT_TOLERANCE: f64 = 0.999;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn estimated_image_size_mm(image: &image::DynamicImage) -> (f64, f64) {
    let (px_width, px_height) = image.dimensions();
    (
        MM_PER_INCH * (px_width as f64) / DEFAULT_IMAGE_DPI,
        MM_PER_INCH * (px_height as f64) / DEFAULT_IMAGE_DPI,
    )
}

/// Loads an image from in-memory bytes using the [`image`] crate with descriptive errors.
pub fn decode_image_from_bytes(bytes: impl AsRef<[u8]>) -> Result<image::DynamicImage, Error> {
    image::load_from_memory(bytes.as_ref()).context("Failed to decode image from provided bytes")
}

/// Loads an image from the given path using the [`image`] crate with descriptive errors.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// Decoded images referenced by a layout plan.
///
/// Images that fail to load are logged once and remembered as missing, so the columns that show
/// them are left blank instead of failing the render.
#[derive(Clone, Default)]
pub struct AssetCache {
    images: HashMap<String, Option<image::DynamicImage>>,
}

impl AssetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every image referenced by `rows`.
    pub fn preload<'a>(&mut self, rows: impl IntoIterator<Item = &'a GridRow>) {
        for row in rows {
            for column in row.columns() {
                if let Content::Image(ImageSource::Path(path), _) = &column.content {
                    self.load_path(path);
                }
            }
        }
    }

    fn load_path(&mut self, path: &str) -> Option<image::DynamicImage> {
        self.images
            .entry(path.to_string())
            .or_insert_with(|| match decode_image_from_path(path) {
                Ok(image) => Some(flatten(image)),
                Err(err) => {
                    warn!("Image file was not loaded: {}", err);
                    None
                }
            })
            .clone()
    }

    /// Returns the decoded image for `source`, or `None` when it could not be loaded.
    pub fn image(&mut self, source: &ImageSource) -> Option<image::DynamicImage> {
        match source {
            ImageSource::Path(path) => self.load_path(path),
            ImageSource::Bytes(bytes) => match decode_image_from_bytes(bytes) {
                Ok(image) => Some(flatten(image)),
                Err(err) => {
                    warn!("Image bytes were not loaded: {}", err);
                    None
                }
            },
        }
    }

    /// Returns whether `path` was requested and failed to load.
    pub fn is_missing(&self, path: &str) -> bool {
        matches!(self.images.get(path), Some(None))
    }
}

/// `genpdf` rejects images with an alpha channel, so everything is embedded as RGB.
fn flatten(image: image::DynamicImage) -> image::DynamicImage {
    image::DynamicImage::ImageRgb8(image.to_rgb8())
}

/// Maps text properties to `genpdf` styles, including the optional monospaced family.
#[derive(Clone, Debug, Default)]
pub struct FontSet {
    mono: Option<FontFamily<Font>>,
}

impl FontSet {
    /// Creates a font set; without a monospaced family, mono text uses the default family.
    pub fn new(mono: Option<FontFamily<Font>>) -> Self {
        Self { mono }
    }

    fn style(
        &self,
        size: u8,
        bold: bool,
        italic: bool,
        color: Option<Rgb>,
        role: FontRole,
    ) -> Style {
        let mut style = Style::new();
        style.set_font_size(size);
        if bold {
            style.set_bold();
        }
        if italic {
            style.set_italic();
        }
        if let Some(color) = color {
            style.set_color(color.into());
        }
        if let (FontRole::Mono, Some(family)) = (role, &self.mono) {
            style.set_font_family(family.clone());
        }
        style
    }

    fn text_style(&self, props: &TextProps) -> Style {
        self.style(
            props.size,
            props.bold,
            props.italic,
            props.color,
            props.family,
        )
    }

    fn table_style(&self, content: &TableListContent) -> Style {
        self.style(content.size, content.bold, false, None, FontRole::Sans)
    }
}

/// Greedily wraps `text` into lines no wider than `max_width`.
///
/// Words wider than a line are kept on a line of their own.  Explicit newlines start a new line.
pub fn wrap_words(text: &str, max_width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }

            let candidate = format!("{} {}", current, word);
            if measure(&candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }

    lines
}

/// Horizontal offset of a line of `width` inside `available` for the given alignment.
pub fn aligned_offset(alignment: HorizontalAlignment, available: f64, width: f64) -> f64 {
    match alignment {
        HorizontalAlignment::Left => 0.0,
        HorizontalAlignment::Center => ((available - width) / 2.0).max(0.0),
        HorizontalAlignment::Right => (available - width).max(0.0),
    }
}

fn text_width(context: &genpdf::Context, style: Style, text: &str) -> f64 {
    let styled = StyledString::new(text.to_string(), style);
    mm_to_f64(styled.width(&context.font_cache))
}

fn wrapped_lines(context: &genpdf::Context, style: Style, text: &str, width: f64) -> Vec<String> {
    wrap_words(text, width, |candidate| {
        text_width(context, style, candidate)
    })
}

/// Prints pre-wrapped `lines` starting `top` millimetres below the area origin.
///
/// Lines that would cross the bottom of the area are dropped.
fn print_lines(
    context: &genpdf::Context,
    area: &render::Area<'_>,
    lines: &[String],
    style: Style,
    alignment: HorizontalAlignment,
    top: f64,
) -> Result<(), Error> {
    let available_width = mm_to_f64(area.size().width);
    let available_height = mm_to_f64(area.size().height);
    let line_height = mm_to_f64(style.line_height(&context.font_cache));

    for (index, line) in lines.iter().enumerate() {
        let y = top + line_height * index as f64;
        if y + line_height > available_height + f64::EPSILON {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let x = aligned_offset(alignment, available_width, text_width(context, style, line));
        if let Some(mut section) = area.text_section(
            &context.font_cache,
            Position::new(mm_from_f64(x), mm_from_f64(y)),
            style,
        ) {
            section.print_str(line, style)?;
        }
    }

    Ok(())
}

/// Paints a solid rectangle by stacking horizontal strokes.
fn fill_rect(area: &render::Area<'_>, x: f64, y: f64, width: f64, height: f64, color: Color) {
    let style = Style::new().with_color(color);
    let mut offset = FILL_STROKE_STEP_MM / 2.0;
    while offset < height {
        area.draw_line(
            vec![
                Position::new(mm_from_f64(x), mm_from_f64(y + offset)),
                Position::new(mm_from_f64(x + width), mm_from_f64(y + offset)),
            ],
            style,
        );
        offset += FILL_STROKE_STEP_MM;
    }
}

fn sub_area<'p>(area: &render::Area<'p>, x: f64, width: f64, height: f64) -> render::Area<'p> {
    let mut cell = area.clone();
    cell.add_offset(Position::new(mm_from_f64(x), 0));
    cell.set_width(mm_from_f64(width));
    cell.set_height(mm_from_f64(height));
    cell
}

/// Scale and offset that fit an image of `natural` size into a cell per `props`.
///
/// Returns `(scale, x, y)` in millimetres relative to the cell origin.
pub fn fit_rect(natural: (f64, f64), cell: (f64, f64), props: RectProps) -> (f64, f64, f64) {
    let (natural_width, natural_height) = natural;
    let (cell_width, cell_height) = cell;
    if natural_width <= 0.0 || natural_height <= 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let percent = (props.percent / 100.0).clamp(0.0, 1.0);
    let (left, top) = if props.center {
        (0.0, 0.0)
    } else {
        (props.left.max(0.0), props.top.max(0.0))
    };
    let max_width = (cell_width - left).max(0.0) * percent;
    let max_height = (cell_height - top).max(0.0) * percent;
    let scale = (max_width / natural_width).min(max_height / natural_height) * FIT_TOLERANCE;

    if props.center {
        let x = (cell_width - natural_width * scale) / 2.0;
        let y = (cell_height - natural_height * scale) / 2.0;
        (scale, x, y)
    } else {
        (scale, left, top)
    }
}

fn render_image(
    context: &genpdf::Context,
    area: &render::Area<'_>,
    image: &image::DynamicImage,
    props: RectProps,
    style: Style,
) -> Result<(), Error> {
    let cell = (mm_to_f64(area.size().width), mm_to_f64(area.size().height));
    let (scale, x, y) = fit_rect(estimated_image_size_mm(image), cell, props);
    if scale <= 0.0 {
        return Ok(());
    }

    let mut element = Image::from_dynamic_image(image.clone())?;
    element.set_scale(Scale::new(scale, scale));

    let mut target = area.clone();
    target.add_offset(Position::new(mm_from_f64(x), mm_from_f64(y)));
    element.render(context, target, style)?;
    Ok(())
}

fn render_signature(
    context: &genpdf::Context,
    area: &render::Area<'_>,
    label: &str,
    style: Style,
) -> Result<(), Error> {
    let width = mm_to_f64(area.size().width);
    let height = mm_to_f64(area.size().height);
    let line_height = mm_to_f64(style.line_height(&context.font_cache));
    let line_y = (height - line_height - SIGNATURE_LABEL_GAP_MM).max(0.0);

    let mut line_style = Style::new();
    if let Some(color) = style.color() {
        line_style = line_style.with_color(color);
    }
    area.draw_line(
        vec![
            Position::new(
                mm_from_f64(width * SIGNATURE_LINE_INSET),
                mm_from_f64(line_y),
            ),
            Position::new(
                mm_from_f64(width * (1.0 - SIGNATURE_LINE_INSET)),
                mm_from_f64(line_y),
            ),
        ],
        line_style,
    );

    print_lines(
        context,
        area,
        &[label.to_string()],
        style,
        HorizontalAlignment::Center,
        line_y + SIGNATURE_LABEL_GAP_MM / 2.0,
    )
}

enum Cell {
    Text(String, TextProps),
    Graphic(Option<image::DynamicImage>, RectProps),
    Signature(String, TextProps),
    Empty,
}

/// A fixed-height row whose columns follow the 12-unit grid.
///
/// The row is drawn whole or not at all: when it does not fit, it reports that more content is
/// pending so the document moves it to the next page.
pub struct GridRowElement {
    height: f64,
    background: Option<Rgb>,
    weights: Vec<usize>,
    cells: Vec<Cell>,
    fonts: FontSet,
}

impl GridRowElement {
    /// Prepares `row` for rendering, decoding images and encoding symbols up front.
    ///
    /// Images and symbols that cannot be produced are logged and leave their column blank.
    pub fn new(row: &GridRow, assets: &mut AssetCache, fonts: FontSet) -> Result<Self, Error> {
        let weights = row.grid_weights().map_err(|err| {
            Error::new(err.to_string(), genpdf::error::ErrorKind::InvalidData)
        })?;

        let mut cells: Vec<Cell> = row
            .columns()
            .iter()
            .map(|column| match &column.content {
                Content::Text(text, props) => Cell::Text(text.clone(), props.clone()),
                Content::Image(source, props) => Cell::Graphic(assets.image(source), *props),
                Content::Barcode(data, props, proportion) => {
                    let barcode = symbols::barcode_image(data, *proportion);
                    Cell::Graphic(log_symbol(barcode), *props)
                }
                Content::QrCode(data, props) => {
                    Cell::Graphic(log_symbol(symbols::qr_image(data)), *props)
                }
                Content::Signature(label, props) => Cell::Signature(label.clone(), props.clone()),
                Content::Empty => Cell::Empty,
            })
            .collect();
        if cells.len() < weights.len() {
            cells.push(Cell::Empty);
        }

        Ok(Self {
            height: row.height(),
            background: row.background(),
            weights,
            cells,
            fonts,
        })
    }

    /// Returns the row height in millimetres.
    pub fn height(&self) -> f64 {
        self.height
    }
}

fn log_symbol(result: Result<image::DynamicImage, Error>) -> Option<image::DynamicImage> {
    match result {
        Ok(image) => Some(image),
        Err(err) => {
            warn!("Symbol was not generated: {}", err);
            None
        }
    }
}

impl Element for GridRowElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let available_width = mm_to_f64(area.size().width);
        if self.height > mm_to_f64(area.size().height) + f64::EPSILON {
            result.has_more = true;
            return Ok(result);
        }

        if let Some(background) = self.background {
            fill_rect(
                &area,
                0.0,
                0.0,
                available_width,
                self.height,
                background.into(),
            );
        }

        let widths = column_widths(available_width, &self.weights);
        let mut x = 0.0;
        for (cell, width) in self.cells.iter().zip(widths) {
            let cell_area = sub_area(&area, x, width, self.height);
            match cell {
                Cell::Text(text, props) => {
                    let cell_style = style.and(self.fonts.text_style(props));
                    let lines = wrapped_lines(context, cell_style, text, width);
                    print_lines(
                        context,
                        &cell_area,
                        &lines,
                        cell_style,
                        props.align,
                        props.top,
                    )?;
                }
                Cell::Graphic(Some(image), props) => {
                    render_image(context, &cell_area, image, *props, style)?;
                }
                Cell::Signature(label, props) => {
                    let cell_style = style.and(self.fonts.text_style(props));
                    render_signature(context, &cell_area, label, cell_style)?;
                }
                Cell::Graphic(None, _) | Cell::Empty => {}
            }
            x += width;
        }

        result.size = Size::new(area.size().width, mm_from_f64(self.height));
        Ok(result)
    }
}

/// A heading row followed by data rows, continued across pages.
///
/// The heading is drawn once, at the start of the table.
pub struct TableListElement {
    table: TableList,
    fonts: FontSet,
    heading_printed: bool,
    next_row: usize,
}

impl TableListElement {
    /// Creates the element for `table`.
    pub fn new(table: TableList, fonts: FontSet) -> Self {
        Self {
            table,
            fonts,
            heading_printed: false,
            next_row: 0,
        }
    }

    fn row_layout(
        &self,
        context: &genpdf::Context,
        fields: &[String],
        widths: &[f64],
        style: Style,
    ) -> (Vec<Vec<String>>, f64) {
        let line_height = mm_to_f64(style.line_height(&context.font_cache));
        let cells: Vec<Vec<String>> = fields
            .iter()
            .zip(widths)
            .map(|(field, width)| {
                let inner = (width - 2.0 * TABLE_CELL_PADDING_MM).max(0.0);
                wrapped_lines(context, style, field, inner)
            })
            .collect();
        let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let height = line_height * lines as f64 + 2.0 * TABLE_CELL_PADDING_MM;
        (cells, height)
    }

    fn draw_row(
        &self,
        context: &genpdf::Context,
        area: &render::Area<'_>,
        cells: &[Vec<String>],
        widths: &[f64],
        y: f64,
        height: f64,
        style: Style,
    ) -> Result<(), Error> {
        let mut row_area = area.clone();
        row_area.add_offset(Position::new(0, mm_from_f64(y)));

        let mut x = 0.0;
        for (lines, width) in cells.iter().zip(widths) {
            let inner = (width - 2.0 * TABLE_CELL_PADDING_MM).max(0.0);
            let cell_area = sub_area(&row_area, x + TABLE_CELL_PADDING_MM, inner, height);
            print_lines(
                context,
                &cell_area,
                lines,
                style,
                self.table.align(),
                TABLE_CELL_PADDING_MM,
            )?;
            x += width;
        }
        Ok(())
    }
}

impl Element for TableListElement {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();
        let available_width = mm_to_f64(area.size().width);
        let available_height = mm_to_f64(area.size().height);
        let widths = column_widths(available_width, self.table.grid_sizes());
        let mut y = 0.0;

        if !self.heading_printed {
            let heading_style = style.and(self.fonts.table_style(self.table.header()));
            let (cells, height) =
                self.row_layout(context, self.table.headings(), &widths, heading_style);
            if height > available_height {
                result.has_more = true;
                return Ok(result);
            }
            self.draw_row(context, &area, &cells, &widths, y, height, heading_style)?;
            y += height + self.table.header_content_space();
            self.heading_printed = true;
        }

        let content_style = style.and(self.fonts.table_style(self.table.content()));
        while self.next_row < self.table.rows().len() {
            let fields = &self.table.rows()[self.next_row];
            let (cells, height) = self.row_layout(context, fields, &widths, content_style);
            if y + height > available_height + f64::EPSILON {
                result.has_more = true;
                break;
            }

            if let Some(tint) = self.table.alternated_background() {
                if self.next_row % 2 == 0 {
                    fill_rect(&area, 0.0, y, available_width, height, tint.into());
                }
            }
            self.draw_row(context, &area, &cells, &widths, y, height, content_style)?;
            y += height;
            self.next_row += 1;
        }

        result.size = Size::new(area.size().width, mm_from_f64(y.min(available_height)));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_width(text: &str) -> f64 {
        text.chars().count() as f64
    }

    #[test]
    fn wrap_keeps_short_text_on_one_line() {
        let lines = wrap_words("Red and juicy", 20.0, char_width);
        assert_eq!(lines, vec!["Red and juicy"]);
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let lines = wrap_words("lorem ipsum dolor sit amet", 11.0, char_width);
        assert_eq!(lines, vec!["lorem ipsum", "dolor sit", "amet"]);
    }

    #[test]
    fn wrap_keeps_overlong_words_whole() {
        let lines = wrap_words("a incomprehensibilities b", 5.0, char_width);
        assert_eq!(lines, vec!["a", "incomprehensibilities", "b"]);
    }

    #[test]
    fn wrap_honours_newlines_and_empty_text() {
        assert_eq!(wrap_words("one\ntwo", 50.0, char_width), vec!["one", "two"]);
        assert_eq!(wrap_words("", 50.0, char_width), vec![String::new()]);
    }

    #[test]
    fn alignment_offsets() {
        use HorizontalAlignment::{Center, Left, Right};

        assert_eq!(aligned_offset(Left, 100.0, 40.0), 0.0);
        assert_eq!(aligned_offset(Center, 100.0, 40.0), 30.0);
        assert_eq!(aligned_offset(Right, 100.0, 40.0), 60.0);
        assert_eq!(aligned_offset(Right, 10.0, 40.0), 0.0);
    }

    #[test]
    fn centered_image_is_width_bound_for_wide_logos() {
        let (scale, x, y) = fit_rect((100.0, 20.0), (170.0, 50.0), RectProps::centered(75.0));
        let width = 100.0 * scale;
        assert!((width - 127.5 * FIT_TOLERANCE).abs() < 1e-9);
        assert!((x - (170.0 - width) / 2.0).abs() < 1e-9);
        assert!((y - (50.0 - 20.0 * scale) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn offset_image_is_height_bound_for_square_codes() {
        let (scale, x, y) = fit_rect((10.0, 10.0), (70.0, 15.0), RectProps::at(0.0, 5.0, 100.0));
        assert!((10.0 * scale - 10.0 * FIT_TOLERANCE).abs() < 1e-9);
        assert_eq!((x, y), (0.0, 5.0));
    }

    #[test]
    fn degenerate_images_are_skipped() {
        assert_eq!(
            fit_rect((0.0, 10.0), (10.0, 10.0), RectProps::centered(100.0)),
            (0.0, 0.0, 0.0)
        );
    }

    #[test]
    fn missing_images_are_cached_as_missing() {
        let mut assets = AssetCache::new();
        let source = ImageSource::from_path("/__fruit_invoice__/missing_logo.jpg");
        assert!(assets.image(&source).is_none());
        assert!(assets.is_missing("/__fruit_invoice__/missing_logo.jpg"));
    }

    #[test]
    fn grid_row_element_pads_partial_rows() {
        let row = GridRow::new(20.0)
            .col_space(7)
            .col(2, Content::Text("Total:".into(), TextProps::default()));
        let element =
            GridRowElement::new(&row, &mut AssetCache::new(), FontSet::default()).expect("row");
        assert_eq!(element.weights, vec![7, 2, 3]);
        assert_eq!(element.cells.len(), 3);
        assert_eq!(element.height(), 20.0);
    }
}
