//! Data structures describing the layout plan of a document.
//!
//! A [`LayoutPlan`] is plain data: page setup, a header and a footer [`PageTemplate`] that are
//! replayed on every page, and the body [`Block`]s.  Apart from the color conversion
//! nothing here touches `genpdf`, so a plan can be built and inspected without
//! loading fonts; the [`crate::builder`] module turns it into `genpdf` elements.
//!
//! Rows follow a 12-unit grid.  Each [`Column`] spans a number of grid units and carries one
//! piece of [`Content`].

use std::fmt;

/// Number of horizontal grid units in a row.
pub const GRID_UNITS: usize = 12;

/// Placeholder for the current page number inside page templates.
pub const PAGE_TOKEN: &str = "{page}";

/// Placeholder for the total number of pages inside page templates.
pub const PAGE_COUNT_TOKEN: &str = "{nb}";

/// An RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl Rgb {
    /// Creates a color from its channels.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Pure white.
    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }
}

impl From<Rgb> for genpdf::style::Color {
    fn from(color: Rgb) -> Self {
        genpdf::style::Color::Rgb(color.red, color.green, color.blue)
    }
}

/// Horizontal placement of text and images inside a column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
    /// Right aligned content.
    Right,
}

/// Font family role used by a piece of text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FontRole {
    /// The document's default proportional family.
    #[default]
    Sans,
    /// A monospaced family, used where a Courier face is wanted.
    Mono,
}

/// Paper orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    /// Taller than wide.
    #[default]
    Portrait,
    /// Wider than tall.
    Landscape,
}

/// Page margins in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageMargins {
    /// Left margin.
    pub left: f64,
    /// Top margin.
    pub top: f64,
    /// Right margin.
    pub right: f64,
    /// Bottom margin.
    pub bottom: f64,
}

impl PageMargins {
    /// Creates margins from the left, top and right values with a 10 mm bottom margin.
    pub fn new(left: f64, top: f64, right: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom: 10.0,
        }
    }

    /// Sets the bottom margin and returns the updated margins.
    pub fn with_bottom(mut self, bottom: f64) -> Self {
        self.bottom = bottom;
        self
    }
}

impl Default for PageMargins {
    fn default() -> Self {
        Self::new(20.0, 10.0, 20.0)
    }
}

/// Paper size, orientation and margins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSetup {
    /// Orientation applied to the A4 sheet.
    pub orientation: Orientation,
    /// Margins applied through the page decorator.
    pub margins: PageMargins,
}

impl PageSetup {
    /// A4 paper in the given orientation with default margins.
    pub fn a4(orientation: Orientation) -> Self {
        Self {
            orientation,
            margins: PageMargins::default(),
        }
    }

    /// Sets the margins and returns the updated setup.
    pub fn with_margins(mut self, margins: PageMargins) -> Self {
        self.margins = margins;
        self
    }

    /// Returns the paper width and height in millimetres.
    pub fn paper_size_mm(&self) -> (f64, f64) {
        match self.orientation {
            Orientation::Portrait => (210.0, 297.0),
            Orientation::Landscape => (297.0, 210.0),
        }
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::a4(Orientation::Portrait)
    }
}

/// Text styling for a single piece of text.
#[derive(Clone, Debug, PartialEq)]
pub struct TextProps {
    /// Distance from the top of the column, in millimetres.
    pub top: f64,
    /// Font size in points.
    pub size: u8,
    /// Bold face.
    pub bold: bool,
    /// Italic face.
    pub italic: bool,
    /// Text color; defaults to black.
    pub color: Option<Rgb>,
    /// Font family role.
    pub family: FontRole,
    /// Horizontal alignment.
    pub align: HorizontalAlignment,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            top: 0.0,
            size: 10,
            bold: false,
            italic: false,
            color: None,
            family: FontRole::Sans,
            align: HorizontalAlignment::Left,
        }
    }
}

impl TextProps {
    /// Sets the top offset and returns the updated props.
    pub fn top(mut self, top: f64) -> Self {
        self.top = top;
        self
    }

    /// Sets the font size and returns the updated props.
    pub fn size(mut self, size: u8) -> Self {
        self.size = size;
        self
    }

    /// Marks the text as bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Marks the text as italic.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Sets the text color and returns the updated props.
    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the font family role and returns the updated props.
    pub fn family(mut self, family: FontRole) -> Self {
        self.family = family;
        self
    }

    /// Sets the alignment and returns the updated props.
    pub fn align(mut self, align: HorizontalAlignment) -> Self {
        self.align = align;
        self
    }
}

/// Representation of image sources supported by the layout plan.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
    /// Image loaded from raw bytes.
    Bytes(Vec<u8>),
    /// Image referenced by a file path.
    Path(String),
}

impl ImageSource {
    /// Creates a new in-memory image from raw bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Creates an image sourced from a file path.
    pub fn from_path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }
}

/// Placement of a rectangular element (image or QR code) inside its column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectProps {
    /// Offset from the left edge of the column in millimetres; ignored when centered.
    pub left: f64,
    /// Offset from the top edge of the column in millimetres; ignored when centered.
    pub top: f64,
    /// Center the element in both directions.
    pub center: bool,
    /// Size relative to the column, in percent.
    pub percent: f64,
}

impl RectProps {
    /// Centered placement at the given percentage of the column.
    pub fn centered(percent: f64) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            center: true,
            percent,
        }
    }

    /// Placement at an explicit offset.
    pub fn at(left: f64, top: f64, percent: f64) -> Self {
        Self {
            left,
            top,
            center: false,
            percent,
        }
    }
}

/// Width-to-height proportion of a barcode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Proportion {
    /// Relative width.
    pub width: f64,
    /// Relative height.
    pub height: f64,
}

impl Default for Proportion {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 0.2,
        }
    }
}

/// The content of a single grid column.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// Styled text, wrapped to the column width.
    Text(String, TextProps),
    /// An image loaded from `source`.
    Image(ImageSource, RectProps),
    /// A Code 128 barcode encoding the string.
    Barcode(String, RectProps, Proportion),
    /// A QR code encoding the string.
    QrCode(String, RectProps),
    /// A signature line with a label underneath.
    Signature(String, TextProps),
    /// Empty space.
    Empty,
}

impl Content {
    fn resolve_tokens(&self, page: usize, total: Option<usize>) -> Content {
        match self {
            Content::Text(text, props) => {
                Content::Text(resolve_page_tokens(text, page, total), props.clone())
            }
            other => other.clone(),
        }
    }
}

/// A column spanning `span` grid units.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// Number of grid units covered.
    pub span: usize,
    /// What is drawn in the column.
    pub content: Content,
}

impl Column {
    /// Creates a column with content.
    pub fn new(span: usize, content: Content) -> Self {
        Self { span, content }
    }

    /// Creates an empty spacer column.
    pub fn space(span: usize) -> Self {
        Self::new(span, Content::Empty)
    }
}

/// A fixed-height row on the 12-unit grid.
#[derive(Clone, Debug, PartialEq)]
pub struct GridRow {
    height: f64,
    background: Option<Rgb>,
    columns: Vec<Column>,
}

impl GridRow {
    /// Creates an empty row with the given height in millimetres.
    pub fn new(height: f64) -> Self {
        Self {
            height,
            background: None,
            columns: Vec::new(),
        }
    }

    /// Appends a column and returns the updated row.
    pub fn col(mut self, span: usize, content: Content) -> Self {
        self.columns.push(Column::new(span, content));
        self
    }

    /// Appends an empty spacer column and returns the updated row.
    pub fn col_space(mut self, span: usize) -> Self {
        self.columns.push(Column::space(span));
        self
    }

    /// Paints the row background and returns the updated row.
    pub fn with_background(mut self, color: Rgb) -> Self {
        self.background = Some(color);
        self
    }

    /// Returns the row height in millimetres.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Returns the background color, if any.
    pub fn background(&self) -> Option<Rgb> {
        self.background
    }

    /// Returns the columns of the row.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the grid weights of the row, padded with a trailing spacer up to 12 units.
    ///
    /// Fails when the spans exceed the grid.
    pub fn grid_weights(&self) -> Result<Vec<usize>, LayoutError> {
        let used: usize = self.columns.iter().map(|column| column.span).sum();
        if used > GRID_UNITS {
            return Err(LayoutError::GridOverflow { used });
        }

        let mut weights: Vec<usize> = self.columns.iter().map(|column| column.span).collect();
        if used < GRID_UNITS {
            weights.push(GRID_UNITS - used);
        }
        Ok(weights)
    }

    fn resolve_tokens(&self, page: usize, total: Option<usize>) -> GridRow {
        GridRow {
            height: self.height,
            background: self.background,
            columns: self
                .columns
                .iter()
                .map(|column| {
                    Column::new(column.span, column.content.resolve_tokens(page, total))
                })
                .collect(),
        }
    }
}

/// Text properties of one part of a table list.
#[derive(Clone, Debug, PartialEq)]
pub struct TableListContent {
    /// Font size in points.
    pub size: u8,
    /// Bold face.
    pub bold: bool,
}

impl TableListContent {
    /// Regular text of the given size.
    pub fn sized(size: u8) -> Self {
        Self { size, bold: false }
    }

    /// Marks the text as bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// A heading row followed by data rows, laid out with per-column grid weights.
#[derive(Clone, Debug, PartialEq)]
pub struct TableList {
    headings: Vec<String>,
    rows: Vec<Vec<String>>,
    grid_sizes: Vec<usize>,
    header: TableListContent,
    content: TableListContent,
    align: HorizontalAlignment,
    alternated_background: Option<Rgb>,
    header_content_space: f64,
}

impl TableList {
    /// Creates a table list, checking that every row has one field per heading.
    ///
    /// Columns share the grid evenly until [`with_grid_sizes`][Self::with_grid_sizes] is called.
    pub fn new(headings: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, LayoutError> {
        if headings.is_empty() {
            return Err(LayoutError::EmptyHeadings);
        }
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headings.len())
        {
            return Err(LayoutError::RowWidth {
                row: index,
                expected: headings.len(),
                found: row.len(),
            });
        }

        let grid_sizes = vec![1; headings.len()];
        Ok(Self {
            headings,
            rows,
            grid_sizes,
            header: TableListContent::sized(10).bold(),
            content: TableListContent::sized(10),
            align: HorizontalAlignment::Left,
            alternated_background: None,
            header_content_space: 4.0,
        })
    }

    /// Sets the column weights; there must be one non-zero weight per heading.
    pub fn with_grid_sizes(mut self, grid_sizes: Vec<usize>) -> Result<Self, LayoutError> {
        if grid_sizes.len() != self.headings.len() || grid_sizes.iter().any(|size| *size == 0) {
            return Err(LayoutError::GridSizes {
                expected: self.headings.len(),
                found: grid_sizes,
            });
        }
        self.grid_sizes = grid_sizes;
        Ok(self)
    }

    /// Sets the heading text properties.
    pub fn with_header(mut self, header: TableListContent) -> Self {
        self.header = header;
        self
    }

    /// Sets the data row text properties.
    pub fn with_content(mut self, content: TableListContent) -> Self {
        self.content = content;
        self
    }

    /// Sets the alignment of every cell.
    pub fn with_align(mut self, align: HorizontalAlignment) -> Self {
        self.align = align;
        self
    }

    /// Tints every other data row, starting with the first one.
    pub fn with_alternated_background(mut self, color: Rgb) -> Self {
        self.alternated_background = Some(color);
        self
    }

    /// Sets the gap between the heading and the first data row, in millimetres.
    pub fn with_header_content_space(mut self, space: f64) -> Self {
        self.header_content_space = space;
        self
    }

    /// Returns the headings.
    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    /// Returns the data rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns the column weights.
    pub fn grid_sizes(&self) -> &[usize] {
        &self.grid_sizes
    }

    /// Returns the heading text properties.
    pub fn header(&self) -> &TableListContent {
        &self.header
    }

    /// Returns the data row text properties.
    pub fn content(&self) -> &TableListContent {
        &self.content
    }

    /// Returns the cell alignment.
    pub fn align(&self) -> HorizontalAlignment {
        self.align
    }

    /// Returns the tint applied to alternating rows.
    pub fn alternated_background(&self) -> Option<Rgb> {
        self.alternated_background
    }

    /// Returns the heading/content gap in millimetres.
    pub fn header_content_space(&self) -> f64 {
        self.header_content_space
    }

    /// Returns the rendered row count: the heading row plus every data row.
    pub fn rendered_row_count(&self) -> usize {
        1 + self.rows.len()
    }

    /// Returns each column's share of the total width.
    pub fn column_ratios(&self) -> Vec<f64> {
        column_widths(1.0, &self.grid_sizes)
    }
}

/// Content that is replayed on every page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageTemplate {
    rows: Vec<GridRow>,
}

impl PageTemplate {
    /// Creates an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row and returns the updated template.
    pub fn with_row(mut self, row: GridRow) -> Self {
        self.rows.push(row);
        self
    }

    /// Returns the template rows.
    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    /// Returns whether the template has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the combined height of the template rows in millimetres.
    pub fn height(&self) -> f64 {
        self.rows.iter().map(GridRow::height).sum()
    }

    /// Returns the rows for `page` with the page tokens substituted.
    ///
    /// `{nb}` is left untouched while the total is still unknown.
    pub fn resolve(&self, page: usize, total: Option<usize>) -> Vec<GridRow> {
        self.rows
            .iter()
            .map(|row| row.resolve_tokens(page, total))
            .collect()
    }
}

/// A body element of the document.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// A fixed-height grid row.
    Row(GridRow),
    /// A table list that may span several pages.
    Table(TableList),
}

/// The complete, immutable description of a document.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutPlan {
    title: String,
    setup: PageSetup,
    header: PageTemplate,
    footer: PageTemplate,
    body: Vec<Block>,
}

impl LayoutPlan {
    /// Creates an empty plan with the given document title.
    pub fn new(title: impl Into<String>, setup: PageSetup) -> Self {
        Self {
            title: title.into(),
            setup,
            header: PageTemplate::new(),
            footer: PageTemplate::new(),
            body: Vec::new(),
        }
    }

    /// Sets the header template and returns the updated plan.
    pub fn with_header(mut self, header: PageTemplate) -> Self {
        self.header = header;
        self
    }

    /// Sets the footer template and returns the updated plan.
    pub fn with_footer(mut self, footer: PageTemplate) -> Self {
        self.footer = footer;
        self
    }

    /// Appends a body row and returns the updated plan.
    pub fn row(mut self, row: GridRow) -> Self {
        self.body.push(Block::Row(row));
        self
    }

    /// Appends a table list and returns the updated plan.
    pub fn table(mut self, table: TableList) -> Self {
        self.body.push(Block::Table(table));
        self
    }

    /// Returns the document title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the page setup.
    pub fn setup(&self) -> &PageSetup {
        &self.setup
    }

    /// Returns the header template.
    pub fn header(&self) -> &PageTemplate {
        &self.header
    }

    /// Returns the footer template.
    pub fn footer(&self) -> &PageTemplate {
        &self.footer
    }

    /// Returns the body blocks in emission order.
    pub fn body(&self) -> &[Block] {
        &self.body
    }

    /// Iterates over every grid row of the plan: header, footer and body rows.
    pub fn grid_rows(&self) -> impl Iterator<Item = &GridRow> {
        self.header
            .rows()
            .iter()
            .chain(self.footer.rows())
            .chain(self.body.iter().filter_map(|block| match block {
                Block::Row(row) => Some(row),
                Block::Table(_) => None,
            }))
    }

    /// Returns the first table list of the body, if any.
    pub fn first_table(&self) -> Option<&TableList> {
        self.body.iter().find_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Row(_) => None,
        })
    }
}

/// Structural problems in a layout plan.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutError {
    /// A table list without headings.
    EmptyHeadings,
    /// A table row whose field count differs from the heading count.
    RowWidth {
        /// Index of the offending data row.
        row: usize,
        /// Number of headings.
        expected: usize,
        /// Number of fields in the row.
        found: usize,
    },
    /// Grid sizes that do not match the headings.
    GridSizes {
        /// Number of headings.
        expected: usize,
        /// The rejected weights.
        found: Vec<usize>,
    },
    /// Column spans exceeding the 12-unit grid.
    GridOverflow {
        /// Units requested by the row.
        used: usize,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHeadings => write!(f, "table list has no headings"),
            Self::RowWidth {
                row,
                expected,
                found,
            } => write!(
                f,
                "table row {} has {} fields but there are {} headings",
                row, found, expected
            ),
            Self::GridSizes { expected, found } => write!(
                f,
                "expected {} non-zero grid sizes, got {:?}",
                expected, found
            ),
            Self::GridOverflow { used } => write!(
                f,
                "row columns span {} units but the grid has {}",
                used, GRID_UNITS
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Splits `total` proportionally to `weights`.
pub fn column_widths(total: f64, weights: &[usize]) -> Vec<f64> {
    let sum: usize = weights.iter().sum();
    if sum == 0 {
        return vec![0.0; weights.len()];
    }
    weights
        .iter()
        .map(|weight| total * (*weight as f64) / (sum as f64))
        .collect()
}

/// Substitutes `{page}` and, once known, `{nb}` in `text`.
pub fn resolve_page_tokens(text: &str, page: usize, total: Option<usize>) -> String {
    let text = text.replace(PAGE_TOKEN, &page.to_string());
    match total {
        Some(total) => text.replace(PAGE_COUNT_TOKEN, &total.to_string()),
        None => text,
    }
}
