//! The fruit invoice layout plan.
//!
//! [`invoice_plan`] describes the whole document: a logo header repeated on every page, the
//! invoice heading with a barcode, the "Grocery List" band, the fruit table, the totals row, a
//! QR code next to the signature line, and a footer with the invoice date and page numbers.

use chrono::{Local, NaiveDate};

use crate::generator::{self, Price, SampleItem};
use crate::model::{
    Content, FontRole, GridRow, HorizontalAlignment, ImageSource, LayoutError, LayoutPlan,
    Orientation, PageMargins, PageSetup, PageTemplate, Proportion, RectProps, Rgb, TableList,
    TableListContent, TextProps,
};

/// Default location of the rendered invoice.
pub const DEFAULT_OUTPUT_PATH: &str = "pdfs/div_rhino_fruit.pdf";

/// Default location of the header logo.
pub const DEFAULT_LOGO_PATH: &str = "images/logo_div_rhino.jpg";

/// Invoice title printed under the logo.
pub const INVOICE_TITLE: &str = "Invoice ABC123456789";

/// URL encoded in the barcode and the QR code.
pub const SITE_URL: &str = "https://divrhino.com";

/// Amount shown when the total is not computed.
pub const PLACEHOLDER_TOTAL: &str = "$ XXXX.00";

/// Alternating table row tint.
pub const PURPLE: Rgb = Rgb::new(210, 200, 230);

/// Background of the "Grocery List" band.
pub const TEAL: Rgb = Rgb::new(3, 166, 166);

/// Footer text color.
pub const GREY: Rgb = Rgb::new(206, 206, 206);

/// Column weights of the fruit table.
pub const TABLE_GRID_SIZES: [usize; 3] = [3, 7, 2];

/// Where the table rows come from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LineItems {
    /// The two literal rows: apples and oranges.
    #[default]
    Static,
    /// Generated fake records.
    Generated(Vec<SampleItem>),
}

impl LineItems {
    /// Returns the table rows.
    pub fn rows(&self) -> Vec<Vec<String>> {
        match self {
            LineItems::Static => static_rows(),
            LineItems::Generated(items) => generator::rows(items),
        }
    }
}

/// How the totals row is filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TotalPolicy {
    /// Sum the price column.
    #[default]
    Computed,
    /// Print [`PLACEHOLDER_TOTAL`].
    Placeholder,
}

/// Inputs of the invoice plan.
#[derive(Clone, Debug, PartialEq)]
pub struct InvoiceOptions {
    logo: ImageSource,
    date: NaiveDate,
    items: LineItems,
    total: TotalPolicy,
}

impl Default for InvoiceOptions {
    fn default() -> Self {
        Self {
            logo: ImageSource::from_path(DEFAULT_LOGO_PATH),
            date: Local::now().date_naive(),
            items: LineItems::Static,
            total: TotalPolicy::Computed,
        }
    }
}

impl InvoiceOptions {
    /// Options for today's invoice with the static rows and the default logo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the logo and returns the updated options.
    pub fn with_logo(mut self, logo: ImageSource) -> Self {
        self.logo = logo;
        self
    }

    /// Sets the invoice date printed in the footer.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Sets the table rows.
    pub fn with_items(mut self, items: LineItems) -> Self {
        self.items = items;
        self
    }

    /// Sets the totals policy.
    pub fn with_total(mut self, total: TotalPolicy) -> Self {
        self.total = total;
        self
    }
}

/// Builds the complete invoice plan.
pub fn invoice_plan(options: &InvoiceOptions) -> Result<LayoutPlan, LayoutError> {
    let setup =
        PageSetup::a4(Orientation::Portrait).with_margins(PageMargins::new(20.0, 10.0, 20.0));
    let rows = options.items.rows();
    let total = match options.total {
        TotalPolicy::Computed => computed_total(&rows),
        TotalPolicy::Placeholder => PLACEHOLDER_TOTAL.to_string(),
    };

    let mut plan = LayoutPlan::new(INVOICE_TITLE, setup)
        .with_header(header_template(options.logo.clone()))
        .with_footer(footer_template(options.date));
    for row in heading_rows() {
        plan = plan.row(row);
    }
    Ok(plan
        .row(title_band())
        .table(fruit_table(rows)?)
        .row(totals_row(&total))
        .row(signature_row()))
}

/// Table headings.
pub fn headings() -> Vec<String> {
    vec!["Fruit".into(), "Description".into(), "Price".into()]
}

/// The literal table rows.
pub fn static_rows() -> Vec<Vec<String>> {
    vec![
        vec!["Apple".into(), "Red and juicy".into(), "2.00".into()],
        vec!["Orange".into(), "Orange and juicy".into(), "3.00".into()],
    ]
}

/// Sums the price column.
///
/// Falls back to the placeholder when a price does not parse or the sum overflows.
pub fn computed_total(rows: &[Vec<String>]) -> String {
    let total = rows
        .iter()
        .map(|row| row.last().and_then(|price| Price::parse(price)))
        .try_fold(Price::default(), |total, price| total.checked_add(price?));
    match total {
        Some(total) => format!("$ {}", total),
        None => PLACEHOLDER_TOTAL.to_string(),
    }
}

fn header_template(logo: ImageSource) -> PageTemplate {
    PageTemplate::new().with_row(GridRow::new(50.0).col(
        12,
        Content::Image(logo, RectProps::centered(75.0)),
    ))
}

fn footer_template(date: NaiveDate) -> PageTemplate {
    let props = TextProps::default().top(10.0).size(8).color(GREY);
    PageTemplate::new().with_row(
        GridRow::new(20.0)
            .col(
                6,
                Content::Text(
                    date.format("%d/%m/%Y").to_string(),
                    props.clone().align(HorizontalAlignment::Left),
                ),
            )
            .col(
                6,
                Content::Text(
                    "Page {page} of {nb}".into(),
                    props.italic().align(HorizontalAlignment::Right),
                ),
            ),
    )
}

fn heading_rows() -> Vec<GridRow> {
    vec![
        GridRow::new(10.0).col(
            12,
            Content::Text(
                INVOICE_TITLE.into(),
                TextProps::default()
                    .top(3.0)
                    .bold()
                    .align(HorizontalAlignment::Center),
            ),
        ),
        GridRow::new(10.0).col(
            12,
            Content::Barcode(
                SITE_URL.into(),
                RectProps::centered(75.0),
                Proportion {
                    width: 50.0,
                    height: 10.0,
                },
            ),
        ),
    ]
}

fn title_band() -> GridRow {
    GridRow::new(10.0).with_background(TEAL).col(
        12,
        Content::Text(
            "Grocery List".into(),
            TextProps::default()
                .top(2.0)
                .size(13)
                .color(Rgb::white())
                .family(FontRole::Mono)
                .bold()
                .align(HorizontalAlignment::Center),
        ),
    )
}

fn fruit_table(rows: Vec<Vec<String>>) -> Result<TableList, LayoutError> {
    Ok(TableList::new(headings(), rows)?
        .with_grid_sizes(TABLE_GRID_SIZES.to_vec())?
        .with_header(TableListContent::sized(9).bold())
        .with_content(TableListContent::sized(8))
        .with_align(HorizontalAlignment::Left)
        .with_alternated_background(PURPLE)
        .with_header_content_space(1.0))
}

fn totals_row(total: &str) -> GridRow {
    let props = TextProps::default().top(5.0).bold().size(8);
    GridRow::new(20.0)
        .col_space(7)
        .col(
            2,
            Content::Text(
                "Total:".into(),
                props.clone().align(HorizontalAlignment::Right),
            ),
        )
        .col(
            3,
            Content::Text(total.into(), props.align(HorizontalAlignment::Center)),
        )
}

fn signature_row() -> GridRow {
    GridRow::new(15.0)
        .col(
            5,
            Content::QrCode(SITE_URL.into(), RectProps::at(0.0, 5.0, 100.0)),
        )
        .col_space(2)
        .col(
            5,
            Content::Signature(
                "Signed by".into(),
                TextProps::default().size(8).italic().family(FontRole::Mono),
            ),
        )
}
