//! Turns a [`LayoutPlan`] into PDF bytes with `genpdf`.
//!
//! Header and footer templates are replayed by a page decorator on every page.  When a template
//! uses the `{nb}` token the document is rendered twice: the first pass only counts pages, the
//! second one prints the known total.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use genpdf::error::{Error, ErrorKind};
use genpdf::style;
use genpdf::{Element, Margins, PageDecorator, Position, Size};
use log::{debug, info};

use crate::elements::{
    mm_from_f64, mm_to_f64, AssetCache, FontSet, GridRowElement, TableListElement,
};
use crate::error::InvoiceError;
use crate::fonts::{self, FontConfig};
use crate::model::{Block, Content, LayoutPlan, PageMargins, PageTemplate, PAGE_COUNT_TOKEN};

/// A rendered document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedPdf {
    /// The serialized PDF.
    pub bytes: Vec<u8>,
    /// Number of pages in the document.
    pub page_count: usize,
}

/// Renders layout plans with a fixed font configuration.
#[derive(Clone, Debug, Default)]
pub struct DocumentBuilder {
    fonts: FontConfig,
}

impl DocumentBuilder {
    /// Creates a builder using the default font search order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the font configuration.
    pub fn with_fonts(mut self, fonts: FontConfig) -> Self {
        self.fonts = fonts;
        self
    }

    /// Renders `plan` into memory.
    pub fn render(&self, plan: &LayoutPlan) -> Result<RenderedPdf, InvoiceError> {
        for row in plan.grid_rows() {
            row.grid_weights()?;
        }

        let mut assets = AssetCache::new();
        assets.preload(plan.grid_rows());

        let first = self.render_pass(plan, &assets, None)?;
        if !uses_page_count(plan) {
            return Ok(first);
        }

        debug!(
            "First pass produced {} page(s); rendering again with the page count",
            first.page_count
        );
        self.render_pass(plan, &assets, Some(first.page_count))
    }

    /// Renders `plan` and writes it to `path`.
    ///
    /// Nothing is written unless rendering succeeds.
    pub fn assemble(
        &self,
        plan: &LayoutPlan,
        path: impl AsRef<Path>,
    ) -> Result<RenderedPdf, InvoiceError> {
        let path = path.as_ref();
        let pdf = self.render(plan)?;
        fs::write(path, &pdf.bytes).map_err(|source| InvoiceError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Wrote {} ({} bytes, {} page(s))",
            path.display(),
            pdf.bytes.len(),
            pdf.page_count
        );
        Ok(pdf)
    }

    fn render_pass(
        &self,
        plan: &LayoutPlan,
        assets: &AssetCache,
        total: Option<usize>,
    ) -> Result<RenderedPdf, InvoiceError> {
        let family = self.fonts.sans_family().map_err(InvoiceError::Fonts)?;
        let mut document = genpdf::Document::new(family);
        document.set_title(plan.title());

        let (width, height) = plan.setup().paper_size_mm();
        document.set_paper_size(Size::new(mm_from_f64(width), mm_from_f64(height)));

        let font_set = FontSet::new(fonts::install_mono_family(&mut document, &self.fonts));
        let mut body_assets = assets.clone();

        let pages = Rc::new(Cell::new(0));
        document.set_page_decorator(TemplatePageDecorator {
            page: 0,
            total,
            pages: Rc::clone(&pages),
            margins: to_margins(plan.setup().margins),
            header: plan.header().clone(),
            footer: plan.footer().clone(),
            assets: assets.clone(),
            fonts: font_set.clone(),
        });

        for block in plan.body() {
            match block {
                Block::Row(row) => {
                    let element = GridRowElement::new(row, &mut body_assets, font_set.clone())
                        .map_err(InvoiceError::Render)?;
                    document.push(element);
                }
                Block::Table(table) => {
                    document.push(TableListElement::new(table.clone(), font_set.clone()));
                }
            }
        }

        let mut bytes = Vec::new();
        document.render(&mut bytes).map_err(InvoiceError::Render)?;

        Ok(RenderedPdf {
            bytes,
            page_count: pages.get(),
        })
    }
}

/// Renders `plan` with the default font search order and writes it to `path`.
pub fn assemble(plan: &LayoutPlan, path: impl AsRef<Path>) -> Result<RenderedPdf, InvoiceError> {
    DocumentBuilder::new().assemble(plan, path)
}

fn to_margins(margins: PageMargins) -> Margins {
    Margins::trbl(
        mm_from_f64(margins.top),
        mm_from_f64(margins.right),
        mm_from_f64(margins.bottom),
        mm_from_f64(margins.left),
    )
}

fn uses_page_count(plan: &LayoutPlan) -> bool {
    plan.header()
        .rows()
        .iter()
        .chain(plan.footer().rows())
        .flat_map(|row| row.columns())
        .any(|column| match &column.content {
            Content::Text(text, _) => text.contains(PAGE_COUNT_TOKEN),
            _ => false,
        })
}

struct TemplatePageDecorator {
    page: usize,
    total: Option<usize>,
    pages: Rc<Cell<usize>>,
    margins: Margins,
    header: PageTemplate,
    footer: PageTemplate,
    assets: AssetCache,
    fonts: FontSet,
}

impl TemplatePageDecorator {
    fn render_template<'a>(
        &mut self,
        template: &PageTemplate,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: style::Style,
    ) -> Result<(), Error> {
        for row in template.resolve(self.page, self.total) {
            let mut element = GridRowElement::new(&row, &mut self.assets, self.fonts.clone())?;
            let result = element.render(context, area.clone(), style)?;
            if result.has_more {
                return Err(Error::new(
                    "Page template row does not fit into the page",
                    ErrorKind::PageSizeExceeded,
                ));
            }
            area.add_offset(Position::new(0, result.size.height));
        }
        Ok(())
    }
}

impl PageDecorator for TemplatePageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        self.pages.set(self.page);
        area.add_margins(self.margins);

        let header = self.header.clone();
        let footer = self.footer.clone();

        if !header.is_empty() {
            self.render_template(&header, context, area.clone(), style)?;
            area.add_offset(Position::new(0, mm_from_f64(header.height())));
        }

        if !footer.is_empty() {
            let available = mm_to_f64(area.size().height);
            let height = footer.height();
            if height > available {
                return Err(Error::new(
                    "Footer height exceeds available space",
                    ErrorKind::InvalidData,
                ));
            }

            let mut footer_area = area.clone();
            footer_area.add_offset(Position::new(0, mm_from_f64(available - height)));
            footer_area.set_height(mm_from_f64(height));
            self.render_template(&footer, context, footer_area, style)?;

            area.set_height(mm_from_f64(available - height));
        }

        Ok(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GridRow, PageSetup, TextProps};

    fn plan_with_footer(text: &str) -> LayoutPlan {
        LayoutPlan::new("Test", PageSetup::default()).with_footer(
            PageTemplate::new().with_row(
                GridRow::new(20.0).col(12, Content::Text(text.into(), TextProps::default())),
            ),
        )
    }

    #[test]
    fn page_count_pass_only_when_total_is_printed() {
        assert!(uses_page_count(&plan_with_footer("Page {page} of {nb}")));
        assert!(!uses_page_count(&plan_with_footer("Page {page}")));
    }

    #[test]
    fn invalid_grids_are_rejected_before_fonts_load() {
        let plan = LayoutPlan::new("Test", PageSetup::default())
            .row(GridRow::new(10.0).col_space(10).col_space(4));
        let fonts = FontConfig::new().with_directory("/__fruit_invoice_missing_fonts__");
        let err = DocumentBuilder::new()
            .with_fonts(fonts)
            .render(&plan)
            .unwrap_err();
        assert!(matches!(err, InvoiceError::Layout(_)));
    }

    #[test]
    fn margins_map_to_top_right_bottom_left() {
        let margins = to_margins(PageMargins::new(20.0, 10.0, 15.0).with_bottom(5.0));
        let expected = Margins::trbl(
            mm_from_f64(10.0),
            mm_from_f64(15.0),
            mm_from_f64(5.0),
            mm_from_f64(20.0),
        );
        assert_eq!(margins, expected);
    }
}
