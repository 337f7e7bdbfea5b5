//! Mutable, possibly invalid product input collected by an editor

use validator::Validate;

use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductDraft};
use crate::report::{self, ReportDocument};

/// Form state for a single product being authored.
///
/// Every field may be missing or out of range while the user is typing.
/// [`ProductForm::to_draft`] is the gate: it yields a [`ProductDraft`] only
/// when all rules pass.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct ProductForm {
    #[validate(length(min = 4, message = "name must be at least 4 characters"))]
    name: String,
    #[validate(
        required(message = "price is required"),
        range(min = 0.0, message = "price must not be negative")
    )]
    price: Option<f64>,
    #[validate(
        required(message = "sold units are required"),
        range(min = 0.0, message = "sold units must not be negative")
    )]
    sold_units: Option<f64>,
    #[validate(
        required(message = "an image is required"),
        length(min = 1, message = "an image is required")
    )]
    image: Option<String>,
}

impl ProductForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill from a persisted product for editing
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: Some(product.price),
            sold_units: Some(product.sold_units),
            image: Some(product.image.clone()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    pub fn sold_units(&self) -> Option<f64> {
        self.sold_units
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_price(&mut self, price: f64) {
        self.price = Some(price).filter(|value| value.is_finite());
    }

    pub fn set_sold_units(&mut self, sold_units: f64) {
        self.sold_units = Some(sold_units).filter(|value| value.is_finite());
    }

    /// Set the price from raw text input; unparsable text clears the field
    pub fn set_price_input(&mut self, input: &str) {
        self.price = parse_numeric_input(input);
    }

    /// Set sold units from raw text input; unparsable text clears the field
    pub fn set_sold_units_input(&mut self, input: &str) {
        self.sold_units = parse_numeric_input(input);
    }

    /// Replace the image, typically with a freshly captured data-URL
    pub fn set_image(&mut self, image: impl Into<String>) {
        self.image = Some(image.into());
    }

    /// Nothing entered yet
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Messages for every rule the form currently breaks, ordered by field
    pub fn errors(&self) -> Vec<String> {
        let Err(errors) = self.validate() else {
            return Vec::new();
        };

        let mut by_field: Vec<_> = errors.field_errors().into_iter().collect();
        by_field.sort_by(|(a, _), (b, _)| a.cmp(b));
        by_field
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| match &failure.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect()
    }

    /// Validate and convert into a draft ready for the lifecycle manager
    pub fn to_draft(&self) -> ProductResult<ProductDraft> {
        self.validate()?;

        let missing = |field: &str| ProductError::Validation(format!("{} is required", field));
        Ok(ProductDraft {
            name: self.name.clone(),
            price: self.price.ok_or_else(|| missing("price"))?,
            sold_units: self.sold_units.ok_or_else(|| missing("sold units"))?,
            image: self.image.clone().ok_or_else(|| missing("image"))?,
        })
    }

    /// One-page report of the values currently in the form
    pub fn export_report(&self) -> ReportDocument {
        report::draft_report(self)
    }
}

/// Parse user-typed numbers: surrounding whitespace is ignored, and empty or
/// non-finite input counts as missing
fn parse_numeric_input(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
