use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

use crate::error::{ProductError, ProductResult};

/// Root collection under which every owner's data lives
pub const OWNERS_COLLECTION: &str = "owners";
/// Per-owner product collection name
pub const PRODUCTS_COLLECTION: &str = "products";

/// The authenticated owner of a catalog.
///
/// Obtained once from the session and passed explicitly into every
/// lifecycle and catalog call. All store paths are derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    uid: String,
}

impl Owner {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// `owners/{uid}/products`
    pub fn products_path(&self) -> CollectionPath {
        CollectionPath::new(format!(
            "{}/{}/{}",
            OWNERS_COLLECTION, self.uid, PRODUCTS_COLLECTION
        ))
    }

    /// `owners/{uid}/products/{id}`
    pub fn product_path(&self, id: &str) -> DocumentPath {
        DocumentPath::new(self.products_path(), id)
    }

    /// `{uid}/{timestamp_ms}`, the location of a freshly uploaded image
    pub fn image_path(&self, timestamp_ms: i64) -> BlobPath {
        BlobPath::new(format!("{}/{}", self.uid, timestamp_ms))
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uid)
    }
}

/// Slash-separated path of a document collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into().trim_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment, e.g. `products`
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Everything before the last segment, e.g. `owners/u1`; empty for a root collection
    pub fn parent(&self) -> &str {
        self.0.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified document path: collection plus identifier segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl DocumentPath {
    pub fn new(collection: CollectionPath, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Internal location of a blob, as opposed to the public URL handed out for it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobPath(String);

impl BlobPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sortable product fields, named as they are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum ProductField {
    Name,
    Price,
    SoldUnits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordering applied by a collection query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: ProductField,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn ascending(field: ProductField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn descending(field: ProductField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    /// The catalog listing order: best sellers first
    pub fn best_sellers() -> Self {
        Self::descending(ProductField::SoldUnits)
    }
}

/// A persisted product.
///
/// `image` always holds a public URL issued by the blob store, never a data-URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub sold_units: f64,
    pub image: String,
}

impl Product {
    pub fn from_payload(id: impl Into<String>, payload: ProductPayload) -> Self {
        Self {
            id: id.into(),
            name: payload.name,
            price: payload.price,
            sold_units: payload.sold_units,
            image: payload.image,
        }
    }

    /// Revenue attributed to this product: `price × soldUnits`
    pub fn profit(&self) -> f64 {
        self.price * self.sold_units
    }

    pub fn to_payload(&self) -> ProductPayload {
        ProductPayload {
            name: self.name.clone(),
            price: self.price,
            sold_units: self.sold_units,
            image: self.image.clone(),
        }
    }
}

/// Document body written on create and update.
///
/// Carries no identifier: the store assigns it on insert and it lives in the
/// path on replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub name: String,
    pub price: f64,
    pub sold_units: f64,
    pub image: String,
}

/// A validated candidate product whose image may still be a data-URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_finite_numbers"))]
pub struct ProductDraft {
    #[validate(length(min = 4, message = "name must be at least 4 characters"))]
    pub name: String,
    #[validate(range(min = 0.0, message = "price must not be negative"))]
    pub price: f64,
    #[validate(range(min = 0.0, message = "sold units must not be negative"))]
    pub sold_units: f64,
    #[validate(length(min = 1, message = "an image is required"))]
    pub image: String,
}

/// Range rules let NaN through, so price and sold units are also required to be finite
fn validate_finite_numbers(draft: &ProductDraft) -> Result<(), ValidationError> {
    if draft.price.is_finite() && draft.sold_units.is_finite() {
        return Ok(());
    }
    let mut error = ValidationError::new("finite");
    error.message = Some("price and sold units must be finite numbers".into());
    Err(error)
}

impl ProductDraft {
    /// Whether the image still has to be uploaded
    pub fn has_pending_image(&self) -> bool {
        DataUrl::is_data_url(&self.image)
    }

    /// Build the write payload with the image replaced by its resolved URL
    pub fn into_payload(self, image_url: String) -> ProductPayload {
        ProductPayload {
            name: self.name,
            price: self.price,
            sold_units: self.sold_units,
            image: image_url,
        }
    }
}

/// A decoded `data:` URL holding an image waiting to be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub content_type: String,
    pub bytes: Bytes,
}

impl DataUrl {
    const SCHEME: &'static str = "data:";

    pub fn is_data_url(value: &str) -> bool {
        value
            .get(..Self::SCHEME.len())
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case(Self::SCHEME))
    }

    /// Decode `data:[<mime>][;base64],<payload>`.
    ///
    /// Anything that cannot be decoded is an [`ProductError::UploadFailed`]:
    /// the blob write cannot proceed.
    pub fn parse(value: &str) -> ProductResult<Self> {
        if !Self::is_data_url(value) {
            return Err(ProductError::UploadFailed(
                "image is not a data URL".to_string(),
            ));
        }
        let rest = &value[Self::SCHEME.len()..];
        let (meta, data) = rest.split_once(',').ok_or_else(|| {
            ProductError::UploadFailed("data URL has no payload separator".to_string())
        })?;

        let (media, is_base64) = match meta.strip_suffix(";base64") {
            Some(media) => (media, true),
            None => (meta, false),
        };
        let content_type = media
            .split(';')
            .next()
            .filter(|mime| !mime.is_empty())
            .unwrap_or("text/plain")
            .to_ascii_lowercase();

        let bytes = if is_base64 {
            let compact: String = data.split_whitespace().collect();
            STANDARD.decode(compact).map_err(|e| {
                ProductError::UploadFailed(format!("data URL is not valid base64: {}", e))
            })?
        } else {
            urlencoding::decode_binary(data.as_bytes()).into_owned()
        };

        if bytes.is_empty() {
            return Err(ProductError::UploadFailed(
                "data URL carries an empty payload".to_string(),
            ));
        }

        Ok(Self {
            content_type,
            bytes: Bytes::from(bytes),
        })
    }
}
