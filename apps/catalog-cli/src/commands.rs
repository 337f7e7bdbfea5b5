//! Subcommand implementations, generic over the store backends

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use domain_products::{
    BlobStore, CatalogController, DocumentStore, EditOutcome, EditorEvent, Owner, Product,
    ProductForm, ReportDocument, SessionNotice,
};
use eyre::{eyre, Result, WrapErr};
use tokio::sync::mpsc;
use tracing::info;

/// Field values given on the command line; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub name: Option<String>,
    pub price: Option<String>,
    pub sold_units: Option<String>,
    pub image: Option<PathBuf>,
}

impl ProductInput {
    async fn into_events(self) -> Result<Vec<EditorEvent>> {
        let mut events = Vec::new();
        if let Some(name) = self.name {
            events.push(EditorEvent::Name(name));
        }
        if let Some(price) = self.price {
            events.push(EditorEvent::Price(price));
        }
        if let Some(sold_units) = self.sold_units {
            events.push(EditorEvent::SoldUnits(sold_units));
        }
        if let Some(image) = self.image {
            events.push(EditorEvent::Image(image_data_url(&image).await?));
        }
        events.push(EditorEvent::Submit);
        Ok(events)
    }
}

/// Which document `report` should write
#[derive(Debug, Clone)]
pub enum ReportTarget {
    Catalog,
    Product(String),
}

pub fn format_product(product: &Product) -> String {
    format!(
        "{}  {:<24} price={:<10} sold={:<8} profit={:.2}",
        product.id,
        product.name,
        product.price,
        product.sold_units,
        product.profit()
    )
}

pub async fn list<D, B>(catalog: &mut CatalogController<D, B>, owner: &Owner) -> Result<()>
where
    D: DocumentStore,
    B: BlobStore,
{
    catalog.refresh(owner).await?;
    if catalog.is_empty() {
        println!("No products yet");
    }
    for product in catalog.products() {
        println!("{}", format_product(product));
    }
    Ok(())
}

/// Create a product, or update the listed product `id`, through an edit session
pub async fn save<D, B>(
    catalog: &mut CatalogController<D, B>,
    owner: &Owner,
    id: Option<&str>,
    input: ProductInput,
) -> Result<Product>
where
    D: DocumentStore,
    B: BlobStore,
{
    if id.is_some() {
        catalog.refresh(owner).await?;
    }

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();
    let mut session = catalog.edit_session(owner, id)?.with_notices(notice_tx);

    let events = input.into_events().await?;
    let (tx, rx) = mpsc::channel(events.len());
    for event in events {
        tx.send(event).await.wrap_err("editor channel closed")?;
    }
    drop(tx);

    let outcome = session.run(rx).await;

    let product = match &outcome {
        EditOutcome::Committed(product) => product.clone(),
        EditOutcome::Cancelled => {
            let mut problems = Vec::new();
            while let Ok(notice) = notice_rx.try_recv() {
                match notice {
                    SessionNotice::Rejected(rules) => problems.extend(rules),
                    SessionNotice::Failed(e) if e.is_transient() => {
                        problems.push(format!("{e} (temporary, try again)"))
                    }
                    SessionNotice::Failed(e) => problems.push(e.to_string()),
                }
            }
            return Err(eyre!("product not saved: {}", problems.join("; ")));
        }
    };

    catalog.apply_outcome(owner, &outcome).await?;
    info!(product_id = %product.id, "Product saved");
    Ok(product)
}

pub async fn delete<D, B>(catalog: &mut CatalogController<D, B>, owner: &Owner, id: &str) -> Result<()>
where
    D: DocumentStore,
    B: BlobStore,
{
    catalog.refresh(owner).await?;
    let report = catalog.delete(owner, id).await?;
    if let Some(warning) = report.blob_warning {
        eprintln!("warning: product deleted but its image was not: {warning}");
    }
    println!("Deleted {id}");
    Ok(())
}

pub async fn profit<D, B>(catalog: &mut CatalogController<D, B>, owner: &Owner) -> Result<f64>
where
    D: DocumentStore,
    B: BlobStore,
{
    catalog.refresh(owner).await?;
    Ok(catalog.aggregate_profit())
}

/// Render a report and write it as PDF into `out_dir`; returns the written path
pub async fn report<D, B>(
    catalog: &mut CatalogController<D, B>,
    owner: &Owner,
    target: ReportTarget,
    out_dir: &Path,
) -> Result<PathBuf>
where
    D: DocumentStore,
    B: BlobStore,
{
    catalog.refresh(owner).await?;
    let document = match target {
        ReportTarget::Catalog => catalog.export_report(),
        ReportTarget::Product(id) => {
            let product = catalog
                .find(&id)
                .ok_or_else(|| eyre!("product {id} not found"))?;
            ProductForm::from_product(product).export_report()
        }
    };
    write_report(&document, out_dir).await
}

async fn write_report(document: &ReportDocument, out_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .wrap_err_with(|| format!("cannot create {}", out_dir.display()))?;

    let path = out_dir.join(&document.filename);
    tokio::fs::write(&path, document.to_pdf_bytes())
        .await
        .wrap_err_with(|| format!("cannot write {}", path.display()))?;

    info!(path = %path.display(), pages = document.page_count(), "Report written");
    Ok(path)
}

/// Read an image file into a base64 data-URL, typed by its extension
pub async fn image_data_url(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("cannot read image {}", path.display()))?;
    Ok(format!(
        "data:{};base64,{}",
        content_type_for(path),
        STANDARD.encode(bytes)
    ))
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_products::{InMemoryDocumentStore, ObjectStoreBlobStore, ProductLifecycle};

    type Catalog = CatalogController<InMemoryDocumentStore, ObjectStoreBlobStore>;

    fn catalog() -> Catalog {
        CatalogController::new(ProductLifecycle::new(
            InMemoryDocumentStore::new(),
            ObjectStoreBlobStore::memory("http://localhost:9199/v0/b/catalog"),
        ))
    }

    fn image_file(dir: &Path) -> PathBuf {
        let path = dir.join("widget.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();
        path
    }

    fn widget_input(image: PathBuf) -> ProductInput {
        ProductInput {
            name: Some("Widget".into()),
            price: Some("9.99".into()),
            sold_units: Some("3".into()),
            image: Some(image),
        }
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_image_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let url = image_data_url(&image_file(dir.path())).await.unwrap();
        assert_eq!(url, "data:image/png;base64,iVBORw==");
    }

    #[tokio::test]
    async fn test_save_creates_then_updates() {
        let dir = tempfile::tempdir().unwrap();
        let owner = Owner::new("u1");
        let mut catalog = catalog();

        let created = save(&mut catalog, &owner, None, widget_input(image_file(dir.path())))
            .await
            .unwrap();
        assert_eq!(catalog.len(), 1);

        let update = ProductInput {
            sold_units: Some("10".into()),
            ..Default::default()
        };
        let updated = save(&mut catalog, &owner, Some(&created.id), update)
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.image, created.image);
        let total = profit(&mut catalog, &owner).await.unwrap();
        assert!((total - 99.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_save_reports_validation_problems() {
        let owner = Owner::new("u1");
        let mut catalog = catalog();
        let input = ProductInput {
            name: Some("abc".into()),
            ..Default::default()
        };

        let err = save(&mut catalog, &owner, None, input).await.unwrap_err();

        assert!(err.to_string().contains("name must be at least 4 characters"));
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let owner = Owner::new("u1");
        let mut catalog = catalog();
        let created = save(&mut catalog, &owner, None, widget_input(image_file(dir.path())))
            .await
            .unwrap();

        let single = report(
            &mut catalog,
            &owner,
            ReportTarget::Product(created.id.clone()),
            dir.path(),
        )
        .await
        .unwrap();
        assert!(single.ends_with("producto.pdf"));

        delete(&mut catalog, &owner, &created.id).await.unwrap();
        let written = report(&mut catalog, &owner, ReportTarget::Catalog, dir.path())
            .await
            .unwrap();

        assert!(written.ends_with("productos.pdf"));
        assert!(std::fs::read(&written).unwrap().starts_with(b"%PDF-"));
        assert!(catalog.is_empty());
    }
}
