//! Catalog CLI
//!
//! Manage one owner's product catalog from the command line. Products live in
//! MongoDB, their images in an object store (local directory, memory or S3).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::FromEnv;
use domain_products::models::PRODUCTS_COLLECTION;
use domain_products::{
    CatalogController, MongoDocumentStore, ObjectStoreBlobStore, Owner, ProductLifecycle,
};
use eyre::Result;
use tracing::info;

mod commands;
mod config;

use commands::{ProductInput, ReportTarget};
use config::Config;

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Manage a product catalog and export its reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products, best sellers first
    List,

    /// Create a product
    Create {
        #[command(flatten)]
        fields: ProductFields,
    },

    /// Update an existing product; omitted fields keep their value
    Update {
        /// Product identifier
        id: String,

        #[command(flatten)]
        fields: ProductFields,
    },

    /// Delete a product and its image
    Delete {
        /// Product identifier
        id: String,
    },

    /// Print the total profit (price × sold units) of the catalog
    Profit,

    /// Write a PDF report of the catalog, or of a single product
    Report {
        /// Directory the PDF is written to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Report a single product instead of the whole catalog
        #[arg(short, long)]
        product: Option<String>,
    },
}

#[derive(Args)]
struct ProductFields {
    /// Product name (at least 4 characters)
    #[arg(short, long)]
    name: Option<String>,

    /// Unit price
    #[arg(short, long)]
    price: Option<String>,

    /// Units sold so far
    #[arg(short, long)]
    sold_units: Option<String>,

    /// Image file to upload
    #[arg(short, long)]
    image: Option<PathBuf>,
}

impl From<ProductFields> for ProductInput {
    fn from(fields: ProductFields) -> Self {
        Self {
            name: fields.name,
            price: fields.price,
            sold_units: fields.sold_units,
            image: fields.image,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to stores...");
    let documents = MongoDocumentStore::connect(&config.mongodb).await?;
    documents.init_indexes(PRODUCTS_COLLECTION).await?;
    let blobs =
        ObjectStoreBlobStore::from_url(&config.blob.store_url, config.blob.public_base_url.clone())?;

    let owner = Owner::new(config.owner_uid.clone());
    let mut catalog = CatalogController::new(ProductLifecycle::new(documents, blobs));

    match cli.command {
        Commands::List => commands::list(&mut catalog, &owner).await?,

        Commands::Create { fields } => {
            let product = commands::save(&mut catalog, &owner, None, fields.into()).await?;
            println!("Created {}", commands::format_product(&product));
        }

        Commands::Update { id, fields } => {
            let product = commands::save(&mut catalog, &owner, Some(&id), fields.into()).await?;
            println!("Updated {}", commands::format_product(&product));
        }

        Commands::Delete { id } => commands::delete(&mut catalog, &owner, &id).await?,

        Commands::Profit => {
            let total = commands::profit(&mut catalog, &owner).await?;
            println!("{total:.2}");
        }

        Commands::Report { out, product } => {
            let target = product.map_or(ReportTarget::Catalog, ReportTarget::Product);
            let path = commands::report(&mut catalog, &owner, target, &out).await?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
