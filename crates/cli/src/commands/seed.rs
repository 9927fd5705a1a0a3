//! Seed the product catalog from a YAML file.
//!
//! The file is a list of products. `title` and `price` are required;
//! `description`, `image` and `category` are optional and every other key is
//! stored as a display field. The whole file is parsed and validated before
//! the database is touched.

use std::path::Path;

use tracing::{error, info};

use bagrit_api::db::{self, PgProductStore};
use bagrit_api::models::NewProduct;

/// Parse a catalog file and check every entry.
///
/// # Errors
///
/// Returns the YAML error, or one line per invalid entry.
pub fn parse_catalog(content: &str) -> Result<Vec<NewProduct>, Box<dyn std::error::Error>> {
    let products: Vec<NewProduct> = serde_yaml::from_str(content)?;

    let errors: Vec<String> = products
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.validate().err().map(|e| format!("entry {i}: {e}")))
        .collect();

    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    Ok(products)
}

/// Insert the products listed in `file_path`.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML catalog
/// * `clear_existing` - If true, delete every existing product first
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or validated, or an insert fails.
pub async fn products(
    file_path: &str,
    clear_existing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url().map_err(|var| format!("{var} not set"))?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let products = parse_catalog(&content)?;
    info!(products = products.len(), "Parsed catalog");

    let pool = db::create_pool(&database_url).await?;
    let store = PgProductStore::new(pool);
    info!("Connected to database");

    if clear_existing {
        let removed = store.clear().await?;
        info!(removed, "Cleared existing products");
    }

    for product in products {
        let product = product.into_product();
        store.insert(&product).await?;
        info!(id = %product.id, title = %product.title, "Inserted product");
    }

    info!("Seeding complete!");
    Ok(())
}
