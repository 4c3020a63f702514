mod line_items;
mod loader;

pub use line_items::{LineItemCsv, LineItemCsvError, LineItemRecord};
pub use loader::{ArticleCatalogLoader, ArticleLoaderError, ArticleRecord};
