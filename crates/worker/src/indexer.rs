use tracing::info;

use concierge_core::config::IndexerConfig;
use concierge_core::domain::restaurant::SearchIndexEntry;
use concierge_db::repositories::{RepositoryError, RestaurantRepository, SearchIndexRepository};

/// How many index entries one builder pass wrote for one cuisine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CuisineIndexReport {
    pub cuisine: String,
    pub indexed: u32,
}

/// Derives the per-cuisine search index from the restaurant store.
///
/// Inserts are appends; rerunning the builder adds duplicate entries rather
/// than replacing earlier ones. Lookups cap their result count, so the
/// duplicates cost storage, not correctness.
pub struct IndexBuilder<R, S> {
    restaurants: R,
    index: S,
    cuisines: Vec<String>,
    locality: String,
    per_cuisine_cap: u32,
    page_size: u32,
}

impl<R, S> IndexBuilder<R, S>
where
    R: RestaurantRepository,
    S: SearchIndexRepository,
{
    pub fn new(restaurants: R, index: S, config: &IndexerConfig) -> Self {
        Self {
            restaurants,
            index,
            cuisines: config.cuisines.clone(),
            locality: config.locality.clone(),
            per_cuisine_cap: config.per_cuisine_cap,
            page_size: config.page_size,
        }
    }

    pub async fn build(&self) -> Result<Vec<CuisineIndexReport>, RepositoryError> {
        let mut reports = Vec::with_capacity(self.cuisines.len());

        for cuisine in &self.cuisines {
            let indexed = self.index_cuisine(cuisine).await?;
            info!(
                event_name = "indexer.cuisine_indexed",
                cuisine = %cuisine,
                indexed,
                "search index entries written"
            );
            reports.push(CuisineIndexReport { cuisine: cuisine.clone(), indexed });
        }

        Ok(reports)
    }

    async fn index_cuisine(&self, cuisine: &str) -> Result<u32, RepositoryError> {
        let mut indexed = 0u32;
        let mut offset = 0u32;

        while indexed < self.per_cuisine_cap {
            let page = self
                .restaurants
                .scan_by_cuisine(cuisine, &self.locality, offset, self.page_size)
                .await?;
            let page_len = page.len() as u32;

            for record in page {
                if indexed >= self.per_cuisine_cap {
                    break;
                }
                self.index
                    .insert(SearchIndexEntry {
                        business_id: record.business_id,
                        cuisine: cuisine.to_string(),
                    })
                    .await?;
                indexed += 1;
            }

            if page_len < self.page_size {
                break;
            }
            offset += page_len;
        }

        Ok(indexed)
    }
}
