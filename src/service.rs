use crate::auth::Submitter;
use crate::config::Config;
use crate::constants::is_wildcard;
use crate::error::Result;
use crate::pipeline::ingestion::{BatchLoader, IngestProgress, IngestReport, Sheet};
use crate::pipeline::read::{expand, FilterEngine, FilterOptions, PaginatedFetcher, ResultCache, Selections};
use crate::storage::PointStore;
use crate::types::PointRow;
use crate::view::MapView;
use std::sync::Arc;
use tracing::info;

/// Entry point shared by the CLI and the HTTP server: one store, one cached table.
///
/// Reads go through the cache; writes go through a `BatchLoader` that invalidates it.
pub struct TerritorialService {
    store: Arc<dyn PointStore>,
    cache: Arc<ResultCache<Vec<PointRow>>>,
    fetcher: PaginatedFetcher,
    filters: FilterEngine,
    config: Config,
}

impl TerritorialService {
    pub fn new(store: Arc<dyn PointStore>, config: &Config) -> Self {
        Self {
            fetcher: PaginatedFetcher::from_config(store.clone(), config),
            cache: Arc::new(ResultCache::new(config.read.cache_ttl())),
            store,
            filters: FilterEngine::default(),
            config: config.clone(),
        }
    }

    pub fn with_filters(mut self, filters: FilterEngine) -> Self {
        self.filters = filters;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The whole points table with derived fields, served from cache while fresh
    pub async fn table(&self) -> Result<Arc<Vec<PointRow>>> {
        self.cache
            .get_or_build(|| async { self.fetcher.fetch_all().await.map(expand) })
            .await
    }

    /// Drop the cached table so the next read goes to storage
    pub fn refresh(&self) {
        info!("🔄 Manual refresh requested");
        self.cache.invalidate();
    }

    fn loader(&self, store: Arc<dyn PointStore>) -> BatchLoader {
        BatchLoader::from_config(store, &self.config).with_cache(self.cache.clone())
    }

    pub async fn ingest(
        &self,
        bytes: &[u8],
        submitter: &Submitter,
        progress: &mut (dyn FnMut(IngestProgress) + Send),
    ) -> Result<IngestReport> {
        self.ingest_into(self.store.clone(), bytes, submitter, progress).await
    }

    /// Ingest through a different store handle, e.g. one carrying the submitter's own token so
    /// row-level security applies to the insert. The shared cache is still invalidated.
    pub async fn ingest_into(
        &self,
        store: Arc<dyn PointStore>,
        bytes: &[u8],
        submitter: &Submitter,
        progress: &mut (dyn FnMut(IngestProgress) + Send),
    ) -> Result<IngestReport> {
        self.loader(store).load(bytes, submitter, progress).await
    }

    pub async fn ingest_sheet(
        &self,
        sheet: &Sheet,
        submitter: &Submitter,
        progress: &mut (dyn FnMut(IngestProgress) + Send),
    ) -> Result<IngestReport> {
        self.loader(self.store.clone())
            .load_sheet(sheet, submitter, progress)
            .await
    }

    pub async fn view(&self, selections: &Selections) -> Result<MapView> {
        let table = self.table().await?;
        let shown = self.filters.apply(&table, selections);
        let options = self.filters.options(&table, selections);
        Ok(MapView::build(table.len(), shown, selections, options))
    }

    pub async fn options(&self, selections: &Selections) -> Result<FilterOptions> {
        let table = self.table().await?;
        Ok(self.filters.options(&table, selections))
    }

    /// Uncached read with equality filters applied by the store. Wildcard values
    /// (`"Todas"`, `"all"`, blank) are not sent.
    pub async fn fetch_where(&self, filters: &[(String, String)]) -> Result<Vec<PointRow>> {
        let fetcher = filters.iter().filter(|(_, value)| !is_wildcard(value)).fold(
            PaginatedFetcher::from_config(self.store.clone(), &self.config),
            |fetcher, (column, value)| fetcher.with_filter(column.clone(), value.clone()),
        );
        Ok(expand(fetcher.fetch_all().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::POINTS_TABLE;
    use crate::storage::InMemoryStorage;
    use crate::types::{PointDetails, TerritorialPoint};

    fn point(name: &str, region: &str, commune: &str) -> TerritorialPoint {
        TerritorialPoint {
            name: name.to_string(),
            point_type: "SSR".to_string(),
            region: region.to_string(),
            commune: commune.to_string(),
            latitude: -35.0,
            longitude: -71.0,
            details: PointDetails::default(),
            created_by: "ana@example.cl".to_string(),
        }
    }

    async fn service_with(points: &[TerritorialPoint]) -> (Arc<InMemoryStorage>, TerritorialService) {
        let store = Arc::new(InMemoryStorage::new());
        store.insert(POINTS_TABLE, points).await.unwrap();
        let service = TerritorialService::new(store.clone(), &Config::default());
        (store, service)
    }

    #[tokio::test]
    async fn table_is_cached_until_refresh() {
        let (store, service) = service_with(&[point("APR Uno", "Maule", "Talca")]).await;
        assert_eq!(service.table().await.unwrap().len(), 1);

        // written behind the service's back: not visible until refresh
        store
            .insert(POINTS_TABLE, &[point("APR Dos", "Maule", "Curicó")])
            .await
            .unwrap();
        assert_eq!(service.table().await.unwrap().len(), 1);

        service.refresh();
        assert_eq!(service.table().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn view_reports_totals_and_options() {
        let (_, service) = service_with(&[
            point("APR Uno", "Maule", "Talca"),
            point("APR Dos", "Maule", "Curicó"),
            point("APR Tres", "Ñuble", "Chillán"),
        ])
        .await;

        let view = service.view(&Selections::all().region("Maule")).await.unwrap();
        assert_eq!(view.total, 3);
        assert_eq!(view.shown, 2);
        assert_eq!(view.options.regions, vec!["Maule", "Ñuble"]);
        assert_eq!(view.options.communes, vec!["Curicó", "Talca"]);
    }

    #[tokio::test]
    async fn fetch_where_pushes_filters_to_the_store() {
        let (_, service) = service_with(&[
            point("APR Uno", "Maule", "Talca"),
            point("APR Tres", "Ñuble", "Chillán"),
        ])
        .await;
        let rows = service
            .fetch_where(&[("comuna".to_string(), "Chillán".to_string())])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name(), "APR Tres");
    }

    #[tokio::test]
    async fn fetch_where_skips_wildcard_values() {
        let (_, service) = service_with(&[
            point("APR Uno", "Maule", "Talca"),
            point("APR Tres", "Ñuble", "Chillán"),
        ])
        .await;
        let rows = service
            .fetch_where(&[
                ("region".to_string(), "Todas".to_string()),
                ("comuna".to_string(), "Talca".to_string()),
            ])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name(), "APR Uno");

        let everything = service
            .fetch_where(&[("region".to_string(), "all".to_string())])
            .await
            .unwrap();
        assert_eq!(everything.len(), 2);
    }
}
