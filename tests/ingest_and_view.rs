use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use territorial_intel::auth::Submitter;
use territorial_intel::config::Config;
use territorial_intel::constants::{self, POINTS_TABLE};
use territorial_intel::error::{Result, TerritorialError};
use territorial_intel::pipeline::ingestion::{CellValue, IngestProgress, Sheet};
use territorial_intel::pipeline::read::{Dimension, FilterEngine, Selections};
use territorial_intel::service::TerritorialService;
use territorial_intel::storage::{InMemoryStorage, PointStore, SelectQuery};
use territorial_intel::types::{StoredPoint, TerritorialPoint};

/// Counts every call before delegating to the in-memory table
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStorage,
    selects: AtomicUsize,
    inserts: AtomicUsize,
}

#[async_trait]
impl PointStore for CountingStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<StoredPoint>> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, rows: &[TerritorialPoint]) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(table, rows).await
    }
}

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

fn headers(with_beneficiaries: bool) -> Vec<String> {
    let mut headers: Vec<String> = constants::REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
    if with_beneficiaries {
        headers.push(constants::COL_BENEFICIARIES.to_string());
    }
    headers
}

#[allow(clippy::too_many_arguments)]
fn ssr_row(
    name: &str,
    region: &str,
    commune: &str,
    lat: CellValue,
    lon: CellValue,
    connections: i64,
    classification: &str,
    beneficiaries: i64,
) -> Vec<CellValue> {
    vec![
        text(name),
        text(region),
        text(commune),
        lat,
        lon,
        CellValue::Int(connections),
        text("65.432.100-K"),
        text(classification),
        CellValue::Int(beneficiaries),
    ]
}

fn workbook() -> Sheet {
    Sheet::new(
        headers(true),
        vec![
            ssr_row("APR Agua Santa", "Valparaíso", "Casablanca", text("-33,32"), text("-71,41"), 210, "Mayor", 840),
            ssr_row("APR Las Dichas", "Valparaíso", "Casablanca", CellValue::Float(-33.28), CellValue::Float(-71.50), 95, "Menor", 380),
            ssr_row("APR El Agua Dulce", "Valparaíso", "Quillota", text("-32.88"), text("-71.25"), 120, "Mediano", 0),
            // no latitude: rejected
            ssr_row("APR Sin Coordenada", "Valparaíso", "Quillota", CellValue::Empty, text("-71.25"), 30, "Menor", 90),
            ssr_row("APR Duao", "Maule", "Maule", text("-35,48"), text("-71,62"), 60, "Menor", 240),
            ssr_row("APR Huapi", "Maule", "Pelarco", text("-35.38"), text("-71.33"), 75, "Semi Concentrado", 300),
            // unparseable longitude: rejected
            ssr_row("APR Coordenada Rota", "Maule", "Pelarco", text("-35.38"), text("71°O"), 10, "Menor", 0),
        ],
    )
}

async fn ingested() -> (Arc<CountingStore>, TerritorialService) {
    let store = Arc::new(CountingStore::default());
    let service = TerritorialService::new(store.clone(), &Config::default());
    let report = service
        .ingest_sheet(&workbook(), &Submitter::new("ana@example.cl"), &mut |_: IngestProgress| {})
        .await
        .unwrap();
    assert_eq!(report.rows_scanned, 7);
    assert_eq!(report.accepted, 5);
    assert_eq!(report.rejected, 2);
    (store, service)
}

#[tokio::test]
async fn only_rows_with_valid_coordinates_are_stored() {
    let (store, _) = ingested().await;
    assert_eq!(store.inner.len(POINTS_TABLE), 5);

    let stored = store.inner.select(&SelectQuery::new(POINTS_TABLE)).await.unwrap();
    let first = &stored[0].point;
    assert_eq!(first.latitude, -33.32);
    assert_eq!(first.longitude, -71.41);
    assert_eq!(first.point_type, "SSR");
    assert_eq!(first.created_by, "ana@example.cl");
    assert_eq!(first.details.arranques, Some(210));
    assert_eq!(first.details.beneficiarios, Some(840));
}

#[tokio::test]
async fn missing_required_column_writes_nothing() {
    let store = Arc::new(CountingStore::default());
    let service = TerritorialService::new(store.clone(), &Config::default());

    let mut headers = headers(false);
    headers.retain(|h| h != constants::COL_LATITUDE);
    let sheet = Sheet::new(headers, vec![vec![text("APR Huilliborgoa"); 7]]);

    let err = service
        .ingest_sheet(&sheet, &Submitter::new("ana@example.cl"), &mut |_: IngestProgress| {})
        .await
        .unwrap_err();
    match err {
        TerritorialError::Schema { missing, .. } => {
            assert_eq!(missing, vec![constants::COL_LATITUDE.to_string()]);
        }
        other => panic!("expected schema error, got {other:?}"),
    }
    assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    assert_eq!(store.selects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ingest_invalidates_cached_table() {
    let store = Arc::new(CountingStore::default());
    let service = TerritorialService::new(store.clone(), &Config::default());

    assert_eq!(service.table().await.unwrap().len(), 0);
    service
        .ingest_sheet(&workbook(), &Submitter::new("ana@example.cl"), &mut |_: IngestProgress| {})
        .await
        .unwrap();

    // default TTL is an hour; the new rows show up without waiting for it
    let table = service.table().await.unwrap();
    assert_eq!(table.len(), 5);
    let duao = table.iter().find(|r| r.name() == "APR Duao").unwrap();
    assert_eq!(duao.clasificacion, "Menor");
    assert_eq!(duao.beneficiarios, 240);
}

#[tokio::test]
async fn cached_reads_do_not_hit_storage() {
    let (store, service) = ingested().await;
    let before = store.selects.load(Ordering::SeqCst);
    service.view(&Selections::all()).await.unwrap();
    service.view(&Selections::all().region("Maule")).await.unwrap();
    service.options(&Selections::all()).await.unwrap();
    // one build for the whole table, then served from cache
    assert_eq!(store.selects.load(Ordering::SeqCst), before + 1);
}

#[tokio::test]
async fn region_and_name_filters_cascade() {
    let (_, service) = ingested().await;

    let view = service
        .view(&Selections::all().region("Valparaíso").commune("all"))
        .await
        .unwrap();
    assert_eq!(view.total, 5);
    assert_eq!(view.shown, 3);
    assert!(view.points.iter().all(|p| p.row.region() == "Valparaíso"));

    let view = service
        .view(&Selections::all().region("Valparaíso").commune("all").name("agua"))
        .await
        .unwrap();
    let names: Vec<_> = view.points.iter().map(|p| p.row.name()).collect();
    assert_eq!(names, vec!["APR Agua Santa", "APR El Agua Dulce"]);
}

#[tokio::test]
async fn option_lists_follow_the_pipeline() {
    let (_, service) = ingested().await;

    let maule = service.options(&Selections::all().region("Maule")).await.unwrap();
    assert_eq!(maule.communes, vec!["Maule", "Pelarco"]);

    let everywhere = service.options(&Selections::all()).await.unwrap();
    assert_eq!(maule.classifications, everywhere.classifications);
    assert_eq!(
        everywhere.classifications,
        vec!["Mayor", "Mediano", "Menor", "Semi Concentrado"]
    );
}

#[tokio::test]
async fn all_wildcards_return_the_cached_table_in_order() {
    let (_, service) = ingested().await;
    let table = service.table().await.unwrap();

    let engine = FilterEngine::default();
    let selections = Selections::all()
        .region("all")
        .commune("Todas")
        .classification("all")
        .name("");
    assert_eq!(engine.apply(&table, &selections), *table);
    assert!(engine.options_for(&table, &selections, Dimension::Name).is_empty());
}
