use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::sync::{Arc, Mutex};
use territorial_intel::auth::Submitter;
use territorial_intel::constants::{self, POINTS_TABLE};
use territorial_intel::error::TerritorialError;
use territorial_intel::pipeline::ingestion::{BatchLoader, CellValue, IngestProgress, Sheet};
use territorial_intel::storage::{InMemoryStorage, PointStore, SelectQuery};

const COL_SURVEY_DATE: &str = "FECHA_CATASTRO";

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Blank,
}

/// SSR workbook as exported by the regional offices: padded region header, a date column
/// the loader does not use, and one row without latitude
fn ssr_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    let headers = [
        constants::COL_NAME,
        " REGIÓN ",
        constants::COL_COMMUNE,
        constants::COL_LATITUDE,
        constants::COL_LONGITUDE,
        constants::COL_CONNECTIONS,
        constants::COL_RUT,
        constants::COL_CLASSIFICATION,
        constants::COL_BENEFICIARIES,
        COL_SURVEY_DATE,
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }

    let rows: [[Cell; 9]; 3] = [
        [
            Cell::Text("APR Agua Santa"),
            Cell::Text("Valparaíso"),
            Cell::Text("Casablanca"),
            Cell::Number(-33.32),
            Cell::Number(-71.41),
            Cell::Number(210.0),
            Cell::Text("65.432.100-K"),
            Cell::Text("Mayor"),
            Cell::Number(840.0),
        ],
        [
            Cell::Text("APR Duao"),
            Cell::Text("Maule"),
            Cell::Text("Maule"),
            Cell::Text("-35,48"),
            Cell::Text("-71,62"),
            Cell::Text("60"),
            Cell::Text("71.222.333-4"),
            Cell::Text("Menor"),
            Cell::Blank,
        ],
        [
            Cell::Text("APR Sin Coordenada"),
            Cell::Text("Maule"),
            Cell::Text("Pelarco"),
            Cell::Blank,
            Cell::Number(-71.33),
            Cell::Number(30.0),
            Cell::Text("1-9"),
            Cell::Text("Menor"),
            Cell::Number(90.0),
        ],
    ];

    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let survey_date = ExcelDateTime::from_ymd(2024, 5, 1).unwrap();
    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                Cell::Text(s) => {
                    sheet.write_string(r, c, *s).unwrap();
                }
                Cell::Number(n) => {
                    sheet.write_number(r, c, *n).unwrap();
                }
                Cell::Blank => {}
            }
        }
        sheet
            .write_datetime_with_format(r, headers.len() as u16 - 1, &survey_date, &date_format)
            .unwrap();
    }

    workbook.save_to_buffer().unwrap()
}

#[test]
fn decode_reads_header_row_and_cell_types() {
    let sheet = Sheet::decode(&ssr_workbook()).unwrap();

    assert_eq!(sheet.len(), 3);
    assert!(sheet.has_column(constants::COL_REGION));
    assert!(sheet.headers().iter().all(|h| h.trim() == h));

    let first = &sheet.rows()[0];
    assert_eq!(first[constants::COL_NAME], CellValue::Text("APR Agua Santa".to_string()));
    assert_eq!(first[constants::COL_LATITUDE], CellValue::Float(-33.32));
    // 2024-05-01 as an Excel serial day
    assert_eq!(first[COL_SURVEY_DATE], CellValue::Float(45413.0));

    let missing_latitude = &sheet.rows()[2];
    assert!(missing_latitude[constants::COL_LATITUDE].is_empty());
}

#[tokio::test]
async fn load_stores_valid_rows_from_a_real_workbook() {
    let store = Arc::new(InMemoryStorage::new());
    let loader = BatchLoader::new(store.clone(), POINTS_TABLE).with_batch_size(1);
    let seen = Mutex::new(Vec::new());
    let mut on_progress = |p: IngestProgress| seen.lock().unwrap().push(p);

    let report = loader
        .load(&ssr_workbook(), &Submitter::new("ana@example.cl"), &mut on_progress)
        .await
        .unwrap();

    assert_eq!(report.rows_scanned, 3);
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.batches_written, 2);
    assert_eq!(
        seen.lock().unwrap().last().copied(),
        Some(IngestProgress {
            rows_scanned: 3,
            total_rows: 3
        })
    );

    let stored = store.select(&SelectQuery::new(POINTS_TABLE)).await.unwrap();
    let santa = &stored[0].point;
    assert_eq!(santa.region, "Valparaíso");
    assert_eq!(santa.latitude, -33.32);
    assert_eq!(santa.longitude, -71.41);
    assert_eq!(santa.details.arranques, Some(210));
    assert_eq!(santa.details.beneficiarios, Some(840));

    let duao = &stored[1].point;
    assert_eq!(duao.latitude, -35.48);
    assert_eq!(duao.longitude, -71.62);
    assert_eq!(duao.details.arranques, Some(60));
    assert_eq!(duao.details.beneficiarios, None);
    assert_eq!(duao.created_by, "ana@example.cl");
}

#[tokio::test]
async fn workbook_missing_a_required_column_is_rejected_whole() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, constants::COL_NAME).unwrap();
    sheet.write_string(0, 1, constants::COL_REGION).unwrap();
    sheet.write_string(1, 0, "APR Huapi").unwrap();
    sheet.write_string(1, 1, "Maule").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let store = Arc::new(InMemoryStorage::new());
    let err = BatchLoader::new(store.clone(), POINTS_TABLE)
        .load(&bytes, &Submitter::new("ana@example.cl"), &mut |_: IngestProgress| {})
        .await
        .unwrap_err();

    assert!(matches!(err, TerritorialError::Schema { .. }));
    assert!(store.is_empty(POINTS_TABLE));
}
