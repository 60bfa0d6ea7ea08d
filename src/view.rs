use crate::constants::{MARKER_OTHER, MARKER_SSR, POINT_TYPE_SSR, ZOOM_COUNTRY, ZOOM_REGION};
use crate::pipeline::read::{Dimension, FilterOptions, Selections};
use crate::types::PointRow;
use serde::Serialize;

/// What the map page renders for one set of selections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// Rows in the cached table
    pub total: usize,
    /// Rows left after filtering
    pub shown: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<MapCenter>,
    pub zoom: u8,
    pub points: Vec<MapPoint>,
    pub options: FilterOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapCenter {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    #[serde(flatten)]
    pub row: PointRow,
    pub marker_color: &'static str,
}

impl From<PointRow> for MapPoint {
    fn from(row: PointRow) -> Self {
        let marker_color = if row.stored.point.point_type == POINT_TYPE_SSR {
            MARKER_SSR
        } else {
            MARKER_OTHER
        };
        Self { row, marker_color }
    }
}

impl MapView {
    pub fn build(
        total: usize,
        shown: Vec<PointRow>,
        selections: &Selections,
        options: FilterOptions,
    ) -> Self {
        let zoom = if selections.get(Dimension::Region).is_some() {
            ZOOM_REGION
        } else {
            ZOOM_COUNTRY
        };
        let center = centroid(&shown);
        let points: Vec<MapPoint> = shown.into_iter().map(MapPoint::from).collect();

        Self {
            total,
            shown: points.len(),
            center,
            zoom,
            points,
            options,
        }
    }
}

fn centroid(rows: &[PointRow]) -> Option<MapCenter> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let (lat, lon) = rows.iter().fold((0.0, 0.0), |(lat, lon), row| {
        (lat + row.stored.point.latitude, lon + row.stored.point.longitude)
    });
    Some(MapCenter {
        latitude: lat / n,
        longitude: lon / n,
    })
}
