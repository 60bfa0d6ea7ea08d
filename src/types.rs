use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A geolocated infrastructure record as written to `puntos_territoriales`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritorialPoint {
    #[serde(rename = "nombre_oficial", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "tipo_punto", default, deserialize_with = "null_as_default")]
    pub point_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region: String,
    #[serde(rename = "comuna", default, deserialize_with = "null_as_default")]
    pub commune: String,
    #[serde(rename = "latitud")]
    pub latitude: f64,
    #[serde(rename = "longitud")]
    pub longitude: f64,
    #[serde(rename = "detalles", default, deserialize_with = "null_as_default")]
    pub details: PointDetails,
    #[serde(rename = "usuario_creador", default, deserialize_with = "null_as_default")]
    pub created_by: String,
}

/// Typed view of the `detalles` JSON payload.
///
/// Every field is optional on the wire; defaults are resolved when the table is expanded,
/// not when the record is read. Sub-fields written by other sources are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointDetails {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_i64")]
    pub arranques: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub rut: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub clasificacion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_i64")]
    pub beneficiarios: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A point as read back from storage, with its storage-assigned identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub point: TerritorialPoint,
}

impl StoredPoint {
    pub fn new(id: Option<i64>, point: TerritorialPoint) -> Self {
        Self {
            id,
            created_at: None,
            point,
        }
    }
}

/// One row of the cached table: the stored point plus the fields projected out of `details`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRow {
    #[serde(flatten)]
    pub stored: StoredPoint,
    pub arranques: i64,
    pub clasificacion: String,
    pub beneficiarios: i64,
    pub rut: String,
}

impl PointRow {
    pub fn name(&self) -> &str {
        &self.stored.point.name
    }

    pub fn region(&self) -> &str {
        &self.stored.point.region
    }

    pub fn commune(&self) -> &str {
        &self.stored.point.commune
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts integers, integral floats and numeric strings ("12", "12,0"); anything else is absent
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Postgres `timestamptz` comes back as RFC 3339; plain `timestamp` has no offset
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_as_i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok().and_then(float_as_i64))
        }
        _ => None,
    }
}

pub(crate) fn float_as_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
