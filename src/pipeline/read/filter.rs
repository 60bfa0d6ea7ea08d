use crate::constants::is_wildcard;
use crate::types::PointRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Attributes the map view can be filtered on, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Region,
    Commune,
    Classification,
    Name,
}

impl Dimension {
    fn value(self, row: &PointRow) -> &str {
        match self {
            Dimension::Region => row.region(),
            Dimension::Commune => row.commune(),
            Dimension::Classification => &row.clasificacion,
            Dimension::Name => row.name(),
        }
    }

    fn matches(self, row: &PointRow, wanted: &str) -> bool {
        match self {
            Dimension::Name => self
                .value(row)
                .to_lowercase()
                .contains(&wanted.trim().to_lowercase()),
            _ => self.value(row) == wanted,
        }
    }

    /// Free-text dimensions have no option list
    fn has_options(self) -> bool {
        !matches!(self, Dimension::Name)
    }
}

/// Which rows a stage draws its option list from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionScope {
    /// Rows left after every earlier stage has been applied
    Upstream,
    /// The whole table, ignoring earlier selections
    BaseTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStage {
    pub dimension: Dimension,
    pub option_scope: OptionScope,
}

/// Classification options come from the whole table even when a region or commune is
/// selected. Kept as shipped; awaiting product confirmation before scoping it upstream.
pub const FILTER_PIPELINE: [FilterStage; 4] = [
    FilterStage {
        dimension: Dimension::Region,
        option_scope: OptionScope::Upstream,
    },
    FilterStage {
        dimension: Dimension::Commune,
        option_scope: OptionScope::Upstream,
    },
    FilterStage {
        dimension: Dimension::Classification,
        option_scope: OptionScope::BaseTable,
    },
    FilterStage {
        dimension: Dimension::Name,
        option_scope: OptionScope::Upstream,
    },
];

/// Current filter choices. For region, commune and classification `None`, `""`, `"all"` and
/// `"Todas"` mean no restriction; a name search is only unrestricted when blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selections {
    pub region: Option<String>,
    pub commune: Option<String>,
    pub classification: Option<String>,
    pub name: Option<String>,
}

impl Selections {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn commune(mut self, commune: impl Into<String>) -> Self {
        self.commune = Some(commune.into());
        self
    }

    pub fn classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The active (non-wildcard) value for `dimension`
    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        let raw = match dimension {
            Dimension::Region => &self.region,
            Dimension::Commune => &self.commune,
            Dimension::Classification => &self.classification,
            Dimension::Name => &self.name,
        };
        match dimension {
            Dimension::Name => raw.as_deref().filter(|v| !v.trim().is_empty()),
            _ => raw.as_deref().filter(|v| !is_wildcard(v)),
        }
    }
}

/// Option lists for every dimension that has them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    pub communes: Vec<String>,
    pub classifications: Vec<String>,
}

/// Ordered pipeline of equality/substring stages over the cached table.
/// Every call returns a fresh view; the input table is never modified.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    stages: Vec<FilterStage>,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self {
            stages: FILTER_PIPELINE.to_vec(),
        }
    }
}

impl FilterEngine {
    pub fn new(stages: Vec<FilterStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    fn accepts(stages: &[FilterStage], row: &PointRow, selections: &Selections) -> bool {
        stages.iter().all(|stage| {
            selections
                .get(stage.dimension)
                .map_or(true, |wanted| stage.dimension.matches(row, wanted))
        })
    }

    pub fn apply(&self, table: &[PointRow], selections: &Selections) -> Vec<PointRow> {
        table
            .iter()
            .filter(|row| Self::accepts(&self.stages, row, selections))
            .cloned()
            .collect()
    }

    /// Sorted distinct non-empty values of `dimension`, drawn from the rows its stage's
    /// option scope allows
    pub fn options_for(
        &self,
        table: &[PointRow],
        selections: &Selections,
        dimension: Dimension,
    ) -> Vec<String> {
        let Some(position) = self.stages.iter().position(|s| s.dimension == dimension) else {
            return Vec::new();
        };
        if !dimension.has_options() {
            return Vec::new();
        }

        let upstream = match self.stages[position].option_scope {
            OptionScope::BaseTable => &self.stages[..0],
            OptionScope::Upstream => &self.stages[..position],
        };

        table
            .iter()
            .filter(|row| Self::accepts(upstream, row, selections))
            .map(|row| dimension.value(row).trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn options(&self, table: &[PointRow], selections: &Selections) -> FilterOptions {
        FilterOptions {
            regions: self.options_for(table, selections, Dimension::Region),
            communes: self.options_for(table, selections, Dimension::Commune),
            classifications: self.options_for(table, selections, Dimension::Classification),
        }
    }
}
