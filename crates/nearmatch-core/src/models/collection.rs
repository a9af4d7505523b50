//! Spatial collections and the datasets that carry them.

use super::geometry::{Crs, Geometry};
use serde_json::{Map, Value};

/// One row of a spatial collection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpatialEntity {
    /// Attribute bag (district name, price, ...)
    pub attributes: Map<String, Value>,

    /// `None` when the source feature had a null geometry
    pub geometry: Option<Geometry>,
}

impl SpatialEntity {
    pub fn new(geometry: Geometry) -> Self {
        Self { attributes: Map::new(), geometry: Some(geometry) }
    }

    /// Entity without geometry
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Ordered entities sharing one (possibly absent) CRS
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialCollection {
    pub name: String,
    pub crs: Option<Crs>,
    pub entities: Vec<SpatialEntity>,
}

impl SpatialCollection {
    pub fn new(name: impl Into<String>, crs: Option<Crs>) -> Self {
        Self { name: name.into(), crs, entities: Vec::new() }
    }

    /// Collection of bare points, mostly useful for fixtures
    pub fn from_points(name: impl Into<String>, crs: Option<Crs>, points: &[(f64, f64)]) -> Self {
        let entities =
            points.iter().map(|&(x, y)| SpatialEntity::new(Geometry::point(x, y))).collect();
        Self { name: name.into(), crs, entities }
    }

    pub fn with_entities(mut self, entities: Vec<SpatialEntity>) -> Self {
        self.entities = entities;
        self
    }

    pub fn push(&mut self, entity: SpatialEntity) {
        self.entities.push(entity);
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpatialEntity> {
        self.entities.iter()
    }

    /// Same name and CRS, entities selected by `keep`
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&SpatialEntity) -> bool,
    {
        Self {
            name: self.name.clone(),
            crs: self.crs.clone(),
            entities: self.entities.iter().filter(|e| keep(e)).cloned().collect(),
        }
    }
}

/// Attribute-only dataset, e.g. an income table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

/// Anything a format reader can hand over
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Spatial(SpatialCollection),
    Tabular(Table),
}

impl Dataset {
    pub fn name(&self) -> &str {
        match self {
            Dataset::Spatial(c) => &c.name,
            Dataset::Tabular(t) => &t.name,
        }
    }

    /// Human-readable kind used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Dataset::Spatial(_) => "spatial collection",
            Dataset::Tabular(_) => "tabular dataset",
        }
    }

    pub fn as_spatial(&self) -> Option<&SpatialCollection> {
        match self {
            Dataset::Spatial(c) => Some(c),
            Dataset::Tabular(_) => None,
        }
    }

    pub fn into_spatial(self) -> Option<SpatialCollection> {
        match self {
            Dataset::Spatial(c) => Some(c),
            Dataset::Tabular(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Dataset::Spatial(c) => c.len(),
            Dataset::Tabular(t) => t.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<SpatialCollection> for Dataset {
    fn from(collection: SpatialCollection) -> Self {
        Dataset::Spatial(collection)
    }
}

impl From<Table> for Dataset {
    fn from(table: Table) -> Self {
        Dataset::Tabular(table)
    }
}
