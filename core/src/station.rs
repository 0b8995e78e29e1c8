use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A remote receiver as known to the station store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Read-only lookup into whatever persists station records.
#[async_trait]
pub trait StationDirectory: Send + Sync {
    async fn station(&self, id: &str) -> Option<Station>;
}

/// Fixed set of stations, typically loaded from configuration.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectory {
    stations: HashMap<String, Station>,
}

impl InMemoryDirectory {
    pub fn new(stations: impl IntoIterator<Item = Station>) -> Self {
        Self {
            stations: stations
                .into_iter()
                .map(|station| (station.id.clone(), station))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[async_trait]
impl StationDirectory for InMemoryDirectory {
    async fn station(&self, id: &str) -> Option<Station> {
        self.stations.get(id).cloned()
    }
}
