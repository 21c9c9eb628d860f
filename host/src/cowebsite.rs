use framebridge_core::messages::CoWebsiteInfo;
use tracing::debug;
use url::Url;

/// A page the host shows next to the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoWebsiteEntry {
    pub id: String,
    pub url: Url,
    pub allow_api: bool,
    pub allow_policy: Option<String>,
}

/// Open co-websites in display order. Positions are indices into the list.
#[derive(Debug, Default)]
pub struct CoWebsiteList {
    sites: Vec<CoWebsiteEntry>,
    next_id: u64,
}

impl CoWebsiteList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts at `position` (clamped to the end) or appends.
    pub fn open(
        &mut self,
        url: Url,
        allow_api: bool,
        allow_policy: Option<String>,
        position: Option<u32>,
    ) -> CoWebsiteInfo {
        self.next_id += 1;
        let id = format!("cowebsite-{}", self.next_id);
        let index = position
            .map(|p| (p as usize).min(self.sites.len()))
            .unwrap_or(self.sites.len());

        debug!(target: "host", id = %id, url = %url, index, "Opening co-website");
        self.sites.insert(
            index,
            CoWebsiteEntry {
                id: id.clone(),
                url,
                allow_api,
                allow_policy,
            },
        );
        CoWebsiteInfo {
            id,
            position: index as u32,
        }
    }

    pub fn close(&mut self, id: &str) -> bool {
        let before = self.sites.len();
        self.sites.retain(|s| s.id != id);
        self.sites.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&CoWebsiteEntry> {
        self.sites.iter().find(|s| s.id == id)
    }

    pub fn list(&self) -> Vec<CoWebsiteInfo> {
        self.sites
            .iter()
            .enumerate()
            .map(|(i, s)| CoWebsiteInfo {
                id: s.id.clone(),
                position: i as u32,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
