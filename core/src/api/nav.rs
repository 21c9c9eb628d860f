use crate::bridge::Bridge;
use crate::messages::{types, CloseCoWebsiteEvent, CoWebsiteInfo, OpenCoWebsiteEvent, UrlEvent};
use crate::Result;

/// A page opened next to the map.
#[derive(Clone)]
pub struct CoWebsite {
    info: CoWebsiteInfo,
    bridge: Bridge,
}

impl std::fmt::Debug for CoWebsite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CoWebsite").field(&self.info).finish()
    }
}

impl CoWebsite {
    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn position(&self) -> u32 {
        self.info.position
    }

    pub async fn close(self) -> Result<()> {
        self.bridge.nav().close_co_website(&self.info.id).await
    }
}

pub struct NavCommands<'a> {
    bridge: &'a Bridge,
}

impl<'a> NavCommands<'a> {
    pub(crate) fn new(bridge: &'a Bridge) -> Self {
        Self { bridge }
    }

    pub fn open_tab(&self, url: &str) -> Result<()> {
        self.bridge
            .publish(types::OPEN_TAB, &UrlEvent { url: url.to_string() })
    }

    /// Navigates the whole host page away.
    pub fn go_to_page(&self, url: &str) -> Result<()> {
        self.bridge
            .publish(types::GO_TO_PAGE, &UrlEvent { url: url.to_string() })
    }

    pub async fn open_co_website(&self, request: OpenCoWebsiteEvent) -> Result<CoWebsite> {
        let info: CoWebsiteInfo = self.bridge.query(types::OPEN_CO_WEBSITE, &request).await?;
        Ok(self.wrap(info))
    }

    pub async fn close_co_website(&self, id: &str) -> Result<()> {
        self.bridge
            .query(types::CLOSE_CO_WEBSITE, &CloseCoWebsiteEvent { id: id.to_string() })
            .await
    }

    /// Open co-websites, ordered by position.
    pub async fn get_co_websites(&self) -> Result<Vec<CoWebsite>> {
        let infos: Vec<CoWebsiteInfo> = self.bridge.query(types::GET_CO_WEBSITES, &()).await?;
        Ok(infos.into_iter().map(|info| self.wrap(info)).collect())
    }

    fn wrap(&self, info: CoWebsiteInfo) -> CoWebsite {
        CoWebsite {
            info,
            bridge: self.bridge.clone(),
        }
    }
}
