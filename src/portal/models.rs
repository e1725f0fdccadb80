// src/portal/models.rs
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_PORTAL_URL: &str = "https://mta.newnycontracts.com";

// The portal sniffs for a browser; a plain client gets an empty frameset.
pub const PORTAL_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:138.0) Gecko/20100101 Firefox/138.0";

const SEARCH_PATH: &str = "/FrontEnd/ContractSearchPublic.asp";
const DETAIL_PATH: &str = "/FrontEnd/ContractSearchPublicDetail.asp";

/// Endpoint layout and request pacing for the contract portal.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    /// `TN` query parameter: the portal tenant.
    pub template: String,
    /// `XID` of the public search page.
    pub search_xid: String,
    /// `XID` of the public detail page.
    pub detail_xid: String,
    pub organization_id: String,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random wait added to every delay.
    pub max_jitter: Duration,
    pub request_timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PORTAL_URL.to_string(),
            template: "mta".to_string(),
            search_xid: "5421".to_string(),
            detail_xid: "788".to_string(),
            organization_id: "30000183".to_string(),
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
            max_jitter: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl PortalConfig {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn search_url(&self) -> String {
        format!("{}{}", self.base(), SEARCH_PATH)
    }

    pub fn search_query(&self) -> [(&'static str, &str); 2] {
        [("XID", self.search_xid.as_str()), ("TN", self.template.as_str())]
    }

    /// Referer the search form is normally posted from.
    pub fn search_referer(&self) -> String {
        format!("{}?TN={}&XID=2353", self.search_url(), self.template)
    }

    pub fn origin(&self) -> String {
        self.base().to_string()
    }

    pub fn detail_url(&self, cid: &str) -> String {
        format!(
            "{}{}?XID={}&TN={}&CID={}",
            self.base(),
            DETAIL_PATH,
            self.detail_xid,
            self.template,
            cid
        )
    }

    pub fn search_form<'a>(&'a self, contract_number: &'a str) -> SearchForm<'a> {
        SearchForm {
            submit: "Search",
            diversity_id: &self.organization_id,
            organization_id: &self.organization_id,
            template_name: &self.template,
            page_number: "1",
            contract_number,
            // open contracts only
            contract_status: "1",
        }
    }
}

/// Body of the public search POST (`application/x-www-form-urlencoded`).
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchForm<'a> {
    pub submit: &'a str,
    #[serde(rename = "DiversityID")]
    pub diversity_id: &'a str,
    #[serde(rename = "OrganizationID")]
    pub organization_id: &'a str,
    pub template_name: &'a str,
    pub page_number: &'a str,
    pub contract_number: &'a str,
    pub contract_status: &'a str,
}
