// redfin.rs
use crate::domain::{format_address, Category, FetchPartition, PropertyRecord, PropertyType, Source};
use crate::sources::http::{build_client, read_body};
use crate::sources::models::{RedfinHome, RedfinNumber};
use crate::sources::regions;
use crate::sources::{non_empty, RawPage, SourceAdapter, SourceError, SourceSettings};
use reqwest::blocking::Client;
use serde_json::Value;

const GIS_URL: &str = "https://www.redfin.com/stingray/api/gis";
const SITE_ROOT: &str = "https://www.redfin.com";

// Responses are JSON behind an anti-hijacking prefix.
const RESPONSE_PREFIX: &str = "{}&&";

/// The whole market comes back in one response of at most this many homes.
pub(crate) const NUM_HOMES: usize = 100_000;

const CATEGORIES: &[Category] = &[Category::All];

pub struct RedfinAdapter {
    client: Client,
    settings: SourceSettings,
}

impl RedfinAdapter {
    pub fn new(settings: SourceSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client()?,
            settings,
        })
    }

    fn query(region_id: u32) -> Vec<(&'static str, String)> {
        vec![
            ("al", "1".into()),
            ("include_nearby_homes", "true".into()),
            ("max_price", "350000".into()),
            ("min_listing_approx_size", "750".into()),
            ("min_price", "60000".into()),
            ("min_sqft", "750".into()),
            ("mpt", "99".into()),
            ("num_baths", "1".into()),
            ("num_beds", "2".into()),
            ("num_homes", NUM_HOMES.to_string()),
            ("ord", "days-on-redfin-asc".into()),
            ("page_number", "1".into()),
            ("region_id", region_id.to_string()),
            ("region_type", "4".into()),
            ("sf", "1,2,3,7".into()),
            ("start", "0".into()),
            ("status", "1".into()),
            ("uipt", "1,4".into()),
            ("v", "8".into()),
        ]
    }

    pub(crate) fn parse_page(body: &str) -> Result<RawPage, SourceError> {
        let json = body.strip_prefix(RESPONSE_PREFIX).ok_or_else(|| {
            SourceError::UnexpectedShape("response is missing the {}&& prefix".into())
        })?;
        let data: Value =
            serde_json::from_str(json).map_err(|e| SourceError::Decode(e.to_string()))?;

        let items = data["payload"]["homes"].as_array().cloned().unwrap_or_default();
        let total = items.len();
        Ok(RawPage::new(items, Some(total)))
    }

    fn property_type(code: Option<i64>) -> PropertyType {
        match code {
            Some(6) => PropertyType::SingleFamily,
            Some(4) => PropertyType::MultiFamily,
            _ => PropertyType::Other,
        }
    }
}

impl SourceAdapter for RedfinAdapter {
    fn source(&self) -> Source {
        Source::Redfin
    }

    fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    fn categories(&self) -> &'static [Category] {
        CATEGORIES
    }

    fn request_page(&self, partition: &FetchPartition, _page: u32) -> Result<RawPage, SourceError> {
        let info = regions::lookup(&partition.state)
            .ok_or_else(|| SourceError::UnsupportedState(partition.state.clone()))?;

        tracing::debug!(market = info.redfin_market, region_id = info.redfin_region_id, "redfin request");

        let resp = self
            .client
            .get(GIS_URL)
            .header("Accept", "*/*")
            .header("Referer", SITE_ROOT)
            .query(&Self::query(info.redfin_region_id))
            .send()?;

        Self::parse_page(&read_body(resp)?)
    }

    fn transform(&self, partition: &FetchPartition, raw: &Value) -> Option<PropertyRecord> {
        let home: RedfinHome = match serde_json::from_value(raw.clone()) {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!(partition = %partition, error = %e, "undecodable redfin listing");
                return None;
            }
        };

        let mut record = PropertyRecord::new(home.property_id?, Source::Redfin);
        let zip = non_empty(home.zip);
        let street = non_empty(home.street_line.and_then(|s| s.value));

        record.state = partition.state.clone();
        record.property_type = Self::property_type(home.property_type);
        record.address = format_address(&street, &non_empty(home.city), &non_empty(home.state), &zip);
        record.zip_code = zip;
        record.square_footage = RedfinNumber::get(&home.sq_ft).unwrap_or(0.0);
        record.bedrooms = home.beds.unwrap_or(0);
        record.bathrooms = home.baths.unwrap_or(0.0);
        record.year_built = RedfinNumber::get(&home.year_built).unwrap_or(0.0) as i32;
        record.after_repair_value = RedfinNumber::get(&home.price).unwrap_or(0.0);
        record.url = home
            .url
            .filter(|u| !u.is_empty())
            .map(|u| format!("{SITE_ROOT}{u}"))
            .unwrap_or_default();

        record.has_valid_measurements().then_some(record)
    }
}
