// realtor.rs
use crate::domain::{format_address, Category, FetchPartition, PropertyRecord, PropertyType, Source};
use crate::sources::http::{build_client, read_body};
use crate::sources::models::RealtorHome;
use crate::sources::{non_empty, RawPage, SourceAdapter, SourceError, SourceSettings};
use reqwest::blocking::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "https://www.realtor.com/frontdoor/graphql";
const DETAIL_URL: &str = "https://www.realtor.com/realestateandhomes-detail/";

pub(crate) const PAGE_SIZE: usize = 200;
// The search API refuses offsets past 10_000.
const MAX_OFFSET: usize = 10_000;
pub(crate) const MAX_PAGES: u32 = (MAX_OFFSET / PAGE_SIZE) as u32;

const CATEGORIES: &[Category] = &[Category::SingleFamily, Category::MultiFamily];

const SEARCH_QUERY: &str = r#"query ConsumerSearchQuery($query: HomeSearchCriteria!, $limit: Int, $offset: Int, $sort: [SearchAPISort], $client_data: JSON) {
  home_search: home_search(query: $query, sort: $sort, limit: $limit, offset: $offset, client_data: $client_data) {
    count
    total
    properties: results {
      property_id
      list_price
      permalink
      description { name beds baths_consolidated sqft type year_built }
      location { address { line city state_code postal_code } }
    }
  }
}"#;

pub struct RealtorAdapter {
    client: Client,
    settings: SourceSettings,
}

impl RealtorAdapter {
    pub fn new(settings: SourceSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client()?,
            settings,
        })
    }

    fn payload(partition: &FetchPartition, page: u32) -> Value {
        let offset = (page.saturating_sub(1) as usize) * PAGE_SIZE;
        json!({
            "operationName": "ConsumerSearchQuery",
            "variables": {
                "query": {
                    "primary": true,
                    "status": ["for_sale", "ready_to_build"],
                    "search_location": { "location": partition.state },
                    "baths": { "min": 1 },
                    "beds": { "min": 2 },
                    "type": [partition.category.as_str()],
                    "sqft": { "min": 800 },
                    "list_price": { "min": 60000, "max": 350000 }
                },
                "client_data": { "device_data": { "device_type": "desktop" } },
                "limit": PAGE_SIZE,
                "offset": offset,
                "sort": [
                    { "field": "list_date", "direction": "desc" },
                    { "field": "photo_count", "direction": "desc" }
                ]
            },
            "query": SEARCH_QUERY
        })
    }

    pub(crate) fn parse_page(body: &str) -> Result<RawPage, SourceError> {
        let data: Value =
            serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

        let search = &data["data"]["home_search"];
        if search.is_null() {
            return Err(SourceError::UnexpectedShape("data.home_search missing".into()));
        }

        let items = search["properties"].as_array().cloned().unwrap_or_default();
        let total = search["total"].as_u64().map(|t| t as usize);
        Ok(RawPage::new(items, total))
    }

    fn property_type(raw: Option<&str>) -> PropertyType {
        match raw {
            Some("single_family") => PropertyType::SingleFamily,
            Some("multi_family") => PropertyType::MultiFamily,
            _ => PropertyType::Other,
        }
    }
}

impl SourceAdapter for RealtorAdapter {
    fn source(&self) -> Source {
        Source::Realtor
    }

    fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    fn categories(&self) -> &'static [Category] {
        CATEGORIES
    }

    fn request_page(&self, partition: &FetchPartition, page: u32) -> Result<RawPage, SourceError> {
        let referer = format!(
            "https://www.realtor.com/realestateandhomes-search/{}",
            partition.state.replace(' ', "-")
        );

        let resp = self
            .client
            .post(BASE_URL)
            .header("Accept", "*/*")
            .header("Origin", "https://www.realtor.com")
            .header("Referer", referer)
            .header("rdc-client-name", "RDC_WEB_SRP_FS_PAGE")
            .header("rdc-client-version", "3.x.x")
            .json(&Self::payload(partition, page))
            .send()?;

        Self::parse_page(&read_body(resp)?)
    }

    fn transform(&self, partition: &FetchPartition, raw: &Value) -> Option<PropertyRecord> {
        let home: RealtorHome = match serde_json::from_value(raw.clone()) {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!(partition = %partition, error = %e, "undecodable realtor listing");
                return None;
            }
        };

        let property_id = home.property_id?;
        let mut record = PropertyRecord::new(property_id, Source::Realtor);
        record.state = partition.state.clone();

        if let Some(address) = home.location.and_then(|l| l.address) {
            let zip = non_empty(address.postal_code);
            record.address = format_address(
                &non_empty(address.line),
                &non_empty(address.city),
                &non_empty(address.state_code),
                &zip,
            );
            record.zip_code = zip;
        }

        if let Some(d) = home.description {
            record.property_type = Self::property_type(d.property_type.as_deref());
            record.square_footage = d.sqft.unwrap_or(0.0);
            record.bedrooms = d.beds.unwrap_or(0);
            record.bathrooms = d.baths_consolidated.unwrap_or(0.0);
            record.year_built = d.year_built.unwrap_or(0) as i32;
        }

        record.after_repair_value = home.list_price.unwrap_or(0.0);
        record.url = home
            .permalink
            .filter(|p| !p.is_empty())
            .map(|p| format!("{DETAIL_URL}{p}"))
            .unwrap_or_default();

        record.has_valid_measurements().then_some(record)
    }
}
