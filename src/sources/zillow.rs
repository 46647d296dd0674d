// zillow.rs
use crate::domain::{format_address, Category, FetchPartition, PropertyRecord, PropertyType, Source};
use crate::sources::http::{build_client, read_body};
use crate::sources::models::ZillowHome;
use crate::sources::regions::{self, StateInfo};
use crate::sources::{non_empty, RawPage, SourceAdapter, SourceError, SourceSettings};
use reqwest::blocking::Client;
use serde_json::{json, Map, Value};

const SEARCH_URL: &str = "https://www.zillow.com/async-create-search-page-state";
const SITE_ROOT: &str = "https://www.zillow.com";

pub(crate) const PAGE_SIZE: usize = 40;
pub(crate) const MAX_PAGES: u32 = 25;

const CATEGORIES: &[Category] = &[Category::SingleFamily, Category::MultiFamily];

// Every home-type toggle is sent explicitly; only the partition's is true.
const HOME_TYPE_FILTERS: &[&str] = &[
    "isSingleFamily",
    "isMultiFamily",
    "isTownhouse",
    "isCondo",
    "isLotLand",
    "isApartment",
    "isManufactured",
];

pub struct ZillowAdapter {
    client: Client,
    settings: SourceSettings,
}

impl ZillowAdapter {
    pub fn new(settings: SourceSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client()?,
            settings,
        })
    }

    fn filter_state(category: Category) -> Value {
        let mut filters = Map::new();
        filters.insert("sortSelection".into(), json!({ "value": "days" }));
        filters.insert("price".into(), json!({ "min": 60000, "max": 350000 }));
        filters.insert("monthlyPayment".into(), json!({ "min": 312, "max": 1817 }));
        filters.insert("beds".into(), json!({ "min": 2 }));
        filters.insert("baths".into(), json!({ "min": 1 }));
        filters.insert("sqft".into(), json!({ "min": 750 }));
        filters.insert("built".into(), json!({ "min": 1900 }));
        filters.insert("isNewConstruction".into(), json!({ "value": false }));
        filters.insert("isForSaleForeclosure".into(), json!({ "value": false }));
        filters.insert("isComingSoon".into(), json!({ "value": false }));

        let selected = match category {
            Category::SingleFamily => Some("isSingleFamily"),
            Category::MultiFamily => Some("isMultiFamily"),
            Category::All => None,
        };
        for key in HOME_TYPE_FILTERS {
            let on = selected.map_or(true, |s| s == *key);
            filters.insert((*key).into(), json!({ "value": on }));
        }

        Value::Object(filters)
    }

    fn payload(info: &StateInfo, category: Category, page: u32) -> Value {
        let b = info.zillow_bounds;
        json!({
            "searchQueryState": {
                "pagination": { "currentPage": page },
                "isMapVisible": false,
                "mapBounds": { "west": b.west, "east": b.east, "south": b.south, "north": b.north },
                "regionSelection": [
                    { "regionId": info.zillow_region_id, "regionType": info.zillow_region_type }
                ],
                "filterState": Self::filter_state(category),
                "isListVisible": true,
                "mapZoom": info.zillow_zoom,
                "usersSearchTerm": info.zillow_search_term
            },
            "wants": {
                "cat1": ["listResults", "mapResults"],
                "cat2": ["total"]
            },
            "requestId": page,
            "isDebugRequest": false
        })
    }

    pub(crate) fn parse_page(body: &str) -> Result<RawPage, SourceError> {
        let data: Value =
            serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

        if !data.is_object() {
            return Err(SourceError::UnexpectedShape("expected a JSON object".into()));
        }

        // A missing cat1 total means an empty result set, not an error.
        let total = data["categoryTotals"]["cat1"]["totalResultCount"]
            .as_u64()
            .map(|t| t as usize)
            .unwrap_or(0);
        let items = data["cat1"]["searchResults"]["listResults"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        Ok(RawPage::new(items, Some(total)))
    }

    fn property_type(raw: Option<&str>) -> PropertyType {
        match raw {
            Some("SINGLE_FAMILY") => PropertyType::SingleFamily,
            Some("MULTI_FAMILY") => PropertyType::MultiFamily,
            _ => PropertyType::Other,
        }
    }

    fn absolute_url(detail: Option<String>) -> String {
        match detail {
            Some(u) if u.starts_with("http") => u,
            Some(u) if !u.is_empty() => format!("{SITE_ROOT}{u}"),
            _ => String::new(),
        }
    }
}

impl SourceAdapter for ZillowAdapter {
    fn source(&self) -> Source {
        Source::Zillow
    }

    fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    fn categories(&self) -> &'static [Category] {
        CATEGORIES
    }

    fn request_page(&self, partition: &FetchPartition, page: u32) -> Result<RawPage, SourceError> {
        let info = regions::lookup(&partition.state)
            .ok_or_else(|| SourceError::UnsupportedState(partition.state.clone()))?;

        let resp = self
            .client
            .put(SEARCH_URL)
            .header("Accept", "*/*")
            .header("Referer", "https://www.zillow.com/")
            .header("Origin", SITE_ROOT)
            .json(&Self::payload(info, partition.category, page))
            .send()?;

        Self::parse_page(&read_body(resp)?)
    }

    fn transform(&self, partition: &FetchPartition, raw: &Value) -> Option<PropertyRecord> {
        let home: ZillowHome = match serde_json::from_value(raw.clone()) {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!(partition = %partition, error = %e, "undecodable zillow listing");
                return None;
            }
        };

        let mut record = PropertyRecord::new(home.id?, Source::Zillow);
        record.state = partition.state.clone();
        record.url = Self::absolute_url(home.detail_url);

        if let Some(info) = home.hdp_data.and_then(|h| h.home_info) {
            let zip = non_empty(info.zipcode);
            record.property_type = Self::property_type(info.home_type.as_deref());
            record.address = format_address(
                &non_empty(info.street_address),
                &non_empty(info.city),
                &non_empty(info.state),
                &zip,
            );
            record.zip_code = zip;
            record.square_footage = info.living_area.unwrap_or(0.0);
            record.bedrooms = info.bedrooms.unwrap_or(0);
            record.bathrooms = info.bathrooms.unwrap_or(0.0);
            record.year_built = info.year_built.unwrap_or(0) as i32;
            record.after_repair_value = info.price.unwrap_or(0.0);
        }

        record.has_valid_measurements().then_some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> ZillowAdapter {
        ZillowAdapter::new(SourceSettings::defaults_for(Source::Zillow)).unwrap()
    }

    #[test]
    fn only_the_partition_home_type_is_enabled() {
        let filters = ZillowAdapter::filter_state(Category::MultiFamily);
        assert_eq!(filters["isMultiFamily"]["value"], true);
        assert_eq!(filters["isSingleFamily"]["value"], false);
        assert_eq!(filters["isCondo"]["value"], false);
    }

    #[test]
    fn payload_carries_region_and_page() {
        let info = regions::lookup("Indiana").unwrap();
        let payload = ZillowAdapter::payload(info, Category::SingleFamily, 4);
        let q = &payload["searchQueryState"];
        assert_eq!(q["pagination"]["currentPage"], 4);
        assert_eq!(q["regionSelection"][0]["regionId"], 32149);
        assert_eq!(q["usersSearchTerm"], "Indianapolis, IN");
    }

    #[test]
    fn parses_totals_and_list_results() {
        let body = r#"{
            "categoryTotals": {"cat1": {"totalResultCount": 95}},
            "cat1": {"searchResults": {"listResults": [{"id": "1"}, {"id": "2"}]}}
        }"#;
        let page = ZillowAdapter::parse_page(body).unwrap();
        assert_eq!(page.total_known, Some(95));
        assert_eq!(page.items.len(), 2);

        let empty = ZillowAdapter::parse_page("{}").unwrap();
        assert_eq!(empty.total_known, Some(0));
        assert!(empty.items.is_empty());
    }

    #[test]
    fn transforms_listing_and_makes_url_absolute() {
        let raw = serde_json::json!({
            "id": "34567",
            "detailUrl": "/homedetails/45-Elm-Ave-Akron-OH-44301/34567_zpid/",
            "hdpData": {"homeInfo": {
                "homeType": "MULTI_FAMILY",
                "streetAddress": "45 Elm Ave",
                "city": "Akron",
                "state": "OH",
                "zipcode": "44301",
                "livingArea": 2100,
                "bedrooms": 4,
                "bathrooms": 2,
                "yearBuilt": 1920,
                "price": 149000
            }}
        });
        let partition = FetchPartition::new(Source::Zillow, "Ohio", Category::MultiFamily);
        let record = adapter().transform(&partition, &raw).unwrap();

        assert_eq!(record.property_id, "34567");
        assert_eq!(record.property_type, PropertyType::MultiFamily);
        assert_eq!(record.address, "45 Elm Ave, Akron, OH 44301");
        assert_eq!(record.after_repair_value, 149000.0);
        assert_eq!(
            record.url,
            "https://www.zillow.com/homedetails/45-Elm-Ave-Akron-OH-44301/34567_zpid/"
        );
    }

    #[test]
    fn negative_living_area_is_rejected() {
        let raw = serde_json::json!({"id": "1", "hdpData": {"homeInfo": {"livingArea": -5}}});
        let partition = FetchPartition::new(Source::Zillow, "Ohio", Category::SingleFamily);
        assert!(adapter().transform(&partition, &raw).is_none());
    }
}
