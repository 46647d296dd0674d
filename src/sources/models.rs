use crate::sources::lenient;
use serde::Deserialize;

// realtor: data.home_search.properties[]
//  ├── property_id
//  ├── list_price
//  ├── permalink
//  ├── description
//  │    ├── beds
//  │    ├── baths_consolidated
//  │    ├── sqft
//  │    ├── type
//  │    └── year_built
//  └── location
//       └── address
//            ├── line
//            ├── city
//            ├── state_code
//            └── postal_code

#[derive(Debug, Deserialize)]
pub struct RealtorHome {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub property_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub list_price: Option<f64>,
    pub permalink: Option<String>,
    pub description: Option<RealtorDescription>,
    pub location: Option<RealtorLocation>,
}

#[derive(Debug, Deserialize)]
pub struct RealtorDescription {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub beds: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub baths_consolidated: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub sqft: Option<f64>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub year_built: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RealtorLocation {
    pub address: Option<RealtorAddress>,
}

#[derive(Debug, Deserialize)]
pub struct RealtorAddress {
    pub line: Option<String>,
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub postal_code: Option<String>,
}

// zillow: cat1.searchResults.listResults[]
//  ├── id
//  ├── detailUrl
//  └── hdpData
//       └── homeInfo
//            ├── homeType
//            ├── streetAddress / city / state / zipcode
//            ├── livingArea
//            ├── bedrooms / bathrooms
//            ├── yearBuilt
//            └── price

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZillowHome {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub id: Option<String>,
    pub detail_url: Option<String>,
    pub hdp_data: Option<ZillowHdpData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZillowHdpData {
    pub home_info: Option<ZillowHomeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZillowHomeInfo {
    pub home_type: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub living_area: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub bedrooms: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub bathrooms: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub year_built: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub price: Option<f64>,
}

// redfin: payload.homes[]; several fields are wrapped as {"value": ...}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedfinHome {
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub property_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub property_type: Option<i64>,
    pub street_line: Option<RedfinText>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub sq_ft: Option<RedfinNumber>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub beds: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub baths: Option<f64>,
    pub year_built: Option<RedfinNumber>,
    pub price: Option<RedfinNumber>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedfinText {
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedfinNumber {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub value: Option<f64>,
}

impl RedfinNumber {
    pub fn get(field: &Option<RedfinNumber>) -> Option<f64> {
        field.as_ref().and_then(|n| n.value)
    }
}
