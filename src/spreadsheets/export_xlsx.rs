use crate::domain::PropertyRecord;
use crate::errors::ServerError;
use crate::responses::xlsx_response;
use crate::responses::ResultResp;
use rust_xlsxwriter::{Workbook, Worksheet};

const HEADERS: [&str; 12] = [
    "Property ID",
    "Source",
    "State",
    "Property Type",
    "Address",
    "Zip",
    "Square Footage",
    "Beds",
    "Baths",
    "Year Built",
    "ARV",
    "URL",
];

fn text(ws: &mut Worksheet, row: u32, col: u16, value: &str) -> Result<(), ServerError> {
    ws.write_string(row, col, value)
        .map(|_| ())
        .map_err(|e| ServerError::XlsxError(format!("Failed to write {}: {}", HEADERS[col as usize], e)))
}

fn number(ws: &mut Worksheet, row: u32, col: u16, value: f64) -> Result<(), ServerError> {
    ws.write_number(row, col, value)
        .map(|_| ())
        .map_err(|e| ServerError::XlsxError(format!("Failed to write {}: {}", HEADERS[col as usize], e)))
}

/// Builds the workbook bytes; split from the response so it can be tested.
pub fn verified_workbook(properties: &[PropertyRecord]) -> Result<Vec<u8>, ServerError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        text(worksheet, 0, col as u16, header)?;
    }

    for (i, p) in properties.iter().enumerate() {
        let r = (i + 1) as u32;

        text(worksheet, r, 0, &p.property_id)?;
        text(worksheet, r, 1, p.source.as_str())?;
        text(worksheet, r, 2, &p.state)?;
        text(worksheet, r, 3, p.property_type.as_str())?;
        text(worksheet, r, 4, &p.address)?;
        text(worksheet, r, 5, &p.zip_code)?;
        number(worksheet, r, 6, p.square_footage)?;
        number(worksheet, r, 7, p.bedrooms as f64)?;
        number(worksheet, r, 8, p.bathrooms)?;
        number(worksheet, r, 9, f64::from(p.year_built))?;
        number(worksheet, r, 10, p.after_repair_value)?;
        text(worksheet, r, 11, &p.url)?;
    }

    workbook
        .save_to_buffer()
        .map_err(|e| ServerError::XlsxError(format!("Failed to save workbook: {}", e)))
}

pub fn export_verified_xlsx(properties: &[PropertyRecord], stamp: &str) -> ResultResp {
    let buffer = verified_workbook(properties)?;
    xlsx_response(buffer, &format!("verified_properties_{stamp}.xlsx"))
}
