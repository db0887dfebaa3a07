use serde::{Deserialize, Serialize};

use super::lenient::{
    amount_or_zero, count_or_one, count_or_zero, lenient_string, one, optional_count, parse_number,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescription {
    pub address: PropertyAddress,
    #[serde(default)]
    pub details: PropertyDetails,
    #[serde(default)]
    pub taxes: PropertyTaxes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAddress {
    #[serde(default, deserialize_with = "lenient_string")]
    pub street_number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub street_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetails {
    #[serde(default, deserialize_with = "lenient_string")]
    pub property_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub style: String,
    #[serde(default = "one", deserialize_with = "count_or_one")]
    pub num_bedrooms: u32,
    #[serde(default = "one", deserialize_with = "count_or_one")]
    pub num_bathrooms: u32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sqft: String,
    #[serde(default, deserialize_with = "optional_count", skip_serializing_if = "Option::is_none")]
    pub year_built: Option<u32>,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub num_parking_spaces: u32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub basement1: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub basement_finished: String,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub basement_bedrooms: u32,
}

impl Default for PropertyDetails {
    fn default() -> Self {
        Self {
            property_type: String::new(),
            style: String::new(),
            num_bedrooms: 1,
            num_bathrooms: 1,
            sqft: String::new(),
            year_built: None,
            num_parking_spaces: 0,
            basement1: String::new(),
            basement_finished: String::new(),
            basement_bedrooms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTaxes {
    #[serde(default, deserialize_with = "amount_or_zero")]
    pub annual_amount: f64,
}

impl PropertyDescription {
    /// "12 Main St, Toronto, M5V 1A1", skipping empty parts.
    pub fn composed_address(&self) -> String {
        let a = &self.address;
        let street = format!("{} {}", a.street_number.trim(), a.street_name.trim())
            .trim()
            .to_string();

        [street.as_str(), a.city.trim(), a.zip.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyForm {
    #[serde(default, deserialize_with = "lenient_string")]
    pub street_number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub street_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postal_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub property_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub property_style: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bedrooms: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bathrooms: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub square_feet: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year_built: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub basement: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub basement_finished: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub basement_bedrooms: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub parking_spaces: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub taxes: String,
}

impl From<PropertyForm> for PropertyDescription {
    fn from(form: PropertyForm) -> Self {
        let count = |s: &str| parse_number(s).map(|n| n as u32).filter(|n| *n > 0);

        Self {
            address: PropertyAddress {
                street_number: form.street_number,
                street_name: form.street_name,
                city: form.city,
                zip: form.postal_code,
            },
            details: PropertyDetails {
                property_type: form.property_type,
                style: form.property_style,
                num_bedrooms: count(&form.bedrooms).unwrap_or(1),
                num_bathrooms: count(&form.bathrooms).unwrap_or(1),
                sqft: form.square_feet,
                year_built: count(&form.year_built),
                num_parking_spaces: count(&form.parking_spaces).unwrap_or(0),
                basement1: form.basement,
                basement_finished: form.basement_finished,
                basement_bedrooms: count(&form.basement_bedrooms).unwrap_or(0),
            },
            taxes: PropertyTaxes {
                annual_amount: parse_number(&form.taxes).unwrap_or(0.0),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubmittedProperty {
    Described(PropertyDescription),
    Form(PropertyForm),
}

impl From<SubmittedProperty> for PropertyDescription {
    fn from(submitted: SubmittedProperty) -> Self {
        match submitted {
            SubmittedProperty::Described(description) => description,
            SubmittedProperty::Form(form) => form.into(),
        }
    }
}
