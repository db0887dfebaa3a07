use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::property::{PropertyDescription, SubmittedProperty};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, deserialize_with = "submitted_property")]
    pub property_data: Option<PropertyDescription>,
    /// Estimate JSON exactly as the browser held it. Stored verbatim.
    #[serde(default)]
    pub estimate_data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub preferred_contact: Option<String>,
    #[serde(default)]
    pub interested_in: Option<String>,
    #[serde(default)]
    pub property_address: Option<String>,
}

fn submitted_property<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<PropertyDescription>, D::Error> {
    Ok(Option::<SubmittedProperty>::deserialize(d)?.map(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lead_without_property_or_estimate() {
        let lead: LeadSubmission = serde_json::from_value(json!({
            "name": "Ada", "email": "ada@example.com", "phone": "555-0100",
        }))
        .unwrap();
        assert!(lead.property_data.is_none());
        assert!(lead.estimate_data.is_none());

        let lead: LeadSubmission = serde_json::from_value(json!({
            "name": "Ada", "propertyData": null, "estimateData": null,
        }))
        .unwrap();
        assert!(lead.property_data.is_none());
        assert!(lead.estimate_data.is_none());
    }

    #[test]
    fn lead_accepts_the_stored_form_shape() {
        let lead: LeadSubmission = serde_json::from_value(json!({
            "name": "Ada",
            "propertyData": { "streetNumber": "5", "streetName": "Elm", "city": "Guelph", "postalCode": "N1H" },
            "estimateData": { "estimate": { "value": 1 }, "source": "deepseek" },
        }))
        .unwrap();
        let property = lead.property_data.unwrap();
        assert_eq!(property.composed_address(), "5 Elm, Guelph, N1H");
    }

    #[test]
    fn contact_optional_tags() {
        let contact: ContactSubmission = serde_json::from_value(json!({
            "name": "Bo", "email": "bo@example.com", "phone": "1", "message": "hi",
            "preferredContact": "email",
        }))
        .unwrap();
        assert_eq!(contact.preferred_contact.as_deref(), Some("email"));
        assert!(contact.interested_in.is_none());
        assert!(contact.property_address.is_none());
    }
}
