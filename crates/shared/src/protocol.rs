//! Wire shapes of the validation and account-recovery endpoints.
//!
//! The server is lenient about types (amounts occasionally arrive as strings,
//! field errors as lists) and several deployments renamed price fields over
//! time, so decoding here accepts the known spellings and normalises them.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{CustomerId, PriceKind, ReservationType},
    error::{FieldErrors, StepFailure, UNSPECIFIED_REJECTION},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepResponse {
    #[serde(default, deserialize_with = "de_flag")]
    pub success: bool,
    #[serde(default, deserialize_with = "de_field_errors")]
    pub errors: FieldErrors,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub price_data: Option<Value>,
    #[serde(default, deserialize_with = "de_customer_id")]
    pub customer_id: Option<CustomerId>,
    /// Legacy spelling; some responses carry both.
    #[serde(default, deserialize_with = "de_customer_id")]
    pub customerid: Option<CustomerId>,
    #[serde(default)]
    pub reservation_type: Option<String>,
    #[serde(default)]
    pub customer_site_url: Option<String>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub delivery_required: bool,
}

impl StepResponse {
    /// Unknown names decode to `None`; the caller decides what that means for
    /// the step at hand.
    pub fn reservation_type(&self) -> Option<ReservationType> {
        self.reservation_type
            .as_deref()
            .and_then(|raw| raw.parse().ok())
    }

    /// Newer servers report the matched customer at the top level (as
    /// `customer_id`, `customerid` or both), older ones only inside the price
    /// breakdown.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id.or(self.customerid).or_else(|| {
            self.price_data
                .as_ref()
                .and_then(|data| data.get("customer_id"))
                .and_then(customer_id_from_value)
        })
    }

    pub fn price_breakdown(&self, kind: PriceKind) -> Result<PriceBreakdown, serde_json::Error> {
        let data = self
            .price_data
            .as_ref()
            .ok_or_else(|| serde_json::Error::custom("missing price_data"))?;
        PriceBreakdown::decode(kind, data, self.delivery_required)
    }

    pub fn failure(&self) -> StepFailure {
        if !self.errors.is_empty() {
            return StepFailure::validation(self.errors.clone(), self.error.clone());
        }
        StepFailure::business(
            self.error
                .clone()
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| UNSPECIFIED_REJECTION.to_string()),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordResetResponse {
    #[serde(default, deserialize_with = "de_flag")]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalPrice {
    #[serde(deserialize_with = "de_count")]
    pub num_days: u32,
    #[serde(deserialize_with = "de_amount")]
    pub base_price: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub multi_day_discount: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub multi_day_discount_pct: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub specific_discount: f64,
    #[serde(default, deserialize_with = "de_text")]
    pub specific_discount_label: String,
    #[serde(default, deserialize_with = "de_text")]
    pub extra_miles: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub extra_miles_cost: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub customer_discount: f64,
    #[serde(deserialize_with = "de_amount")]
    pub subtotal: f64,
    #[serde(alias = "tax_amt", deserialize_with = "de_amount")]
    pub tax_amount: f64,
    #[serde(default, alias = "tax_rate_pct", deserialize_with = "de_amount")]
    pub tax_rate_as_percent: f64,
    #[serde(alias = "total", deserialize_with = "de_amount")]
    pub total_with_tax: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub reservation_deposit: f64,
    #[serde(skip)]
    pub delivery_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPrice {
    #[serde(deserialize_with = "de_count")]
    pub num_drivers: u32,
    #[serde(deserialize_with = "de_amount")]
    pub driver_cost: f64,
    #[serde(default, deserialize_with = "de_count")]
    pub num_passengers: u32,
    #[serde(default, deserialize_with = "de_amount")]
    pub passenger_cost: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub customer_discount: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub specific_discount: f64,
    #[serde(default, deserialize_with = "de_text")]
    pub specific_discount_label: String,
    #[serde(deserialize_with = "de_amount")]
    pub subtotal: f64,
    #[serde(alias = "tax_amt", deserialize_with = "de_amount")]
    pub tax_amount: f64,
    #[serde(default, alias = "tax_rate_pct", deserialize_with = "de_amount")]
    pub tax_rate_as_percent: f64,
    #[serde(alias = "total", deserialize_with = "de_amount")]
    pub total_with_tax: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceBreakdown {
    DailyRate(RentalPrice),
    HeadCount(EventPrice),
}

/// One rendered slot of the price breakdown, keyed by the element class the
/// value is written into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceLine {
    pub class: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PriceVisibility {
    pub specific_discount: bool,
    pub customer_discount: bool,
    pub delivery_smallprint: bool,
}

impl PriceBreakdown {
    pub fn decode(
        kind: PriceKind,
        price_data: &Value,
        delivery_required: bool,
    ) -> Result<Self, serde_json::Error> {
        match kind {
            PriceKind::DailyRate => {
                let mut price = RentalPrice::deserialize(price_data)?;
                price.delivery_required = delivery_required;
                Ok(Self::DailyRate(price))
            }
            PriceKind::HeadCount => Ok(Self::HeadCount(EventPrice::deserialize(price_data)?)),
        }
    }

    pub fn total_with_tax(&self) -> f64 {
        match self {
            Self::DailyRate(price) => price.total_with_tax,
            Self::HeadCount(price) => price.total_with_tax,
        }
    }

    pub fn lines(&self) -> Vec<PriceLine> {
        match self {
            Self::DailyRate(p) => vec![
                line("price-numdays", plural(p.num_days, "day")),
                line("price-rental-total", money(p.base_price)),
                line("price-multi-day-discount", money(p.multi_day_discount)),
                line("price-multi-day-discount-pct", p.multi_day_discount_pct.to_string()),
                line("price-specific-discount", money(p.specific_discount)),
                line("price-specific-discount-label", p.specific_discount_label.clone()),
                line("price-extra-miles", p.extra_miles.clone()),
                line("price-extra-miles-cost", money(p.extra_miles_cost)),
                line("price-customer-discount", money(p.customer_discount)),
                line("price-subtotal", money(p.subtotal)),
                line("price-tax", money(p.tax_amount)),
                line("price-tax-rate", p.tax_rate_as_percent.to_string()),
                line("price-total", money(p.total_with_tax)),
                line("price-reservation-deposit", money(p.reservation_deposit)),
            ],
            Self::HeadCount(p) => vec![
                line("price-nodrv", plural(p.num_drivers, "driver")),
                line("price-drvcost", money(p.driver_cost)),
                line("price-nopax", plural(p.num_passengers, "passenger")),
                line("price-paxcost", money(p.passenger_cost)),
                line("price-customer-discount", money(p.customer_discount)),
                line("price-specific-discount", money(p.specific_discount)),
                line("price-specific-discount-label", p.specific_discount_label.clone()),
                line("price-subtotal", money(p.subtotal)),
                line("price-tax", money(p.tax_amount)),
                line("price-tax-rate", p.tax_rate_as_percent.to_string()),
                line("price-total", money(p.total_with_tax)),
            ],
        }
    }

    pub fn visibility(&self) -> PriceVisibility {
        match self {
            Self::DailyRate(p) => PriceVisibility {
                specific_discount: p.specific_discount != 0.0,
                customer_discount: p.customer_discount != 0.0,
                delivery_smallprint: p.delivery_required,
            },
            Self::HeadCount(p) => PriceVisibility {
                specific_discount: p.specific_discount != 0.0,
                customer_discount: p.customer_discount != 0.0,
                delivery_smallprint: false,
            },
        }
    }
}

fn line(class: &'static str, text: String) -> PriceLine {
    PriceLine { class, text }
}

pub fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

pub fn plural(count: u32, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| D::Error::custom("amount out of range")),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(0.0),
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<f64>()
            .map_err(|err| D::Error::custom(format!("invalid amount '{raw}': {err}"))),
        Some(other) => Err(D::Error::custom(format!("expected amount, got {other}"))),
    }
}

fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|count| u32::try_from(count).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid count {number}"))),
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<u32>()
            .map_err(|err| D::Error::custom(format!("invalid count '{raw}': {err}"))),
        Some(other) => Err(D::Error::custom(format!("expected count, got {other}"))),
    }
}

fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|value| value != 0.0),
        Some(Value::String(raw)) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Some(other) => return Err(D::Error::custom(format!("expected flag, got {other}"))),
    })
}

fn de_customer_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<CustomerId>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(customer_id_from_value))
}

fn customer_id_from_value(value: &Value) -> Option<CustomerId> {
    match value {
        Value::Number(number) => number.as_i64().map(CustomerId),
        Value::String(raw) => raw.trim().parse().ok().map(CustomerId),
        _ => None,
    }
}

/// Form errors arrive either as `{field: "message"}` or Django-style
/// `{field: ["message", ...]}`; lists are joined into one line.
fn de_field_errors<'de, D: Deserializer<'de>>(deserializer: D) -> Result<FieldErrors, D::Error> {
    let Some(map) = Option::<Map<String, Value>>::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(map
        .into_iter()
        .map(|(field, message)| (field, error_text(&message)))
        .collect())
}

fn error_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(error_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(object) => object.get("message").map(error_text).unwrap_or_default(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::FailureKind;

    fn response(value: Value) -> StepResponse {
        serde_json::from_value(value).expect("decode step response")
    }

    #[test]
    fn rental_price_renders_display_lines() {
        let body = response(json!({
            "success": true,
            "delivery_required": true,
            "price_data": {
                "num_days": 3,
                "base_price": 897.0,
                "multi_day_discount": 44.85,
                "multi_day_discount_pct": 5,
                "specific_discount": 0,
                "specific_discount_label": null,
                "extra_miles": 100,
                "extra_miles_cost": 60,
                "subtotal": 912.15,
                "tax_amount": 66.13,
                "tax_rate_as_percent": 7.25,
                "total_with_tax": 978.28,
                "reservation_deposit": 489.14
            }
        }));
        let price = body.price_breakdown(PriceKind::DailyRate).expect("price");
        let lines = price.lines();
        let text = |class: &str| {
            lines
                .iter()
                .find(|line| line.class == class)
                .map(|line| line.text.clone())
                .expect("line present")
        };
        assert_eq!(text("price-numdays"), "3 days");
        assert_eq!(text("price-rental-total"), "897.00");
        assert_eq!(text("price-multi-day-discount-pct"), "5");
        assert_eq!(text("price-extra-miles"), "100");
        assert_eq!(text("price-tax-rate"), "7.25");
        assert_eq!(text("price-total"), "978.28");
        assert_eq!(text("price-specific-discount-label"), "");
        assert_eq!(
            price.visibility(),
            PriceVisibility {
                specific_discount: false,
                customer_discount: false,
                delivery_smallprint: true,
            }
        );
    }

    #[test]
    fn event_price_accepts_legacy_tax_names_and_string_amounts() {
        let body = response(json!({
            "success": true,
            "price_data": {
                "num_drivers": 1,
                "driver_cost": "295.00",
                "num_passengers": 2,
                "passenger_cost": 50,
                "customer_discount": 10,
                "specific_discount": 15,
                "specific_discount_label": "Spring special",
                "subtotal": 320,
                "tax_amt": 23.2,
                "tax_rate_pct": 7.25,
                "total": 343.2
            }
        }));
        let PriceBreakdown::HeadCount(price) =
            body.price_breakdown(PriceKind::HeadCount).expect("price")
        else {
            panic!("expected head-count pricing");
        };
        assert_eq!(price.driver_cost, 295.0);
        assert_eq!(price.tax_amount, 23.2);
        assert_eq!(price.total_with_tax, 343.2);

        let breakdown = PriceBreakdown::HeadCount(price);
        let lines = breakdown.lines();
        assert_eq!(lines[0].text, "1 driver");
        assert_eq!(lines[2].text, "2 passengers");
        assert!(breakdown.visibility().specific_discount);
        assert!(breakdown.visibility().customer_discount);
    }

    #[test]
    fn missing_price_data_is_a_decode_error() {
        let body = response(json!({ "success": true }));
        assert!(body.price_breakdown(PriceKind::DailyRate).is_err());
    }

    #[test]
    fn field_errors_keep_server_order_and_join_lists() {
        let body = response(json!({
            "success": false,
            "errors": {
                "phone": ["This field is required."],
                "email": ["Enter a valid email address.", "Already in use."]
            }
        }));
        assert_eq!(
            body.errors,
            vec![
                ("phone".to_string(), "This field is required.".to_string()),
                (
                    "email".to_string(),
                    "Enter a valid email address. Already in use.".to_string()
                ),
            ]
        );
        let failure = body.failure();
        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(failure.message, "This field is required.");
    }

    #[test]
    fn business_failure_uses_top_level_error() {
        let body = response(json!({
            "success": false,
            "errors": {},
            "error": "No vehicles are available for those dates."
        }));
        let failure = body.failure();
        assert_eq!(failure.kind, FailureKind::Business);
        assert_eq!(failure.message, "No vehicles are available for those dates.");

        let silent = response(json!({ "success": false, "error": "  " }));
        assert_eq!(silent.failure().message, UNSPECIFIED_REJECTION);
    }

    #[test]
    fn customer_id_is_read_from_any_known_location() {
        assert_eq!(
            response(json!({ "success": true, "customerid": "42" })).customer_id(),
            Some(CustomerId(42))
        );
        assert_eq!(
            response(json!({ "success": true, "price_data": { "customer_id": 7 } })).customer_id(),
            Some(CustomerId(7))
        );
        assert_eq!(
            response(json!({ "success": true, "customer_id": null })).customer_id(),
            None
        );
    }

    #[test]
    fn both_customer_id_spellings_in_one_response_decode() {
        let body = response(json!({
            "success": true,
            "customer_id": 314,
            "customerid": "314"
        }));
        assert_eq!(body.customer_id(), Some(CustomerId(314)));

        let legacy_only = response(json!({ "success": true, "customer_id": null, "customerid": 9 }));
        assert_eq!(legacy_only.customer_id(), Some(CustomerId(9)));
    }

    #[test]
    fn reservation_type_tolerates_unknown_values() {
        let body = response(json!({ "success": true, "reservation_type": "subpay" }));
        assert_eq!(
            body.reservation_type(),
            Some(ReservationType::SubscriptionPayment)
        );
        let body = response(json!({ "success": true, "reservation_type": "mystery" }));
        assert_eq!(body.reservation_type(), None);
    }

    #[test]
    fn money_and_plural_formatting() {
        assert_eq!(money(12.5), "12.50");
        assert_eq!(money(0.0), "0.00");
        assert_eq!(plural(1, "day"), "1 day");
        assert_eq!(plural(0, "passenger"), "0 passengers");
    }
}
