use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);
    };
}

id_newtype!(CustomerId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// How the server prices a reservation type on the `details` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceKind {
    DailyRate,
    HeadCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationType {
    Rental,
    Joyride,
    Perfexp,
    Gift,
    NewsletterSubscribe,
    NewsletterUnsubscribe,
    SubscriptionPayment,
    Survey,
}

impl ReservationType {
    pub const ALL: [ReservationType; 8] = [
        Self::Rental,
        Self::Joyride,
        Self::Perfexp,
        Self::Gift,
        Self::NewsletterSubscribe,
        Self::NewsletterUnsubscribe,
        Self::SubscriptionPayment,
        Self::Survey,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::Rental => "rental",
            Self::Joyride => "joyride",
            Self::Perfexp => "perfexp",
            Self::Gift => "gift",
            Self::NewsletterSubscribe => "newsletter-subscribe",
            Self::NewsletterUnsubscribe => "newsletter-unsubscribe",
            Self::SubscriptionPayment => "subscription-payment",
            Self::Survey => "survey",
        }
    }

    /// Rentals and the two driving events end at the customer site; everything
    /// else finishes on a plain success page.
    pub fn is_booking(self) -> bool {
        matches!(self, Self::Rental | Self::Joyride | Self::Perfexp)
    }

    pub fn price_kind(self) -> Option<PriceKind> {
        match self {
            Self::Rental => Some(PriceKind::DailyRate),
            Self::Joyride | Self::Perfexp => Some(PriceKind::HeadCount),
            _ => None,
        }
    }
}

impl fmt::Display for ReservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReservationType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = match value.trim() {
            "rental" => Self::Rental,
            "joyride" => Self::Joyride,
            "perfexp" => Self::Perfexp,
            "gift" => Self::Gift,
            "newsletter-subscribe" | "newsletter" | "subscribe" => Self::NewsletterSubscribe,
            "newsletter-unsubscribe" | "unsubscribeNewsletter" | "unsubscribe" => {
                Self::NewsletterUnsubscribe
            }
            "subscription-payment" | "submitSubPay" | "subpay" => Self::SubscriptionPayment,
            "survey" | "submitSurvey" => Self::Survey,
            other => return Err(UnknownVariant::new("reservation type", other)),
        };
        Ok(parsed)
    }
}

impl Serialize for ReservationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.slug())
    }
}

impl<'de> Deserialize<'de> for ReservationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Details,
    Password,
    Login,
    Payment,
    Confirm,
    Subscribe,
    Unsubscribe,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Password => "password",
            Self::Login => "login",
            Self::Payment => "payment",
            Self::Confirm => "confirm",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = match value.trim() {
            "details" => Self::Details,
            "password" => Self::Password,
            "login" => Self::Login,
            "payment" => Self::Payment,
            "confirm" => Self::Confirm,
            "subscribe" => Self::Subscribe,
            "unsubscribe" => Self::Unsubscribe,
            other => return Err(UnknownVariant::new("step", other)),
        };
        Ok(parsed)
    }
}

/// Which deployment the wizard runs on. The public site handles sign-in and
/// account creation inline; the customer portal assumes a signed-in customer
/// and ends with an explicit confirm step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteVariant {
    #[default]
    Marketing,
    CustomerPortal,
}

impl FromStr for SiteVariant {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "marketing" | "public" => Ok(Self::Marketing),
            "customer-portal" | "customer_portal" | "portal" => Ok(Self::CustomerPortal),
            other => Err(UnknownVariant::new("site variant", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_type_slugs_round_trip() {
        for kind in ReservationType::ALL {
            assert_eq!(kind.slug().parse::<ReservationType>(), Ok(kind));
        }
    }

    #[test]
    fn legacy_reservation_type_names_are_accepted() {
        assert_eq!(
            "submitSubPay".parse::<ReservationType>(),
            Ok(ReservationType::SubscriptionPayment)
        );
        assert_eq!(
            "subpay".parse::<ReservationType>(),
            Ok(ReservationType::SubscriptionPayment)
        );
        assert_eq!(
            "newsletter".parse::<ReservationType>(),
            Ok(ReservationType::NewsletterSubscribe)
        );
        assert_eq!(
            "unsubscribeNewsletter".parse::<ReservationType>(),
            Ok(ReservationType::NewsletterUnsubscribe)
        );
        assert!("validateLogin".parse::<ReservationType>().is_err());
    }

    #[test]
    fn only_driving_products_are_bookings() {
        let bookings: Vec<_> = ReservationType::ALL
            .into_iter()
            .filter(|kind| kind.is_booking())
            .collect();
        assert_eq!(
            bookings,
            vec![
                ReservationType::Rental,
                ReservationType::Joyride,
                ReservationType::Perfexp
            ]
        );
        assert_eq!(ReservationType::Gift.price_kind(), None);
        assert_eq!(
            ReservationType::Perfexp.price_kind(),
            Some(PriceKind::HeadCount)
        );
    }

    #[test]
    fn reservation_type_deserializes_from_wire_alias() {
        let parsed: ReservationType = serde_json::from_str("\"submitSurvey\"").expect("parse");
        assert_eq!(parsed, ReservationType::Survey);
        assert_eq!(
            serde_json::to_string(&ReservationType::NewsletterSubscribe).expect("serialize"),
            "\"newsletter-subscribe\""
        );
    }

    #[test]
    fn site_variant_parses_loose_spellings() {
        assert_eq!("Portal".parse::<SiteVariant>(), Ok(SiteVariant::CustomerPortal));
        assert_eq!(
            "customer_portal".parse::<SiteVariant>(),
            Ok(SiteVariant::CustomerPortal)
        );
        assert_eq!("marketing".parse::<SiteVariant>(), Ok(SiteVariant::Marketing));
        assert!("backoffice".parse::<SiteVariant>().is_err());
    }
}
