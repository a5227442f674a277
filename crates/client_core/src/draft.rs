use shared::domain::{CustomerId, ReservationType, SiteVariant, Step};

/// Field values of the reservation form, in page order.
///
/// Setting a name that is already present replaces its value in place, the
/// same way serializing a form into a key/value map keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationDraft {
    fields: Vec<(String, String)>,
}

impl ReservationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Body of one validation request: the draft as-is, then the routing
    /// markers the server expects for the site variant. A customer id learned
    /// earlier in the wizard fills `customerid` only when the form left it
    /// blank.
    pub fn form_params(&self, markers: &SubmissionMarkers) -> Vec<(String, String)> {
        let mut params = self.clone();
        if let Some(customer_id) = markers.customer_id {
            if params.get("customerid").map_or(true, |value| value.trim().is_empty()) {
                params.set("customerid", customer_id.0.to_string());
            }
        }
        params.set("reservationType", markers.reservation_type.slug());
        params.set("step", markers.step.as_str());
        match markers.site {
            SiteVariant::Marketing => {
                params.set("method", markers.reservation_type.slug());
            }
            SiteVariant::CustomerPortal => {
                let create = markers.step == Step::Confirm;
                params.set("createReservation", create.to_string());
            }
        }
        params.fields
    }
}

impl<K, V> FromIterator<(K, V)> for ReservationDraft
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut draft = Self::new();
        for (name, value) in iter {
            draft.set(name, value);
        }
        draft
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SubmissionMarkers {
    pub site: SiteVariant,
    pub reservation_type: ReservationType,
    pub step: Step,
    pub customer_id: Option<CustomerId>,
}
