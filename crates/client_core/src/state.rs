use std::collections::BTreeSet;

use shared::domain::{CustomerId, ReservationType, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardPhase {
    Details,
    /// Recognised customer signs in (or sets a password) before paying.
    Login,
    Payment,
    Confirm,
    /// The browser was sent elsewhere; nothing more happens in this wizard.
    Redirected,
}

#[derive(Debug, Clone)]
pub struct WizardState {
    pub phase: WizardPhase,
    pub reservation_type: ReservationType,
    pub existing_customer: Option<CustomerId>,
    pub redirect: Option<String>,
    pub(crate) in_flight: BTreeSet<Step>,
    pub(crate) generation: u64,
}

impl WizardState {
    pub fn new(reservation_type: ReservationType) -> Self {
        Self {
            phase: WizardPhase::Details,
            reservation_type,
            existing_customer: None,
            redirect: None,
            in_flight: BTreeSet::new(),
            generation: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == WizardPhase::Redirected
    }

    pub fn in_flight(&self) -> impl Iterator<Item = Step> + '_ {
        self.in_flight.iter().copied()
    }
}
