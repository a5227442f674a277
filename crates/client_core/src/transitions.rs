//! Server-directed wizard transitions.
//!
//! A response is first reduced to a [`ResponseShape`] by [`classify`]; the
//! `(step, shape)` pair then selects one row of [`TRANSITIONS`], which names
//! the next phase and the effects to apply. Pairs without a row are protocol
//! violations and get reported like a transport failure.

use shared::{
    domain::{CustomerId, ReservationType, SiteVariant, Step},
    error::StepFailure,
    protocol::{PriceBreakdown, StepResponse},
};

use crate::{state::WizardPhase, view::PricePlacement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseShape {
    /// Priced, and the details matched a customer on file.
    PricedExistingCustomer,
    /// Priced, no matching customer: payment doubles as sign-up.
    PricedNewCustomer,
    /// Priced for a signed-in portal customer, awaiting confirmation.
    PricedForConfirm,
    /// Password matched an account; payment follows without user input.
    LoginValidated,
    /// A new account password was accepted.
    PasswordCreated,
    Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    RenderPrice(PricePlacement),
    /// Store the customer reported by the response (or forget a previous one).
    RecordCustomer,
    ShowPanel(Step),
    HidePanel(Step),
    HideError(Step),
    ChainPayment,
    Navigate,
}

#[derive(Debug)]
pub struct Transition {
    pub step: Step,
    pub shape: ResponseShape,
    pub next: WizardPhase,
    pub effects: &'static [Effect],
}

const fn redirect(step: Step) -> Transition {
    Transition {
        step,
        shape: ResponseShape::Redirect,
        next: WizardPhase::Redirected,
        effects: &[Effect::Navigate],
    }
}

pub static TRANSITIONS: &[Transition] = &[
    Transition {
        step: Step::Details,
        shape: ResponseShape::PricedExistingCustomer,
        next: WizardPhase::Login,
        effects: &[
            Effect::RenderPrice(PricePlacement::ExistingCustomer),
            Effect::RecordCustomer,
            Effect::HidePanel(Step::Payment),
            Effect::HideError(Step::Payment),
            Effect::ShowPanel(Step::Login),
        ],
    },
    Transition {
        step: Step::Details,
        shape: ResponseShape::PricedNewCustomer,
        next: WizardPhase::Payment,
        effects: &[
            Effect::RenderPrice(PricePlacement::NewCustomer),
            Effect::RecordCustomer,
            Effect::HidePanel(Step::Login),
            Effect::HideError(Step::Password),
            Effect::ShowPanel(Step::Payment),
        ],
    },
    Transition {
        step: Step::Details,
        shape: ResponseShape::PricedForConfirm,
        next: WizardPhase::Confirm,
        effects: &[
            Effect::RenderPrice(PricePlacement::Inline),
            Effect::ShowPanel(Step::Confirm),
        ],
    },
    Transition {
        step: Step::Password,
        shape: ResponseShape::LoginValidated,
        next: WizardPhase::Payment,
        effects: &[Effect::RecordCustomer, Effect::ChainPayment],
    },
    Transition {
        step: Step::Password,
        shape: ResponseShape::PasswordCreated,
        next: WizardPhase::Payment,
        effects: &[Effect::ShowPanel(Step::Payment)],
    },
    redirect(Step::Login),
    redirect(Step::Payment),
    redirect(Step::Confirm),
    redirect(Step::Subscribe),
    redirect(Step::Unsubscribe),
];

pub fn lookup(step: Step, shape: ResponseShape) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|transition| transition.step == step && transition.shape == shape)
}

/// Everything the effects of an accepted response may need.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub shape: ResponseShape,
    pub price: Option<PriceBreakdown>,
    pub customer: Option<CustomerId>,
    pub chain_type: Option<ReservationType>,
    pub redirect: Option<String>,
}

impl Accepted {
    fn new(shape: ResponseShape) -> Self {
        Self {
            shape,
            price: None,
            customer: None,
            chain_type: None,
            redirect: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Accepted(Accepted),
    Rejected(StepFailure),
    Malformed(String),
}

pub fn classify(
    site: SiteVariant,
    reservation_type: ReservationType,
    step: Step,
    response: &StepResponse,
) -> Classification {
    if !response.success {
        return Classification::Rejected(response.failure());
    }

    match step {
        Step::Details => classify_details(site, reservation_type, response),
        Step::Password => classify_password(response),
        Step::Login | Step::Payment | Step::Confirm | Step::Subscribe | Step::Unsubscribe => {
            match redirect_target(reservation_type, response) {
                Some(target) => Classification::Accepted(Accepted {
                    redirect: Some(target),
                    ..Accepted::new(ResponseShape::Redirect)
                }),
                None => Classification::Malformed(format!(
                    "{step} accepted without a redirect target"
                )),
            }
        }
    }
}

fn classify_details(
    site: SiteVariant,
    reservation_type: ReservationType,
    response: &StepResponse,
) -> Classification {
    let price = match reservation_type.price_kind() {
        Some(kind) => match response.price_breakdown(kind) {
            Ok(price) => Some(price),
            Err(err) => {
                return Classification::Malformed(format!("unreadable price_data: {err}"));
            }
        },
        None => None,
    };
    let customer = response.customer_id();
    let shape = match (site, customer) {
        (SiteVariant::CustomerPortal, _) => ResponseShape::PricedForConfirm,
        (SiteVariant::Marketing, Some(_)) => ResponseShape::PricedExistingCustomer,
        (SiteVariant::Marketing, None) => ResponseShape::PricedNewCustomer,
    };
    Classification::Accepted(Accepted {
        price,
        customer,
        ..Accepted::new(shape)
    })
}

/// A validated sign-in names the booking it belongs to so payment can follow
/// immediately; a bare success means a new password was accepted.
fn classify_password(response: &StepResponse) -> Classification {
    match response.reservation_type().filter(|kind| kind.is_booking()) {
        Some(kind) => Classification::Accepted(Accepted {
            customer: response.customer_id(),
            chain_type: Some(kind),
            ..Accepted::new(ResponseShape::LoginValidated)
        }),
        None => Classification::Accepted(Accepted::new(ResponseShape::PasswordCreated)),
    }
}

/// Bookings finish on the customer site, everything else on a success page.
/// The reservation type echoed by the server wins over the submitted one.
pub fn redirect_target(
    submitted: ReservationType,
    response: &StepResponse,
) -> Option<String> {
    let kind = response.reservation_type().unwrap_or(submitted);
    let customer_site = non_empty(response.customer_site_url.as_deref());
    let success_page = non_empty(response.success_url.as_deref());
    if kind.is_booking() {
        customer_site.or(success_page)
    } else {
        success_page.or(customer_site)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
