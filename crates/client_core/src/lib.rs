use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::{ReservationType, SiteVariant, Step},
    error::{FailureKind, StepFailure, COMMUNICATION_ERROR, UNSPECIFIED_REJECTION},
};
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

pub mod config;
pub mod draft;
pub mod error;
pub mod state;
pub mod transitions;
pub mod transport;
pub mod view;

pub use config::ClientSettings;
pub use draft::{ReservationDraft, SubmissionMarkers};
pub use state::{WizardPhase, WizardState};
pub use transport::{HttpTransport, MissingTransport, ScriptedTransport, StepTransport};
pub use view::{PricePlacement, RecordingView, UiCommand, UiSnapshot, WizardView};

use transitions::{Accepted, Classification, Effect};

/// Key Django uses for form errors that belong to no single field.
const NON_FIELD_ERRORS: &str = "__all__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The same step is still waiting for its response.
    InFlight,
    /// The wizard already redirected away.
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Advanced { step: Step, phase: WizardPhase },
    Redirected { step: Step, url: String },
    Failed { step: Step, failure: StepFailure },
    Ignored { step: Step, reason: IgnoreReason },
    /// The response arrived after [`WizardController::abandon`] and was dropped.
    Abandoned { step: Step },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    Sent,
    Failed(StepFailure),
}

enum Submission {
    Done(StepOutcome),
    ChainPayment(ReservationType),
}

struct Ticket {
    generation: u64,
    params: Vec<(String, String)>,
}

/// Drives the reservation wizard: posts each step to the validation API and
/// applies the transition the server's answer selects.
pub struct WizardController<V: WizardView> {
    transport: Arc<dyn StepTransport>,
    site: SiteVariant,
    base_url: Option<Url>,
    inner: Mutex<WizardState>,
    view: Mutex<V>,
}

impl<V: WizardView> WizardController<V> {
    pub fn new(
        transport: Arc<dyn StepTransport>,
        view: V,
        site: SiteVariant,
        reservation_type: ReservationType,
    ) -> Self {
        Self {
            transport,
            site,
            base_url: None,
            inner: Mutex::new(WizardState::new(reservation_type)),
            view: Mutex::new(view),
        }
    }

    pub fn from_settings(
        settings: &ClientSettings,
        view: V,
        reservation_type: ReservationType,
    ) -> Result<Self> {
        let transport = HttpTransport::from_settings(settings)?;
        let base_url = transport.base_url().clone();
        Ok(
            Self::new(Arc::new(transport), view, settings.site, reservation_type)
                .with_base_url(base_url),
        )
    }

    /// Relative redirect targets are resolved against this URL.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn site(&self) -> SiteVariant {
        self.site
    }

    pub async fn state(&self) -> WizardState {
        self.inner.lock().await.clone()
    }

    pub async fn with_view<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        let view = self.view.lock().await;
        f(&*view)
    }

    pub fn into_view(self) -> V {
        self.view.into_inner()
    }

    /// Drops every response still in flight. Steps become submittable again
    /// immediately; late answers for the old requests are ignored.
    pub async fn abandon(&self) {
        let mut state = self.inner.lock().await;
        state.generation += 1;
        state.in_flight.clear();
        info!(generation = state.generation, "wizard: in-flight requests abandoned");
    }

    /// Submits one step. A successful sign-in on the `password` step carries
    /// straight on to `payment` for the booking the server names.
    pub async fn submit_step(
        &self,
        reservation_type: ReservationType,
        step: Step,
        draft: &ReservationDraft,
    ) -> StepOutcome {
        let mut reservation_type = reservation_type;
        let mut step = step;
        loop {
            match self.submit_once(reservation_type, step, draft).await {
                Submission::Done(outcome) => return outcome,
                Submission::ChainPayment(next_type) => {
                    info!(
                        reservation_type = %next_type,
                        "wizard: sign-in validated, continuing to payment"
                    );
                    reservation_type = next_type;
                    step = Step::Payment;
                }
            }
        }
    }

    async fn submit_once(
        &self,
        reservation_type: ReservationType,
        step: Step,
        draft: &ReservationDraft,
    ) -> Submission {
        let ticket = match self.begin(reservation_type, step, draft).await {
            Ok(ticket) => ticket,
            Err(reason) => {
                info!(%reservation_type, %step, ?reason, "wizard: submission ignored");
                return Submission::Done(StepOutcome::Ignored { step, reason });
            }
        };

        {
            let mut view = self.view.lock().await;
            if self.site == SiteVariant::Marketing {
                view.apply(UiCommand::HidePanel(Step::Payment));
                view.apply(UiCommand::HidePanel(Step::Login));
            }
            view.apply(UiCommand::SetSubmitEnabled {
                step,
                enabled: false,
            });
            view.apply(UiCommand::SetBusy { step, busy: true });
            view.apply(UiCommand::HideError(step));
        }

        info!(%reservation_type, %step, site = ?self.site, "wizard: submitting step");
        let response = self
            .transport
            .validate_step(reservation_type, step, &ticket.params)
            .await;

        let mut state = self.inner.lock().await;
        if state.generation != ticket.generation {
            info!(%reservation_type, %step, "wizard: dropping response for abandoned request");
            return Submission::Done(StepOutcome::Abandoned { step });
        }
        state.in_flight.remove(&step);

        let mut view = self.view.lock().await;
        view.apply(UiCommand::SetBusy { step, busy: false });
        view.apply(UiCommand::ClearFieldErrors);

        let classification = match response {
            Ok(response) => {
                transitions::classify(self.site, reservation_type, step, &response)
            }
            Err(err) => {
                warn!(%reservation_type, %step, error = %err, "wizard: step request failed");
                Classification::Rejected(StepFailure::transport())
            }
        };

        let accepted = match classification {
            Classification::Accepted(accepted) => accepted,
            Classification::Rejected(failure) => {
                return Submission::Done(self.fail(&mut *view, reservation_type, step, failure));
            }
            Classification::Malformed(reason) => {
                warn!(%reservation_type, %step, %reason, "wizard: unusable step response");
                return Submission::Done(self.fail(
                    &mut *view,
                    reservation_type,
                    step,
                    StepFailure::transport(),
                ));
            }
        };

        let Some(transition) = transitions::lookup(step, accepted.shape) else {
            warn!(
                %reservation_type,
                %step,
                shape = ?accepted.shape,
                "wizard: no transition for response"
            );
            return Submission::Done(self.fail(
                &mut *view,
                reservation_type,
                step,
                StepFailure::transport(),
            ));
        };

        let mut chain = None;
        let mut redirect = None;
        for effect in transition.effects {
            match *effect {
                Effect::RenderPrice(placement) => {
                    if let Some(breakdown) = accepted.price.clone() {
                        view.apply(UiCommand::RenderPrice {
                            placement,
                            breakdown,
                        });
                    }
                }
                Effect::RecordCustomer => {
                    state.existing_customer = accepted.customer;
                    if let Some(customer_id) = accepted.customer {
                        view.apply(UiCommand::SetCustomerId(customer_id));
                    }
                }
                Effect::ShowPanel(panel) => view.apply(UiCommand::ShowPanel(panel)),
                Effect::HidePanel(panel) => view.apply(UiCommand::HidePanel(panel)),
                Effect::HideError(panel) => view.apply(UiCommand::HideError(panel)),
                Effect::ChainPayment => chain = accepted.chain_type,
                Effect::Navigate => redirect = self.resolve_redirect(&accepted),
            }
        }

        state.phase = transition.next;
        info!(
            %reservation_type,
            %step,
            phase = ?state.phase,
            "wizard: step accepted"
        );

        if let Some(url) = redirect {
            state.redirect = Some(url.clone());
            view.apply(UiCommand::Navigate(url.clone()));
            return Submission::Done(StepOutcome::Redirected { step, url });
        }

        view.apply(UiCommand::SetSubmitEnabled {
            step,
            enabled: true,
        });
        match chain {
            Some(next_type) => Submission::ChainPayment(next_type),
            None => Submission::Done(StepOutcome::Advanced {
                step,
                phase: state.phase,
            }),
        }
    }

    async fn begin(
        &self,
        reservation_type: ReservationType,
        step: Step,
        draft: &ReservationDraft,
    ) -> Result<Ticket, IgnoreReason> {
        let mut state = self.inner.lock().await;
        if state.is_finished() {
            return Err(IgnoreReason::Finished);
        }
        if !state.in_flight.insert(step) {
            return Err(IgnoreReason::InFlight);
        }
        state.reservation_type = reservation_type;
        let params = draft.form_params(&SubmissionMarkers {
            site: self.site,
            reservation_type,
            step,
            customer_id: state.existing_customer,
        });
        Ok(Ticket {
            generation: state.generation,
            params,
        })
    }

    fn fail(
        &self,
        view: &mut V,
        reservation_type: ReservationType,
        step: Step,
        failure: StepFailure,
    ) -> StepOutcome {
        warn!(
            %reservation_type,
            %step,
            kind = ?failure.kind,
            message = %failure.message,
            fields = failure.field_errors.len(),
            "wizard: step rejected"
        );
        view.apply(UiCommand::SetSubmitEnabled {
            step,
            enabled: true,
        });
        view.apply(UiCommand::ShowError {
            step,
            message: failure.message.clone(),
        });
        if self.site == SiteVariant::Marketing {
            view.apply(UiCommand::ShowPanel(step));
        }
        if self.site == SiteVariant::CustomerPortal
            && reservation_type == ReservationType::Rental
            && step == Step::Confirm
            && failure.kind == FailureKind::Validation
        {
            view.apply(UiCommand::Alert(failure.message.clone()));
        }

        let mut focused = false;
        for (field, _) in &failure.field_errors {
            if field == NON_FIELD_ERRORS {
                continue;
            }
            let field = field.to_lowercase();
            view.apply(UiCommand::MarkFieldInvalid(field.clone()));
            if !focused && view.has_field(&field) {
                view.apply(UiCommand::FocusField(field));
                focused = true;
            }
        }

        StepOutcome::Failed { step, failure }
    }

    fn resolve_redirect(&self, accepted: &Accepted) -> Option<String> {
        let target = accepted.redirect.as_deref()?;
        let Some(base_url) = &self.base_url else {
            return Some(target.to_string());
        };
        match base_url.join(target) {
            Ok(url) => Some(url.to_string()),
            Err(err) => {
                warn!(
                    redirect = %target,
                    error = %err,
                    "wizard: redirect target not resolvable, using as-is"
                );
                Some(target.to_string())
            }
        }
    }

    /// Asks the server to mail a reset link for the account behind `email`.
    pub async fn request_password_reset(&self, email: &str) -> ResetOutcome {
        self.view.lock().await.apply(UiCommand::CloseResetDialog);
        let response = self.transport.request_password_reset(email).await;
        let mut view = self.view.lock().await;
        match response {
            Ok(response) if response.success => {
                info!("wizard: password reset requested");
                view.apply(UiCommand::ShowResetSent);
                ResetOutcome::Sent
            }
            Ok(response) => {
                let message = response
                    .error
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| UNSPECIFIED_REJECTION.to_string());
                warn!(%message, "wizard: password reset refused");
                view.apply(UiCommand::Alert(message.clone()));
                ResetOutcome::Failed(StepFailure::business(message))
            }
            Err(err) => {
                warn!(error = %err, "wizard: password reset request failed");
                view.apply(UiCommand::Alert(COMMUNICATION_ERROR.to_string()));
                ResetOutcome::Failed(StepFailure::transport())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod transport_tests;
