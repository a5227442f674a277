//! The wizard never touches a page directly; it emits [`UiCommand`]s to a
//! [`WizardView`], which a browser binding, terminal front-end or test double
//! turns into visible state.

use std::collections::{BTreeMap, BTreeSet};

use shared::{domain::CustomerId, domain::Step, protocol::PriceBreakdown};

/// Where the price breakdown is attached after a successful `details` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricePlacement {
    /// Next to the sign-in form for a recognised customer.
    ExistingCustomer,
    /// Next to the payment/account-creation form.
    NewCustomer,
    /// In place, above the confirm panel.
    Inline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    SetSubmitEnabled { step: Step, enabled: bool },
    SetBusy { step: Step, busy: bool },
    ShowPanel(Step),
    HidePanel(Step),
    ShowError { step: Step, message: String },
    HideError(Step),
    ClearFieldErrors,
    MarkFieldInvalid(String),
    FocusField(String),
    RenderPrice {
        placement: PricePlacement,
        breakdown: PriceBreakdown,
    },
    SetCustomerId(CustomerId),
    Alert(String),
    Navigate(String),
    CloseResetDialog,
    ShowResetSent,
}

pub trait WizardView: Send {
    fn apply(&mut self, command: UiCommand);

    /// Whether a field with this (lower-cased) name exists on the page. Only
    /// existing fields can take focus.
    fn has_field(&self, _field: &str) -> bool {
        true
    }
}

/// Visible state produced by folding commands in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiSnapshot {
    pub panels: BTreeMap<Step, bool>,
    pub errors: BTreeMap<Step, String>,
    pub disabled: BTreeSet<Step>,
    pub busy: BTreeSet<Step>,
    pub invalid_fields: BTreeSet<String>,
    pub focused: Option<String>,
    pub price: Option<(PricePlacement, PriceBreakdown)>,
    pub customer_id: Option<CustomerId>,
    pub alert: Option<String>,
    pub location: Option<String>,
    pub reset_dialog_open: bool,
    pub reset_sent: bool,
}

impl UiSnapshot {
    pub fn apply(&mut self, command: &UiCommand) {
        match command {
            UiCommand::SetSubmitEnabled { step, enabled } => {
                if *enabled {
                    self.disabled.remove(step);
                } else {
                    self.disabled.insert(*step);
                }
            }
            UiCommand::SetBusy { step, busy } => {
                if *busy {
                    self.busy.insert(*step);
                } else {
                    self.busy.remove(step);
                }
            }
            UiCommand::ShowPanel(step) => {
                self.panels.insert(*step, true);
            }
            UiCommand::HidePanel(step) => {
                self.panels.insert(*step, false);
            }
            UiCommand::ShowError { step, message } => {
                self.errors.insert(*step, message.clone());
            }
            UiCommand::HideError(step) => {
                self.errors.remove(step);
            }
            UiCommand::ClearFieldErrors => {
                self.invalid_fields.clear();
                self.focused = None;
            }
            UiCommand::MarkFieldInvalid(field) => {
                self.invalid_fields.insert(field.clone());
            }
            UiCommand::FocusField(field) => self.focused = Some(field.clone()),
            UiCommand::RenderPrice {
                placement,
                breakdown,
            } => self.price = Some((*placement, breakdown.clone())),
            UiCommand::SetCustomerId(customer_id) => self.customer_id = Some(*customer_id),
            UiCommand::Alert(message) => self.alert = Some(message.clone()),
            UiCommand::Navigate(url) => self.location = Some(url.clone()),
            UiCommand::CloseResetDialog => self.reset_dialog_open = false,
            UiCommand::ShowResetSent => self.reset_sent = true,
        }
    }

    pub fn is_visible(&self, step: Step) -> bool {
        self.panels.get(&step).copied().unwrap_or(false)
    }

    pub fn is_hidden(&self, step: Step) -> bool {
        !self.panels.get(&step).copied().unwrap_or(true)
    }
}

/// Keeps every command it receives plus the folded snapshot.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub commands: Vec<UiCommand>,
    pub snapshot: UiSnapshot,
    known_fields: Option<BTreeSet<String>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts [`WizardView::has_field`] to the given names.
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_fields: Some(fields.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn take_commands(&mut self) -> Vec<UiCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl WizardView for RecordingView {
    fn apply(&mut self, command: UiCommand) {
        self.snapshot.apply(&command);
        self.commands.push(command);
    }

    fn has_field(&self, field: &str) -> bool {
        self.known_fields
            .as_ref()
            .map_or(true, |fields| fields.contains(field))
    }
}
