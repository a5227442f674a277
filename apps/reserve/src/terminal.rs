use std::collections::BTreeSet;

use client_core::{UiCommand, WizardView};

/// Prints each UI command as one line on stdout.
pub struct TerminalView {
    fields: BTreeSet<String>,
}

impl TerminalView {
    pub fn new<'a>(fields: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            fields: fields.into_iter().map(str::to_lowercase).collect(),
        }
    }
}

impl WizardView for TerminalView {
    fn apply(&mut self, command: UiCommand) {
        for line in render(&command) {
            println!("{line}");
        }
    }

    fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

pub fn render(command: &UiCommand) -> Vec<String> {
    match command {
        UiCommand::SetSubmitEnabled { step, enabled } => {
            let state = if *enabled { "enabled" } else { "disabled" };
            vec![format!("[{step}] submit {state}")]
        }
        UiCommand::SetBusy { step, busy } => {
            let state = if *busy { "working..." } else { "idle" };
            vec![format!("[{step}] {state}")]
        }
        UiCommand::ShowPanel(step) => vec![format!("[{step}] panel shown")],
        UiCommand::HidePanel(step) => vec![format!("[{step}] panel hidden")],
        UiCommand::ShowError { step, message } => vec![format!("[{step}] error: {message}")],
        UiCommand::HideError(_) | UiCommand::ClearFieldErrors => Vec::new(),
        UiCommand::MarkFieldInvalid(field) => vec![format!("  invalid field: {field}")],
        UiCommand::FocusField(field) => vec![format!("  focus: {field}")],
        UiCommand::RenderPrice {
            placement,
            breakdown,
        } => {
            let visibility = breakdown.visibility();
            let mut lines = vec![format!("price ({placement:?}):")];
            for line in breakdown.lines() {
                let hidden = (line.class.starts_with("price-specific-discount")
                    && !visibility.specific_discount)
                    || (line.class == "price-customer-discount" && !visibility.customer_discount);
                if !hidden {
                    lines.push(format!("  {:<32} {}", line.class, line.text));
                }
            }
            if visibility.delivery_smallprint {
                lines.push("  * delivery required".to_string());
            }
            lines
        }
        UiCommand::SetCustomerId(customer_id) => vec![format!("customer id: {}", customer_id.0)],
        UiCommand::Alert(message) => vec![format!("ALERT: {message}")],
        UiCommand::Navigate(url) => vec![format!("redirect: {url}")],
        UiCommand::CloseResetDialog => Vec::new(),
        UiCommand::ShowResetSent => {
            vec!["password reset link sent, check your inbox".to_string()]
        }
    }
}
