//! Token-purchase wizard: pick a package, pick a provider, submit proof.
//!
//! The client never settles anything. The submission becomes a pending
//! transaction that an admin approves or rejects out of band.

use oneclick_client_core::{Identity, NewTransaction, Package, PaymentMethod};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStep {
    Browsing,
    Methods,
    Form,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaymentInputError {
    #[error("no package selected")]
    NoPackage,
    #[error("no payment method selected")]
    NoMethod,
    #[error("transaction reference is required")]
    MissingReference,
    #[error("a submission is already in progress")]
    SubmitInFlight,
}

#[derive(Debug)]
pub struct PaymentWorkflow {
    step: PaymentStep,
    package: Option<Package>,
    method: Option<PaymentMethod>,
    trx_id: String,
    screenshot: Option<String>,
    note: String,
    submit_in_flight: bool,
    last_error: Option<String>,
}

impl Default for PaymentWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentWorkflow {
    pub fn new() -> Self {
        Self {
            step: PaymentStep::Browsing,
            package: None,
            method: None,
            trx_id: String::new(),
            screenshot: None,
            note: String::new(),
            submit_in_flight: false,
            last_error: None,
        }
    }

    pub fn step(&self) -> PaymentStep {
        self.step
    }

    pub fn package(&self) -> Option<&Package> {
        self.package.as_ref()
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn trx_id(&self) -> &str {
        &self.trx_id
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn screenshot(&self) -> Option<&str> {
        self.screenshot.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submit_in_flight
    }

    pub fn choose_package(&mut self, package: Package) {
        if self.step == PaymentStep::Browsing {
            self.package = Some(package);
            self.step = PaymentStep::Methods;
        }
    }

    pub fn choose_method(&mut self, method: PaymentMethod) {
        if self.step == PaymentStep::Methods {
            self.method = Some(method);
            self.step = PaymentStep::Form;
        }
    }

    /// One step back. Entered form data is kept so coming forward again does
    /// not lose it. No way back out of `Success`; that goes through
    /// [`close`].
    ///
    /// [`close`]: PaymentWorkflow::close
    pub fn back(&mut self) {
        self.step = match self.step {
            PaymentStep::Form => PaymentStep::Methods,
            PaymentStep::Methods => PaymentStep::Browsing,
            other => other,
        };
    }

    pub fn set_trx_id(&mut self, trx_id: impl Into<String>) {
        self.trx_id = trx_id.into();
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    /// Inline Data-URI screenshot, or `None` to detach it.
    pub fn attach_screenshot(&mut self, data_uri: Option<String>) {
        self.screenshot = data_uri;
    }

    /// Validates the form and produces the submission draft, taking the
    /// in-flight flag so a double tap cannot submit twice. The claimed
    /// amount is always the selected package's price.
    pub fn begin_submit(&mut self, buyer: &Identity) -> Result<NewTransaction, PaymentInputError> {
        if self.submit_in_flight {
            return Err(PaymentInputError::SubmitInFlight);
        }
        let package = self.package.as_ref().ok_or(PaymentInputError::NoPackage)?;
        let method = self.method.ok_or(PaymentInputError::NoMethod)?;
        let trx_id = self.trx_id.trim();
        if trx_id.is_empty() {
            return Err(PaymentInputError::MissingReference);
        }
        let note = self.note.trim();
        self.submit_in_flight = true;
        self.last_error = None;
        Ok(NewTransaction {
            user_id: buyer.id.clone(),
            user_email: buyer.email.clone(),
            package_id: package.id.clone(),
            package_name: package.name.clone(),
            amount: package.price,
            tokens: package.tokens,
            payment_method: method,
            trx_id: trx_id.to_string(),
            screenshot: self.screenshot.clone(),
            note: (!note.is_empty()).then(|| note.to_string()),
        })
    }

    pub fn submit_succeeded(&mut self) {
        self.submit_in_flight = false;
        self.step = PaymentStep::Success;
    }

    /// Back to the form with everything the user entered still in place.
    pub fn submit_failed(&mut self, message: impl Into<String>) {
        self.submit_in_flight = false;
        self.last_error = Some(message.into());
        self.step = PaymentStep::Form;
    }

    /// The only exit from `Success`; clears the whole wizard.
    pub fn close(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn buyer() -> Identity {
        Identity {
            id: "u1".to_string(),
            email: "buyer@example.com".to_string(),
            name: "Buyer".to_string(),
            is_admin: false,
            tokens: 2,
            is_verified: true,
            is_banned: false,
            avatar_url: None,
            bio: None,
            created_at: Utc::now(),
        }
    }

    fn starter_package() -> Package {
        Package {
            id: "p1".to_string(),
            name: "Starter".to_string(),
            tokens: 50,
            price: 500,
        }
    }

    fn to_form(payment: &mut PaymentWorkflow) {
        payment.choose_package(starter_package());
        payment.choose_method(PaymentMethod::Bkash);
    }

    #[test]
    fn wizard_walks_forward_and_backward() {
        let mut payment = PaymentWorkflow::new();
        assert_eq!(payment.step(), PaymentStep::Browsing);

        payment.choose_package(starter_package());
        assert_eq!(payment.step(), PaymentStep::Methods);

        payment.choose_method(PaymentMethod::Nagad);
        assert_eq!(payment.step(), PaymentStep::Form);

        payment.back();
        assert_eq!(payment.step(), PaymentStep::Methods);
        payment.back();
        assert_eq!(payment.step(), PaymentStep::Browsing);
        payment.back();
        assert_eq!(payment.step(), PaymentStep::Browsing);
    }

    #[test]
    fn reference_is_required() {
        let mut payment = PaymentWorkflow::new();
        to_form(&mut payment);
        payment.set_trx_id("   ");
        assert_eq!(
            payment.begin_submit(&buyer()),
            Err(PaymentInputError::MissingReference)
        );
        assert!(!payment.is_submitting());
    }

    #[test]
    fn draft_carries_package_price_and_trimmed_fields() {
        let mut payment = PaymentWorkflow::new();
        to_form(&mut payment);
        payment.set_trx_id(" TX123 ");
        payment.set_note("  ");
        payment.attach_screenshot(Some("data:image/png;base64,YWJj".to_string()));

        let draft = payment.begin_submit(&buyer()).expect("draft");
        assert_eq!(draft.package_id, "p1");
        assert_eq!(draft.amount, 500);
        assert_eq!(draft.tokens, 50);
        assert_eq!(draft.payment_method, PaymentMethod::Bkash);
        assert_eq!(draft.trx_id, "TX123");
        assert_eq!(draft.note, None);
        assert!(draft.screenshot.is_some());
        assert!(payment.is_submitting());
    }

    #[test]
    fn double_tap_cannot_submit_twice() {
        let mut payment = PaymentWorkflow::new();
        to_form(&mut payment);
        payment.set_trx_id("TX123");
        payment.begin_submit(&buyer()).expect("first");
        assert_eq!(
            payment.begin_submit(&buyer()),
            Err(PaymentInputError::SubmitInFlight)
        );
    }

    #[test]
    fn failure_returns_to_form_with_data_retained() {
        let mut payment = PaymentWorkflow::new();
        to_form(&mut payment);
        payment.set_trx_id("TX123");
        payment.set_note("paid from 017...");
        payment.begin_submit(&buyer()).expect("draft");

        payment.submit_failed("directory transport failure: timeout");
        assert_eq!(payment.step(), PaymentStep::Form);
        assert_eq!(payment.trx_id(), "TX123");
        assert_eq!(payment.note(), "paid from 017...");
        assert!(payment.last_error().is_some());
        assert!(!payment.is_submitting());

        // Retrying is allowed straight away.
        assert!(payment.begin_submit(&buyer()).is_ok());
    }

    #[test]
    fn close_is_the_only_exit_from_success_and_clears_everything() {
        let mut payment = PaymentWorkflow::new();
        to_form(&mut payment);
        payment.set_trx_id("TX123");
        payment.begin_submit(&buyer()).expect("draft");
        payment.submit_succeeded();
        assert_eq!(payment.step(), PaymentStep::Success);

        payment.back();
        assert_eq!(payment.step(), PaymentStep::Success);

        payment.close();
        assert_eq!(payment.step(), PaymentStep::Browsing);
        assert!(payment.package().is_none());
        assert_eq!(payment.trx_id(), "");
        assert!(payment.screenshot().is_none());
    }
}
