//! Edit session for a single product draft
//!
//! The session consumes editor events from a channel and resolves to an
//! [`EditOutcome`] once the draft is committed or the editor goes away.
//! Rejections and failed submits never end the session; the draft stays
//! editable so no input is lost.

use tokio::sync::mpsc;
use tracing::instrument;

use crate::error::ProductError;
use crate::form::ProductForm;
use crate::models::{Owner, Product};
use crate::repository::{BlobStore, DocumentStore};
use crate::service::ProductLifecycle;

/// Input coming from whatever surface is editing the draft
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Name(String),
    /// Raw text typed into the price field
    Price(String),
    /// Raw text typed into the sold units field
    SoldUnits(String),
    /// New image, usually a captured data-URL
    Image(String),
    Submit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Committed(Product),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Empty,
    Editing { valid: bool },
    Submitting,
    Committed,
    /// Last submit failed; the next edit returns to `Editing`
    Failed,
}

/// Feedback for the editing surface
#[derive(Debug)]
pub enum SessionNotice {
    /// Submit refused because the draft breaks these rules
    Rejected(Vec<String>),
    /// Submit reached the stores and failed
    Failed(ProductError),
}

pub struct EditSession<D: DocumentStore, B: BlobStore> {
    lifecycle: ProductLifecycle<D, B>,
    owner: Owner,
    existing: Option<Product>,
    form: ProductForm,
    state: DraftState,
    notices: Option<mpsc::UnboundedSender<SessionNotice>>,
}

impl<D: DocumentStore, B: BlobStore> EditSession<D, B> {
    /// Start a session. With `existing` the form is prefilled and a submit
    /// updates that product; without it a submit creates a new one.
    pub fn new(lifecycle: ProductLifecycle<D, B>, owner: Owner, existing: Option<Product>) -> Self {
        let form = existing
            .as_ref()
            .map(ProductForm::from_product)
            .unwrap_or_default();
        let mut session = Self {
            lifecycle,
            owner,
            existing,
            form,
            state: DraftState::Empty,
            notices: None,
        };
        session.refresh_state();
        session
    }

    pub fn with_notices(mut self, notices: mpsc::UnboundedSender<SessionNotice>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    pub fn form(&self) -> &ProductForm {
        &self.form
    }

    pub fn is_update(&self) -> bool {
        self.existing.is_some()
    }

    /// Drive the session until the draft is committed or cancelled.
    ///
    /// A closed event channel counts as cancellation.
    #[instrument(skip_all, fields(owner = %self.owner, update = self.existing.is_some()))]
    pub async fn run(&mut self, mut events: mpsc::Receiver<EditorEvent>) -> EditOutcome {
        while let Some(event) = events.recv().await {
            match event {
                EditorEvent::Name(name) => self.form.set_name(name),
                EditorEvent::Price(input) => self.form.set_price_input(&input),
                EditorEvent::SoldUnits(input) => self.form.set_sold_units_input(&input),
                EditorEvent::Image(image) => self.form.set_image(image),
                EditorEvent::Cancel => {
                    tracing::debug!("Edit session cancelled");
                    return EditOutcome::Cancelled;
                }
                EditorEvent::Submit => {
                    if let Some(product) = self.submit().await {
                        return EditOutcome::Committed(product);
                    }
                    continue;
                }
            }
            self.refresh_state();
        }

        tracing::debug!("Editor closed without submitting");
        EditOutcome::Cancelled
    }

    async fn submit(&mut self) -> Option<Product> {
        let draft = match self.form.to_draft() {
            Ok(draft) => draft,
            Err(_) => {
                let problems = self.form.errors();
                tracing::debug!(?problems, "Submit rejected");
                self.notify(SessionNotice::Rejected(problems));
                self.refresh_state();
                return None;
            }
        };

        self.state = DraftState::Submitting;
        let result = match &self.existing {
            Some(existing) => self.lifecycle.update(&self.owner, existing, draft).await,
            None => self.lifecycle.create(&self.owner, draft).await,
        };

        match result {
            Ok(product) => {
                self.state = DraftState::Committed;
                Some(product)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Submit failed, draft kept");
                self.state = DraftState::Failed;
                self.notify(SessionNotice::Failed(e));
                None
            }
        }
    }

    fn refresh_state(&mut self) {
        self.state = if self.form.is_empty() {
            DraftState::Empty
        } else {
            DraftState::Editing {
                valid: self.form.is_valid(),
            }
        };
    }

    fn notify(&self, notice: SessionNotice) {
        if let Some(notices) = &self.notices {
            // Nobody listening is fine
            let _ = notices.send(notice);
        }
    }
}
