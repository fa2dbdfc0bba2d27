//! Registration for a single event.
//!
//! A [`Registration`] walks `Idle → Loading → Ready → Submitting → Success`,
//! with `NotFound` as the terminal state of a failed load. A failed
//! submission is reported from [`Registration::confirm`] and puts the
//! session back in `Ready` with the snapshot it had before.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::error::{RegistrationError, StoreError};
use crate::models::{Event, EventId};
use crate::scope::ScreenScope;
use crate::store::EventStore;

pub const SUCCESS_MESSAGE: &str = "Registered! Spots updated";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Clone, Debug, PartialEq)]
pub enum RegistrationState {
    Idle,
    Loading,
    NotFound,
    Ready(Event),
    Submitting(Event),
    Success(Event),
}

impl RegistrationState {
    pub fn event(&self) -> Option<&Event> {
        match self {
            RegistrationState::Ready(event)
            | RegistrationState::Submitting(event)
            | RegistrationState::Success(event) => Some(event),
            _ => None,
        }
    }
}

/// Hints shown next to the form fields. None of them blocks submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormHint {
    MissingName,
    EmailFormat,
}

impl FormHint {
    pub fn message(self) -> &'static str {
        match self {
            FormHint::MissingName => "Full name is required",
            FormHint::EmailFormat => "Email should look like name@example.com",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

impl RegistrationForm {
    pub fn hints(&self) -> Vec<FormHint> {
        let mut hints = Vec::new();
        if self.full_name.trim().is_empty() {
            hints.push(FormHint::MissingName);
        }
        let email = self.email.trim();
        if !email.is_empty() && !EMAIL_RE.is_match(email) {
            hints.push(FormHint::EmailFormat);
        }
        hints
    }
}

pub struct Registration {
    store: Arc<dyn EventStore>,
    event_id: EventId,
    state: RegistrationState,
    pub form: RegistrationForm,
    scope: ScreenScope,
}

impl Registration {
    pub fn new(store: Arc<dyn EventStore>, event_id: impl Into<EventId>) -> Self {
        Self::with_scope(store, event_id, ScreenScope::new())
    }

    pub fn with_scope(
        store: Arc<dyn EventStore>,
        event_id: impl Into<EventId>,
        scope: ScreenScope,
    ) -> Self {
        Self {
            store,
            event_id: event_id.into(),
            state: RegistrationState::Idle,
            form: RegistrationForm::default(),
            scope,
        }
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    /// Ends the screen; responses still in flight are dropped.
    pub fn leave(&self) {
        self.scope.leave();
    }

    pub async fn load(&mut self) -> &RegistrationState {
        let previous = std::mem::replace(&mut self.state, RegistrationState::Loading);
        let store = Arc::clone(&self.store);
        let fetched = self.scope.run(store.get_event(&self.event_id)).await;
        self.state = match fetched {
            Ok(Ok(event)) => RegistrationState::Ready(event),
            Ok(Err(err)) => {
                warn!(id = %self.event_id, error = %err, "event load failed");
                RegistrationState::NotFound
            }
            Err(_) => previous,
        };
        &self.state
    }

    /// Takes one spot for the loaded event.
    ///
    /// Blocked locally, without touching the store, when the snapshot shows
    /// no spots. The decrement is conditional on the snapshot's count, so a
    /// concurrent registration surfaces as `NoSpotsLeft` or `Conflict`
    /// instead of overwriting the other one.
    pub async fn confirm(&mut self) -> Result<Event, RegistrationError> {
        let snapshot = match &self.state {
            RegistrationState::Ready(event) | RegistrationState::Success(event) => event.clone(),
            _ => return Err(RegistrationError::NotReady),
        };
        if !snapshot.has_spots() {
            return Err(RegistrationError::NoSpotsLeft);
        }

        self.state = RegistrationState::Submitting(snapshot.clone());
        let store = Arc::clone(&self.store);
        let mut fallback = snapshot.clone();
        fallback.spots = snapshot.spots - 1;
        let outcome = self
            .scope
            .run(async move {
                let id = fallback.id.clone();
                store.decrement_spots(&id, fallback.spots + 1).await?;
                match store.get_event(&id).await {
                    Ok(updated) => Ok::<Event, StoreError>(updated),
                    Err(err) => {
                        // The spot is taken; show the locally computed count.
                        warn!(%id, error = %err, "refresh after registration failed");
                        Ok(fallback)
                    }
                }
            })
            .await;

        match outcome {
            Ok(Ok(updated)) => {
                info!(id = %updated.id, remaining = updated.spots, "registered");
                self.state = RegistrationState::Success(updated.clone());
                Ok(updated)
            }
            Ok(Err(err)) => {
                warn!(id = %snapshot.id, error = %err, "registration failed");
                self.state = RegistrationState::Ready(snapshot);
                Err(err.into())
            }
            Err(cancelled) => {
                self.state = RegistrationState::Ready(snapshot);
                Err(cancelled.into())
            }
        }
    }
}
