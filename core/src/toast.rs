//! Transient, dismissable messages and the wording for backend failures.

use std::collections::VecDeque;

use lokitos_backend::{BackendError, StatusCode};
use lokitos_types::excerpt;

use crate::FeedError;

const MAX_TOASTS: usize = 5;
const MAX_DETAIL_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToastId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub severity: Severity,
    pub message: String,
    /// How many times in a row this message was pushed.
    pub count: u32,
}

/// Queue of toasts waiting to be shown.
///
/// Pushing the same message twice in a row bumps the count of the last toast
/// instead of stacking a copy. Only the newest `MAX_TOASTS` are kept.
#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    next_id: u64,
}

impl ToastQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> ToastId {
        let message = message.into();
        if let Some(last) = self.toasts.back_mut()
            && last.severity == severity
            && last.message == message
        {
            last.count = last.count.saturating_add(1);
            return last.id;
        }

        let id = ToastId(self.next_id);
        self.next_id += 1;
        self.toasts.push_back(Toast {
            id,
            severity,
            message,
            count: 1,
        });
        if self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
        id
    }

    /// Toast for a failed backend call. Transient failures are warnings.
    pub fn push_error(&mut self, error: &BackendError) -> ToastId {
        let severity = if error.is_transient() {
            Severity::Warning
        } else {
            Severity::Error
        };
        tracing::debug!(error = %error, ?severity, "Showing error toast");
        self.push(severity, describe_error(error))
    }

    pub fn push_feed_error(&mut self, error: &FeedError) -> ToastId {
        match error {
            FeedError::Backend(e) => self.push_error(e),
            FeedError::Window(e) => self.push(Severity::Error, e.to_string()),
        }
    }

    pub fn dismiss(&mut self, id: ToastId) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    /// Take every pending toast, oldest first.
    pub fn drain(&mut self) -> Vec<Toast> {
        self.toasts.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

/// Short user-facing message for a backend failure.
#[must_use]
pub fn describe_error(error: &BackendError) -> String {
    match error {
        BackendError::NotSignedIn => "Iniciá sesión para continuar.".to_string(),
        e if e.is_auth() => "Tu sesión expiró. Iniciá sesión de nuevo.".to_string(),
        BackendError::Validation(e) => e.to_string(),
        BackendError::SelfFollow => "No podés seguirte a vos mismo.".to_string(),
        BackendError::NotFound(_) => "No encontramos lo que buscabas.".to_string(),
        BackendError::Http { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
            "Demasiadas solicitudes. Esperá un momento.".to_string()
        }
        BackendError::Http { status, body } if status.is_server_error() => {
            with_detail("El servidor no responde. Probá de nuevo en un rato.", body)
        }
        BackendError::Http { status, body } => {
            with_detail(&format!("La solicitud falló ({status})."), body)
        }
        BackendError::Connection { .. } | BackendError::Transport(_) => {
            "Sin conexión. Revisá tu red y probá de nuevo.".to_string()
        }
        BackendError::Decode(_) => "Respuesta inesperada del servidor.".to_string(),
        BackendError::Url(_) | BackendError::InsecureUrl(_) | BackendError::InvalidAnonKey => {
            "La configuración del servidor es inválida.".to_string()
        }
    }
}

fn with_detail(summary: &str, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        summary.to_string()
    } else {
        format!("{summary} {}", excerpt(body, MAX_DETAIL_CHARS))
    }
}
