//! Per-operation state and the action chain.
//!
//! Every WebDAV operation a session performs is represented by one
//! `ActionState`. A new action explicitly continues from its predecessor,
//! inheriting the client handle, credentials, host and base path, and
//! registers itself as the session's active action in the [`WebDavContext`].
//! The chain lives until the session is released.
//!
//! [`WebDavContext`]: crate::session_context::WebDavContext

use std::sync::{Arc, Mutex};

use log::debug;

use crate::configuration::{Credentials, WebDavConfig};
use crate::error_handling::types::ActionError;
use crate::session_context::WebDavContext;

use super::operations::WebDavClient;
use super::path_builder;

/// Response facts of the last attempt, written by the interceptor.
///
/// `status_code` stays `None` until the operation has actually executed; that
/// sentinel is structurally distinct from every valid HTTP code.
#[derive(Debug, Clone, Default)]
pub struct ResponseInfo {
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub error_message: Option<String>,
}

/// State carried by one WebDAV operation within a session.
pub struct ActionState {
    session_id: String,
    timer_name: String,
    host: String,
    port: u16,
    dav_path: String,
    auto_url_encoding: bool,
    client: Arc<WebDavClient>,
    credentials: Mutex<Option<Credentials>>,
    response: Mutex<ResponseInfo>,
    previous: Option<Arc<ActionState>>,
}

impl ActionState {
    /// Opens the first action of a session from a validated configuration and
    /// registers it as the session's active action.
    pub fn open(
        context: &WebDavContext,
        session_id: impl Into<String>,
        timer_name: impl Into<String>,
        config: &WebDavConfig,
        client: Arc<WebDavClient>,
    ) -> Arc<Self> {
        let action = Arc::new(Self {
            session_id: session_id.into(),
            timer_name: timer_name.into(),
            host: config.host.clone(),
            port: config.port,
            dav_path: config.dav_path.clone(),
            auto_url_encoding: config.auto_url_encoding,
            client,
            credentials: Mutex::new(config.credentials.clone()),
            response: Mutex::new(ResponseInfo::default()),
            previous: None,
        });
        debug!("[{}] opening action '{}'", action.session_id, action.timer_name);
        context.set_active(&action.session_id, Arc::clone(&action));
        action
    }

    /// Creates the next action of a session, inheriting client, credentials,
    /// host and base path from its predecessor, and registers it as the
    /// session's active action.
    pub fn continue_from(
        context: &WebDavContext,
        previous: &Arc<ActionState>,
        timer_name: impl Into<String>,
    ) -> Arc<Self> {
        let action = Arc::new(Self {
            session_id: previous.session_id.clone(),
            timer_name: timer_name.into(),
            host: previous.host.clone(),
            port: previous.port,
            dav_path: previous.dav_path.clone(),
            auto_url_encoding: previous.auto_url_encoding,
            client: Arc::clone(&previous.client),
            credentials: Mutex::new(previous.credentials()),
            response: Mutex::new(ResponseInfo::default()),
            previous: Some(Arc::clone(previous)),
        });
        debug!(
            "[{}] continuing with action '{}'",
            action.session_id, action.timer_name
        );
        context.set_active(&action.session_id, Arc::clone(&action));
        action
    }

    /// Convenience for the common case: continue from whatever action is
    /// currently active for `session_id`. Fails fast when the session never
    /// opened an action (a contract violation of the calling test script).
    pub fn continue_active(
        context: &WebDavContext,
        session_id: &str,
        timer_name: impl Into<String>,
    ) -> Result<Arc<Self>, ActionError> {
        let previous = context
            .get_active(session_id)
            .ok_or_else(|| ActionError::NoActiveSession(session_id.to_string()))?;
        Ok(Self::continue_from(context, &previous, timer_name))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn timer_name(&self) -> &str {
        &self.timer_name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client(&self) -> &Arc<WebDavClient> {
        &self.client
    }

    pub fn previous(&self) -> Option<&Arc<ActionState>> {
        self.previous.as_ref()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.lock().unwrap().clone()
    }

    /// Sets the credential pair used by this and all following actions of the
    /// session (following actions inherit it through `continue_from`).
    pub fn set_credentials(&self, username: impl Into<String>, password: impl Into<String>) {
        *self.credentials.lock().unwrap() = Some(Credentials {
            username: username.into(),
            password: password.into(),
        });
    }

    /// Status code of the last attempt; `None` until the action has executed.
    pub fn status_code(&self) -> Option<u16> {
        self.response.lock().unwrap().status_code
    }

    pub fn response_info(&self) -> ResponseInfo {
        self.response.lock().unwrap().clone()
    }

    /// Absolute, encoded request path for a resource relative to the WebDAV
    /// home directory.
    pub fn resource_path(&self, relative: &str) -> String {
        path_builder::build_path(&self.dav_path, relative, self.auto_url_encoding)
    }

    pub(crate) fn record_response(&self, status_code: u16, content_type: Option<String>) {
        let mut response = self.response.lock().unwrap();
        response.status_code = Some(status_code);
        response.content_type = content_type;
        response.error_message = None;
    }

    pub(crate) fn record_error(&self, message: &str) {
        self.response.lock().unwrap().error_message = Some(message.to_string());
    }
}
