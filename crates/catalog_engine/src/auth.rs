use catalog_core::UrlPattern;
use catalog_logging::{catalog_error, catalog_info, catalog_warn};
use thiserror::Error;

use crate::click::click_with_retry;
use crate::driver::{DriverError, ElementState, PageDriver};
use crate::session::{Session, SessionStore};
use crate::settings::RunSettings;

/// URL the application lands on after the entry action.
pub const APPLICATION_URL_PATTERN: &str = "**/challenge";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login form unreachable at {url}: {source}")]
    FormUnreachable {
        url: String,
        #[source]
        source: DriverError,
    },
    #[error("access denied{}", describe_alerts(.alerts))]
    AccessDenied { alerts: Vec<String> },
    #[error("post-login landmark never appeared{}", describe_alerts(.alerts))]
    LandmarkMissing { alerts: Vec<String> },
    #[error("could not enter the application: {0}")]
    EntryFailed(#[source] DriverError),
    #[error("application access not confirmed: {0}")]
    AccessUnconfirmed(#[source] DriverError),
    #[error("login interaction failed: {0}")]
    Driver(#[from] DriverError),
}

fn describe_alerts(alerts: &[String]) -> String {
    if alerts.is_empty() {
        String::new()
    } else {
        format!(" (alerts: {})", alerts.join("; "))
    }
}

/// Drives the login form and the entry into the application.
pub struct Authenticator<'a> {
    settings: &'a RunSettings,
}

impl<'a> Authenticator<'a> {
    pub fn new(settings: &'a RunSettings) -> Self {
        Self { settings }
    }

    /// Log in from a clean cookie jar, enter the application and persist the
    /// resulting session. A failed save is logged and does not fail the login.
    pub async fn login(
        &self,
        page: &dyn PageDriver,
        store: &dyn SessionStore,
    ) -> Result<Session, AuthError> {
        let retry = &self.settings.retry;
        let timeout = self.settings.timings.page_load;
        let url = self.settings.entry_url.as_str();
        let email_field = &self.settings.locators.login_email;

        page.clear_cookies().await?;

        let unreachable = |source| AuthError::FormUnreachable {
            url: url.to_string(),
            source,
        };
        retry
            .run("navigate to login page", |_| async move {
                page.goto(url, timeout).await
            })
            .await
            .map_err(unreachable)?;
        retry
            .run("wait for login form", |_| async move {
                page.wait_for(email_field, ElementState::Visible, timeout)
                    .await
                    .map(|_| ())
            })
            .await
            .map_err(unreachable)?;

        let session = retry
            .run("login", |_| async move { self.submit_and_enter(page).await })
            .await
            .inspect_err(|err| {
                catalog_error!("Login failed after {} attempts: {err}", retry.attempts())
            })?;

        if let Err(err) = store.save(&session) {
            catalog_warn!("Continuing without a stored session: {err}");
        }
        catalog_info!("Login successful");
        Ok(session)
    }

    async fn submit_and_enter(&self, page: &dyn PageDriver) -> Result<Session, AuthError> {
        let locators = &self.settings.locators;
        let timings = &self.settings.timings;
        let credentials = &self.settings.credentials;

        page.fill(&locators.login_email, "").await?;
        page.fill(&locators.login_password, "").await?;
        page.fill(&locators.login_email, credentials.email()).await?;
        page.fill(&locators.login_password, credentials.password()).await?;

        let submit = page
            .wait_for(&locators.login_submit, ElementState::Visible, timings.page_load)
            .await?
            .ok_or_else(|| DriverError::NotFound(locators.login_submit.to_string()))?;
        submit.click().await?;

        match page
            .wait_for(&locators.launch_action, ElementState::Visible, timings.page_load)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => return Err(self.diagnose(page).await),
            Err(err) if err.is_timeout() => return Err(self.diagnose(page).await),
            Err(err) => return Err(err.into()),
        }

        self.enter_application(page).await?;
        Ok(page.storage_state().await?)
    }

    /// Collect whatever the page says about a rejected login.
    async fn diagnose(&self, page: &dyn PageDriver) -> AuthError {
        let locators = &self.settings.locators;

        let mut alerts = Vec::new();
        match page.query_all(&locators.alerts).await {
            Ok(elements) => {
                for element in elements {
                    if let Ok(text) = element.inner_text().await {
                        let text = text.trim();
                        if !text.is_empty() {
                            catalog_error!("Login error: {text}");
                            alerts.push(text.to_string());
                        }
                    }
                }
            }
            Err(err) => catalog_warn!("Could not read alerts: {err}"),
        }

        match page.query(&locators.access_denied).await {
            Ok(Some(_)) => {
                catalog_error!("Access denied error detected");
                AuthError::AccessDenied { alerts }
            }
            _ => AuthError::LandmarkMissing { alerts },
        }
    }

    /// Activate the entry action, confirm the application URL and its dashboard.
    pub async fn enter_application(&self, page: &dyn PageDriver) -> Result<(), AuthError> {
        let locators = &self.settings.locators;
        let timings = &self.settings.timings;

        click_with_retry(
            page,
            &locators.launch_action,
            timings.page_load,
            timings.settle,
            &self.settings.retry,
        )
        .await
        .map_err(AuthError::EntryFailed)?;

        page.wait_for_url(&UrlPattern::new(APPLICATION_URL_PATTERN), timings.page_load)
            .await
            .map_err(AuthError::EntryFailed)?;

        page.wait_for(&locators.dashboard_landmark, ElementState::Visible, timings.settle)
            .await
            .map_err(AuthError::AccessUnconfirmed)?;
        Ok(())
    }
}
