use std::time::Duration;

use catalog_logging::catalog_debug;

use crate::driver::{DriverError, ElementState, PageDriver};
use crate::locators::Locator;
use crate::retry::RetryPolicy;

/// Wait for `locator` to be visible, confirm the found element still is, click
/// it, then let the page settle.
/// The whole sequence is retried under `policy`.
pub async fn click_with_retry(
    page: &dyn PageDriver,
    locator: &Locator,
    timeout: Duration,
    settle: Duration,
    policy: &RetryPolicy,
) -> Result<(), DriverError> {
    policy
        .run(locator.role, |attempt| async move {
            catalog_debug!("Clicking {locator} (attempt {attempt})");
            let element = page
                .wait_for(locator, ElementState::Visible, timeout)
                .await?
                .ok_or_else(|| DriverError::NotFound(locator.to_string()))?;
            // The node can be swapped out by a re-render between lookup and click.
            element.wait_for_state(ElementState::Visible, timeout).await?;
            element.click().await?;
            page.wait_for_timeout(settle).await;
            Ok(())
        })
        .await
}
