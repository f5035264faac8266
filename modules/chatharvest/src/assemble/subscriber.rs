use chatharvest_common::{Config, HarvestError, Result, Subscriber, SubscriberProfile};

use crate::driver::{first, non_blank, text_of, wait_text, ElementRef, Scope, UiDriver};
use crate::selectors;

/// Pass 1: minimal subscriber from one member-list row.
pub async fn assemble_subscriber(
    driver: &dyn UiDriver,
    row: &ElementRef,
    app_base_url: &str,
) -> Result<Subscriber> {
    let scope = Scope::Within(row);

    let avatar = first(driver, scope, selectors::MEMBER_AVATAR)
        .await
        .ok_or_else(|| HarvestError::MalformedItem(format!("member row {row} has no avatar")))?;
    let peer_id = non_blank(driver.read_attribute(&avatar, selectors::PEER_ID_ATTR).await)
        .ok_or_else(|| HarvestError::MalformedItem(format!("member row {row} has no peer id")))?;
    let display_name = non_blank(text_of(driver, scope, selectors::MEMBER_NAME).await)
        .ok_or_else(|| HarvestError::MalformedItem(format!("member row {row} has no name")))?;

    let profile_url = format!("{app_base_url}#{peer_id}");
    Ok(Subscriber::new(peer_id, profile_url, display_name))
}

/// Pass 2: open the subscriber's profile and read what it shows.
///
/// Every field is optional and waits at most its own budget. Only a failed
/// navigation is an error.
pub async fn enrich_profile(
    driver: &dyn UiDriver,
    subscriber: &Subscriber,
    config: &Config,
) -> Result<SubscriberProfile> {
    driver.navigate(&config.reset_url).await?;
    driver.navigate(&subscriber.profile_url).await?;

    let mention = wait_text(driver, selectors::PROFILE_MENTION, config.public_handle_timeout).await;
    let field = |selector: &'static str| wait_text(driver, selector, config.profile_field_timeout);

    Ok(SubscriberProfile {
        public_handle_url: public_handle_url(mention.as_deref(), &config.public_handle_base_url),
        phone: non_blank(field(selectors::PROFILE_PHONE).await),
        birth_date_raw: non_blank(field(selectors::PROFILE_BIRTHDAY).await),
        bio: non_blank(field(selectors::PROFILE_BIO).await),
    })
}

/// `@handle` to `<base>handle`. Blank input or a bare `@` gives `None`.
pub fn public_handle_url(mention: Option<&str>, base_url: &str) -> Option<String> {
    let mention = mention?.trim();
    let handle = match mention.split_once('@') {
        Some((_, after)) => after.trim(),
        None => mention,
    };
    if handle.is_empty() {
        None
    } else {
        Some(format!("{base_url}{handle}"))
    }
}
