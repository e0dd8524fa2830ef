//! Proptest generators for homeserver data.

use proptest::prelude::*;
use vestibule_core::Homeserver;

/// Strategy producing well-formed homeserver URLs with varied hosts.
pub fn homeserver_url_strategy() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9]{0,9}", "[a-z]{2,6}")
        .prop_map(|(host, tld)| format!("https://{host}.{tld}"))
}

/// Strategy producing homeserver entries with varied flags.
pub fn homeserver_strategy() -> impl Strategy<Value = Homeserver> {
    (homeserver_url_strategy(), any::<bool>(), any::<bool>()).prop_map(
        |(url, featured, favorite)| {
            let mut hs = Homeserver::from_url(&url);
            hs.featured = featured;
            hs.favorite = favorite;
            hs
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::SessionFixture;

    proptest! {
        #[test]
        fn generated_urls_derive_host_names(url in homeserver_url_strategy()) {
            let hs = Homeserver::from_url(&url);
            prop_assert!(url.contains(&hs.name));
            prop_assert!(!hs.name.starts_with("https://"));
        }

        #[test]
        fn selection_is_idempotent_for_any_url(url in homeserver_url_strategy()) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                let fixture = SessionFixture::new();
                fixture.manager.select_homeserver(&url).await.unwrap();
                fixture.manager.select_homeserver(&url).await.unwrap();

                let known = fixture.manager.known_homeservers().await.unwrap();
                let matching = known.iter().filter(|hs| hs.url == url).count();
                assert_eq!(matching, 1);
            });
        }
    }
}
