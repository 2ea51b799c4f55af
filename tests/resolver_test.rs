//! End-to-end resolution against a mock translation server

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(missing_docs)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use i18n_http_backend::cache::TranslationCache;
use i18n_http_backend::config::{
    BackendSettings,
    HttpSettings,
};
use i18n_http_backend::remote::{
    RemoteClient,
    RemoteError,
};
use i18n_http_backend::resolver::ResolveError;
use i18n_http_backend::{
    Locale,
    Resolver,
    StaticLookup,
    TranslationBundle,
    TranslationKey,
};
use serde_json::{
    Value,
    json,
};
use wiremock::matchers::{
    header,
    method,
    path,
};
use wiremock::{
    Mock,
    MockServer,
    ResponseTemplate,
};

/// Bundle from a JSON object literal.
fn bundle(value: Value) -> TranslationBundle {
    TranslationBundle::from_json(value).unwrap()
}

/// Local backend holding one bundle per `(locale, json)` pair.
fn local(entries: Vec<(&str, Value)>) -> StaticLookup {
    entries.into_iter().fold(StaticLookup::new(), |lookup, (locale, value)| {
        lookup.with_bundle(locale, bundle(value))
    })
}

/// Serves `body` at `/{file}`.
async fn mount_json(server: &MockServer, file: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/{file}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answers `/{file}` with an empty `status` response.
async fn mount_status(server: &MockServer, file: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/{file}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Remote offering en, fr and es, where fr is advertised but missing.
async fn translation_server() -> MockServer {
    let server = MockServer::start().await;
    mount_json(&server, "locales.json", json!({ "locales": ["en", "fr", "es"] })).await;
    mount_json(&server, "en.json", json!({ "hello": "Hello", "world": "World" })).await;
    mount_status(&server, "fr.json", 404).await;
    mount_json(&server, "es.json", json!({ "hello": "Hola", "world": "Mundo" })).await;
    server
}

/// Resolver against `base_url` with a fresh in-memory cache.
async fn resolver_for(base_url: &str, lookup: StaticLookup) -> Resolver {
    resolver_with_cache(base_url, lookup, TranslationCache::in_memory()).await
}

/// Resolver against `base_url` with the given cache.
async fn resolver_with_cache(base_url: &str, lookup: StaticLookup, cache: TranslationCache) -> Resolver {
    let remote = RemoteClient::new(base_url, &HttpSettings::default()).unwrap();
    Resolver::with_parts(remote, cache, Arc::new(lookup), ".").await
}

/// Locales as an order-independent set.
fn locale_set(locales: Vec<Locale>) -> HashSet<String> {
    locales.into_iter().map(|l| l.as_str().to_string()).collect()
}

/// String set from literals.
fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Locale discovery and refresh.
mod available_locales {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn unions_remote_and_local() {
        let server = translation_server().await;
        let resolver = resolver_for(&server.uri(), local(vec![("en", json!({}))])).await;

        assert_eq!(locale_set(resolver.available_locales()), set(&["en", "fr", "es"]));
        assert_eq!(resolver.available_locales().len(), 3);
    }

    #[tokio::test]
    async fn keeps_local_only_locales() {
        let server = translation_server().await;
        let resolver =
            resolver_for(&server.uri(), local(vec![("de", json!({})), (":es", json!({}))])).await;

        assert_eq!(locale_set(resolver.available_locales()), set(&["en", "fr", "es", "de"]));
    }

    #[tokio::test]
    async fn missing_index_degrades_to_local() {
        let server = MockServer::start().await;
        mount_status(&server, "locales.json", 500).await;
        let resolver = resolver_for(&server.uri(), local(vec![("en", json!({}))])).await;

        assert_eq!(resolver.available_locales(), vec![Locale::new("en")]);
    }

    #[tokio::test]
    async fn malformed_index_degrades_to_local() {
        let server = MockServer::start().await;
        mount_json(&server, "locales.json", json!({ "languages": ["de"] })).await;
        let resolver = resolver_for(&server.uri(), local(vec![("en", json!({}))])).await;

        assert_eq!(resolver.available_locales(), vec![Locale::new("en")]);
    }

    #[tokio::test]
    async fn unreachable_remote_degrades_to_local() {
        let resolver = resolver_for("http://127.0.0.1:9", local(vec![("en", json!({}))])).await;

        assert_eq!(resolver.available_locales(), vec![Locale::new("en")]);
    }

    #[tokio::test]
    async fn follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/locales.json"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/v2/locales.json", server.uri())),
            )
            .mount(&server)
            .await;
        mount_json(&server, "v2/locales.json", json!({ "locales": ["pt-BR"] })).await;

        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        assert_eq!(resolver.available_locales(), vec![Locale::new("pt-BR")]);
    }

    #[tokio::test]
    async fn refresh_picks_up_new_remote_locales() {
        let server = MockServer::start().await;
        let initial = Mock::given(method("GET"))
            .and(path("/locales.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "locales": ["en"] })))
            .mount_as_scoped(&server)
            .await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;
        assert_eq!(resolver.available_locales(), vec![Locale::new("en")]);

        drop(initial);
        mount_json(&server, "locales.json", json!({ "locales": ["en", "de"] })).await;

        let refreshed = resolver.refresh_locales().await;
        assert_eq!(refreshed, vec![Locale::new("en"), Locale::new("de")]);
        assert_eq!(resolver.available_locales(), refreshed);
    }

    #[tokio::test]
    async fn background_refresh_updates_locales() {
        let server = MockServer::start().await;
        let initial = Mock::given(method("GET"))
            .and(path("/locales.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "locales": ["en"] })))
            .mount_as_scoped(&server)
            .await;
        let resolver = Arc::new(resolver_for(&server.uri(), StaticLookup::new()).await);
        let task = resolver.spawn_locale_refresh(Duration::from_millis(50));

        drop(initial);
        mount_json(&server, "locales.json", json!({ "locales": ["en", "ja"] })).await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(locale_set(resolver.available_locales()), set(&["en", "ja"]));

        drop(resolver);
        tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    }
}

/// Remote-over-local bundle merging.
mod available_translations {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn remote_wins_over_local() {
        let server = translation_server().await;
        let resolver =
            resolver_for(&server.uri(), local(vec![("en", json!({ "hello": "Local Hello" }))])).await;

        let merged = resolver.available_translations(&Locale::new("en")).await.unwrap();

        assert_eq!(merged, bundle(json!({ "hello": "Hello", "world": "World" })));
    }

    #[tokio::test]
    async fn nested_merge_keeps_local_only_keys() {
        let server = MockServer::start().await;
        mount_json(&server, "en.json", json!({ "menu": { "open": "Open" } })).await;
        let resolver = resolver_for(
            &server.uri(),
            local(vec![("en", json!({ "menu": { "open": "Open (local)", "close": "Close" } }))]),
        )
        .await;

        let merged = resolver.available_translations(&Locale::new("en")).await.unwrap();

        assert_eq!(merged, bundle(json!({ "menu": { "open": "Open", "close": "Close" } })));
    }

    #[tokio::test]
    async fn missing_remote_returns_local_tree_unchanged() {
        let server = translation_server().await;
        let resolver =
            resolver_for(&server.uri(), local(vec![("fr", json!({ "bonjour": "Bonjour" }))])).await;

        let merged = resolver.available_translations(&Locale::new("fr")).await.unwrap();

        assert_eq!(merged, bundle(json!({ "bonjour": "Bonjour" })));
    }

    #[tokio::test]
    async fn nothing_anywhere_is_an_empty_tree() {
        let server = translation_server().await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        let merged = resolver.available_translations(&Locale::new("fr")).await.unwrap();

        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn sends_json_accept_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en.json"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hello": "Hello" })))
            .expect(1)
            .mount(&server)
            .await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        let merged = resolver.available_translations(&Locale::new("en")).await.unwrap();

        assert_eq!(merged, bundle(json!({ "hello": "Hello" })));
    }

    #[tokio::test]
    async fn slow_remote_times_out_to_local() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "hello": "Too late" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        let settings = HttpSettings { read_timeout_ms: 200, ..HttpSettings::default() };
        let remote = RemoteClient::new(&server.uri(), &settings).unwrap();
        let resolver = Resolver::with_parts(
            remote,
            TranslationCache::in_memory(),
            Arc::new(local(vec![("en", json!({ "hello": "Local Hello" }))])),
            ".",
        )
        .await;

        let merged = resolver.available_translations(&Locale::new("en")).await.unwrap();

        assert_eq!(merged, bundle(json!({ "hello": "Local Hello" })));
    }

    #[tokio::test]
    async fn malformed_body_is_a_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
            .mount(&server)
            .await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        let result = resolver.available_translations(&Locale::new("en")).await;

        match result {
            Err(ResolveError::Remote { locale, source: RemoteError::Parse { .. } }) => {
                assert_eq!(locale, Locale::new("en"));
            }
            other => panic!("expected a parse failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_object_body_is_a_remote_error() {
        let server = MockServer::start().await;
        mount_json(&server, "en.json", json!(["hello"])).await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        let result = resolver.available_translations(&Locale::new("en")).await;

        assert!(matches!(
            result,
            Err(ResolveError::Remote { source: RemoteError::Shape { .. }, .. })
        ));
    }
}

/// Cache-aside behaviour seen through the resolver.
mod caching {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn second_call_within_ttl_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hello": "Hello" })))
            .expect(1)
            .mount(&server)
            .await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        let first = resolver.available_translations(&Locale::new("en")).await.unwrap();
        let second = resolver.available_translations(&Locale::new("en")).await.unwrap();

        assert_eq!(first, second);
        server.verify().await;
    }

    #[tokio::test]
    async fn call_after_ttl_fetches_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hello": "Hello" })))
            .expect(2)
            .mount(&server)
            .await;
        let cache = TranslationCache::in_memory().with_ttl(Duration::from_millis(100));
        let resolver = resolver_with_cache(&server.uri(), StaticLookup::new(), cache).await;

        resolver.available_translations(&Locale::new("en")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        resolver.available_translations(&Locale::new("en")).await.unwrap();

        server.verify().await;
    }

    #[tokio::test]
    async fn missing_remote_is_not_negatively_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fr.json"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        resolver.available_translations(&Locale::new("fr")).await.unwrap();
        resolver.available_translations(&Locale::new("fr")).await.unwrap();

        server.verify().await;
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "hello": "Hello" }))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;
        let en = Locale::new("en");

        let results =
            futures::future::join_all((0..10).map(|_| resolver.translate(&en, "hello"))).await;

        assert!(results.iter().all(|text| text == "Hello"));
        server.verify().await;
    }

    #[tokio::test]
    async fn stored_translations_replace_cached_bundle() {
        let server = translation_server().await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;
        let en = Locale::new("en");
        assert_eq!(resolver.translate(&en, "hello").await, "Hello");

        resolver
            .store_translations(&en, &bundle(json!({ "hello": "Updated Hello", "world": "Updated World" })))
            .await
            .unwrap();

        assert_eq!(resolver.translate(&en, "hello").await, "Updated Hello");
        assert_eq!(resolver.translate(&en, "world").await, "Updated World");
    }

    #[tokio::test]
    async fn warm_up_prefetches_available_locales() {
        let server = translation_server().await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        assert_eq!(resolver.warm_up().await, 2);
    }
}

/// Key resolution and the missing-translation placeholder.
mod translate {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn returns_remote_translation() {
        let server = translation_server().await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        assert_eq!(resolver.translate(&Locale::new("en"), "hello").await, "Hello");
        assert_eq!(resolver.translate(&Locale::new("es"), "world").await, "Mundo");
    }

    #[tokio::test]
    async fn key_encodings_resolve_identically() {
        let server = translation_server().await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;
        let en = Locale::new("en");

        assert_eq!(resolver.translate(&en, ":hello").await, "Hello");
        assert_eq!(resolver.translate(&en, " hello ").await, "Hello");
        assert_eq!(resolver.translate(&Locale::new(":en"), "hello").await, "Hello");
    }

    #[tokio::test]
    async fn nested_keys_resolve_through_merge() {
        let server = MockServer::start().await;
        mount_json(&server, "en.json", json!({ "menu": { "open": "Open" } })).await;
        let resolver = resolver_for(
            &server.uri(),
            local(vec![("en", json!({ "menu": { "close": "Close" } }))]),
        )
        .await;
        let en = Locale::new("en");

        assert_eq!(resolver.translate(&en, "menu.open").await, "Open");
        assert_eq!(resolver.translate(&en, "menu.close").await, "Close");
        assert_eq!(resolver.translate(&en, "menu").await, "translation missing: en.menu");
    }

    #[tokio::test]
    async fn falls_back_to_local_chain() {
        let server = translation_server().await;
        let lookup = local(vec![("en", json!({ "farewell": "Goodbye" })), ("fr", json!({}))])
            .with_fallbacks(["en"]);
        let resolver = resolver_for(&server.uri(), lookup).await;

        assert_eq!(resolver.translate(&Locale::new("fr"), "farewell").await, "Goodbye");
    }

    #[tokio::test]
    async fn missing_everywhere_yields_placeholder() {
        let server = translation_server().await;
        let resolver = resolver_for(&server.uri(), local(vec![("en", json!({}))])).await;

        assert_eq!(resolver.translate(&Locale::new("fr"), "hello").await, "translation missing: fr.hello");
        assert_eq!(resolver.translate(&Locale::new("fr"), ":hello").await, "translation missing: fr.hello");
    }

    #[tokio::test]
    async fn lookup_reports_missing_as_typed_error() {
        let server = translation_server().await;
        let resolver = resolver_for(&server.uri(), StaticLookup::new()).await;

        let result = resolver.lookup(&Locale::new("fr"), &TranslationKey::new("hello")).await;

        assert!(matches!(result, Err(ResolveError::Missing(_))));
    }

    #[tokio::test]
    async fn malformed_remote_yields_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;
        let resolver =
            resolver_for(&server.uri(), local(vec![("en", json!({ "hello": "Local Hello" }))])).await;

        assert_eq!(resolver.translate(&Locale::new("en"), "hello").await, "translation missing: en.hello");
    }

    #[tokio::test]
    async fn locale_cannot_escape_base_path() {
        let server = MockServer::start().await;
        mount_json(&server, "secret.json", json!({ "hello": "Outside" })).await;
        mount_json(&server, "i18n/secret.json", json!({ "hello": "Outside" })).await;
        let resolver = resolver_for(&format!("{}/i18n/v1", server.uri()), StaticLookup::new()).await;

        assert_eq!(
            resolver.translate(&Locale::new("../../secret"), "hello").await,
            "translation missing: ../../secret.hello"
        );
        assert_eq!(
            resolver.translate(&Locale::new("x?y=/../../secret"), "hello").await,
            "translation missing: x?y=/../../secret.hello"
        );

        let requested: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|request| request.url.path().to_string())
            .collect();
        assert!(requested.iter().all(|path| path.starts_with("/i18n/v1/")), "{requested:?}");
    }

    #[tokio::test]
    async fn total_outage_serves_local_translations() {
        let resolver = resolver_for(
            "http://127.0.0.1:9",
            local(vec![("en", json!({ "hello": "Local Hello" }))]),
        )
        .await;

        assert_eq!(resolver.translate(&Locale::new("en"), "hello").await, "Local Hello");
    }
}

/// Construction from settings.
mod setup {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn builds_from_settings() {
        let server = translation_server().await;
        let settings = BackendSettings { base_url: format!("{}/", server.uri()), ..BackendSettings::default() };

        let resolver = Resolver::new(&settings, Arc::new(StaticLookup::new())).await.unwrap();

        assert_eq!(resolver.remote().base_url(), server.uri());
        assert_eq!(resolver.translate(&Locale::new("en"), "world").await, "World");
    }

    #[tokio::test]
    async fn shared_starts_configured_refresh() {
        let server = MockServer::start().await;
        let initial = Mock::given(method("GET"))
            .and(path("/locales.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "locales": ["en"] })))
            .mount_as_scoped(&server)
            .await;
        let settings = BackendSettings {
            base_url: server.uri(),
            locale_refresh_interval_secs: Some(1),
            ..BackendSettings::default()
        };
        let resolver = Resolver::shared(&settings, Arc::new(StaticLookup::new())).await.unwrap();

        drop(initial);
        mount_json(&server, "locales.json", json!({ "locales": ["en", "ko"] })).await;
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(locale_set(resolver.available_locales()), set(&["en", "ko"]));
    }

    #[tokio::test]
    async fn invalid_redis_url_fails_setup() {
        let mut settings = BackendSettings::default();
        settings.cache.redis_url = Some("not a url".to_string());

        let result = Resolver::new(&settings, Arc::new(StaticLookup::new())).await;

        assert!(result.is_err());
    }
}
