//! Event operations.

use portal_domain::{ApiRequest, EventDetails, EventDraft, EventId, EventPage, EventQuery, HttpMethod};

use super::PortalClient;
use super::portal_client::encode_error;
use crate::cache::CollectionName;
use crate::error::ApplicationResult;

fn event_path(id: EventId) -> String {
    format!("/events/{id}")
}

impl PortalClient {
    /// Lists events, served from the cache while fresh.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`](crate::ApiError) of the request pipeline.
    pub async fn list_events(&self, query: &EventQuery) -> ApplicationResult<EventPage> {
        let events = self.cache.events();
        if let Some(page) = events.get(query) {
            return Ok(page);
        }

        let generation = events.generation();
        let request = ApiRequest::get("/events")
            .with_query("page", query.page)
            .with_query("page_size", query.page_size)
            .with_optional_query("search", query.search.as_deref())
            .with_optional_query("status", query.status);
        let page: EventPage = self.fetch(&request).await?;
        events.set_if_unchanged(generation, query.clone(), page.clone());
        Ok(page)
    }

    /// Fetches one event, served from the cache while fresh.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`](crate::ApiError) of the request pipeline.
    pub async fn get_event(&self, id: EventId) -> ApplicationResult<EventDetails> {
        let details = self.cache.event_details();
        if let Some(event) = details.get(&id) {
            return Ok(event);
        }

        let generation = details.generation();
        let event: EventDetails = self.fetch(&ApiRequest::get(event_path(id))).await?;
        details.set_if_unchanged(generation, id, event.clone());
        Ok(event)
    }

    /// Creates an event.
    ///
    /// Invalidates the event listings and caches the created event.
    ///
    /// # Errors
    ///
    /// [`ApiError::Invalid`](crate::ApiError::Invalid) for a draft the
    /// backend would reject, or any error of the request pipeline.
    pub async fn create_event(&self, draft: &EventDraft) -> ApplicationResult<EventDetails> {
        draft.validate()?;
        let request =
            ApiRequest::json(HttpMethod::Post, "/events", draft).map_err(|e| encode_error(&e))?;

        let created: EventDetails = self.fetch(&request).await?;
        self.cache.invalidate(CollectionName::Events);
        self.cache.event_details().replace(created.id, created.clone());
        Ok(created)
    }

    /// Replaces an event.
    ///
    /// Invalidates the event listings and overwrites the cached event.
    ///
    /// # Errors
    ///
    /// [`ApiError::Invalid`](crate::ApiError::Invalid) for a draft the
    /// backend would reject, or any error of the request pipeline.
    pub async fn update_event(&self, id: EventId, draft: &EventDraft) -> ApplicationResult<EventDetails> {
        draft.validate()?;
        let request = ApiRequest::json(HttpMethod::Put, event_path(id), draft)
            .map_err(|e| encode_error(&e))?;

        let updated: EventDetails = self.fetch(&request).await?;
        self.cache.invalidate(CollectionName::Events);
        self.cache.event_details().replace(id, updated.clone());
        Ok(updated)
    }

    /// Deletes an event.
    ///
    /// Invalidates the event and gallery listings and evicts the event.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`](crate::ApiError) of the request pipeline.
    pub async fn delete_event(&self, id: EventId) -> ApplicationResult<()> {
        self.execute(&ApiRequest::delete(event_path(id))).await?;
        self.cache.invalidate(CollectionName::Events);
        self.cache.event_details().remove(&id);
        // galleries reference their event
        self.cache.invalidate(CollectionName::Galleries);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::test_support::{
        PortalFixture, ScriptedBackend, ScriptedTransport, minutes, portal_routes,
    };
    use std::time::Duration;
    use portal_domain::{EventStatus, GalleryQuery};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_list_events_reads_through_cache() {
        let fx = PortalFixture::portal().await;
        let query = EventQuery::page(1).with_search("gala").with_status(EventStatus::Published);

        let first = fx.client.list_events(&query).await.unwrap();
        let second = fx.client.list_events(&query).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.total, 1);
        assert_eq!(fx.sent(), vec!["GET /events"]);
        let sent = &fx.transport.recorded()[0];
        assert_eq!(sent.query_value("page"), Some("1"));
        assert_eq!(sent.query_value("page_size"), Some("20"));
        assert_eq!(sent.query_value("search"), Some("gala"));
        assert_eq!(sent.query_value("status"), Some("published"));
    }

    #[tokio::test]
    async fn test_distinct_queries_are_cached_separately() {
        let fx = PortalFixture::portal().await;

        fx.client.list_events(&EventQuery::page(1)).await.unwrap();
        fx.client.list_events(&EventQuery::page(2)).await.unwrap();
        fx.client.list_events(&EventQuery::page(1)).await.unwrap();

        assert_eq!(fx.sent().len(), 2);
        assert_eq!(fx.client.cache().len(CollectionName::Events), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_fetched_again() {
        let fx = PortalFixture::portal().await;

        fx.client.get_event(EventId(1)).await.unwrap();
        fx.clock.advance(minutes(5));
        let event = fx.client.get_event(EventId(1)).await.unwrap();

        assert_eq!(event.gallery_ids.len(), 1);
        assert_eq!(fx.sent(), vec!["GET /events/1", "GET /events/1"]);
    }

    #[tokio::test]
    async fn test_create_event_invalidates_listing_and_caches_result() {
        let fx = PortalFixture::portal().await;
        fx.client.list_events(&EventQuery::default()).await.unwrap();
        fx.client.list_galleries(&GalleryQuery::default()).await.unwrap();

        let created = fx.client.create_event(&EventDraft::new("Fair")).await.unwrap();
        let fetched = fx.client.get_event(created.id).await.unwrap();
        fx.client.list_events(&EventQuery::default()).await.unwrap();
        fx.client.list_galleries(&GalleryQuery::default()).await.unwrap();

        assert_eq!(created.title, "Fair");
        assert_eq!(fetched, created);
        assert_eq!(
            fx.sent(),
            vec!["GET /events", "GET /galleries", "POST /events", "GET /events"]
        );
    }

    #[tokio::test]
    async fn test_update_event_overwrites_cached_details() {
        let fx = PortalFixture::portal().await;
        fx.client.get_event(EventId(1)).await.unwrap();
        fx.client.list_events(&EventQuery::default()).await.unwrap();

        fx.client
            .update_event(EventId(1), &EventDraft::new("Renamed"))
            .await
            .unwrap();

        let event = fx.client.get_event(EventId(1)).await.unwrap();
        assert_eq!(event.title, "Renamed");
        assert_eq!(fx.client.cache().len(CollectionName::Events), 0);
        assert_eq!(fx.sent().last().map(String::as_str), Some("PUT /events/1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_does_not_overwrite_update() {
        let fx = PortalFixture::new(
            ScriptedTransport::new(portal_routes).with_read_delay(Duration::from_millis(200)),
            ScriptedBackend::new(),
        )
        .await;

        let (read, written) = tokio::join!(fx.client.get_event(EventId(1)), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            fx.client
                .update_event(EventId(1), &EventDraft::new("Renamed"))
                .await
        });

        assert_eq!(read.unwrap().title, "Gala");
        assert_eq!(written.unwrap().title, "Renamed");
        let cached = fx.client.get_event(EventId(1)).await.unwrap();
        assert_eq!(cached.title, "Renamed");
        assert_eq!(fx.sent(), vec!["GET /events/1", "PUT /events/1"]);
    }

    #[tokio::test]
    async fn test_delete_event_evicts_event_and_galleries() {
        let fx = PortalFixture::portal().await;
        fx.client.get_event(EventId(1)).await.unwrap();
        fx.client.list_events(&EventQuery::default()).await.unwrap();
        fx.client
            .list_galleries(&GalleryQuery::for_event(EventId(1)))
            .await
            .unwrap();

        fx.client.delete_event(EventId(1)).await.unwrap();

        let cache = fx.client.cache();
        for name in CollectionName::ALL {
            assert_eq!(cache.len(name), 0, "{name} should be empty");
        }
    }

    #[tokio::test]
    async fn test_invalid_draft_is_not_sent() {
        let fx = PortalFixture::portal().await;

        let err = fx.client.create_event(&EventDraft::new("  ")).await.unwrap_err();

        assert!(matches!(err, ApiError::Invalid(_)));
        assert!(fx.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let fx = PortalFixture::portal().await;
        fx.client.list_events(&EventQuery::default()).await.unwrap();

        let err = fx.client.delete_event(EventId(99)).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(fx.client.cache().len(CollectionName::Events), 1);
    }

    #[tokio::test]
    async fn test_expired_session_clears_cache() {
        let fx = PortalFixture::new(
            ScriptedTransport::new(|request| {
                if request.path == "/galleries" {
                    crate::test_support::portal_routes(request)
                } else {
                    Ok(portal_domain::ApiResponse::json_body(401, &serde_json::json!({})))
                }
            }),
            ScriptedBackend::new(),
        )
        .await;
        fx.client.list_galleries(&GalleryQuery::default()).await.unwrap();

        let err = fx.client.get_event(EventId(1)).await.unwrap_err();

        assert!(err.is_session_expired());
        assert!(!fx.client.guard().is_authenticated());
        assert_eq!(fx.client.cache().len(CollectionName::Galleries), 0);
        assert_eq!(fx.backend.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_cache() {
        let fx = PortalFixture::portal().await;
        fx.client.get_event(EventId(1)).await.unwrap();

        fx.client.logout().await;
        fx.client.logout().await;

        assert!(!fx.client.guard().is_authenticated());
        assert!(fx.client.cache().event_details().is_empty());
    }
}
