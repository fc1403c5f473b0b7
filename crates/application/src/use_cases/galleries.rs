//! Gallery operations.

use portal_domain::{ApiRequest, Gallery, GalleryDraft, GalleryId, GalleryQuery, HttpMethod};

use super::PortalClient;
use super::portal_client::encode_error;
use crate::cache::CollectionName;
use crate::error::ApplicationResult;

impl PortalClient {
    /// Lists galleries, served from the cache while fresh.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`](crate::ApiError) of the request pipeline.
    pub async fn list_galleries(&self, query: &GalleryQuery) -> ApplicationResult<Vec<Gallery>> {
        let galleries = self.cache.galleries();
        if let Some(list) = galleries.get(query) {
            return Ok(list);
        }

        let generation = galleries.generation();
        let request = ApiRequest::get("/galleries").with_optional_query("event", query.event);
        let list: Vec<Gallery> = self.fetch(&request).await?;
        galleries.set_if_unchanged(generation, *query, list.clone());
        Ok(list)
    }

    /// Creates a gallery and invalidates the gallery listings.
    ///
    /// # Errors
    ///
    /// [`ApiError::Invalid`](crate::ApiError::Invalid) for a draft the
    /// backend would reject, or any error of the request pipeline.
    pub async fn create_gallery(&self, draft: &GalleryDraft) -> ApplicationResult<Gallery> {
        draft.validate()?;
        let request =
            ApiRequest::json(HttpMethod::Post, "/galleries", draft).map_err(|e| encode_error(&e))?;

        let created: Gallery = self.fetch(&request).await?;
        self.cache.invalidate(CollectionName::Galleries);
        Ok(created)
    }

    /// Deletes a gallery and invalidates the gallery listings.
    ///
    /// # Errors
    ///
    /// Any [`ApiError`](crate::ApiError) of the request pipeline.
    pub async fn delete_gallery(&self, id: GalleryId) -> ApplicationResult<()> {
        self.execute(&ApiRequest::delete(format!("/galleries/{id}"))).await?;
        self.cache.invalidate(CollectionName::Galleries);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::PortalFixture;
    use portal_domain::{EventId, EventQuery};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_list_galleries_filters_by_event() {
        let fx = PortalFixture::portal().await;

        let galleries = fx
            .client
            .list_galleries(&GalleryQuery::for_event(EventId(1)))
            .await
            .unwrap();
        fx.client
            .list_galleries(&GalleryQuery::for_event(EventId(1)))
            .await
            .unwrap();

        assert_eq!(galleries[0].id, GalleryId(7));
        assert_eq!(galleries[0].image_count, 12);
        assert_eq!(fx.sent(), vec!["GET /galleries"]);
        assert_eq!(fx.transport.recorded()[0].query_value("event"), Some("1"));
    }

    #[tokio::test]
    async fn test_gallery_writes_leave_events_cached() {
        let fx = PortalFixture::portal().await;
        fx.client.list_events(&EventQuery::default()).await.unwrap();
        fx.client.list_galleries(&GalleryQuery::default()).await.unwrap();

        let created = fx
            .client
            .create_gallery(&GalleryDraft::new("New", Some(EventId(1))))
            .await
            .unwrap();
        assert_eq!(created.id, GalleryId(8));
        assert_eq!(fx.client.cache().len(CollectionName::Galleries), 0);
        assert_eq!(fx.client.cache().len(CollectionName::Events), 1);

        fx.client.list_galleries(&GalleryQuery::default()).await.unwrap();
        fx.client.delete_gallery(GalleryId(7)).await.unwrap();
        assert_eq!(fx.client.cache().len(CollectionName::Galleries), 0);
        assert_eq!(fx.client.cache().len(CollectionName::Events), 1);
    }
}
