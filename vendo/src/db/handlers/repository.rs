//! The repository trait every table-backed handler implements.

use crate::db::errors::Result;

/// CRUD surface over one Postgres table.
///
/// Each entity defines its own request, response, id and filter types;
/// anything beyond plain CRUD (status transitions, ledger appends, counts)
/// lives on the concrete repository as inherent methods.
#[async_trait::async_trait]
pub trait Repository {
    type CreateRequest;
    type UpdateRequest;
    type Response;
    type Id: Send + Sync;
    type Filter: Send + Sync;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List entities matching the filter, newest first, paginated.
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Delete by id; `false` when no row matched.
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
