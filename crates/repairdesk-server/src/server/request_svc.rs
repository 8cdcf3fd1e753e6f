//! Repair request lifecycle operations.

use repairdesk_core::config::PaginationConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::Principal;
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::{
    NewRequest, Page, RequestPatch, RequestStatus, SearchTerm, apply_patch, today,
};
use crate::policy::{Action, authorize, request_scope};
use crate::storage::{RepairDatabase, RepairRequest, RequestFilter, RequestView};

/// Query parameters of a list call.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct RequestPage {
    pub data: Vec<RequestView>,
    pub pagination: Pagination,
}

pub struct RequestService {
    db: RepairDatabase,
    pagination: PaginationConfig,
}

impl RequestService {
    pub const fn new(db: RepairDatabase, pagination: PaginationConfig) -> Self {
        Self { db, pagination }
    }

    /// One page of the requests visible to `principal`.
    ///
    /// Clients only ever see their own rows and technicians only the rows
    /// assigned to them, whatever filters are supplied.
    #[instrument(skip(self, params), fields(op = "list_requests", caller = principal.user_id))]
    pub async fn list(&self, principal: &Principal, params: ListParams) -> ApiResult<RequestPage> {
        authorize(principal, Action::ListRequests)?;

        let status = match params.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<RequestStatus>()?),
        };
        let filter = RequestFilter {
            scope: request_scope(principal),
            status,
            search: params.search.as_deref().and_then(SearchTerm::parse),
        };
        let page = Page::resolve(
            params.page,
            params.limit,
            self.pagination.default_limit,
            self.pagination.max_limit,
        );

        let (data, total) = self.db.list_requests(&filter, page).await?;

        Ok(RequestPage {
            data,
            pagination: Pagination {
                page: page.page,
                limit: page.limit,
                total,
                pages: page.pages(total),
            },
        })
    }

    #[instrument(skip(self), fields(op = "get_request", caller = principal.user_id))]
    pub async fn get(&self, principal: &Principal, request_id: i64) -> ApiResult<RequestView> {
        let view = self.db.get_request_view(request_id).await?;
        authorize(
            principal,
            Action::ReadRequest {
                client_id: view.request.client_id,
            },
        )?;
        Ok(view)
    }

    /// Open a new request in status `New`, dated today.
    #[instrument(skip(self, input), fields(op = "create_request", caller = principal.user_id))]
    pub async fn create(&self, principal: &Principal, input: NewRequest) -> ApiResult<RepairRequest> {
        authorize(principal, Action::CreateRequest)?;
        let draft = input.validate()?;

        let created = self.db.create_request(&draft, today()).await?;
        info!(
            request_id = created.request_id,
            client_id = created.client_id,
            "Request created"
        );
        Ok(created)
    }

    /// Apply a partial update inside one transaction.
    #[instrument(skip(self, patch), fields(op = "update_request", caller = principal.user_id))]
    pub async fn update(
        &self,
        principal: &Principal,
        request_id: i64,
        patch: RequestPatch,
    ) -> ApiResult<RequestView> {
        authorize(principal, Action::UpdateRequest)?;

        let date = today();
        let updated = self
            .db
            .update_request_with(request_id, |request| {
                apply_patch(request, &patch, date).map_err(ApiError::from)
            })
            .await?;

        info!(
            request_id,
            status = %updated.request.request_status,
            "Request updated"
        );
        Ok(updated)
    }

    /// Delete a request together with its comments.
    #[instrument(skip(self), fields(op = "delete_request", caller = principal.user_id))]
    pub async fn delete(&self, principal: &Principal, request_id: i64) -> ApiResult<()> {
        authorize(principal, Action::DeleteRequest)?;

        if !self.db.delete_request(request_id).await? {
            return Err(ApiError::not_found("Request", request_id));
        }
        info!(request_id, "Request deleted");
        Ok(())
    }
}
