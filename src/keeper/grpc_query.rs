//! gRPC query handlers of the keeper.
//!
//! Handlers take the decoded request as an `Option` so that an absent request body maps to
//! `INVALID_ARGUMENT`, and report every failure as a [`Status`].

use tonic::{Code, Status};
use tracing::{debug, warn};

use super::{Keeper, LatestStateInfoIndexSchema};
use crate::metrics::QUERY_REQUESTS;
use crate::pagination::{paginate, PaginationError};
use crate::types::{
    QueryAllLatestStateInfoIndexRequest, QueryAllLatestStateInfoIndexResponse,
    QueryGetLatestStateInfoIndexRequest, QueryGetLatestStateInfoIndexResponse,
};

const INVALID_REQUEST: &str = "invalid request";

impl From<PaginationError> for Status {
    fn from(err: PaginationError) -> Self {
        match err {
            PaginationError::KeyAndOffset => {
                Status::invalid_argument(PaginationError::KeyAndOffset.to_string())
            }
            PaginationError::Storage(err) => Status::internal(err.to_string()),
        }
    }
}

fn record_outcome<T>(method: &'static str, result: &Result<T, Status>) {
    let code = match result {
        Ok(_) => Code::Ok,
        Err(status) => status.code(),
    };
    if code == Code::Internal {
        warn!(method, "Query failed with internal error");
    }
    QUERY_REQUESTS
        .with_label_values(&[method, &format!("{code:?}")])
        .inc();
}

impl Keeper {
    /// Looks up the latest state info index of `request.rollapp_id`.
    ///
    /// Returns `INVALID_ARGUMENT` for a missing request or an empty rollapp id, and `NOT_FOUND`
    /// when the rollapp has no index.
    pub fn latest_state_info_index(
        &self,
        request: Option<&QueryGetLatestStateInfoIndexRequest>,
    ) -> Result<QueryGetLatestStateInfoIndexResponse, Status> {
        let result = self.latest_state_info_index_inner(request);
        record_outcome("LatestStateInfoIndex", &result);
        result
    }

    fn latest_state_info_index_inner(
        &self,
        request: Option<&QueryGetLatestStateInfoIndexRequest>,
    ) -> Result<QueryGetLatestStateInfoIndexResponse, Status> {
        let request = match request {
            Some(request) if !request.rollapp_id.is_empty() => request,
            _ => return Err(Status::invalid_argument(INVALID_REQUEST)),
        };

        let index = self
            .get_latest_state_info_index(&request.rollapp_id)
            .map_err(|err| Status::internal(err.to_string()))?;
        match index {
            Some(index) => Ok(QueryGetLatestStateInfoIndexResponse {
                latest_state_info_index: Some(index),
            }),
            None => {
                debug!(rollapp_id = %request.rollapp_id, "Latest state info index not found");
                Err(Status::not_found("not found"))
            }
        }
    }

    /// Lists latest state info indexes one page at a time, following `request.pagination`.
    ///
    /// Returns `INVALID_ARGUMENT` for a missing request or when the page request sets both a key
    /// and an offset.
    pub fn latest_state_info_index_all(
        &self,
        request: Option<&QueryAllLatestStateInfoIndexRequest>,
    ) -> Result<QueryAllLatestStateInfoIndexResponse, Status> {
        let result = self.latest_state_info_index_all_inner(request);
        record_outcome("LatestStateInfoIndexAll", &result);
        result
    }

    fn latest_state_info_index_all_inner(
        &self,
        request: Option<&QueryAllLatestStateInfoIndexRequest>,
    ) -> Result<QueryAllLatestStateInfoIndexResponse, Status> {
        let request = request.ok_or_else(|| Status::invalid_argument(INVALID_REQUEST))?;

        let mut latest_state_info_index = Vec::new();
        let page_response = paginate::<LatestStateInfoIndexSchema, _>(
            self.db(),
            request.pagination.as_ref(),
            self.query_config().default_limit,
            |_, index| {
                latest_state_info_index.push(index);
                Ok(())
            },
        )?;

        Ok(QueryAllLatestStateInfoIndexResponse {
            latest_state_info_index,
            pagination: Some(page_response),
        })
    }

    /// Async variant of [`Keeper::latest_state_info_index`]. Needs a multi-threaded runtime.
    pub async fn latest_state_info_index_async(
        &self,
        request: Option<&QueryGetLatestStateInfoIndexRequest>,
    ) -> Result<QueryGetLatestStateInfoIndexResponse, Status> {
        tokio::task::block_in_place(|| self.latest_state_info_index(request))
    }

    /// Async variant of [`Keeper::latest_state_info_index_all`]. Needs a multi-threaded runtime.
    pub async fn latest_state_info_index_all_async(
        &self,
        request: Option<&QueryAllLatestStateInfoIndexRequest>,
    ) -> Result<QueryAllLatestStateInfoIndexResponse, Status> {
        tokio::task::block_in_place(|| self.latest_state_info_index_all(request))
    }
}
