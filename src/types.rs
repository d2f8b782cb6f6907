//! Protobuf messages of the rollapp query service and the Cosmos pagination types it embeds.
//!
//! Field tags match `dymensionxyz.dymension.rollapp` and `cosmos.base.query.v1beta1`, so the
//! messages stay wire compatible with other clients of the service.

/// Pointer to the state info of a rollapp at a given index.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct StateInfoIndex {
    /// The rollapp this index belongs to.
    #[prost(string, tag = "1")]
    pub rollapp_id: ::prost::alloc::string::String,
    /// Index of the state info within the rollapp.
    #[prost(uint64, tag = "2")]
    pub index: u64,
}

/// Pagination parameters of a list request.
///
/// `key` and `offset` are mutually exclusive: a non-empty `key` resumes after a previous page,
/// `offset` skips records from the start.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct PageRequest {
    /// `next_key` of the previous page. Empty to start from the beginning.
    #[prost(bytes = "vec", tag = "1")]
    pub key: ::prost::alloc::vec::Vec<u8>,
    /// Number of records to skip. Only valid without `key`.
    #[prost(uint64, tag = "2")]
    pub offset: u64,
    /// Maximum number of records in the page. Zero selects the default limit.
    #[prost(uint64, tag = "3")]
    pub limit: u64,
    /// Whether to report the total number of records. Ignored with `key`.
    #[prost(bool, tag = "4")]
    pub count_total: bool,
    /// Iterate in descending key order.
    #[prost(bool, tag = "5")]
    pub reverse: bool,
}

/// Pagination state returned with a page.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct PageResponse {
    /// Key to pass as [`PageRequest::key`] for the next page. Empty when there is none.
    #[prost(bytes = "vec", tag = "1")]
    pub next_key: ::prost::alloc::vec::Vec<u8>,
    /// Total number of records, when it was counted.
    #[prost(uint64, tag = "2")]
    pub total: u64,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
#[allow(missing_docs)]
pub struct QueryGetLatestStateInfoIndexRequest {
    #[prost(string, tag = "1")]
    pub rollapp_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
#[allow(missing_docs)]
pub struct QueryGetLatestStateInfoIndexResponse {
    #[prost(message, optional, tag = "1")]
    pub latest_state_info_index: ::core::option::Option<StateInfoIndex>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
#[allow(missing_docs)]
pub struct QueryAllLatestStateInfoIndexRequest {
    #[prost(message, optional, tag = "1")]
    pub pagination: ::core::option::Option<PageRequest>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
#[allow(missing_docs)]
pub struct QueryAllLatestStateInfoIndexResponse {
    #[prost(message, repeated, tag = "1")]
    pub latest_state_info_index: ::prost::alloc::vec::Vec<StateInfoIndex>,
    #[prost(message, optional, tag = "2")]
    pub pagination: ::core::option::Option<PageResponse>,
}

impl PageRequest {
    /// Request starting at the record with the given `next_key`.
    pub fn with_key(key: impl Into<Vec<u8>>, limit: u64) -> Self {
        Self {
            key: key.into(),
            limit,
            ..Default::default()
        }
    }

    /// Request skipping the first `offset` records.
    pub fn with_offset(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            ..Default::default()
        }
    }
}

#[cfg(feature = "arbitrary")]
/// Rollapp ids are drawn from characters that sort after the key separator, so their string
/// order matches store order.
impl proptest::arbitrary::Arbitrary for StateInfoIndex {
    type Parameters = ();

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        use proptest::prelude::any;
        use proptest::strategy::Strategy;

        ("[a-z][a-z0-9_]{0,15}", any::<u64>())
            .prop_map(|(rollapp_id, index)| StateInfoIndex { rollapp_id, index })
            .boxed()
    }

    type Strategy = proptest::strategy::BoxedStrategy<Self>;
}
