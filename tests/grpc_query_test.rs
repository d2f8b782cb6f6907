use std::collections::HashSet;
use std::num::NonZeroU64;

use rollapp_keeper::define_schema;
use rollapp_keeper::keeper::{Keeper, LatestStateInfoIndexSchema, KEY_SEPARATOR};
use rollapp_keeper::schema::{KeyDecoder, KeyEncoder, Schema, ValueCodec};
use rollapp_keeper::test::{create_n_latest_state_info_index, TestKeeper};
use rollapp_keeper::types::{
    PageRequest, QueryAllLatestStateInfoIndexRequest, QueryGetLatestStateInfoIndexRequest,
    QueryGetLatestStateInfoIndexResponse, StateInfoIndex,
};
use rollapp_keeper::{QueryConfig, RocksdbConfig};
use tonic::Code;

fn list_request(
    next: Vec<u8>,
    offset: u64,
    limit: u64,
    total: bool,
) -> QueryAllLatestStateInfoIndexRequest {
    QueryAllLatestStateInfoIndexRequest {
        pagination: Some(PageRequest {
            key: next,
            offset,
            limit,
            count_total: total,
            reverse: false,
        }),
    }
}

fn assert_subset(all: &[StateInfoIndex], page: &[StateInfoIndex]) {
    for item in page {
        assert!(all.contains(item), "{item:?} was never stored");
    }
}

#[test]
fn query_single() {
    let keeper = TestKeeper::new();
    let msgs = create_n_latest_state_info_index(&keeper, 2);

    for msg in &msgs {
        let response = keeper
            .latest_state_info_index(Some(&QueryGetLatestStateInfoIndexRequest {
                rollapp_id: msg.rollapp_id.clone(),
            }))
            .unwrap();
        assert_eq!(
            QueryGetLatestStateInfoIndexResponse {
                latest_state_info_index: Some(msg.clone()),
            },
            response
        );
    }

    let err = keeper
        .latest_state_info_index(Some(&QueryGetLatestStateInfoIndexRequest {
            rollapp_id: 100000.to_string(),
        }))
        .unwrap_err();
    assert_eq!(Code::NotFound, err.code());
    assert_eq!("not found", err.message());

    let err = keeper.latest_state_info_index(None).unwrap_err();
    assert_eq!(Code::InvalidArgument, err.code());
    assert_eq!("invalid request", err.message());
}

#[test]
fn query_paginated_by_offset() {
    let keeper = TestKeeper::new();
    let msgs = create_n_latest_state_info_index(&keeper, 5);

    let step = 2;
    let mut seen = Vec::new();
    for i in (0..msgs.len()).step_by(step) {
        let response = keeper
            .latest_state_info_index_all(Some(&list_request(
                Vec::new(),
                i as u64,
                step as u64,
                false,
            )))
            .unwrap();
        assert!(response.latest_state_info_index.len() <= step);
        assert_subset(&msgs, &response.latest_state_info_index);
        seen.extend(response.latest_state_info_index);
    }
    assert_eq!(msgs, seen);
}

#[test]
fn query_paginated_by_key() {
    let keeper = TestKeeper::new();
    let msgs = create_n_latest_state_info_index(&keeper, 5);

    let step = 2;
    let mut next = Vec::new();
    let mut seen = Vec::new();
    for _ in (0..msgs.len()).step_by(step) {
        let response = keeper
            .latest_state_info_index_all(Some(&list_request(next, 0, step as u64, false)))
            .unwrap();
        assert!(response.latest_state_info_index.len() <= step);
        assert_subset(&msgs, &response.latest_state_info_index);
        seen.extend(response.latest_state_info_index);
        next = response.pagination.unwrap().next_key;
    }
    assert!(next.is_empty(), "cursor should be exhausted");
    assert_eq!(msgs, seen);
}

#[test]
fn query_paginated_total() {
    let keeper = TestKeeper::new();
    let msgs = create_n_latest_state_info_index(&keeper, 5);

    let response = keeper
        .latest_state_info_index_all(Some(&list_request(Vec::new(), 0, 0, true)))
        .unwrap();
    assert_eq!(msgs.len() as u64, response.pagination.unwrap().total);

    let expected: HashSet<StateInfoIndex> = msgs.into_iter().collect();
    let actual: HashSet<StateInfoIndex> = response.latest_state_info_index.into_iter().collect();
    assert_eq!(expected, actual);
}

#[test]
fn query_paginated_invalid_request() {
    let keeper = TestKeeper::new();
    create_n_latest_state_info_index(&keeper, 5);

    let err = keeper.latest_state_info_index_all(None).unwrap_err();
    assert_eq!(Code::InvalidArgument, err.code());
    assert_eq!("invalid request", err.message());
}

#[test]
fn default_limit_comes_from_config() {
    let keeper = TestKeeper::with_query_config(QueryConfig {
        default_limit: NonZeroU64::new(3).unwrap(),
    });
    let msgs = create_n_latest_state_info_index(&keeper, 5);

    let response = keeper
        .latest_state_info_index_all(Some(&list_request(Vec::new(), 0, 0, false)))
        .unwrap();
    assert_eq!(&msgs[..3], &response.latest_state_info_index[..]);
    let pagination = response.pagination.unwrap();
    assert_eq!(5, pagination.total);
    assert_eq!(b"3/".to_vec(), pagination.next_key);
}

#[test]
fn zero_limit_cursor_walk_reaches_the_end() {
    let keeper = TestKeeper::with_query_config(QueryConfig {
        default_limit: NonZeroU64::MIN,
    });
    let msgs = create_n_latest_state_info_index(&keeper, 3);

    let mut next = Vec::new();
    let mut seen = Vec::new();
    for _ in 0..=msgs.len() {
        let response = keeper
            .latest_state_info_index_all(Some(&list_request(next, 0, 0, false)))
            .unwrap();
        seen.extend(response.latest_state_info_index);
        next = response.pagination.unwrap().next_key;
        if next.is_empty() {
            break;
        }
    }
    assert!(next.is_empty(), "cursor should be exhausted");
    assert_eq!(msgs, seen);
}

// Same column family as `LatestStateInfoIndexSchema`, but values are stored as raw bytes.
define_schema!(
    RawLatestStateInfoIndexSchema,
    String,
    Vec<u8>,
    LatestStateInfoIndexSchema::COLUMN_FAMILY_NAME
);

impl KeyEncoder<RawLatestStateInfoIndexSchema> for String {
    fn encode_key(&self) -> rollapp_keeper::schema::Result<Vec<u8>> {
        let mut key = self.as_bytes().to_vec();
        key.push(KEY_SEPARATOR);
        Ok(key)
    }
}

impl KeyDecoder<RawLatestStateInfoIndexSchema> for String {
    fn decode_key(data: &[u8]) -> rollapp_keeper::schema::Result<Self> {
        Ok(String::from_utf8_lossy(data).into_owned())
    }
}

impl ValueCodec<RawLatestStateInfoIndexSchema> for Vec<u8> {
    fn encode_value(&self) -> rollapp_keeper::schema::Result<Vec<u8>> {
        Ok(self.clone())
    }

    fn decode_value(data: &[u8]) -> rollapp_keeper::schema::Result<Self> {
        Ok(data.to_vec())
    }
}

#[test]
fn undecodable_value_is_internal() {
    let keeper = TestKeeper::new();
    create_n_latest_state_info_index(&keeper, 2);
    // Field 2 announces a varint that never comes.
    keeper
        .db()
        .put::<RawLatestStateInfoIndexSchema>(&"corrupt".to_string(), &vec![0x10])
        .unwrap();

    let err = keeper
        .latest_state_info_index(Some(&QueryGetLatestStateInfoIndexRequest {
            rollapp_id: "corrupt".to_string(),
        }))
        .unwrap_err();
    assert_eq!(Code::Internal, err.code());

    let err = keeper
        .latest_state_info_index_all(Some(&QueryAllLatestStateInfoIndexRequest::default()))
        .unwrap_err();
    assert_eq!(Code::Internal, err.code());

    // Records stored before the corrupt one are still served individually.
    assert!(keeper
        .latest_state_info_index(Some(&QueryGetLatestStateInfoIndexRequest {
            rollapp_id: "0".to_string(),
        }))
        .is_ok());
}

#[test]
fn read_only_keeper_serves_queries() {
    let keeper = TestKeeper::new();
    let msgs = create_n_latest_state_info_index(&keeper, 4);
    let tmpdir = keeper.close();

    let keeper = Keeper::open_read_only(
        tmpdir.path(),
        &RocksdbConfig::default(),
        QueryConfig::default(),
    )
    .unwrap();
    let response = keeper
        .latest_state_info_index_all(Some(&QueryAllLatestStateInfoIndexRequest::default()))
        .unwrap();
    assert_eq!(msgs, response.latest_state_info_index);
    assert!(keeper.set_latest_state_info_index(&msgs[0]).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn async_handlers() {
    let keeper = TestKeeper::new();
    let msgs = create_n_latest_state_info_index(&keeper, 3);

    let response = keeper
        .latest_state_info_index_async(Some(&QueryGetLatestStateInfoIndexRequest {
            rollapp_id: msgs[1].rollapp_id.clone(),
        }))
        .await
        .unwrap();
    assert_eq!(Some(msgs[1].clone()), response.latest_state_info_index);

    let err = keeper
        .latest_state_info_index_all_async(None)
        .await
        .unwrap_err();
    assert_eq!(Code::InvalidArgument, err.code());

    let response = keeper
        .latest_state_info_index_all_async(Some(&list_request(Vec::new(), 1, 1, false)))
        .await
        .unwrap();
    assert_eq!(vec![msgs[1].clone()], response.latest_state_info_index);
}
