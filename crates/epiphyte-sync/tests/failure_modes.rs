//! Transport failures during pull and push.

mod common;

use common::{collect, fast_options, open, TestStore};
use epiphyte_core::{EpiphyteError, ErrorKind, Salt, ThreadId};
use epiphyte_storage::store_frame;
use epiphyte_sync::{ChainState, Session, SessionOptions};

#[tokio::test]
async fn failed_fetch_is_not_end_of_chain() {
    let store = TestStore::new();
    let mut writer = open("flaky", &store).await;
    for m in ["one", "two", "three"] {
        writer.push(m.as_bytes()).await.unwrap();
    }

    // third get fails: two chunks decrypted, the third never fetched
    let flaky = store.failing(Some(3), None);
    let mut reader =
        Session::new(ThreadId::from("flaky"), &Salt::default(), flaky, fast_options()).unwrap();
    let err = reader.pull().await.unwrap_err();

    assert!(matches!(err, EpiphyteError::Connection(_)));
    assert_eq!(err.kind(), ErrorKind::TransientIo);
    assert_eq!(collect(&reader), vec![b"one".to_vec(), b"two".to_vec()]);
    assert_ne!(reader.state(), ChainState::Synced);

    // retrying resumes from the tail instead of starting over
    assert_eq!(reader.pull().await.unwrap(), 1);
    assert_eq!(reader.state(), ChainState::Synced);
    assert_eq!(
        collect(&reader),
        vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
    );
}

#[tokio::test]
async fn open_surfaces_fetch_failure() {
    let store = TestStore::new();
    open("down", &store).await.push(b"anything").await.unwrap();

    let result = Session::open(
        ThreadId::from("down"),
        &Salt::default(),
        store.failing(Some(1), None),
        fast_options(),
    )
    .await;
    assert!(matches!(result, Err(EpiphyteError::Connection(_))));
}

#[tokio::test]
async fn partial_push_keeps_local_and_remote_aligned() {
    let store = TestStore::new();
    let opts = SessionOptions {
        fragment_size: 4,
        ..fast_options()
    };

    // second set times out: only the first fragment lands
    let flaky = store.failing(None, Some(2));
    let mut writer = Session::open(ThreadId::from("partial"), &Salt::default(), flaky.clone(), opts)
        .await
        .unwrap();
    let err = writer.push(b"aaaabbbbcccc").await.unwrap_err();

    assert!(matches!(err, EpiphyteError::Timeout(_)));
    assert_eq!(flaky.sets(), 2);
    assert_eq!(writer.thread().len(), 1);
    assert_eq!(collect(&writer), vec![b"aaaa".to_vec()]);

    let reader = open("partial", &store).await;
    assert_eq!(collect(&reader), vec![b"aaaa".to_vec()]);
    assert_eq!(reader.thread().tail().link, writer.thread().tail().link);

    // the next push continues from the last stored fragment
    writer.push(b"dddd").await.unwrap();
    let reader = open("partial", &store).await;
    assert_eq!(collect(&reader), vec![b"aaaa".to_vec(), b"dddd".to_vec()]);
}

#[tokio::test]
async fn first_fragment_failure_leaves_thread_untouched() {
    let store = TestStore::new();
    let flaky = store.failing(None, Some(1));
    let mut writer = Session::open(ThreadId::from("nothing"), &Salt::default(), flaky, fast_options())
        .await
        .unwrap();

    assert!(writer.push(b"lost").await.is_err());
    assert!(writer.thread().is_empty());
    assert!(open("nothing", &store).await.thread().is_empty());
}

#[tokio::test]
async fn stale_writer_cannot_overwrite() {
    let store = TestStore::new();
    let mut a = open("race", &store).await;
    let b = open("race", &store).await;

    a.push(b"a wins").await.unwrap();

    // b still holds genesis as its tail and targets the same key
    let sealed = b.thread().seal(b"b loses").unwrap();
    assert_eq!(*sealed.key(), b.thread().genesis().link);
    let err = store_frame(b.store(), sealed.key(), sealed.frame())
        .await
        .unwrap_err();

    assert!(matches!(err, EpiphyteError::AlreadyExists(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(collect(&open("race", &store).await), vec![b"a wins".to_vec()]);
}

#[tokio::test]
async fn corrupt_record_stops_traversal() {
    let store = TestStore::new();
    let mut writer = open("corrupt", &store).await;
    writer.push(b"good").await.unwrap();

    // plant garbage where the second chunk would live
    let tail = writer.thread().tail().link;
    store_frame(&store, &tail, &[0u8; 7]).await.unwrap();

    let mut reader =
        Session::new(ThreadId::from("corrupt"), &Salt::default(), store.clone(), fast_options())
            .unwrap();
    let err = reader.pull().await.unwrap_err();
    assert!(matches!(err, EpiphyteError::MalformedFrame(_)));
    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert_eq!(collect(&reader), vec![b"good".to_vec()]);
}
