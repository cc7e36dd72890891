//! Several connections draining one queue.

use std::collections::BTreeSet;

use tessera::{AsyncTessera, Store, StoreConfig, Value};
use tessera_testkit::fixtures::{int, TestFixture};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_item_dequeued_once() {
    let fixture = TestFixture::on_disk(8);
    let producer = AsyncTessera::open(&fixture.path, StoreConfig::default())
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for p in 0..4i64 {
        let producer = producer.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..25 {
                producer.enqueue(int(p * 100 + i)).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(fixture.db.queue().count_records().unwrap(), 100);

    let mut consumers = Vec::new();
    for _ in 0..3 {
        let consumer = AsyncTessera::open(&fixture.path, StoreConfig::default())
            .await
            .unwrap();
        consumers.push(tokio::spawn(async move {
            let mut got = Vec::new();
            while let Some(value) = consumer.dequeue().await.unwrap() {
                got.push(value);
            }
            got
        }));
    }

    let mut seen = BTreeSet::new();
    let mut total = 0;
    for consumer in consumers {
        for value in consumer.await.unwrap() {
            let Value::Integer(n) = value else {
                panic!("unexpected value {:?}", value);
            };
            seen.insert(i128::from(n));
            total += 1;
        }
    }
    assert_eq!(total, 100);
    assert_eq!(seen.len(), 100);
    assert!(fixture.db.queue().is_empty().unwrap());
}

#[tokio::test]
async fn test_stack_shared_between_handles() {
    let fixture = TestFixture::on_disk(2);
    let a = AsyncTessera::open(&fixture.path, StoreConfig::default())
        .await
        .unwrap();
    let b = AsyncTessera::open(&fixture.path, StoreConfig::default())
        .await
        .unwrap();

    a.push(int(1)).await.unwrap();
    b.push(int(2)).await.unwrap();
    assert_eq!(a.pop().await.unwrap(), Some(int(2)));
    assert_eq!(b.pop().await.unwrap(), Some(int(1)));
    assert_eq!(a.pop().await.unwrap(), None);
}
