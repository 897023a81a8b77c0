use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grapple_cassandra::{
    codec::{Int64Codec, Utf8Codec},
    transport::MemoryTransport,
    Cluster, ColumnFamily, Error,
};
use tokio::runtime::Runtime;

const ROWS: usize = 1_000;
const COLUMNS: usize = 10;

type Family = ColumnFamily<String, String, i64>;

async fn seed() -> Family {
    let keyspace = Cluster::new(["localhost"])
        .keyspace("Bench")
        .connect_with(Arc::new(MemoryTransport::new()))
        .await
        .unwrap();

    let cf = keyspace
        .column_family("Standard1", Utf8Codec, Utf8Codec, Int64Codec)
        .unwrap();

    for chunk in (0..ROWS).collect::<Vec<_>>().chunks(100) {
        let mut batch = cf.batch();
        for i in chunk {
            let key = format!("key{i:05}");
            for c in 0..COLUMNS {
                batch = batch.insert(&key, &cf.new_column(format!("col{c:02}"), *i as i64));
            }
        }
        batch.execute().await.unwrap();
    }

    cf
}

fn bench_rows_cursor(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let cf = runtime.block_on(seed());

    let mut group = c.benchmark_group("rows_cursor");
    group.throughput(Throughput::Elements(ROWS as u64));

    for page_size in [10, 100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(page_size),
            &page_size,
            |b, &page_size| {
                b.to_async(&runtime).iter(|| async {
                    let mut rows = 0;
                    cf.rows_cursor(page_size)
                        .unwrap()
                        .foreach(|row| {
                            rows += black_box(row).len();
                            Ok::<_, Error>(())
                        })
                        .await
                        .unwrap();
                    assert_eq!(ROWS * COLUMNS, rows);
                });
            },
        );
    }

    group.finish();
}

fn bench_columns_cursor(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let cf = runtime.block_on(seed());
    let key = "key00042".to_string();

    c.bench_function("columns_cursor_page_3", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut columns = 0;
            cf.columns_cursor(3, &key)
                .unwrap()
                .foreach(|column| {
                    black_box(column);
                    columns += 1;
                    Ok::<_, Error>(())
                })
                .await
                .unwrap();
            assert_eq!(COLUMNS, columns);
        });
    });
}

criterion_group!(benches, bench_rows_cursor, bench_columns_cursor);
criterion_main!(benches);
