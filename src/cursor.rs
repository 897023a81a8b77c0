//! Cursors paging through the rows of a column family or the columns of a row.
//!
//! A [`Cursor`] turns an unbounded scan into a lazy sequence. It requests up to
//! `page_size` items strictly after the last item it delivered, hands them to
//! the caller, and only then asks for the next page. At most one page is held
//! in memory and the caller applies backpressure simply by not asking for more.
//!
//! A page shorter than `page_size` ends the scan. A full page is always
//! followed by another request, so scanning `n` items issues `n / page_size + 1`
//! requests: when `page_size` divides `n` the last request comes back empty.
//! Scanning an empty family issues exactly one request.
//!
//! A page holding an item the codecs cannot decode fails with the decode
//! error and ends the scan.
//!
//! Items are delivered in store order. The scan is not a snapshot: rows or
//! columns removed between two page requests silently disappear from it.
//!
//! Three ways to consume a cursor:
//!
//! - [`Pagable`]: `next_page` / `skip_page` for explicit page-by-page control.
//! - [`Cursor::foreach`] and [`Cursor::foreach_async`]: push every item into a
//!   consumer; a consumer error aborts the scan and is returned.
//! - [`Cursor::into_stream`]: a pull-based [`Stream`] of items.
//!
//! Dropping the future of any of these (or aborting the task running it)
//! cancels the in-flight page request. Items already delivered stay delivered.
//!
//! # Example
//!
//! ```rust,no_run
//! use grapple_cassandra::{ColumnFamily, Pagable};
//!
//! # async fn example(cf: ColumnFamily<String, String, String>) -> grapple_cassandra::Result<()> {
//! cf.rows_cursor(2)?
//!     .foreach(|row| {
//!         println!("Found: {}", row.key);
//!         grapple_cassandra::Result::Ok(())
//!     })
//!     .await?;
//!
//! let mut columns = cf.columns_cursor(2, &"yay for me".into())?;
//! while let Some(page) = columns.next_page().await? {
//!     for column in page {
//!         println!("{} = {}", column.name(), column.value());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::{collections::VecDeque, future::Future};

use async_trait::async_trait;
use futures::Stream;
use tracing::debug;

use crate::{
    column::{Column, Row},
    column_family::ColumnFamily,
    transport::{Operation, RawColumn, RawRow},
    Error, Pagable, Result,
};

/// Fetches and decodes the pages a [`Cursor`] walks through.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Raw: Send;
    type Item: Send + Sync;

    /// Encoded position of an item, used as the resume point of the next page.
    fn position(raw: &Self::Raw) -> &[u8];

    /// Whether an item is fetched only as a position and not delivered.
    fn is_absent(_raw: &Self::Raw) -> bool {
        false
    }

    /// Up to `count` items strictly after `start_after`.
    async fn fetch(&self, start_after: Option<Vec<u8>>, count: usize) -> Result<Vec<Self::Raw>>;

    fn decode(&self, raw: Self::Raw) -> Result<Self::Item>;
}

/// Rows of a column family, in store order.
#[derive(Debug)]
pub struct RowPages<K, N, V> {
    family: ColumnFamily<K, N, V>,
}

impl<K, N, V> RowPages<K, N, V> {
    pub(crate) fn new(family: ColumnFamily<K, N, V>) -> Self {
        Self { family }
    }
}

#[async_trait]
impl<K, N, V> PageSource for RowPages<K, N, V>
where
    K: Send + Sync + 'static,
    N: Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    type Raw = RawRow;
    type Item = Row<K, N, V>;

    fn position(raw: &RawRow) -> &[u8] {
        &raw.key
    }

    // Rows whose columns are all deleted can still be listed by the store.
    fn is_absent(raw: &RawRow) -> bool {
        raw.columns.is_empty()
    }

    async fn fetch(&self, start_after: Option<Vec<u8>>, count: usize) -> Result<Vec<RawRow>> {
        self.family
            .read(Operation::RowPage { start_after, count })
            .await?
            .into_rows()
    }

    fn decode(&self, raw: RawRow) -> Result<Row<K, N, V>> {
        let key = self.family.decode_key(&raw.key)?;
        let columns = self.family.decode_columns(raw.columns)?;

        Ok(Row::new(key, columns))
    }
}

/// Columns of a single row, in name order.
#[derive(Debug)]
pub struct ColumnPages<K, N, V> {
    family: ColumnFamily<K, N, V>,
    key: Vec<u8>,
}

impl<K, N, V> ColumnPages<K, N, V> {
    pub(crate) fn new(family: ColumnFamily<K, N, V>, key: Vec<u8>) -> Self {
        Self { family, key }
    }
}

#[async_trait]
impl<K, N, V> PageSource for ColumnPages<K, N, V>
where
    K: Send + Sync + 'static,
    N: Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    type Raw = RawColumn;
    type Item = Column<N, V>;

    fn position(raw: &RawColumn) -> &[u8] {
        &raw.name
    }

    async fn fetch(&self, start_after: Option<Vec<u8>>, count: usize) -> Result<Vec<RawColumn>> {
        self.family
            .read(Operation::ColumnPage {
                key: self.key.clone(),
                start_after,
                count,
            })
            .await?
            .into_columns()
    }

    fn decode(&self, raw: RawColumn) -> Result<Column<N, V>> {
        Ok(self.family.decode_column(raw)?)
    }
}

pub type RowsCursor<K, N, V> = Cursor<RowPages<K, N, V>>;

pub type ColumnsCursor<K, N, V> = Cursor<ColumnPages<K, N, V>>;

/// A paginated scan over the items of a [`PageSource`].
///
/// A cursor is single-owner: every method that advances it takes `&mut self`
/// or `self`.
#[derive(Debug)]
pub struct Cursor<S>
where
    S: PageSource,
{
    source: S,
    page_size: usize,
    resume: Option<Vec<u8>>,
    exhausted: bool,
    inclusive: bool,
    fetches: usize,
    page: Vec<S::Item>,
}

impl<S> Cursor<S>
where
    S: PageSource,
{
    /// Creates a cursor fetching `page_size` items per request.
    ///
    /// Fails with [`Error::Config`] when `page_size` is zero.
    pub fn new(source: S, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::config("page size must be at least 1"));
        }

        Ok(Self {
            source,
            page_size,
            resume: None,
            exhausted: false,
            inclusive: false,
            fetches: 0,
            page: Vec::with_capacity(page_size),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of page requests issued so far.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Whether the scan reached its end. No request is issued afterwards.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    async fn fetch_page(&mut self) -> Result<Vec<S::Item>> {
        loop {
            if self.exhausted {
                return Ok(Vec::new());
            }

            // Stores with inclusive range starts repeat the previous page's last
            // item, so one extra item is requested to keep pages full.
            let requested = match self.resume {
                Some(_) if self.inclusive => self.page_size + 1,
                _ => self.page_size,
            };

            debug!(
                "Fetching page {} of up to {} items",
                self.fetches + 1,
                requested
            );

            let mut raws = self.source.fetch(self.resume.clone(), requested).await?;
            self.fetches += 1;

            let fetched = raws.len();

            let overlaps = match (&self.resume, raws.first()) {
                (Some(resume), Some(first)) => S::position(first) == resume.as_slice(),
                _ => false,
            };
            if overlaps {
                raws.remove(0);

                if !self.inclusive {
                    self.inclusive = true;

                    // The page held nothing but the repeated item.
                    if raws.is_empty() && fetched == requested {
                        continue;
                    }
                }
            }

            let last = raws.last().map(|raw| S::position(raw).to_vec());

            let page = raws
                .into_iter()
                .filter(|raw| !S::is_absent(raw))
                .map(|raw| self.source.decode(raw))
                .collect::<Result<Vec<_>>>();

            // An undecodable item ends the scan.
            if page.is_err() || fetched < requested || last.is_none() {
                self.exhausted = true;
            }
            if last.is_some() {
                self.resume = last;
            }

            return page;
        }
    }

    /// Delivers every remaining item to `consumer`, one page at a time.
    ///
    /// The first error, from the store or from the consumer, stops the scan
    /// and is returned.
    pub async fn foreach<F, E>(mut self, mut consumer: F) -> core::result::Result<(), E>
    where
        F: FnMut(S::Item) -> core::result::Result<(), E>,
        E: From<Error>,
    {
        while !self.exhausted {
            for item in self.fetch_page().await? {
                consumer(item)?;
            }
        }

        Ok(())
    }

    /// Like [`Cursor::foreach`], awaiting the consumer for every item before
    /// delivering the next one.
    pub async fn foreach_async<F, Fut, E>(mut self, mut consumer: F) -> core::result::Result<(), E>
    where
        F: FnMut(S::Item) -> Fut,
        Fut: Future<Output = core::result::Result<(), E>>,
        E: From<Error>,
    {
        while !self.exhausted {
            for item in self.fetch_page().await? {
                consumer(item).await?;
            }
        }

        Ok(())
    }

    /// Converts the cursor into a stream of items. Pages are requested as the
    /// stream is polled.
    pub fn into_stream(self) -> impl Stream<Item = Result<S::Item>> {
        futures::stream::try_unfold(
            (self, VecDeque::new()),
            |(mut cursor, mut buffer)| async move {
                loop {
                    if let Some(item) = buffer.pop_front() {
                        return Ok::<_, Error>(Some((item, (cursor, buffer))));
                    }

                    if cursor.exhausted {
                        return Ok::<_, Error>(None);
                    }

                    buffer.extend(cursor.fetch_page().await?);
                }
            },
        )
    }
}

#[async_trait]
impl<S> Pagable<S::Item> for Cursor<S>
where
    S: PageSource,
{
    async fn next_page(&mut self) -> Result<Option<&[S::Item]>> {
        self.page.clear();

        while self.page.is_empty() && !self.exhausted {
            self.page = self.fetch_page().await?;
        }

        if self.page.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.page_items()))
        }
    }

    async fn skip_page(&mut self) -> Result<()> {
        self.page.clear();
        self.fetch_page().await?;

        Ok(())
    }

    #[inline]
    fn page_items(&self) -> &[S::Item] {
        &self.page
    }
}

// region:    --- Tests

#[cfg(test)]
mod tests {
    type Result<T> = super::Result<T>; // For tests.

    use std::sync::{Arc, Mutex};

    use futures::TryStreamExt;

    use super::*;
    use crate::{
        codec::{Codec, Int32Codec, Int64Codec, Utf8Codec},
        transport::MemoryTransport,
        Cluster, Keyspace,
    };

    type Cf = ColumnFamily<String, String, String>;

    async fn get_family() -> (Arc<MemoryTransport>, Keyspace, Cf) {
        let transport = Arc::new(MemoryTransport::new());
        let keyspace = Cluster::new(["localhost"])
            .keyspace("Keyspace1")
            .connect_with(transport.clone())
            .await
            .unwrap();
        let cf = keyspace
            .column_family("Standard1", Utf8Codec, Utf8Codec, Utf8Codec)
            .unwrap();

        (transport, keyspace, cf)
    }

    fn s(value: &str) -> String {
        value.to_string()
    }

    async fn seed_rows(cf: &Cf, keys: &[&str]) -> Result<()> {
        for key in keys {
            cf.insert(&s(key), &cf.new_column(s("name"), s(key))).await?;
            cf.insert(&s(key), &cf.new_column(s("motto"), s(key))).await?;
        }

        Ok(())
    }

    async fn collect_keys(cf: &Cf, page_size: usize) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        cf.rows_cursor(page_size)?
            .foreach(|row| {
                keys.push(row.key);
                Result::Ok(())
            })
            .await?;

        Ok(keys)
    }

    // region:    --- ROWS TESTS

    #[tokio::test]
    async fn test_rows_cursor_four_keys_two_per_page() -> Result<()> {
        let (transport, _keyspace, cf) = get_family().await;
        seed_rows(
            &cf,
            &["yay for me", "yay for you", "yay for us", "yay for everyone"],
        )
        .await?;

        let keys = collect_keys(&cf, 2).await?;

        assert_eq!(
            vec!["yay for everyone", "yay for me", "yay for us", "yay for you"],
            keys
        );
        // Two full pages, then the empty page that ends the scan.
        assert_eq!(3, transport.requests().row_pages());

        Ok(())
    }

    #[tokio::test]
    async fn test_rows_cursor_delivers_each_row_once_for_every_page_size() -> Result<()> {
        let (transport, _keyspace, cf) = get_family().await;
        let all: Vec<String> = (0..7).map(|i| format!("key{i}")).collect();
        let refs: Vec<&str> = all.iter().map(String::as_str).collect();
        seed_rows(&cf, &refs).await?;

        for page_size in 1..=9 {
            let before = transport.requests().row_pages();

            let keys = collect_keys(&cf, page_size).await?;

            assert_eq!(all, keys, "page size {page_size}");
            assert_eq!(
                all.len() / page_size + 1,
                transport.requests().row_pages() - before,
                "page size {page_size}"
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_rows_cursor_empty_family() -> Result<()> {
        let (transport, _keyspace, cf) = get_family().await;

        let keys = collect_keys(&cf, 3).await?;

        assert!(keys.is_empty());
        assert_eq!(1, transport.requests().row_pages());

        Ok(())
    }

    #[tokio::test]
    async fn test_rows_cursor_rejects_zero_page_size() {
        let (_, _keyspace, cf) = get_family().await;

        assert!(matches!(cf.rows_cursor(0), Err(Error::Config(_))));
        assert!(matches!(
            cf.columns_cursor(0, &s("yay for me")),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_rows_cursor_consumer_error_aborts_scan() -> Result<()> {
        let (transport, _keyspace, cf) = get_family().await;
        seed_rows(&cf, &["a", "b", "c", "d", "e"]).await?;

        let mut seen = 0;
        let res = cf
            .rows_cursor(2)?
            .foreach(|_row| {
                seen += 1;
                if seen == 3 {
                    return Err(Error::config("stop"));
                }
                Ok(())
            })
            .await;

        assert!(matches!(res, Err(Error::Config(_))));
        assert_eq!(3, seen);
        assert_eq!(2, transport.requests().row_pages());

        Ok(())
    }

    #[tokio::test]
    async fn test_rows_cursor_decode_error_ends_scan() -> Result<()> {
        let (_, keyspace, cf) = get_family().await;
        let numbers = keyspace.column_family("Standard1", Utf8Codec, Utf8Codec, Int64Codec)?;

        for key in ["a", "c", "d", "e"] {
            numbers
                .insert(&key.to_string(), &numbers.new_column("n".into(), 1))
                .await?;
        }
        cf.insert(&"b".to_string(), &cf.new_column("n".into(), "oops".into()))
            .await?;

        let mut cursor = numbers.rows_cursor(3)?;

        assert!(matches!(cursor.next_page().await, Err(Error::Decode(_))));
        assert!(cursor.is_exhausted());
        assert!(cursor.next_page().await?.is_none());
        assert_eq!(1, cursor.fetches());

        Ok(())
    }

    #[tokio::test]
    async fn test_rows_cursor_pages_only_after_delivery() -> Result<()> {
        let (transport, _keyspace, cf) = get_family().await;
        seed_rows(&cf, &["a", "b", "c", "d", "e"]).await?;

        let pages_seen = Arc::new(Mutex::new(Vec::new()));
        let counts = transport.clone();
        let seen = pages_seen.clone();

        cf.rows_cursor(2)?
            .foreach_async(move |row| {
                let counts = counts.clone();
                let seen = seen.clone();
                async move {
                    tokio::task::yield_now().await;
                    seen.lock()
                        .unwrap()
                        .push((row.key, counts.requests().row_pages()));
                    Result::Ok(())
                }
            })
            .await?;

        let pages_seen = pages_seen.lock().unwrap().clone();
        assert_eq!(
            vec![
                (s("a"), 1),
                (s("b"), 1),
                (s("c"), 2),
                (s("d"), 2),
                (s("e"), 3)
            ],
            pages_seen
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_rows_cursor_skips_rows_deleted_between_pages() -> Result<()> {
        let (_, _keyspace, cf) = get_family().await;
        seed_rows(&cf, &["a", "b", "c", "d"]).await?;

        let mut cursor = cf.rows_cursor(2)?;
        let first: Vec<String> = cursor
            .next_page()
            .await?
            .unwrap()
            .iter()
            .map(|row| row.key.clone())
            .collect();
        assert_eq!(vec![s("a"), s("b")], first);

        cf.remove_row(&s("c")).await?;

        let second: Vec<String> = cursor
            .next_page()
            .await?
            .unwrap()
            .iter()
            .map(|row| row.key.clone())
            .collect();
        assert_eq!(vec![s("d")], second);

        assert!(cursor.next_page().await?.is_none());
        assert!(cursor.is_exhausted());
        assert_eq!(2, cursor.fetches());

        Ok(())
    }

    #[tokio::test]
    async fn test_rows_cursor_skip_pages() -> Result<()> {
        let (_, _keyspace, cf) = get_family().await;
        seed_rows(&cf, &["a", "b", "c", "d", "e"]).await?;

        let mut cursor = cf.rows_cursor(2)?;
        cursor.skip_pages(2).await?;

        let last = cursor.next_page().await?.unwrap();
        assert_eq!(1, last.len());
        assert_eq!(s("e"), last[0].key);

        assert_eq!(s("e"), cursor.page_items()[0].key);
        assert!(cursor.next_page().await?.is_none());
        assert!(cursor.page_items().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_rows_cursor_cancellation_stops_paging() -> Result<()> {
        let (transport, _keyspace, cf) = get_family().await;
        seed_rows(&cf, &["a", "b", "c", "d", "e"]).await?;

        let cursor = cf.rows_cursor(2)?;
        let task = tokio::spawn(cursor.foreach_async(|row| async move {
            if row.key == "b" {
                futures::future::pending::<()>().await;
            }
            Result::Ok(())
        }));

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert_eq!(1, transport.requests().row_pages());

        Ok(())
    }

    // endregion: --- ROWS TESTS

    // region:    --- COLUMNS TESTS

    #[tokio::test]
    async fn test_columns_cursor() -> Result<()> {
        let (transport, keyspace, _) = get_family().await;
        let cf = keyspace.column_family("Numbers", Utf8Codec, Int32Codec, Utf8Codec)?;
        let key = s("yay for me");

        for i in 0..5 {
            cf.insert(&key, &cf.new_column(i, format!("v{i}"))).await?;
        }
        cf.insert(&s("other"), &cf.new_column(9, s("x"))).await?;

        let mut names = Vec::new();
        cf.columns_cursor(2, &key)?
            .foreach(|column| {
                names.push(*column.name());
                Result::Ok(())
            })
            .await?;

        assert_eq!(vec![0, 1, 2, 3, 4], names);
        assert_eq!(3, transport.requests().column_pages());

        Ok(())
    }

    #[tokio::test]
    async fn test_columns_cursor_as_stream() -> Result<()> {
        let (_, _keyspace, cf) = get_family().await;
        let key = s("yay for me");
        for name in ["a", "b", "c", "d"] {
            cf.insert(&key, &cf.new_column(s(name), s(name))).await?;
        }

        let columns: Vec<Column<String, String>> =
            cf.columns_cursor(3, &key)?.into_stream().try_collect().await?;

        let names: Vec<&str> = columns.iter().map(|c| c.name().as_str()).collect();
        assert_eq!(vec!["a", "b", "c", "d"], names);

        let missing: Vec<Column<String, String>> = cf
            .columns_cursor(3, &s("yay for no one"))?
            .into_stream()
            .try_collect()
            .await?;
        assert!(missing.is_empty());

        Ok(())
    }

    // endregion: --- COLUMNS TESTS

    // region:    --- OVERLAP TESTS

    /// Serves `items` with an inclusive start, the way Thrift range slices do.
    struct InclusiveSource {
        items: Vec<Vec<u8>>,
        fetches: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl PageSource for InclusiveSource {
        type Raw = Vec<u8>;
        type Item = String;

        fn position(raw: &Vec<u8>) -> &[u8] {
            raw
        }

        async fn fetch(&self, start: Option<Vec<u8>>, count: usize) -> Result<Vec<Vec<u8>>> {
            *self.fetches.lock().unwrap() += 1;

            Ok(self
                .items
                .iter()
                .filter(|item| start.as_ref().map_or(true, |start| *item >= start))
                .take(count)
                .cloned()
                .collect())
        }

        fn decode(&self, raw: Vec<u8>) -> Result<String> {
            Ok(Utf8Codec.decode(&raw)?)
        }
    }

    #[tokio::test]
    async fn test_cursor_trims_boundary_overlap() -> Result<()> {
        let fetches = Arc::new(Mutex::new(0));
        let source = InclusiveSource {
            items: ["a", "b", "c", "d"].iter().map(|s| s.as_bytes().to_vec()).collect(),
            fetches: fetches.clone(),
        };

        let items: Vec<String> = Cursor::new(source, 2)?.into_stream().try_collect().await?;

        assert_eq!(vec!["a", "b", "c", "d"], items);
        // [a b] [b c] [c d]
        assert_eq!(3, *fetches.lock().unwrap());

        Ok(())
    }

    #[tokio::test]
    async fn test_cursor_overlap_only_page_terminates() -> Result<()> {
        let source = InclusiveSource {
            items: vec![b"a".to_vec()],
            fetches: Arc::new(Mutex::new(0)),
        };

        let items: Vec<String> = Cursor::new(source, 1)?.into_stream().try_collect().await?;

        assert_eq!(vec!["a"], items);

        Ok(())
    }

    #[tokio::test]
    async fn test_cursor_overlap_with_single_item_pages() -> Result<()> {
        let fetches = Arc::new(Mutex::new(0));
        let source = InclusiveSource {
            items: ["a", "b", "c"].iter().map(|s| s.as_bytes().to_vec()).collect(),
            fetches: fetches.clone(),
        };

        let mut cursor = Cursor::new(source, 1)?;
        let mut items = Vec::new();
        while let Some(page) = cursor.next_page().await? {
            assert_eq!(1, page.len());
            items.extend(page.iter().cloned());
        }

        assert_eq!(vec!["a", "b", "c"], items);
        // [a] [a] [a b] [b c] [c]
        assert_eq!(5, *fetches.lock().unwrap());

        Ok(())
    }

    // endregion: --- OVERLAP TESTS
}

// endregion: --- Tests
