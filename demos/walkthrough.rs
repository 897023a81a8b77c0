// region:    --- Modules

#[cfg(feature = "scylla")]
use grapple_cassandra::{codec::Utf8Codec, scylla::ConnectionParams, Cluster, Pagable};

// endregion: --- Modules

pub type Result<T> = core::result::Result<T, Error>;
pub type Error = Box<dyn std::error::Error>; // For early dev.

#[cfg(not(feature = "scylla"))]
fn main() {
    panic!("This example requires 'scylla' enabled feature")
}

#[cfg(feature = "scylla")]
#[tokio::main]
async fn main() -> Result<()> {
    // -- CONNECT
    let cluster = Cluster::new(["localhost"]);

    let keyspace = cluster
        .keyspace("Keyspace1")
        .connection(ConnectionParams {
            create_keyspace: true,
            ..Default::default()
        })
        .connect()
        .await?;

    keyspace.ensure_column_family("Standard1").await?;
    println!("Connected to {:?}", keyspace.hosts());

    let cass = keyspace.column_family("Standard1", Utf8Codec, Utf8Codec, Utf8Codec)?;

    let me = "yay for me".to_string();
    let you = "yay for you".to_string();
    let us = "yay for us".to_string();
    let everyone = "yay for everyone".to_string();
    let nobody = "yay for nobody".to_string();
    let name = "name".to_string();
    let motto = "motto".to_string();

    // -- INSERT
    println!("inserting some columns");

    for (key, who, says) in [
        (&me, "Coda", "Moar lean."),
        (&you, "Niki", "Told ya."),
        (&us, "Biscuit", "Mlalm."),
        (&everyone, "Louie", "Swish!"),
    ] {
        cass.insert(key, &cass.new_column(name.clone(), who.into()))
            .await?;
        cass.insert(key, &cass.new_column(motto.clone(), says.into()))
            .await?;
    }

    // -- READ
    let no_one = "yay for no one".to_string();

    println!("getting a column: {:?}", cass.get_column(&me, &name).await?);
    println!(
        "getting a column that doesn't exist: {:?}",
        cass.get_column(&no_one, &name).await?
    );
    println!(
        "getting a column that doesn't exist #2: {:?}",
        cass.get_column(&no_one, &"oink".into()).await?
    );
    println!(
        "getting a set of columns: {:?}",
        cass.get_columns(&me, &[name.clone(), motto.clone()]).await?
    );
    println!("getting a whole row: {:?}", cass.get_row(&me).await?);
    println!(
        "getting a column from a set of keys: {:?}",
        cass.multiget_column([me.clone(), you.clone()], &name).await?
    );
    println!(
        "getting a set of columns from a set of keys: {:?}",
        cass.multiget_columns([me.clone(), you.clone()], &[name.clone(), motto.clone()])
            .await?
    );

    // -- ITERATE
    println!("Iterating!");

    cass.rows_cursor(2)?
        .foreach(|row| {
            println!("Found: {}", row.key);
            grapple_cassandra::Result::Ok(())
        })
        .await?;

    let mut columns = cass.columns_cursor(2, &me)?;
    while let Some(page) = columns.next_page().await? {
        for column in page {
            println!("Found Columns Iteratee: {:?}", column);
        }
    }

    // -- REMOVE
    println!("removing a column");
    cass.remove_column(&me, &motto).await?;

    println!("removing a row");
    cass.remove_row(&me).await?;

    // -- BATCH
    println!("Batching up some stuff");
    cass.batch()
        .remove_column(&you, &name)
        .remove_columns(&us, &[name.clone(), motto.clone()])
        .insert(&nobody, &cass.new_column(name.clone(), "Burt".into()))
        .insert(&nobody, &cass.new_column(motto.clone(), "'S funny.".into()))
        .execute()
        .await?;

    println!("Wrappin' up");
    keyspace.close().await;

    Ok(())
}
